//! # Clinic Scheduling Core
//!
//! Appointment scheduling engine for a multi-provider clinic: recurring
//! weekly availability, free-slot suggestion, conflict-aware booking writes.
//! The core is storage-agnostic and exposes an optional REST API via Axum.
//!
//! ## Features
//!
//! - **Availability**: recurring weekly windows per provider with a default
//!   slot granularity
//! - **Slot Generation**: lazy expansion of availability into concrete,
//!   dated candidate intervals
//! - **Conflict Checking**: half-open overlap detection against active
//!   bookings for a provider or subject
//! - **Booking Writes**: create / reschedule / cancel / approve / decline /
//!   complete with a transactional conflict guard
//! - **HTTP API**: RESTful endpoints for booking surfaces
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: identifier newtypes and re-exported public types
//! - [`models`]: domain entities (intervals, availability windows, bookings)
//! - [`db`]: repository pattern and storage backends
//! - [`services`]: slot generation, conflict checking, and the write path
//! - [`http`]: Axum-based HTTP server and request handlers

pub mod api;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
