//! Domain and audit events emitted by the write path.
//!
//! The core does not send notifications or persist audit records itself; it
//! hands structured events to an [`EventSink`] so external collaborators
//! (mailer, calendar export, audit log) can subscribe at the boundary.

use serde::{Deserialize, Serialize};

use crate::api::BookingId;

/// What happened to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEventKind {
    Created,
    Rescheduled,
    Cancelled,
    Approved,
    Declined,
    Completed,
}

/// Domain event for the notifier/calendar-export collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub booking_id: BookingId,
}

/// Audit event for the audit-log collaborator.
///
/// `action` follows the `booking.create` / `availability.deactivate` naming
/// scheme; `actor` is whatever identity the calling surface supplies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor: Option<String>,
    pub action: String,
    pub object_type: String,
    pub object_id: String,
}

impl AuditEvent {
    pub fn new(
        actor: Option<&str>,
        action: impl Into<String>,
        object_type: impl Into<String>,
        object_id: impl ToString,
    ) -> Self {
        Self {
            actor: actor.map(str::to_string),
            action: action.into(),
            object_type: object_type.into(),
            object_id: object_id.to_string(),
        }
    }
}

/// Boundary for event delivery. Implementations must not block the write
/// path; delivery failures are the collaborator's concern, not the core's.
pub trait EventSink: Send + Sync {
    fn booking_event(&self, event: &BookingEvent);
    fn audit_event(&self, event: &AuditEvent);
}

/// Whether the notifier collaborator should be fed booking events.
///
/// Passed in at construction instead of being read from ambient process
/// state, so each sink instance carries its own toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifierConfig {
    pub notifications_enabled: bool,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
        }
    }
}

/// Sink that forwards events to the tracing subscriber. Stands in for the
/// external notifier and audit collaborators in deployments that only need
/// structured logs.
#[derive(Debug, Clone, Default)]
pub struct LogEventSink {
    notify: NotifierConfig,
}

impl LogEventSink {
    pub fn new(notify: NotifierConfig) -> Self {
        Self { notify }
    }
}

impl EventSink for LogEventSink {
    fn booking_event(&self, event: &BookingEvent) {
        if !self.notify.notifications_enabled {
            return;
        }
        tracing::info!(
            kind = ?event.kind,
            booking_id = %event.booking_id,
            "booking event"
        );
    }

    fn audit_event(&self, event: &AuditEvent) {
        tracing::info!(
            actor = event.actor.as_deref().unwrap_or("-"),
            action = %event.action,
            object_type = %event.object_type,
            object_id = %event.object_id,
            "audit event"
        );
    }
}

/// Sink that drops everything. Useful in tests that don't assert on events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn booking_event(&self, _event: &BookingEvent) {}
    fn audit_event(&self, _event: &AuditEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_serializes_snake_case() {
        let json = serde_json::to_string(&BookingEventKind::Rescheduled).unwrap();
        assert_eq!(json, "\"rescheduled\"");
    }

    #[test]
    fn test_audit_event_builder() {
        let event = AuditEvent::new(Some("reception"), "booking.create", "Booking", 42);
        assert_eq!(event.actor.as_deref(), Some("reception"));
        assert_eq!(event.action, "booking.create");
        assert_eq!(event.object_id, "42");
    }

    #[test]
    fn test_notifier_defaults_on() {
        assert!(NotifierConfig::default().notifications_enabled);
    }
}
