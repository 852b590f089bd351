//! Service layer for business logic and orchestration.
//!
//! Services sit between the repository traits and the callers (HTTP
//! handlers or in-process consumers): slot generation, conflict checking,
//! the booking write path, and availability administration.

pub mod availability_admin;

pub mod booking_flow;

pub mod conflicts;

pub mod error;

pub mod events;

pub mod slots;

pub use booking_flow::BookingFlow;
pub use conflicts::{conflicting_bookings, conflicts_with, ConflictQuery};
pub use error::{SchedulingError, SchedulingResult};
pub use events::{
    AuditEvent, BookingEvent, BookingEventKind, EventSink, LogEventSink, NotifierConfig,
    NullEventSink,
};
pub use slots::{suggest_free_slots, CandidateSlots, FreeSlot, FreeSlotRequest, SlotQuery};
