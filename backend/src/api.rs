//! Public API surface for the scheduling core.
//!
//! This file consolidates the identifier newtypes and re-exports the domain
//! and service types callers interact with. All types derive
//! Serialize/Deserialize for JSON serialization.

pub use crate::models::availability::AvailabilityWindow;
pub use crate::models::availability::NewAvailabilityWindow;
pub use crate::models::booking::Booking;
pub use crate::models::booking::BookingStatus;
pub use crate::models::booking::NewBooking;
pub use crate::models::interval::TimeInterval;
pub use crate::services::conflicts::ConflictQuery;
pub use crate::services::error::SchedulingError;
pub use crate::services::error::SchedulingResult;
pub use crate::services::events::AuditEvent;
pub use crate::services::events::BookingEvent;
pub use crate::services::events::BookingEventKind;
pub use crate::services::slots::FreeSlot;
pub use crate::services::slots::FreeSlotRequest;
pub use crate::services::slots::SlotQuery;

use crate::define_id_type;

// Identifier newtypes (database primary keys / foreign references).
define_id_type!(i64, ProviderId);
define_id_type!(i64, SubjectId);
define_id_type!(i64, BookingId);
define_id_type!(i64, WindowId);
