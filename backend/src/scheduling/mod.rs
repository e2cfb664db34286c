//! Appointment scheduling and conflict detection.
//!
//! - [`policy`]: the ordered booking rules
//! - [`conflict`]: overlap detection for a doctor/patient pair
//! - [`resolver`]: find-or-create for patient identities
//! - [`locks`]: per-participant write serialization
//! - [`service`]: [`SchedulingService`], the entry point for every operation

pub mod clock;
pub mod config;
pub mod conflict;
pub mod error;
pub mod locks;
pub mod policy;
pub mod resolver;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BookingRules, SchedulingConfig};
pub use conflict::{detect_conflicts, ConflictChecker, ConflictReport};
pub use error::{ErrorKind, ReferenceKind, SchedulingError, SchedulingResult, TemporalViolation};
pub use locks::{BookingGuard, BookingLocks, LockKey};
pub use policy::{BookingPolicy, PatientRef};
pub use resolver::{validate_patient, PatientResolver, ResolvedPatient};
pub use service::SchedulingService;
