//! Repository traits for the booking store.
//!
//! The scheduling engine talks to storage only through these traits:
//!
//! - [`ReferenceRepository`]: clinics, specialities, doctors and patients
//!   (existence checks, identity lookup, record creation, doctor search)
//! - [`AppointmentRepository`]: appointment reads and the atomic write paths
//!   that enforce the no-overlap invariant
//! - [`FullRepository`]: both, as handed to the service and HTTP layers

mod appointment;
mod deadline;
mod error;
mod reference;

pub use appointment::AppointmentRepository;
pub use deadline::Deadline;
pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use reference::ReferenceRepository;

/// Everything the scheduling service needs from storage.
pub trait FullRepository: ReferenceRepository + AppointmentRepository {}

impl<T> FullRepository for T where T: ReferenceRepository + AppointmentRepository {}
