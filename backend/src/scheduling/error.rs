//! Errors reported by the scheduling service.
//!
//! Every rejection carries a human-readable message and a machine-readable
//! [`ErrorKind`] so the HTTP layer can map it to a status code without
//! parsing text.

use chrono::NaiveTime;
use thiserror::Error;

use crate::db::repository::RepositoryError;
use crate::models::{AppointmentId, BookingParticipant};

/// Referenced entity that could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Patient,
    Doctor,
    Clinic,
}

impl ReferenceKind {
    /// Map a repository entity name onto the booking reference it denotes.
    pub fn from_entity(entity: &str) -> Option<Self> {
        match entity {
            "patient" => Some(ReferenceKind::Patient),
            "doctor" => Some(ReferenceKind::Doctor),
            "clinic" => Some(ReferenceKind::Clinic),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ReferenceKind::Patient => "Patient",
            ReferenceKind::Doctor => "Doctor",
            ReferenceKind::Clinic => "Clinic",
        }
    }
}

/// Time-based rule that a booking broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalViolation {
    InPast,
    OutsideBusinessHours { opening: NaiveTime, closing: NaiveTime },
}

impl std::fmt::Display for TemporalViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemporalViolation::InPast => write!(f, "You cannot book an appointment in the past."),
            TemporalViolation::OutsideBusinessHours { opening, closing } => write!(
                f,
                "Appointments must be booked between {} and {}.",
                opening.format("%H:%M"),
                closing.format("%H:%M")
            ),
        }
    }
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    ReferentialIntegrity,
    Temporal,
    Conflict,
    NotFound,
    Transient,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::ReferentialIntegrity => "REFERENTIAL_INTEGRITY_ERROR",
            ErrorKind::Temporal => "TEMPORAL_ERROR",
            ErrorKind::Conflict => "CONFLICT_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Transient => "TRANSIENT_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("{0}")]
    Validation(String),

    #[error("{} ID does not exist.", .entity.label())]
    Referential { entity: ReferenceKind, id: i64 },

    #[error("{0}")]
    Temporal(TemporalViolation),

    #[error("{}", conflict_message(.0))]
    Conflict(BookingParticipant),

    #[error("Appointment not found.")]
    NotFound(AppointmentId),

    #[error("Service temporarily unavailable: {message}")]
    Transient { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn conflict_message(participant: &BookingParticipant) -> &'static str {
    match participant {
        BookingParticipant::Patient => "Patient already has an overlapping appointment.",
        BookingParticipant::Doctor => "Doctor is already booked at this time.",
    }
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;

impl SchedulingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Referential { .. } => ErrorKind::ReferentialIntegrity,
            Self::Temporal(_) => ErrorKind::Temporal,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<RepositoryError> for SchedulingError {
    fn from(err: RepositoryError) -> Self {
        if err.is_retryable() {
            return Self::transient(err.to_string());
        }
        match err {
            RepositoryError::ConflictError { participant, .. } => Self::Conflict(participant),
            RepositoryError::ValidationError { message, .. } => Self::Validation(message),
            RepositoryError::MissingReference { entity, id, .. } => {
                match ReferenceKind::from_entity(&entity) {
                    Some(entity) => Self::Referential { entity, id },
                    None => Self::Validation(format!("{} {} does not exist.", entity, id)),
                }
            }
            other => Self::internal(other.to_string()),
        }
    }
}
