//! Find-or-create semantics for the combined booking flow.

use super::error::{SchedulingError, SchedulingResult};
use crate::db::repository::ReferenceRepository;
use crate::models::{NewPatient, Patient};

/// Outcome of matching supplied patient details against stored patients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedPatient {
    /// A patient with the exact same first name, last name and email exists.
    Existing(Patient),
    /// No match; the details will be inserted along with the appointment.
    New(NewPatient),
}

impl ResolvedPatient {
    pub fn existing(&self) -> Option<&Patient> {
        match self {
            ResolvedPatient::Existing(patient) => Some(patient),
            ResolvedPatient::New(_) => None,
        }
    }
}

/// Reject patient details with a blank first name, last name or email.
pub fn validate_patient(patient: &NewPatient) -> SchedulingResult<()> {
    let blank = [&patient.first_name, &patient.last_name, &patient.email]
        .iter()
        .any(|field| field.trim().is_empty());
    if blank {
        return Err(SchedulingError::validation("Patient info is required."));
    }
    Ok(())
}

pub struct PatientResolver<'a, R: ReferenceRepository + ?Sized> {
    repository: &'a R,
}

impl<'a, R: ReferenceRepository + ?Sized> PatientResolver<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// Look the patient up by exact identity.
    ///
    /// Supplied birth date and gender are ignored when an existing record
    /// matches; the stored record is never modified.
    pub async fn resolve(&self, patient: &NewPatient) -> SchedulingResult<ResolvedPatient> {
        validate_patient(patient)?;
        let found = self
            .repository
            .find_patient_by_identity(&patient.identity())
            .await?;
        Ok(match found {
            Some(existing) => ResolvedPatient::Existing(existing),
            None => ResolvedPatient::New(patient.clone()),
        })
    }
}
