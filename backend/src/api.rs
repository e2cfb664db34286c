//! Public API surface for the booking engine.
//!
//! This file consolidates the request shapes accepted by the scheduling
//! service and the flat read-models it returns. Storage records are never
//! serialized at the boundary; callers only see these types.
//! All types derive Serialize/Deserialize with camelCase field names.

pub use crate::models::{
    AppointmentId, BookingParticipant, ClinicId, DoctorId, NewPatient, PatientId, SpecialityId,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{Appointment, AppointmentDraft, BookingSlot};

/// Create/update payload for an appointment with a known patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub appointment_date_time: NaiveDateTime,
    #[serde(default)]
    pub category: String,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub clinic_id: ClinicId,
    #[serde(default)]
    pub duration_in_minutes: i32,
}

impl AppointmentRequest {
    pub fn to_draft(&self) -> AppointmentDraft {
        AppointmentDraft {
            patient_id: self.patient_id,
            slot: BookingSlot {
                start: self.appointment_date_time,
                duration_minutes: self.duration_in_minutes,
                category: self.category.clone(),
                doctor_id: self.doctor_id,
                clinic_id: self.clinic_id,
            },
        }
    }
}

/// Appointment part of the combined "book for a new patient" payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSlotRequest {
    pub appointment_date_time: NaiveDateTime,
    #[serde(default)]
    pub category: String,
    pub doctor_id: DoctorId,
    pub clinic_id: ClinicId,
    #[serde(default)]
    pub duration_in_minutes: i32,
}

impl AppointmentSlotRequest {
    pub fn to_slot(&self) -> BookingSlot {
        BookingSlot {
            start: self.appointment_date_time,
            duration_minutes: self.duration_in_minutes,
            category: self.category.clone(),
            doctor_id: self.doctor_id,
            clinic_id: self.clinic_id,
        }
    }
}

/// Combined payload: resolve or create the patient, then book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentWithPatientRequest {
    pub patient: NewPatient,
    pub appointment: AppointmentSlotRequest,
}

/// Appointment read-model with joined display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: AppointmentId,
    pub appointment_date_time: NaiveDateTime,
    pub category: String,
    pub duration_in_minutes: i32,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub clinic_id: ClinicId,
    pub patient_name: String,
    pub doctor_name: String,
    pub clinic_name: String,
}

impl AppointmentView {
    /// Build the read-model from a stored appointment and the joined names.
    pub fn from_parts(
        appointment: &Appointment,
        patient_name: impl Into<String>,
        doctor_name: impl Into<String>,
        clinic_name: impl Into<String>,
    ) -> Self {
        Self {
            id: appointment.id,
            appointment_date_time: appointment.start,
            category: appointment.category.clone(),
            duration_in_minutes: appointment.duration_minutes,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            clinic_id: appointment.clinic_id,
            patient_name: patient_name.into(),
            doctor_name: doctor_name.into(),
            clinic_name: clinic_name.into(),
        }
    }
}

/// Doctor search criteria. At least one term must be non-blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSearch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl DoctorSearch {
    /// Lower-cased, trimmed first-name term, if one was given.
    pub fn first_name_term(&self) -> Option<String> {
        normalize_term(self.first_name.as_deref())
    }

    /// Lower-cased, trimmed last-name term, if one was given.
    pub fn last_name_term(&self) -> Option<String> {
        normalize_term(self.last_name.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.first_name_term().is_none() && self.last_name_term().is_none()
    }

    /// Case-insensitive substring match against a doctor's names.
    pub fn matches(&self, first_name: &str, last_name: &str) -> bool {
        let first_ok = self
            .first_name_term()
            .map_or(true, |t| first_name.to_lowercase().contains(&t));
        let last_ok = self
            .last_name_term()
            .map_or(true, |t| last_name.to_lowercase().contains(&t));
        first_ok && last_ok
    }
}

fn normalize_term(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Doctor search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSearchResult {
    pub doctor_id: DoctorId,
    pub full_name: String,
    pub clinic_name: String,
    pub speciality_name: String,
}
