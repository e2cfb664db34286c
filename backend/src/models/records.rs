//! Stored records and write payloads for the booking domain.
//!
//! These are flat structs keyed by id newtypes. Relationships are expressed
//! through ids only; joined data is exposed through read-models in
//! [`crate::api`].

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::interval::TimeInterval;
use crate::define_id_type;

define_id_type!(i64, AppointmentId);
define_id_type!(i64, PatientId);
define_id_type!(i64, DoctorId);
define_id_type!(i64, ClinicId);
define_id_type!(i64, SpecialityId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    pub id: ClinicId,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClinic {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speciality {
    pub id: SpecialityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSpeciality {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: DoctorId,
    pub first_name: String,
    pub last_name: String,
    pub clinic_id: ClinicId,
    pub speciality_id: SpecialityId,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub first_name: String,
    pub last_name: String,
    pub clinic_id: ClinicId,
    pub speciality_id: SpecialityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn identity(&self) -> PatientIdentity {
        PatientIdentity {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Patient details supplied by a caller, before the record has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl NewPatient {
    pub fn identity(&self) -> PatientIdentity {
        PatientIdentity {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Exact-match identity key used to find an existing patient.
///
/// Comparison is byte-for-byte: no trimming or case folding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Which side of a booking an overlap was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingParticipant {
    Patient,
    Doctor,
}

impl std::fmt::Display for BookingParticipant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingParticipant::Patient => write!(f, "patient"),
            BookingParticipant::Doctor => write!(f, "doctor"),
        }
    }
}

/// The time, reason and place of a booking, independent of the patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingSlot {
    pub start: NaiveDateTime,
    pub duration_minutes: i32,
    pub category: String,
    pub doctor_id: DoctorId,
    pub clinic_id: ClinicId,
}

impl BookingSlot {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::from_minutes(self.start, self.duration_minutes)
    }
}

/// A complete appointment payload for insert or full-field replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDraft {
    pub patient_id: PatientId,
    #[serde(flatten)]
    pub slot: BookingSlot,
}

impl AppointmentDraft {
    pub fn interval(&self) -> TimeInterval {
        self.slot.interval()
    }

    pub fn into_appointment(self, id: AppointmentId) -> Appointment {
        Appointment {
            id,
            start: self.slot.start,
            duration_minutes: self.slot.duration_minutes,
            category: self.slot.category,
            patient_id: self.patient_id,
            doctor_id: self.slot.doctor_id,
            clinic_id: self.slot.clinic_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub start: NaiveDateTime,
    pub duration_minutes: i32,
    pub category: String,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub clinic_id: ClinicId,
}

impl Appointment {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::from_minutes(self.start, self.duration_minutes)
    }

    pub fn end(&self) -> NaiveDateTime {
        self.interval().end()
    }
}
