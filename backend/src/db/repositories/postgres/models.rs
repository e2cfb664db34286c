use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use super::schema::{appointments, clinics, doctors, patients, specialities};
use crate::models::{
    Appointment, AppointmentDraft, AppointmentId, BookingSlot, Clinic, ClinicId, Doctor, DoctorId,
    NewClinic, NewDoctor, NewPatient, NewSpeciality, Patient, PatientId, Speciality, SpecialityId,
};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = clinics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ClinicRow {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
}

impl From<ClinicRow> for Clinic {
    fn from(row: ClinicRow) -> Self {
        Clinic {
            id: ClinicId::new(row.id),
            name: row.name,
            address: row.address,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = clinics)]
pub struct NewClinicRow {
    pub name: String,
    pub address: Option<String>,
}

impl From<&NewClinic> for NewClinicRow {
    fn from(clinic: &NewClinic) -> Self {
        Self {
            name: clinic.name.clone(),
            address: clinic.address.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = specialities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SpecialityRow {
    pub id: i64,
    pub name: String,
}

impl From<SpecialityRow> for Speciality {
    fn from(row: SpecialityRow) -> Self {
        Speciality {
            id: SpecialityId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = specialities)]
pub struct NewSpecialityRow {
    pub name: String,
}

impl From<&NewSpeciality> for NewSpecialityRow {
    fn from(speciality: &NewSpeciality) -> Self {
        Self {
            name: speciality.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = doctors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DoctorRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub clinic_id: i64,
    pub speciality_id: i64,
}

impl From<DoctorRow> for Doctor {
    fn from(row: DoctorRow) -> Self {
        Doctor {
            id: DoctorId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            clinic_id: ClinicId::new(row.clinic_id),
            speciality_id: SpecialityId::new(row.speciality_id),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = doctors)]
pub struct NewDoctorRow {
    pub first_name: String,
    pub last_name: String,
    pub clinic_id: i64,
    pub speciality_id: i64,
}

impl From<&NewDoctor> for NewDoctorRow {
    fn from(doctor: &NewDoctor) -> Self {
        Self {
            first_name: doctor.first_name.clone(),
            last_name: doctor.last_name.clone(),
            clinic_id: doctor.clinic_id.value(),
            speciality_id: doctor.speciality_id.value(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = patients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PatientRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: PatientId::new(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            birth_date: row.birth_date,
            gender: row.gender,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = patients)]
pub struct NewPatientRow {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
}

impl From<&NewPatient> for NewPatientRow {
    fn from(patient: &NewPatient) -> Self {
        Self {
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            email: patient.email.clone(),
            birth_date: patient.birth_date,
            gender: patient.gender.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[allow(dead_code)] // ends_at is maintained by the database
pub struct AppointmentRow {
    pub id: i64,
    pub appointment_date_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub ends_at: NaiveDateTime,
    pub category: String,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub clinic_id: i64,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: AppointmentId::new(row.id),
            start: row.appointment_date_time,
            duration_minutes: row.duration_minutes,
            category: row.category,
            patient_id: PatientId::new(row.patient_id),
            doctor_id: DoctorId::new(row.doctor_id),
            clinic_id: ClinicId::new(row.clinic_id),
        }
    }
}

/// Insert and full-replace payload. `ends_at` is a generated column.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = appointments)]
pub struct AppointmentValues {
    pub appointment_date_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub category: String,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub clinic_id: i64,
}

impl AppointmentValues {
    pub fn new(patient_id: PatientId, slot: &BookingSlot) -> Self {
        Self {
            appointment_date_time: slot.start,
            duration_minutes: slot.duration_minutes,
            category: slot.category.clone(),
            patient_id: patient_id.value(),
            doctor_id: slot.doctor_id.value(),
            clinic_id: slot.clinic_id.value(),
        }
    }
}

impl From<&AppointmentDraft> for AppointmentValues {
    fn from(draft: &AppointmentDraft) -> Self {
        Self::new(draft.patient_id, &draft.slot)
    }
}
