#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use clinic_booking::api::AppointmentRequest;
use clinic_booking::db::repositories::LocalRepository;
use clinic_booking::db::repository::ReferenceRepository;
use clinic_booking::models::{
    Clinic, Doctor, NewClinic, NewDoctor, NewPatient, NewSpeciality, Patient,
};
use clinic_booking::scheduling::{FixedClock, SchedulingConfig, SchedulingService};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// A weekday well in the future, so fixtures never fall in the past.
pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2031, 3, 10).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, minute, 0).unwrap()
}

/// The instant the fixture clock reports as "now".
pub fn now() -> NaiveDateTime {
    at(7, 0)
}

/// Reference data for booking tests: one clinic, two doctors, two patients.
pub struct Seed {
    pub repo: Arc<LocalRepository>,
    pub clinic: Clinic,
    pub doctor: Doctor,
    pub other_doctor: Doctor,
    pub patient: Patient,
    pub other_patient: Patient,
    pub clock: FixedClock,
}

impl Seed {
    /// Service over the seeded repository with the fixture clock.
    pub fn service(&self) -> SchedulingService {
        SchedulingService::new(self.repo.clone(), SchedulingConfig::default())
            .with_clock(Arc::new(self.clock.clone()))
    }

    /// 30-minute checkup with the primary doctor and patient.
    pub fn request(&self, hour: u32, minute: u32) -> AppointmentRequest {
        AppointmentRequest {
            appointment_date_time: at(hour, minute),
            category: "Checkup".to_string(),
            patient_id: self.patient.id,
            doctor_id: self.doctor.id,
            clinic_id: self.clinic.id,
            duration_in_minutes: 30,
        }
    }
}

pub fn new_patient(first: &str, last: &str, email: &str) -> NewPatient {
    NewPatient {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        birth_date: None,
        gender: None,
    }
}

pub async fn seed() -> Seed {
    let repo = Arc::new(LocalRepository::new());
    let clinic = repo
        .create_clinic(&NewClinic {
            name: "Riverside Clinic".to_string(),
            address: Some("12 River Rd".to_string()),
        })
        .await
        .unwrap();
    let general = repo
        .create_speciality(&NewSpeciality {
            name: "General Practice".to_string(),
        })
        .await
        .unwrap();
    let cardiology = repo
        .create_speciality(&NewSpeciality {
            name: "Cardiology".to_string(),
        })
        .await
        .unwrap();
    let doctor = repo
        .create_doctor(&NewDoctor {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            clinic_id: clinic.id,
            speciality_id: general.id,
        })
        .await
        .unwrap();
    let other_doctor = repo
        .create_doctor(&NewDoctor {
            first_name: "Alice".to_string(),
            last_name: "Jones".to_string(),
            clinic_id: clinic.id,
            speciality_id: cardiology.id,
        })
        .await
        .unwrap();
    let patient = repo
        .create_patient(&new_patient("Jane", "Doe", "jane@example.com"))
        .await
        .unwrap();
    let other_patient = repo
        .create_patient(&new_patient("Mark", "Lee", "mark@example.com"))
        .await
        .unwrap();

    Seed {
        repo,
        clinic,
        doctor,
        other_doctor,
        patient,
        other_patient,
        clock: FixedClock::new(now()),
    }
}
