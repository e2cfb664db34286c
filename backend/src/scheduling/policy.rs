//! Ordered booking rules.
//!
//! A candidate booking is checked in a fixed order and the first failing
//! rule decides the error:
//!
//! 1. category is non-blank
//! 2. duration is positive
//! 3. patient, doctor and clinic exist
//! 4. start is not in the past
//! 5. start time-of-day is within business hours
//! 6. the patient has no overlapping appointment
//! 7. the doctor has no overlapping appointment

use futures::future::try_join3;
use tracing::debug;

use super::clock::Clock;
use super::config::BookingRules;
use super::conflict::ConflictChecker;
use super::error::{ReferenceKind, SchedulingError, SchedulingResult, TemporalViolation};
use crate::db::repository::FullRepository;
use crate::models::{AppointmentId, BookingSlot, PatientId};

/// The patient side of a candidate booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientRef {
    /// A stored patient.
    Existing(PatientId),
    /// A patient that will be created together with the booking. It has no
    /// record to check and no appointments to conflict with.
    Pending,
}

impl PatientRef {
    pub fn id(&self) -> Option<PatientId> {
        match self {
            PatientRef::Existing(id) => Some(*id),
            PatientRef::Pending => None,
        }
    }
}

pub struct BookingPolicy<'a> {
    repository: &'a dyn FullRepository,
    rules: &'a BookingRules,
    clock: &'a dyn Clock,
}

impl<'a> BookingPolicy<'a> {
    pub fn new(
        repository: &'a dyn FullRepository,
        rules: &'a BookingRules,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            repository,
            rules,
            clock,
        }
    }

    /// Rules 1 and 2. Needs no storage access.
    pub fn check_structure(slot: &BookingSlot) -> SchedulingResult<()> {
        if slot.category.trim().is_empty() {
            return Err(SchedulingError::validation("Category is required."));
        }
        if slot.duration_minutes <= 0 {
            return Err(SchedulingError::validation(
                "Duration must be greater than zero.",
            ));
        }
        Ok(())
    }

    /// Rule 3, in patient, doctor, clinic order.
    ///
    /// The three lookups run concurrently; the reported error still follows
    /// the fixed order.
    pub async fn check_references(
        &self,
        patient: PatientRef,
        slot: &BookingSlot,
    ) -> SchedulingResult<()> {
        let patient_lookup = async {
            match patient {
                PatientRef::Existing(id) => self.repository.patient_exists(id).await,
                PatientRef::Pending => Ok(true),
            }
        };
        let (patient_ok, doctor_ok, clinic_ok) = try_join3(
            patient_lookup,
            self.repository.doctor_exists(slot.doctor_id),
            self.repository.clinic_exists(slot.clinic_id),
        )
        .await?;

        let missing = if !patient_ok {
            patient.id().map(|id| (ReferenceKind::Patient, id.value()))
        } else if !doctor_ok {
            Some((ReferenceKind::Doctor, slot.doctor_id.value()))
        } else if !clinic_ok {
            Some((ReferenceKind::Clinic, slot.clinic_id.value()))
        } else {
            None
        };
        match missing {
            Some((entity, id)) => Err(SchedulingError::Referential { entity, id }),
            None => Ok(()),
        }
    }

    /// Rules 4 and 5.
    pub fn check_timing(&self, slot: &BookingSlot) -> SchedulingResult<()> {
        if slot.start < self.clock.now() {
            return Err(SchedulingError::Temporal(TemporalViolation::InPast));
        }
        if !self.rules.admits(slot.start.time()) {
            return Err(SchedulingError::Temporal(
                TemporalViolation::OutsideBusinessHours {
                    opening: self.rules.opening,
                    closing: self.rules.closing,
                },
            ));
        }
        Ok(())
    }

    /// Rules 6 and 7. `exclude` is the appointment being updated, if any.
    pub async fn check_availability(
        &self,
        patient: PatientRef,
        slot: &BookingSlot,
        exclude: Option<AppointmentId>,
    ) -> SchedulingResult<()> {
        let report = ConflictChecker::new(self.repository)
            .check(slot.doctor_id, patient.id(), &slot.interval(), exclude)
            .await?;
        match report.first_conflict() {
            None => Ok(()),
            Some(participant) => {
                debug!(start = %slot.start, %participant, "participant already busy");
                Err(SchedulingError::Conflict(participant))
            }
        }
    }

    /// Run every rule in order.
    pub async fn evaluate(
        &self,
        patient: PatientRef,
        slot: &BookingSlot,
        exclude: Option<AppointmentId>,
    ) -> SchedulingResult<()> {
        Self::check_structure(slot)?;
        self.check_references(patient, slot).await?;
        self.check_timing(slot)?;
        self.check_availability(patient, slot, exclude).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::{AppointmentRepository, Deadline, ReferenceRepository};
    use crate::models::{
        AppointmentDraft, ClinicId, DoctorId, NewClinic, NewDoctor, NewPatient, NewSpeciality,
    };
    use crate::scheduling::clock::FixedClock;
    use crate::scheduling::error::ErrorKind;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::time::Duration;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 4, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    struct Fixture {
        repo: LocalRepository,
        clock: FixedClock,
        rules: BookingRules,
        patient: PatientId,
        doctor: DoctorId,
        clinic: ClinicId,
    }

    impl Fixture {
        async fn new() -> Self {
            let repo = LocalRepository::new();
            let clinic = repo
                .create_clinic(&NewClinic {
                    name: "North".to_string(),
                    address: None,
                })
                .await
                .unwrap();
            let speciality = repo
                .create_speciality(&NewSpeciality {
                    name: "Cardiology".to_string(),
                })
                .await
                .unwrap();
            let doctor = repo
                .create_doctor(&NewDoctor {
                    first_name: "Ana".to_string(),
                    last_name: "Lopez".to_string(),
                    clinic_id: clinic.id,
                    speciality_id: speciality.id,
                })
                .await
                .unwrap();
            let patient = repo
                .create_patient(&NewPatient {
                    first_name: "Tom".to_string(),
                    last_name: "Hardy".to_string(),
                    email: "tom@example.com".to_string(),
                    birth_date: None,
                    gender: None,
                })
                .await
                .unwrap();
            Self {
                repo,
                clock: FixedClock::new(at(1, 7, 0)),
                rules: BookingRules::default(),
                patient: patient.id,
                doctor: doctor.id,
                clinic: clinic.id,
            }
        }

        fn policy(&self) -> BookingPolicy<'_> {
            BookingPolicy::new(&self.repo, &self.rules, &self.clock)
        }

        fn slot(&self, start: NaiveDateTime, minutes: i32) -> BookingSlot {
            BookingSlot {
                start,
                duration_minutes: minutes,
                category: "Consult".to_string(),
                doctor_id: self.doctor,
                clinic_id: self.clinic,
            }
        }
    }

    #[tokio::test]
    async fn test_category_checked_before_duration_and_references() {
        let fx = Fixture::new().await;
        let mut slot = fx.slot(at(2, 9, 0), 0);
        slot.category = "   ".to_string();
        slot.doctor_id = DoctorId::new(777);
        let err = fx
            .policy()
            .evaluate(PatientRef::Existing(fx.patient), &slot, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Category is required.");
    }

    #[tokio::test]
    async fn test_duration_checked_before_references() {
        let fx = Fixture::new().await;
        let mut slot = fx.slot(at(2, 9, 0), -10);
        slot.clinic_id = ClinicId::new(777);
        let err = fx
            .policy()
            .evaluate(PatientRef::Existing(fx.patient), &slot, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Duration must be greater than zero.");
    }

    #[tokio::test]
    async fn test_references_checked_patient_doctor_clinic() {
        let fx = Fixture::new().await;
        let mut slot = fx.slot(at(2, 9, 0), 30);
        slot.doctor_id = DoctorId::new(777);
        slot.clinic_id = ClinicId::new(778);

        let err = fx
            .policy()
            .evaluate(PatientRef::Existing(PatientId::new(779)), &slot, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Patient ID does not exist.");

        let err = fx
            .policy()
            .evaluate(PatientRef::Existing(fx.patient), &slot, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Doctor ID does not exist.");

        slot.doctor_id = fx.doctor;
        let err = fx
            .policy()
            .evaluate(PatientRef::Existing(fx.patient), &slot, None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Clinic ID does not exist.");
        assert_eq!(err.kind(), ErrorKind::ReferentialIntegrity);
    }

    #[tokio::test]
    async fn test_past_checked_before_business_hours() {
        let fx = Fixture::new().await;
        fx.clock.set(at(2, 12, 0));
        let err = fx
            .policy()
            .evaluate(PatientRef::Existing(fx.patient), &fx.slot(at(1, 20, 0), 30), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "You cannot book an appointment in the past.");
    }

    #[tokio::test]
    async fn test_business_hours_bounds() {
        let fx = Fixture::new().await;
        let policy = fx.policy();
        assert!(policy.check_timing(&fx.slot(at(2, 8, 0), 30)).is_ok());
        assert!(policy.check_timing(&fx.slot(at(2, 18, 0), 30)).is_ok());
        let err = policy.check_timing(&fx.slot(at(2, 18, 1), 30)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Appointments must be booked between 08:00 and 18:00."
        );
        assert!(policy.check_timing(&fx.slot(at(2, 7, 59), 30)).is_err());
    }

    #[tokio::test]
    async fn test_patient_conflict_reported_before_doctor_conflict() {
        let fx = Fixture::new().await;
        fx.repo
            .insert_appointment(
                &AppointmentDraft {
                    patient_id: fx.patient,
                    slot: fx.slot(at(2, 9, 0), 60),
                },
                Deadline::after(Duration::from_secs(1)),
            )
            .await
            .unwrap();

        let err = fx
            .policy()
            .evaluate(PatientRef::Existing(fx.patient), &fx.slot(at(2, 9, 30), 30), None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Patient already has an overlapping appointment."
        );

        let err = fx
            .policy()
            .evaluate(PatientRef::Pending, &fx.slot(at(2, 9, 30), 30), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Doctor is already booked at this time.");
    }

    #[tokio::test]
    async fn test_valid_booking_passes() {
        let fx = Fixture::new().await;
        fx.policy()
            .evaluate(PatientRef::Existing(fx.patient), &fx.slot(at(2, 10, 0), 45), None)
            .await
            .unwrap();
    }
}
