//! Overlap detection against existing bookings.

use crate::db::repository::{AppointmentRepository, RepositoryResult};
use crate::models::{Appointment, AppointmentId, BookingParticipant, DoctorId, PatientId, TimeInterval};

/// Which participants of a candidate booking are already busy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictReport {
    pub patient_conflict: bool,
    pub doctor_conflict: bool,
}

impl ConflictReport {
    pub fn is_clear(&self) -> bool {
        !self.patient_conflict && !self.doctor_conflict
    }

    /// The conflict to report first: patient before doctor.
    pub fn first_conflict(&self) -> Option<BookingParticipant> {
        if self.patient_conflict {
            Some(BookingParticipant::Patient)
        } else if self.doctor_conflict {
            Some(BookingParticipant::Doctor)
        } else {
            None
        }
    }
}

/// Scan `existing` for bookings that overlap `candidate`.
///
/// An appointment counts against the patient when it shares `patient_id`
/// and against the doctor when it shares `doctor_id`; one record can
/// trigger both. `exclude` is skipped so an update never collides with the
/// appointment's own previous window.
pub fn detect_conflicts<'a, I>(
    existing: I,
    doctor_id: DoctorId,
    patient_id: Option<PatientId>,
    candidate: &TimeInterval,
    exclude: Option<AppointmentId>,
) -> ConflictReport
where
    I: IntoIterator<Item = &'a Appointment>,
{
    let mut report = ConflictReport::default();
    for appointment in existing {
        if Some(appointment.id) == exclude {
            continue;
        }
        if !appointment.interval().overlaps(candidate) {
            continue;
        }
        if Some(appointment.patient_id) == patient_id {
            report.patient_conflict = true;
        }
        if appointment.doctor_id == doctor_id {
            report.doctor_conflict = true;
        }
        if report.patient_conflict && report.doctor_conflict {
            break;
        }
    }
    report
}

/// Loads the bookings of a doctor/patient pair and tests them for overlap.
pub struct ConflictChecker<'a, R: AppointmentRepository + ?Sized> {
    repository: &'a R,
}

impl<'a, R: AppointmentRepository + ?Sized> ConflictChecker<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// Report patient and doctor conflicts for `candidate`.
    ///
    /// # Arguments
    /// * `doctor_id` - Doctor of the candidate booking
    /// * `patient_id` - Patient of the candidate booking, `None` when the
    ///   patient is about to be created and therefore has no bookings
    /// * `candidate` - Requested window
    /// * `exclude` - Appointment to ignore (the one being updated)
    pub async fn check(
        &self,
        doctor_id: DoctorId,
        patient_id: Option<PatientId>,
        candidate: &TimeInterval,
        exclude: Option<AppointmentId>,
    ) -> RepositoryResult<ConflictReport> {
        let existing = self
            .repository
            .appointments_for_participants(doctor_id, patient_id)
            .await?;
        Ok(detect_conflicts(
            existing.iter(),
            doctor_id,
            patient_id,
            candidate,
            exclude,
        ))
    }
}
