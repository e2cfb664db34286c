//! Appointment repository trait.
//!
//! Reads are plain lookups. Every write path re-validates the no-overlap
//! invariant atomically inside the store, so two requests that both passed
//! the application-level conflict check cannot both commit.

use async_trait::async_trait;

use super::deadline::Deadline;
use super::error::RepositoryResult;
use crate::api::AppointmentView;
use crate::models::{
    Appointment, AppointmentDraft, AppointmentId, BookingSlot, DoctorId, NewPatient, Patient,
    PatientId,
};

/// Repository trait for appointment storage.
///
/// # Write Guarantees
/// `insert_appointment`, `insert_appointment_with_patient` and
/// `update_appointment` must reject a write that would overlap an existing
/// appointment of the same doctor or patient with
/// `RepositoryError::ConflictError`, must verify the referenced records
/// exist, and must check the [`Deadline`] before mutating. A rejected write
/// leaves no trace.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Check if the store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Fetch a stored appointment.
    async fn find_appointment(&self, id: AppointmentId) -> RepositoryResult<Option<Appointment>>;

    /// All appointments of the doctor, plus those of the patient when given.
    ///
    /// # Arguments
    /// * `doctor_id` - Doctor whose bookings are needed
    /// * `patient_id` - Patient whose bookings are needed, `None` for a patient
    ///   that does not exist yet
    async fn appointments_for_participants(
        &self,
        doctor_id: DoctorId,
        patient_id: Option<PatientId>,
    ) -> RepositoryResult<Vec<Appointment>>;

    /// Insert an appointment for an existing patient.
    ///
    /// # Returns
    /// * `Ok(Appointment)` - The committed appointment with its id
    /// * `Err(RepositoryError::ConflictError)` - If the slot overlaps another booking
    /// * `Err(RepositoryError::MissingReference)` - If a referenced record is missing
    /// * `Err(RepositoryError::TimeoutError)` - If the deadline passed before commit
    async fn insert_appointment(
        &self,
        draft: &AppointmentDraft,
        deadline: Deadline,
    ) -> RepositoryResult<Appointment>;

    /// Find-or-create the patient by identity and insert the appointment for
    /// them, as one atomic unit.
    ///
    /// If the appointment is rejected, a patient created by this call is
    /// rolled back as well.
    async fn insert_appointment_with_patient(
        &self,
        patient: &NewPatient,
        slot: &BookingSlot,
        deadline: Deadline,
    ) -> RepositoryResult<(Patient, Appointment)>;

    /// Replace all fields of an appointment.
    ///
    /// The appointment's own previous window never conflicts with the new one.
    ///
    /// # Returns
    /// * `Ok(Appointment)` - The updated appointment
    /// * `Err(RepositoryError::NotFound)` - If the id is unknown
    async fn update_appointment(
        &self,
        id: AppointmentId,
        draft: &AppointmentDraft,
        deadline: Deadline,
    ) -> RepositoryResult<Appointment>;

    /// Delete an appointment.
    ///
    /// # Returns
    /// * `Ok(true)` - The appointment existed and was removed
    /// * `Ok(false)` - No appointment with this id
    async fn delete_appointment(
        &self,
        id: AppointmentId,
        deadline: Deadline,
    ) -> RepositoryResult<bool>;

    /// Appointment read-model with joined patient, doctor and clinic names.
    async fn get_appointment_view(
        &self,
        id: AppointmentId,
    ) -> RepositoryResult<Option<AppointmentView>>;

    /// All appointment read-models ordered by start time, then id.
    async fn list_appointment_views(&self) -> RepositoryResult<Vec<AppointmentView>>;
}
