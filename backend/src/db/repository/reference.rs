//! Reference data repository trait.
//!
//! Clinics, specialities, doctors and patients are plain records owned by
//! the store. The booking engine needs existence checks, patient identity
//! lookup and record creation; the lookup API reads them back by id or as
//! whole lists, and searches doctors by name.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{DoctorSearch, DoctorSearchResult};
use crate::models::{
    Clinic, ClinicId, Doctor, DoctorId, NewClinic, NewDoctor, NewPatient, NewSpeciality, Patient,
    PatientId, PatientIdentity, Speciality, SpecialityId,
};

/// Repository trait for referenced records.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// Check whether a patient with this id exists.
    async fn patient_exists(&self, id: PatientId) -> RepositoryResult<bool>;

    /// Check whether a doctor with this id exists.
    async fn doctor_exists(&self, id: DoctorId) -> RepositoryResult<bool>;

    /// Check whether a clinic with this id exists.
    async fn clinic_exists(&self, id: ClinicId) -> RepositoryResult<bool>;

    /// Find a patient by exact `(first name, last name, email)` match.
    ///
    /// # Returns
    /// * `Ok(Some(Patient))` - The matching patient
    /// * `Ok(None)` - No patient carries this identity
    async fn find_patient_by_identity(
        &self,
        identity: &PatientIdentity,
    ) -> RepositoryResult<Option<Patient>>;

    /// Create a patient.
    ///
    /// # Returns
    /// * `Ok(Patient)` - The stored patient with its id
    /// * `Err(RepositoryError::ValidationError)` - If the identity is already taken
    async fn create_patient(&self, patient: &NewPatient) -> RepositoryResult<Patient>;

    async fn create_clinic(&self, clinic: &NewClinic) -> RepositoryResult<Clinic>;

    async fn create_speciality(&self, speciality: &NewSpeciality)
        -> RepositoryResult<Speciality>;

    /// Create a doctor.
    ///
    /// # Returns
    /// * `Ok(Doctor)` - The stored doctor
    /// * `Err(RepositoryError::MissingReference)` - If the clinic or speciality is unknown
    async fn create_doctor(&self, doctor: &NewDoctor) -> RepositoryResult<Doctor>;

    async fn find_clinic(&self, id: ClinicId) -> RepositoryResult<Option<Clinic>>;

    /// All clinics, ordered by id.
    async fn list_clinics(&self) -> RepositoryResult<Vec<Clinic>>;

    async fn find_speciality(&self, id: SpecialityId) -> RepositoryResult<Option<Speciality>>;

    /// All specialities, ordered by id.
    async fn list_specialities(&self) -> RepositoryResult<Vec<Speciality>>;

    /// Get a doctor by id.
    ///
    /// # Returns
    /// * `Ok(Some(Doctor))` - The stored doctor
    /// * `Ok(None)` - No doctor has this id
    async fn find_doctor(&self, id: DoctorId) -> RepositoryResult<Option<Doctor>>;

    /// All doctors, ordered by id.
    async fn list_doctors(&self) -> RepositoryResult<Vec<Doctor>>;

    async fn find_patient(&self, id: PatientId) -> RepositoryResult<Option<Patient>>;

    /// All patients, ordered by id.
    async fn list_patients(&self) -> RepositoryResult<Vec<Patient>>;

    /// Search doctors by case-insensitive name fragments.
    async fn search_doctors(
        &self,
        search: &DoctorSearch,
    ) -> RepositoryResult<Vec<DoctorSearchResult>>;
}
