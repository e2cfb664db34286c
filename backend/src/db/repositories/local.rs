//! In-memory repository implementation.
//!
//! All state lives behind one `parking_lot::RwLock`. Reads take the shared
//! lock; every write takes the exclusive lock and re-validates references
//! and the no-overlap invariant before mutating, which makes each write
//! atomic with respect to its own checks.

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;

use crate::api::{AppointmentView, DoctorSearch, DoctorSearchResult};
use crate::db::repository::{
    AppointmentRepository, Deadline, ErrorContext, ReferenceRepository, RepositoryError,
    RepositoryResult,
};
use crate::models::{
    Appointment, AppointmentDraft, AppointmentId, BookingSlot, Clinic, ClinicId, Doctor, DoctorId,
    NewClinic, NewDoctor, NewPatient, NewSpeciality, Patient, PatientId, PatientIdentity,
    Speciality, SpecialityId,
};
use crate::scheduling::conflict::detect_conflicts;

#[derive(Debug, Default)]
struct LocalState {
    clinics: BTreeMap<ClinicId, Clinic>,
    specialities: BTreeMap<SpecialityId, Speciality>,
    doctors: BTreeMap<DoctorId, Doctor>,
    patients: BTreeMap<PatientId, Patient>,
    appointments: BTreeMap<AppointmentId, Appointment>,
    next_id: i64,
}

impl LocalState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn patient_by_identity(&self, identity: &PatientIdentity) -> Option<&Patient> {
        self.patients.values().find(|p| {
            p.first_name == identity.first_name
                && p.last_name == identity.last_name
                && p.email == identity.email
        })
    }

    fn insert_patient(&mut self, patient: &NewPatient) -> Patient {
        let id = PatientId::new(self.allocate_id());
        let stored = Patient {
            id,
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            email: patient.email.clone(),
            birth_date: patient.birth_date,
            gender: patient.gender.clone(),
        };
        self.patients.insert(id, stored.clone());
        stored
    }

    /// Foreign-key checks mirroring the relational schema.
    fn ensure_references(
        &self,
        patient_id: Option<PatientId>,
        slot: &BookingSlot,
        operation: &str,
    ) -> RepositoryResult<()> {
        if let Some(patient_id) = patient_id {
            if !self.patients.contains_key(&patient_id) {
                return Err(missing_reference(operation, "patient", patient_id.value()));
            }
        }
        if !self.doctors.contains_key(&slot.doctor_id) {
            return Err(missing_reference(operation, "doctor", slot.doctor_id.value()));
        }
        if !self.clinics.contains_key(&slot.clinic_id) {
            return Err(missing_reference(operation, "clinic", slot.clinic_id.value()));
        }
        Ok(())
    }

    /// Exclusion check equivalent to the overlap constraints of the SQL schema.
    fn ensure_free(
        &self,
        patient_id: Option<PatientId>,
        slot: &BookingSlot,
        exclude: Option<AppointmentId>,
        operation: &str,
    ) -> RepositoryResult<()> {
        let report = detect_conflicts(
            self.appointments.values(),
            slot.doctor_id,
            patient_id,
            &slot.interval(),
            exclude,
        );
        match report.first_conflict() {
            None => Ok(()),
            Some(participant) => {
                debug!(
                    "Rejected overlapping {} booking at {} ({})",
                    participant, slot.start, operation
                );
                Err(RepositoryError::conflict(
                    participant,
                    ErrorContext::new(operation).with_entity("appointment"),
                ))
            }
        }
    }

    fn view_of(&self, appointment: &Appointment) -> RepositoryResult<AppointmentView> {
        let patient = self.patients.get(&appointment.patient_id);
        let doctor = self.doctors.get(&appointment.doctor_id);
        let clinic = self.clinics.get(&appointment.clinic_id);
        match (patient, doctor, clinic) {
            (Some(patient), Some(doctor), Some(clinic)) => Ok(AppointmentView::from_parts(
                appointment,
                patient.full_name(),
                doctor.full_name(),
                clinic.name.clone(),
            )),
            _ => Err(RepositoryError::internal_with_context(
                "appointment references a missing record",
                ErrorContext::new("view_of")
                    .with_entity("appointment")
                    .with_entity_id(appointment.id),
            )),
        }
    }
}

fn missing_reference(operation: &str, entity: &str, id: i64) -> RepositoryError {
    RepositoryError::missing_reference(entity, id, ErrorContext::new(operation))
}

/// In-memory repository for tests and local development.
#[derive(Debug, Default)]
pub struct LocalRepository {
    state: RwLock<LocalState>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored appointments.
    pub fn appointment_count(&self) -> usize {
        self.state.read().appointments.len()
    }

    /// Number of stored patients.
    pub fn patient_count(&self) -> usize {
        self.state.read().patients.len()
    }

    /// Snapshot of all stored appointments, ordered by id.
    pub fn appointments(&self) -> Vec<Appointment> {
        self.state.read().appointments.values().cloned().collect()
    }
}

#[async_trait]
impl ReferenceRepository for LocalRepository {
    async fn patient_exists(&self, id: PatientId) -> RepositoryResult<bool> {
        Ok(self.state.read().patients.contains_key(&id))
    }

    async fn doctor_exists(&self, id: DoctorId) -> RepositoryResult<bool> {
        Ok(self.state.read().doctors.contains_key(&id))
    }

    async fn clinic_exists(&self, id: ClinicId) -> RepositoryResult<bool> {
        Ok(self.state.read().clinics.contains_key(&id))
    }

    async fn find_patient_by_identity(
        &self,
        identity: &PatientIdentity,
    ) -> RepositoryResult<Option<Patient>> {
        Ok(self.state.read().patient_by_identity(identity).cloned())
    }

    async fn create_patient(&self, patient: &NewPatient) -> RepositoryResult<Patient> {
        let mut state = self.state.write();
        if state.patient_by_identity(&patient.identity()).is_some() {
            return Err(RepositoryError::validation_with_context(
                "a patient with this name and email already exists",
                ErrorContext::new("create_patient").with_entity("patient"),
            ));
        }
        Ok(state.insert_patient(patient))
    }

    async fn create_clinic(&self, clinic: &NewClinic) -> RepositoryResult<Clinic> {
        let mut state = self.state.write();
        let id = ClinicId::new(state.allocate_id());
        let stored = Clinic {
            id,
            name: clinic.name.clone(),
            address: clinic.address.clone(),
        };
        state.clinics.insert(id, stored.clone());
        Ok(stored)
    }

    async fn create_speciality(
        &self,
        speciality: &NewSpeciality,
    ) -> RepositoryResult<Speciality> {
        let mut state = self.state.write();
        let id = SpecialityId::new(state.allocate_id());
        let stored = Speciality {
            id,
            name: speciality.name.clone(),
        };
        state.specialities.insert(id, stored.clone());
        Ok(stored)
    }

    async fn create_doctor(&self, doctor: &NewDoctor) -> RepositoryResult<Doctor> {
        let mut state = self.state.write();
        if !state.clinics.contains_key(&doctor.clinic_id) {
            return Err(missing_reference(
                "create_doctor",
                "clinic",
                doctor.clinic_id.value(),
            ));
        }
        if !state.specialities.contains_key(&doctor.speciality_id) {
            return Err(missing_reference(
                "create_doctor",
                "speciality",
                doctor.speciality_id.value(),
            ));
        }
        let id = DoctorId::new(state.allocate_id());
        let stored = Doctor {
            id,
            first_name: doctor.first_name.clone(),
            last_name: doctor.last_name.clone(),
            clinic_id: doctor.clinic_id,
            speciality_id: doctor.speciality_id,
        };
        state.doctors.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_clinic(&self, id: ClinicId) -> RepositoryResult<Option<Clinic>> {
        Ok(self.state.read().clinics.get(&id).cloned())
    }

    async fn list_clinics(&self) -> RepositoryResult<Vec<Clinic>> {
        Ok(self.state.read().clinics.values().cloned().collect())
    }

    async fn find_speciality(&self, id: SpecialityId) -> RepositoryResult<Option<Speciality>> {
        Ok(self.state.read().specialities.get(&id).cloned())
    }

    async fn list_specialities(&self) -> RepositoryResult<Vec<Speciality>> {
        Ok(self.state.read().specialities.values().cloned().collect())
    }

    async fn find_doctor(&self, id: DoctorId) -> RepositoryResult<Option<Doctor>> {
        Ok(self.state.read().doctors.get(&id).cloned())
    }

    async fn list_doctors(&self) -> RepositoryResult<Vec<Doctor>> {
        Ok(self.state.read().doctors.values().cloned().collect())
    }

    async fn find_patient(&self, id: PatientId) -> RepositoryResult<Option<Patient>> {
        Ok(self.state.read().patients.get(&id).cloned())
    }

    async fn list_patients(&self) -> RepositoryResult<Vec<Patient>> {
        Ok(self.state.read().patients.values().cloned().collect())
    }

    async fn search_doctors(
        &self,
        search: &DoctorSearch,
    ) -> RepositoryResult<Vec<DoctorSearchResult>> {
        let state = self.state.read();
        let results = state
            .doctors
            .values()
            .filter(|d| search.matches(&d.first_name, &d.last_name))
            .map(|d| DoctorSearchResult {
                doctor_id: d.id,
                full_name: d.full_name(),
                clinic_name: state
                    .clinics
                    .get(&d.clinic_id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
                speciality_name: state
                    .specialities
                    .get(&d.speciality_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        Ok(results)
    }
}

#[async_trait]
impl AppointmentRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(true)
    }

    async fn find_appointment(&self, id: AppointmentId) -> RepositoryResult<Option<Appointment>> {
        Ok(self.state.read().appointments.get(&id).cloned())
    }

    async fn appointments_for_participants(
        &self,
        doctor_id: DoctorId,
        patient_id: Option<PatientId>,
    ) -> RepositoryResult<Vec<Appointment>> {
        let state = self.state.read();
        Ok(state
            .appointments
            .values()
            .filter(|a| a.doctor_id == doctor_id || Some(a.patient_id) == patient_id)
            .cloned()
            .collect())
    }

    async fn insert_appointment(
        &self,
        draft: &AppointmentDraft,
        deadline: Deadline,
    ) -> RepositoryResult<Appointment> {
        const OP: &str = "insert_appointment";
        let mut state = self.state.write();
        state.ensure_references(Some(draft.patient_id), &draft.slot, OP)?;
        state.ensure_free(Some(draft.patient_id), &draft.slot, None, OP)?;
        deadline.check(OP)?;

        let id = AppointmentId::new(state.allocate_id());
        let appointment = draft.clone().into_appointment(id);
        state.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn insert_appointment_with_patient(
        &self,
        patient: &NewPatient,
        slot: &BookingSlot,
        deadline: Deadline,
    ) -> RepositoryResult<(Patient, Appointment)> {
        const OP: &str = "insert_appointment_with_patient";
        let mut state = self.state.write();
        let existing = state.patient_by_identity(&patient.identity()).cloned();
        let patient_id = existing.as_ref().map(|p| p.id);

        state.ensure_references(patient_id, slot, OP)?;
        state.ensure_free(patient_id, slot, None, OP)?;
        deadline.check(OP)?;

        // Nothing has been written yet, so every rejection above is a clean rollback.
        let patient = match existing {
            Some(patient) => patient,
            None => state.insert_patient(patient),
        };
        let id = AppointmentId::new(state.allocate_id());
        let appointment = AppointmentDraft {
            patient_id: patient.id,
            slot: slot.clone(),
        }
        .into_appointment(id);
        state.appointments.insert(id, appointment.clone());
        Ok((patient, appointment))
    }

    async fn update_appointment(
        &self,
        id: AppointmentId,
        draft: &AppointmentDraft,
        deadline: Deadline,
    ) -> RepositoryResult<Appointment> {
        const OP: &str = "update_appointment";
        let mut state = self.state.write();
        if !state.appointments.contains_key(&id) {
            return Err(RepositoryError::not_found_with_context(
                "Appointment not found",
                ErrorContext::new(OP)
                    .with_entity("appointment")
                    .with_entity_id(id),
            ));
        }
        state.ensure_references(Some(draft.patient_id), &draft.slot, OP)?;
        state.ensure_free(Some(draft.patient_id), &draft.slot, Some(id), OP)?;
        deadline.check(OP)?;

        let appointment = draft.clone().into_appointment(id);
        state.appointments.insert(id, appointment.clone());
        Ok(appointment)
    }

    async fn delete_appointment(
        &self,
        id: AppointmentId,
        deadline: Deadline,
    ) -> RepositoryResult<bool> {
        let mut state = self.state.write();
        if !state.appointments.contains_key(&id) {
            return Ok(false);
        }
        deadline.check("delete_appointment")?;
        Ok(state.appointments.remove(&id).is_some())
    }

    async fn get_appointment_view(
        &self,
        id: AppointmentId,
    ) -> RepositoryResult<Option<AppointmentView>> {
        let state = self.state.read();
        state
            .appointments
            .get(&id)
            .map(|a| state.view_of(a))
            .transpose()
    }

    async fn list_appointment_views(&self) -> RepositoryResult<Vec<AppointmentView>> {
        let state = self.state.read();
        let mut appointments: Vec<&Appointment> = state.appointments.values().collect();
        appointments.sort_by_key(|a| (a.start, a.id));
        appointments.into_iter().map(|a| state.view_of(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingParticipant;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::time::Duration;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 6, 3)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    struct Seed {
        clinic: ClinicId,
        doctor: DoctorId,
        patient: PatientId,
    }

    async fn seed(repo: &LocalRepository) -> Seed {
        let clinic = repo
            .create_clinic(&NewClinic {
                name: "Star Clinic".to_string(),
                address: None,
            })
            .await
            .unwrap();
        let speciality = repo
            .create_speciality(&NewSpeciality {
                name: "Dermatology".to_string(),
            })
            .await
            .unwrap();
        let doctor = repo
            .create_doctor(&NewDoctor {
                first_name: "John".to_string(),
                last_name: "Smith".to_string(),
                clinic_id: clinic.id,
                speciality_id: speciality.id,
            })
            .await
            .unwrap();
        let patient = repo
            .create_patient(&NewPatient {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: "jane@example.com".to_string(),
                birth_date: None,
                gender: None,
            })
            .await
            .unwrap();
        Seed {
            clinic: clinic.id,
            doctor: doctor.id,
            patient: patient.id,
        }
    }

    fn draft(seed: &Seed, hour: u32, minute: u32, len: i32) -> AppointmentDraft {
        AppointmentDraft {
            patient_id: seed.patient,
            slot: BookingSlot {
                start: at(hour, minute),
                duration_minutes: len,
                category: "Checkup".to_string(),
                doctor_id: seed.doctor,
                clinic_id: seed.clinic,
            },
        }
    }

    #[tokio::test]
    async fn test_insert_and_view() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;
        let stored = repo
            .insert_appointment(&draft(&seed, 9, 0, 30), deadline())
            .await
            .unwrap();

        let view = repo.get_appointment_view(stored.id).await.unwrap().unwrap();
        assert_eq!(view.patient_name, "Jane Doe");
        assert_eq!(view.doctor_name, "John Smith");
        assert_eq!(view.clinic_name, "Star Clinic");
        assert_eq!(view.duration_in_minutes, 30);
    }

    #[tokio::test]
    async fn test_store_rejects_overlap_even_without_service_checks() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;
        repo.insert_appointment(&draft(&seed, 9, 0, 30), deadline())
            .await
            .unwrap();

        let err = repo
            .insert_appointment(&draft(&seed, 9, 15, 30), deadline())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::ConflictError {
                participant: BookingParticipant::Patient,
                ..
            }
        ));
        assert_eq!(repo.appointment_count(), 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_references() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;
        let mut bad = draft(&seed, 9, 0, 30);
        bad.slot.doctor_id = DoctorId::new(999);
        let err = repo.insert_appointment(&bad, deadline()).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::MissingReference { ref entity, id: 999, .. } if entity == "doctor"
        ));
        assert_eq!(repo.appointment_count(), 0);
    }

    #[tokio::test]
    async fn test_update_excludes_own_window() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;
        let stored = repo
            .insert_appointment(&draft(&seed, 9, 0, 30), deadline())
            .await
            .unwrap();

        let mut changed = draft(&seed, 9, 10, 30);
        changed.slot.category = "Follow-up".to_string();
        let updated = repo
            .update_appointment(stored.id, &changed, deadline())
            .await
            .unwrap();
        assert_eq!(updated.category, "Follow-up");
        assert_eq!(updated.start, at(9, 10));
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;
        let err = repo
            .update_appointment(AppointmentId::new(404), &draft(&seed, 9, 0, 30), deadline())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_combined_insert_reuses_identity_and_rolls_back_on_conflict() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;
        let jane = NewPatient {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: "jane@example.com".to_string(),
            birth_date: None,
            gender: None,
        };
        let (patient, _) = repo
            .insert_appointment_with_patient(&jane, &draft(&seed, 9, 0, 30).slot, deadline())
            .await
            .unwrap();
        assert_eq!(patient.id, seed.patient);

        let newcomer = NewPatient {
            first_name: "Max".to_string(),
            ..jane.clone()
        };
        let err = repo
            .insert_appointment_with_patient(&newcomer, &draft(&seed, 9, 10, 30).slot, deadline())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::ConflictError {
                participant: BookingParticipant::Doctor,
                ..
            }
        ));
        assert_eq!(repo.patient_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_deadline_leaves_no_write() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;
        let expired = Deadline::after(Duration::ZERO);
        let err = repo
            .insert_appointment(&draft(&seed, 9, 0, 30), expired)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(repo.appointment_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;
        let stored = repo
            .insert_appointment(&draft(&seed, 9, 0, 30), deadline())
            .await
            .unwrap();
        assert!(repo.delete_appointment(stored.id, deadline()).await.unwrap());
        assert!(!repo.delete_appointment(stored.id, deadline()).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_doctor_requires_clinic() {
        let repo = LocalRepository::new();
        let err = repo
            .create_doctor(&NewDoctor {
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                clinic_id: ClinicId::new(1),
                speciality_id: SpecialityId::new(1),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::MissingReference { ref entity, .. } if entity == "clinic"
        ));
    }

    #[tokio::test]
    async fn test_reference_lookup() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;

        let clinic = repo.find_clinic(seed.clinic).await.unwrap().unwrap();
        assert_eq!(clinic.name, "Star Clinic");
        let doctor = repo.find_doctor(seed.doctor).await.unwrap().unwrap();
        assert_eq!(doctor.full_name(), "John Smith");
        assert_eq!(doctor.clinic_id, seed.clinic);
        let speciality = repo
            .find_speciality(doctor.speciality_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(speciality.name, "Dermatology");
        let patient = repo.find_patient(seed.patient).await.unwrap().unwrap();
        assert_eq!(patient.email, "jane@example.com");

        assert!(repo.find_clinic(ClinicId::new(999)).await.unwrap().is_none());
        assert!(repo.find_doctor(DoctorId::new(999)).await.unwrap().is_none());
        assert!(repo.find_patient(PatientId::new(999)).await.unwrap().is_none());

        let second = repo
            .create_clinic(&NewClinic {
                name: "North Clinic".to_string(),
                address: Some("1 High St".to_string()),
            })
            .await
            .unwrap();
        let clinics = repo.list_clinics().await.unwrap();
        assert_eq!(
            clinics.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![seed.clinic, second.id]
        );
        assert_eq!(repo.list_specialities().await.unwrap().len(), 1);
        assert_eq!(repo.list_doctors().await.unwrap().len(), 1);
        assert_eq!(repo.list_patients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_views_sorted_by_start() {
        let repo = LocalRepository::new();
        let seed = seed(&repo).await;
        repo.insert_appointment(&draft(&seed, 11, 0, 30), deadline())
            .await
            .unwrap();
        repo.insert_appointment(&draft(&seed, 9, 0, 30), deadline())
            .await
            .unwrap();
        let views = repo.list_appointment_views().await.unwrap();
        assert_eq!(views.len(), 2);
        assert!(views[0].appointment_date_time < views[1].appointment_date_time);
    }
}
