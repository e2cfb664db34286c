//! Appointment booking operations.
//!
//! [`SchedulingService`] is the single entry point for mutating
//! appointments. Each write runs as:
//!
//! 1. acquire the per-participant locks (sorted, see [`BookingLocks`])
//! 2. evaluate the [`BookingPolicy`] against current storage
//! 3. commit through the repository, which re-checks the no-overlap
//!    invariant atomically and honours the operation deadline
//!
//! Steps 1 and 2 are cancelled at the deadline. Step 3 is never cancelled
//! from outside; the store refuses to commit once the deadline has passed.
//! The names shown in the returned view are read during step 2, so nothing
//! touches storage after a successful commit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join3;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::config::SchedulingConfig;
use super::error::{SchedulingError, SchedulingResult};
use super::locks::{BookingGuard, BookingLocks, LockKey};
use super::policy::{BookingPolicy, PatientRef};
use super::resolver::{validate_patient, PatientResolver, ResolvedPatient};
use crate::api::{
    AppointmentRequest, AppointmentView, AppointmentWithPatientRequest, DoctorSearch,
    DoctorSearchResult,
};
use crate::db::repository::{Deadline, FullRepository, RepositoryError};
use crate::models::{Appointment, AppointmentId, BookingSlot, PatientId};

/// Display names for a booking, captured before commit.
struct ViewNames {
    patient: Option<String>,
    doctor: String,
    clinic: String,
}

impl ViewNames {
    fn into_view(self, appointment: &Appointment) -> SchedulingResult<AppointmentView> {
        let patient = self.patient.ok_or_else(|| {
            SchedulingError::internal(format!(
                "patient {} has no display name",
                appointment.patient_id
            ))
        })?;
        Ok(AppointmentView::from_parts(
            appointment,
            patient,
            self.doctor,
            self.clinic,
        ))
    }
}

#[derive(Clone)]
pub struct SchedulingService {
    repository: Arc<dyn FullRepository>,
    locks: Arc<BookingLocks>,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
    timeout: Duration,
}

impl std::fmt::Debug for SchedulingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulingService")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SchedulingService {
    pub fn new(repository: Arc<dyn FullRepository>, config: SchedulingConfig) -> Self {
        let timeout = config.operation_timeout;
        Self {
            repository,
            locks: Arc::new(BookingLocks::new()),
            clock: Arc::new(SystemClock),
            config,
            timeout,
        }
    }

    /// Replace the clock used for the not-in-the-past rule.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// A handle that runs operations under `timeout` instead of the
    /// configured default. Locks and storage are shared with `self`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut scoped = self.clone();
        scoped.timeout = timeout;
        scoped
    }

    pub fn repository(&self) -> &Arc<dyn FullRepository> {
        &self.repository
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }

    fn policy(&self) -> BookingPolicy<'_> {
        BookingPolicy::new(
            self.repository.as_ref(),
            &self.config.rules,
            self.clock.as_ref(),
        )
    }

    /// Run `operation` until `deadline`, failing with a transient error if
    /// it has not finished by then.
    async fn within<T, F>(
        &self,
        deadline: Deadline,
        name: &str,
        operation: F,
    ) -> SchedulingResult<T>
    where
        F: Future<Output = SchedulingResult<T>>,
    {
        match tokio::time::timeout_at(deadline.into(), operation).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation = name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "deadline exceeded"
                );
                Err(SchedulingError::transient(format!(
                    "{} did not complete within {} ms",
                    name,
                    self.timeout.as_millis()
                )))
            }
        }
    }

    /// Surface a failed commit, logging what the store caught.
    fn commit_error(name: &str, err: RepositoryError) -> SchedulingError {
        let err = SchedulingError::from(err);
        match &err {
            SchedulingError::Conflict(participant) => {
                warn!(operation = name, %participant, "storage rejected overlapping booking")
            }
            SchedulingError::Transient { message } => {
                warn!(operation = name, error = %message, "commit failed transiently")
            }
            _ => {}
        }
        err
    }

    /// Names for the view of a booking on `slot`. The patient name is
    /// skipped when the patient does not exist yet.
    async fn view_names(
        &self,
        patient_id: Option<PatientId>,
        slot: &BookingSlot,
    ) -> SchedulingResult<ViewNames> {
        let repository = self.repository.as_ref();
        let patient = async {
            match patient_id {
                Some(id) => repository
                    .find_patient(id)
                    .await
                    .map(|found| found.map(|p| p.full_name())),
                None => Ok(None),
            }
        };
        let (patient, doctor, clinic) = try_join3(
            patient,
            repository.find_doctor(slot.doctor_id),
            repository.find_clinic(slot.clinic_id),
        )
        .await?;
        let missing = |entity: &str| {
            SchedulingError::internal(format!("{} vanished while booking", entity))
        };
        Ok(ViewNames {
            patient,
            doctor: doctor.ok_or_else(|| missing("doctor"))?.full_name(),
            clinic: clinic.ok_or_else(|| missing("clinic"))?.name,
        })
    }

    /// Book an appointment for an existing patient.
    pub async fn create_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> SchedulingResult<AppointmentView> {
        const OP: &str = "create_appointment";
        let deadline = self.deadline();
        let draft = request.to_draft();
        let patient = PatientRef::Existing(draft.patient_id);

        let (guard, names) = self
            .within(deadline, OP, async {
                let guard = self
                    .locks
                    .acquire([
                        LockKey::Doctor(draft.slot.doctor_id),
                        LockKey::Patient(draft.patient_id),
                    ])
                    .await;
                self.policy().evaluate(patient, &draft.slot, None).await?;
                let names = self.view_names(patient.id(), &draft.slot).await?;
                Ok::<_, SchedulingError>((guard, names))
            })
            .await
            .inspect_err(|e| debug!(operation = OP, error = %e, "booking rejected"))?;

        let stored = self
            .repository
            .insert_appointment(&draft, deadline)
            .await
            .map_err(|e| Self::commit_error(OP, e))?;
        drop(guard);

        info!(
            appointment_id = %stored.id,
            doctor_id = %stored.doctor_id,
            patient_id = %stored.patient_id,
            start = %stored.start,
            "appointment booked"
        );
        names.into_view(&stored)
    }

    /// Book an appointment, reusing the patient with the same identity or
    /// creating one in the same commit.
    pub async fn create_appointment_with_patient(
        &self,
        request: &AppointmentWithPatientRequest,
    ) -> SchedulingResult<AppointmentView> {
        const OP: &str = "create_appointment_with_patient";
        let deadline = self.deadline();
        validate_patient(&request.patient)?;
        let slot = request.appointment.to_slot();
        let identity = request.patient.identity();

        let (guard, names) = self
            .within(deadline, OP, async {
                let guard = self
                    .locks
                    .acquire([
                        LockKey::Doctor(slot.doctor_id),
                        LockKey::PatientIdentity(identity),
                    ])
                    .await;
                let resolved = PatientResolver::new(self.repository.as_ref())
                    .resolve(&request.patient)
                    .await?;
                let (guard, patient) = match &resolved {
                    ResolvedPatient::Existing(existing) => (
                        self.locks
                            .extend(guard, [LockKey::Patient(existing.id)])
                            .await,
                        PatientRef::Existing(existing.id),
                    ),
                    ResolvedPatient::New(_) => (guard, PatientRef::Pending),
                };

                let policy = self.policy();
                BookingPolicy::check_structure(&slot)?;
                // Patient existence is settled by resolution.
                policy.check_references(PatientRef::Pending, &slot).await?;
                policy.check_timing(&slot)?;
                policy.check_availability(patient, &slot, None).await?;
                let names = self.view_names(None, &slot).await?;
                Ok::<(BookingGuard, ViewNames), SchedulingError>((guard, names))
            })
            .await
            .inspect_err(|e| debug!(operation = OP, error = %e, "booking rejected"))?;

        let (patient, stored) = self
            .repository
            .insert_appointment_with_patient(&request.patient, &slot, deadline)
            .await
            .map_err(|e| Self::commit_error(OP, e))?;
        drop(guard);

        info!(
            appointment_id = %stored.id,
            doctor_id = %stored.doctor_id,
            patient_id = %patient.id,
            start = %stored.start,
            "appointment booked with patient details"
        );
        ViewNames {
            patient: Some(patient.full_name()),
            ..names
        }
        .into_view(&stored)
    }

    /// Replace every field of an existing appointment.
    pub async fn update_appointment(
        &self,
        id: AppointmentId,
        request: &AppointmentRequest,
    ) -> SchedulingResult<AppointmentView> {
        const OP: &str = "update_appointment";
        let deadline = self.deadline();
        let draft = request.to_draft();
        let patient = PatientRef::Existing(draft.patient_id);

        let (guard, names) = self
            .within(deadline, OP, async {
                if self.repository.find_appointment(id).await?.is_none() {
                    return Err(SchedulingError::NotFound(id));
                }
                let guard = self
                    .locks
                    .acquire([
                        LockKey::Doctor(draft.slot.doctor_id),
                        LockKey::Patient(draft.patient_id),
                    ])
                    .await;
                self.policy().evaluate(patient, &draft.slot, Some(id)).await?;
                let names = self.view_names(patient.id(), &draft.slot).await?;
                Ok::<_, SchedulingError>((guard, names))
            })
            .await
            .inspect_err(|e| debug!(operation = OP, error = %e, "update rejected"))?;

        let stored = match self.repository.update_appointment(id, &draft, deadline).await {
            Ok(stored) => stored,
            Err(e) if e.is_not_found() => return Err(SchedulingError::NotFound(id)),
            Err(e) => return Err(Self::commit_error(OP, e)),
        };
        drop(guard);

        info!(appointment_id = %stored.id, start = %stored.start, "appointment updated");
        names.into_view(&stored)
    }

    /// Remove an appointment.
    pub async fn delete_appointment(&self, id: AppointmentId) -> SchedulingResult<()> {
        let deadline = self.deadline();
        let deleted = self
            .repository
            .delete_appointment(id, deadline)
            .await
            .map_err(|e| Self::commit_error("delete_appointment", e))?;
        if !deleted {
            return Err(SchedulingError::NotFound(id));
        }
        info!(appointment_id = %id, "appointment deleted");
        Ok(())
    }

    pub async fn get_appointment(&self, id: AppointmentId) -> SchedulingResult<AppointmentView> {
        let deadline = self.deadline();
        self.within(deadline, "get_appointment", async {
            self.repository
                .get_appointment_view(id)
                .await?
                .ok_or(SchedulingError::NotFound(id))
        })
        .await
    }

    /// All appointments, ordered by start time.
    pub async fn list_appointments(&self) -> SchedulingResult<Vec<AppointmentView>> {
        let deadline = self.deadline();
        self.within(deadline, "list_appointments", async {
            Ok::<_, SchedulingError>(self.repository.list_appointment_views().await?)
        })
        .await
    }

    /// Case-insensitive doctor search. At least one term is required.
    pub async fn search_doctors(
        &self,
        search: &DoctorSearch,
    ) -> SchedulingResult<Vec<DoctorSearchResult>> {
        if search.is_empty() {
            return Err(SchedulingError::validation(
                "Please provide at least a first name or last name to search.",
            ));
        }
        let deadline = self.deadline();
        self.within(deadline, "search_doctors", async {
            Ok::<_, SchedulingError>(self.repository.search_doctors(search).await?)
        })
        .await
    }
}
