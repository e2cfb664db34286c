//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! [`SchedulingService`] for booking logic or to the repository for
//! reference data.

use axum::{
    extract::{FromRequest, Path, Request, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::dto::{
    AppointmentListResponse, AppointmentResponse, DoctorSearchResponse, HealthResponse,
    MessageResponse, UpdateAppointmentResponse,
};
use super::error::AppError;
use super::state::AppState;
use crate::api::{AppointmentId, AppointmentRequest, AppointmentWithPatientRequest, DoctorSearch};
use crate::db::repository::RepositoryError;
use crate::models::{
    Clinic, ClinicId, Doctor, DoctorId, NewClinic, NewDoctor, NewPatient, NewSpeciality, Patient,
    PatientId, Speciality, SpecialityId,
};
use crate::scheduling::{validate_patient, SchedulingService};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Result type for handlers that create a resource.
pub type CreatedResult<T> = Result<(StatusCode, Json<T>), AppError>;

/// Header carrying the caller's deadline in milliseconds.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// JSON body extractor that reports malformed input as a validation error.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// The service to use for this request, honouring the timeout header.
fn scheduler(state: &AppState, headers: &HeaderMap) -> Result<SchedulingService, AppError> {
    let Some(raw) = headers.get(REQUEST_TIMEOUT_HEADER) else {
        return Ok(state.scheduler.clone());
    };
    let millis = raw
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "{} must be a positive integer",
                REQUEST_TIMEOUT_HEADER
            ))
        })?;
    Ok(state.scheduler.with_timeout(Duration::from_millis(millis)))
}

fn require(value: &str, message: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(message.to_string()));
    }
    Ok(())
}

/// The record as a JSON body, or a 404 carrying `message`.
fn found<T>(record: Option<T>, message: &str) -> HandlerResult<T> {
    record
        .map(Json)
        .ok_or_else(|| RepositoryError::not_found(message).into())
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and storage is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Appointments
// =============================================================================

/// GET /v1/appointments
pub async fn list_appointments(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> HandlerResult<AppointmentListResponse> {
    let appointments = scheduler(&state, &headers)?.list_appointments().await?;
    Ok(Json(AppointmentListResponse { appointments }))
}

/// GET /v1/appointments/{id}
pub async fn get_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<AppointmentResponse> {
    let appointment = scheduler(&state, &headers)?
        .get_appointment(AppointmentId::new(id))
        .await?;
    Ok(Json(AppointmentResponse { appointment }))
}

/// POST /v1/appointments
///
/// Book an appointment for an existing patient.
pub async fn create_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<AppointmentRequest>,
) -> CreatedResult<AppointmentResponse> {
    let appointment = scheduler(&state, &headers)?
        .create_appointment(&request)
        .await?;
    Ok((StatusCode::CREATED, Json(AppointmentResponse { appointment })))
}

/// POST /v1/appointments/with-patient
///
/// Book an appointment, reusing or creating the patient from the supplied details.
pub async fn create_appointment_with_patient(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<AppointmentWithPatientRequest>,
) -> CreatedResult<AppointmentResponse> {
    let appointment = scheduler(&state, &headers)?
        .create_appointment_with_patient(&request)
        .await?;
    Ok((StatusCode::CREATED, Json(AppointmentResponse { appointment })))
}

/// PUT /v1/appointments/{id}
pub async fn update_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<AppointmentRequest>,
) -> HandlerResult<UpdateAppointmentResponse> {
    let appointment = scheduler(&state, &headers)?
        .update_appointment(AppointmentId::new(id), &request)
        .await?;
    Ok(Json(UpdateAppointmentResponse {
        message: "Appointment updated successfully.".to_string(),
        appointment,
    }))
}

/// DELETE /v1/appointments/{id}
pub async fn delete_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<MessageResponse> {
    scheduler(&state, &headers)?
        .delete_appointment(AppointmentId::new(id))
        .await?;
    Ok(Json(MessageResponse::new("Appointment deleted successfully.")))
}

// =============================================================================
// Search
// =============================================================================

/// POST /v1/search/doctors
///
/// Case-insensitive search by first and/or last name. No hits is an empty
/// `results` list, not a 404.
pub async fn search_doctors(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(search): ApiJson<DoctorSearch>,
) -> HandlerResult<DoctorSearchResponse> {
    let results = scheduler(&state, &headers)?.search_doctors(&search).await?;
    Ok(Json(DoctorSearchResponse { results }))
}

// =============================================================================
// Reference Data
// =============================================================================

/// POST /v1/clinics
pub async fn create_clinic(
    State(state): State<AppState>,
    ApiJson(clinic): ApiJson<NewClinic>,
) -> CreatedResult<Clinic> {
    require(&clinic.name, "Clinic name is required.")?;
    let stored = state.repository.create_clinic(&clinic).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /v1/specialities
pub async fn create_speciality(
    State(state): State<AppState>,
    ApiJson(speciality): ApiJson<NewSpeciality>,
) -> CreatedResult<Speciality> {
    require(&speciality.name, "Speciality name is required.")?;
    let stored = state.repository.create_speciality(&speciality).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /v1/doctors
pub async fn create_doctor(
    State(state): State<AppState>,
    ApiJson(doctor): ApiJson<NewDoctor>,
) -> CreatedResult<Doctor> {
    require(&doctor.first_name, "Doctor name is required.")?;
    require(&doctor.last_name, "Doctor name is required.")?;
    let stored = state.repository.create_doctor(&doctor).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /v1/patients
pub async fn create_patient(
    State(state): State<AppState>,
    ApiJson(patient): ApiJson<NewPatient>,
) -> CreatedResult<Patient> {
    validate_patient(&patient)?;
    let stored = state.repository.create_patient(&patient).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /v1/clinics
pub async fn list_clinics(State(state): State<AppState>) -> HandlerResult<Vec<Clinic>> {
    Ok(Json(state.repository.list_clinics().await?))
}

/// GET /v1/clinics/{id}
pub async fn get_clinic(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<Clinic> {
    let clinic = state.repository.find_clinic(ClinicId::new(id)).await?;
    found(clinic, "Clinic not found.")
}

/// GET /v1/specialities
pub async fn list_specialities(State(state): State<AppState>) -> HandlerResult<Vec<Speciality>> {
    Ok(Json(state.repository.list_specialities().await?))
}

/// GET /v1/specialities/{id}
pub async fn get_speciality(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<Speciality> {
    let speciality = state
        .repository
        .find_speciality(SpecialityId::new(id))
        .await?;
    found(speciality, "Speciality not found.")
}

/// GET /v1/doctors
pub async fn list_doctors(State(state): State<AppState>) -> HandlerResult<Vec<Doctor>> {
    Ok(Json(state.repository.list_doctors().await?))
}

/// GET /v1/doctors/{id}
pub async fn get_doctor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<Doctor> {
    let doctor = state.repository.find_doctor(DoctorId::new(id)).await?;
    found(doctor, "Doctor not found.")
}

/// GET /v1/patients
pub async fn list_patients(State(state): State<AppState>) -> HandlerResult<Vec<Patient>> {
    Ok(Json(state.repository.list_patients().await?))
}

/// GET /v1/patients/{id}
pub async fn get_patient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> HandlerResult<Patient> {
    let patient = state.repository.find_patient(PatientId::new(id)).await?;
    found(patient, "Patient not found.")
}
