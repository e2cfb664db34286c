//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for development, should be restricted in production
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Appointments
        .route(
            "/appointments",
            get(handlers::list_appointments).post(handlers::create_appointment),
        )
        .route(
            "/appointments/with-patient",
            post(handlers::create_appointment_with_patient),
        )
        .route(
            "/appointments/{id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        // Search
        .route("/search/doctors", post(handlers::search_doctors))
        // Reference data
        .route(
            "/clinics",
            get(handlers::list_clinics).post(handlers::create_clinic),
        )
        .route("/clinics/{id}", get(handlers::get_clinic))
        .route(
            "/specialities",
            get(handlers::list_specialities).post(handlers::create_speciality),
        )
        .route("/specialities/{id}", get(handlers::get_speciality))
        .route(
            "/doctors",
            get(handlers::list_doctors).post(handlers::create_doctor),
        )
        .route("/doctors/{id}", get(handlers::get_doctor))
        .route(
            "/patients",
            get(handlers::list_patients).post(handlers::create_patient),
        )
        .route("/patients/{id}", get(handlers::get_patient));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
