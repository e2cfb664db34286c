//! Response envelopes for the REST API.
//!
//! Request bodies reuse the types in [`crate::api`] and [`crate::models`]
//! directly.

use serde::{Deserialize, Serialize};

use crate::api::{AppointmentView, DoctorSearchResult};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentResponse {
    pub appointment: AppointmentView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentListResponse {
    pub appointments: Vec<AppointmentView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentResponse {
    pub message: String,
    pub appointment: AppointmentView,
}

/// Plain acknowledgement, e.g. after a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Doctor search hits. An empty `results` list means no doctor matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSearchResponse {
    pub results: Vec<DoctorSearchResult>,
}
