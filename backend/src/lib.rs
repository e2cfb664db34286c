//! # Clinic Booking Backend
//!
//! Appointment scheduling and conflict detection for a multi-clinic
//! practice.
//!
//! A booking names a patient, a doctor, a clinic, a start time and a
//! duration. The engine accepts it only if the referenced records exist,
//! the start is not in the past and falls within business hours, and
//! neither the patient nor the doctor already has an overlapping
//! appointment. That last guarantee holds under concurrent requests.
//!
//! ## Architecture
//!
//! - [`models`]: stored records, id newtypes and [`models::TimeInterval`]
//! - [`api`]: request payloads and flat read-models
//! - [`scheduling`]: booking rules, conflict detection, keyed locks and the
//!   [`scheduling::SchedulingService`]
//! - [`db`]: repository traits with in-memory and Postgres backends
//! - [`http`]: Axum-based REST API

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod db;
pub mod models;
pub mod scheduling;

#[cfg(feature = "http-server")]
pub mod http;
