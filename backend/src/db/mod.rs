//! Storage for clinics, doctors, patients and appointments.
//!
//! This module provides abstractions for database operations via the
//! Repository pattern, allowing different storage backends to be swapped
//! easily.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Application Layer (REST API)                           │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  SchedulingService (crate::scheduling)                  │
//! │  - booking rules, conflict checks, keyed locks          │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────┐
//!     │                              │
//! ┌───▼──────────────┐     ┌─────────▼──────────┐
//! │ LocalRepository  │     │ PostgresRepository │
//! │  (in-memory)     │     │  (Diesel, r2d2)    │
//! └──────────────────┘     └────────────────────┘
//! ```
//!
//! # Recommended Usage
//!
//! ```ignore
//! use clinic_booking::db::{RepositoryFactory, RepositoryType};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = RepositoryFactory::create(RepositoryType::Local, None).await?;
//!     assert!(repo.health_check().await?);
//!     Ok(())
//! }
//! ```

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use repo_config::RepositoryConfig;

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    AppointmentRepository, Deadline, ErrorContext, FullRepository, ReferenceRepository,
    RepositoryError, RepositoryResult,
};

use std::path::Path;
use std::sync::Arc;

use crate::scheduling::SchedulingConfig;

/// Create the repository selected by the deployment configuration.
///
/// Uses `repository.toml` when one is found in the standard locations and
/// falls back to environment variables otherwise. The caller owns the
/// returned handle; there is no process-wide instance.
pub async fn create_repository() -> RepositoryResult<Arc<dyn FullRepository>> {
    create_repository_in(Path::new(".")).await
}

/// Same as [`create_repository`], searching for `repository.toml` relative to `dir`.
///
/// A file that exists but cannot be read or parsed is an error; only a
/// missing file selects the environment.
pub async fn create_repository_in(dir: &Path) -> RepositoryResult<Arc<dyn FullRepository>> {
    match RepositoryConfig::load_from_dir(dir)? {
        Some(config) => RepositoryFactory::from_repository_config(&config).await,
        None => RepositoryFactory::from_env().await,
    }
}

/// Load booking rules from `repository.toml`, or from the environment when
/// no file exists.
pub fn load_scheduling_config() -> RepositoryResult<SchedulingConfig> {
    load_scheduling_config_in(Path::new("."))
}

/// Same as [`load_scheduling_config`], searching relative to `dir`.
pub fn load_scheduling_config_in(dir: &Path) -> RepositoryResult<SchedulingConfig> {
    match RepositoryConfig::load_from_dir(dir)? {
        Some(config) => config.to_scheduling_config(),
        None => SchedulingConfig::from_env().map_err(RepositoryError::configuration),
    }
}
