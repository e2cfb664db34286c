//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::scheduling::{SchedulingConfig, SchedulingService};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for reference-data writes and health checks
    pub repository: Arc<dyn FullRepository>,
    /// Booking engine sharing the same repository
    pub scheduler: SchedulingService,
}

impl AppState {
    /// Create state with a service built from `config`.
    pub fn new(repository: Arc<dyn FullRepository>, config: SchedulingConfig) -> Self {
        let scheduler = SchedulingService::new(repository.clone(), config);
        Self {
            repository,
            scheduler,
        }
    }

    /// Create state around an existing service.
    pub fn from_service(scheduler: SchedulingService) -> Self {
        Self {
            repository: scheduler.repository().clone(),
            scheduler,
        }
    }
}
