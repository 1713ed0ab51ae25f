//! Core domain logic for coldstore.
//! This crate owns the tray allocation invariants and their persistence.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AllocationConfig, ConfigError, HorizonPolicy, DEFAULT_GRACE_DAYS};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogSink};
pub use model::sample::{is_storable_date, Sample, SampleId, SampleKind, SampleKindId, MAX_STORABLE_YEAR};
pub use model::tray::{Place, PlaceNo, Placement, Tray, TrayId};
pub use repo::error::{RepoError, RepoResult};
pub use repo::sample_repo::{SampleRepository, SqliteSampleRepository};
pub use repo::tray_repo::{SqliteTrayRepository, TrayRepository};
pub use service::cooling_service::{ClearTrayOutcome, CoolingService};
pub use service::error::{ErrorKind, Missing, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
