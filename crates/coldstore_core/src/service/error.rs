//! Service error taxonomy.
//!
//! # Invariants
//! - "Does not exist" (`NotFound`) is never conflated with store failure
//!   (`DataAccess`).
//! - `DataAccess` keeps the low-level cause reachable through `source()`.

use crate::config::ConfigError;
use crate::db::DbError;
use crate::model::sample::{SampleId, SampleKindId};
use crate::model::tray::TrayId;
use crate::repo::error::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Entity referenced by a `NotFound` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Sample(SampleId),
    SampleKind(SampleKindId),
    Tray(TrayId),
}

impl Display for Missing {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sample(id) => write!(f, "sample {id}"),
            Self::SampleKind(id) => write!(f, "sample kind {id}"),
            Self::Tray(id) => write!(f, "tray {id}"),
        }
    }
}

/// Payload-free classification of [`ServiceError`] for branching callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    NoCapacity,
    DataAccess,
    NotConfigured,
    InvalidInput,
}

impl ErrorKind {
    /// Stable code used in log events and CLI output.
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::NoCapacity => "no_capacity",
            Self::DataAccess => "data_access",
            Self::NotConfigured => "not_configured",
            Self::InvalidInput => "invalid_input",
        }
    }
}

/// Errors from cold storage service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Referenced sample, sample kind or tray does not exist.
    NotFound(Missing),
    /// Entity already exists, creation references an unknown entity, or the
    /// sample already holds a place.
    Conflict(String),
    /// The selected tray has no free place.
    NoCapacity { tray_id: TrayId },
    /// Underlying store failure.
    DataAccess(RepoError),
    /// Connection is not usable by the service (schema missing or outdated).
    NotConfigured(DbError),
    /// Allocation configuration was rejected.
    InvalidConfig(ConfigError),
    /// Caller input is outside the accepted domain.
    InvalidInput(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NoCapacity { .. } => ErrorKind::NoCapacity,
            Self::DataAccess(_) => ErrorKind::DataAccess,
            Self::NotConfigured(_) => ErrorKind::NotConfigured,
            Self::InvalidConfig(_) | Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(missing) => write!(f, "{missing} does not exist"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::NoCapacity { tray_id } => write!(f, "no available place on tray {tray_id}"),
            Self::DataAccess(err) => write!(f, "data access failed: {err}"),
            Self::NotConfigured(err) => write!(f, "service not configured: {err}"),
            Self::InvalidConfig(err) => write!(f, "invalid configuration: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DataAccess(err) => Some(err),
            Self::NotConfigured(err) => Some(err),
            Self::InvalidConfig(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::SampleNotFound(id) => Self::NotFound(Missing::Sample(id)),
            other => Self::DataAccess(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::DataAccess(RepoError::from(value))
    }
}

impl From<ConfigError> for ServiceError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}
