//! Allocation engine configuration.
//!
//! # Responsibility
//! - Carry the tunables of tray selection and tray creation.
//! - Reject values that would push tray horizons out of a sane range.
//!
//! # Invariants
//! - `grace_days` never exceeds `MAX_GRACE_DAYS`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Grace window applied to new trays when nothing else is configured.
pub const DEFAULT_GRACE_DAYS: u32 = 30;

/// Upper bound for the grace window (ten years).
pub const MAX_GRACE_DAYS: u32 = 3650;

/// How a tray horizon is compared with a sample expiration date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonPolicy {
    /// Tray qualifies when `horizon >= expiration`.
    #[default]
    Inclusive,
    /// Tray qualifies only when `horizon > expiration`.
    Strict,
}

impl HorizonPolicy {
    pub fn accepts(self, horizon: NaiveDate, expiration: NaiveDate) -> bool {
        match self {
            Self::Inclusive => horizon >= expiration,
            Self::Strict => horizon > expiration,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inclusive => "inclusive",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for HorizonPolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inclusive" | ">=" => Ok(Self::Inclusive),
            "strict" | ">" => Ok(Self::Strict),
            other => Err(ConfigError::UnknownHorizonPolicy(other.to_string())),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    GraceWindowTooLarge(u32),
    /// A zero grace window under `Strict` yields trays that reject their own
    /// first sample.
    ZeroGraceUnderStrictPolicy,
    UnknownHorizonPolicy(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GraceWindowTooLarge(days) => write!(
                f,
                "grace window of {days} days exceeds maximum of {MAX_GRACE_DAYS}"
            ),
            Self::ZeroGraceUnderStrictPolicy => write!(
                f,
                "strict horizon policy requires a grace window of at least 1 day"
            ),
            Self::UnknownHorizonPolicy(value) => write!(
                f,
                "unknown horizon policy `{value}`; expected inclusive|strict"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Tunables for [`crate::service::cooling_service::CoolingService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Days added to a sample's expiration date to size a new tray's horizon.
    pub grace_days: u32,
    pub horizon_policy: HorizonPolicy,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            grace_days: DEFAULT_GRACE_DAYS,
            horizon_policy: HorizonPolicy::default(),
        }
    }
}

impl AllocationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grace_days > MAX_GRACE_DAYS {
            return Err(ConfigError::GraceWindowTooLarge(self.grace_days));
        }
        if self.grace_days == 0 && self.horizon_policy == HorizonPolicy::Strict {
            return Err(ConfigError::ZeroGraceUnderStrictPolicy);
        }
        Ok(())
    }
}
