//! Tray and place records.
//!
//! # Invariants
//! - `place_no` is unique per tray and starts at 1.
//! - A tray with `horizon == None` accepts samples of any expiration date.

use crate::config::HorizonPolicy;
use crate::model::sample::SampleId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Store-assigned tray identifier.
pub type TrayId = i64;

/// Ordinal slot position on a tray.
pub type PlaceNo = i64;

/// Physical cooling rack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tray {
    pub id: TrayId,
    /// Physical size class. Only samples requesting the same diameter fit.
    pub diameter: i64,
    /// Latest expiration date this tray hosts. `None` means unbounded.
    pub horizon: Option<NaiveDate>,
}

impl Tray {
    /// Returns whether this tray can host a sample expiring on `expiration`.
    pub fn covers(&self, expiration: NaiveDate, policy: HorizonPolicy) -> bool {
        match self.horizon {
            None => true,
            Some(horizon) => policy.accepts(horizon, expiration),
        }
    }
}

/// One storage slot on a tray.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
    pub tray_id: TrayId,
    pub place_no: PlaceNo,
    /// `None` marks a free slot.
    pub sample_id: Option<SampleId>,
}

impl Place {
    pub fn is_free(&self) -> bool {
        self.sample_id.is_none()
    }
}

/// Occupied place read model returned by allocation and placement lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub tray_id: TrayId,
    pub place_no: PlaceNo,
    pub sample_id: SampleId,
}

#[cfg(test)]
mod tests {
    use super::Tray;
    use crate::config::HorizonPolicy;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn unbounded_tray_covers_everything() {
        let tray = Tray {
            id: 1,
            diameter: 5,
            horizon: None,
        };
        assert!(tray.covers(date(31), HorizonPolicy::Strict));
    }

    #[test]
    fn equal_horizon_depends_on_policy() {
        let tray = Tray {
            id: 1,
            diameter: 5,
            horizon: Some(date(10)),
        };
        assert!(tray.covers(date(10), HorizonPolicy::Inclusive));
        assert!(!tray.covers(date(10), HorizonPolicy::Strict));
        assert!(!tray.covers(date(11), HorizonPolicy::Inclusive));
    }
}
