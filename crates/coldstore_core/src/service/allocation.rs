//! Sample-to-tray allocation engine.
//!
//! # Responsibility
//! - Pick the tray a sample goes to, creating one when no stored tray fits.
//! - Claim the lowest free place on that tray for the sample.
//!
//! # Invariants
//! - Sample existence is checked before any tray lookup, so a missing sample
//!   never creates a tray.
//! - A sample that already holds a place is rejected, never moved.
//! - A full candidate tray fails with `NoCapacity`; the engine never falls
//!   through to a second tray of the same diameter.
//! - The target tray, found or created, covers the sample under the
//!   configured horizon policy.
//! - Callers run [`allocate`] inside one transaction. Every error leaves
//!   writes behind that the caller's rollback must discard.

use crate::config::AllocationConfig;
use crate::model::sample::{is_storable_date, Sample, SampleId};
use crate::model::tray::{PlaceNo, Placement, Tray, TrayId};
use crate::repo::error::RepoError;
use crate::repo::sample_repo::SampleRepository;
use crate::repo::tray_repo::TrayRepository;
use crate::service::error::{ServiceError, ServiceResult};
use chrono::Days;
use log::{info, warn};

/// Place number given to the only place of a freshly created tray.
pub const FIRST_PLACE_NO: PlaceNo = 1;

/// Number of search-and-claim rounds before a lost claim becomes
/// `NoCapacity`.
pub const MAX_CLAIM_ATTEMPTS: u32 = 3;

/// Result of one successful allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub placement: Placement,
    /// `true` when the engine had to create the tray it placed the sample on.
    pub tray_created: bool,
}

/// Places an existing, unplaced sample onto a tray slot of `diameter`.
pub fn allocate<S, T>(
    samples: &S,
    trays: &T,
    sample_id: SampleId,
    diameter: i64,
    config: &AllocationConfig,
) -> ServiceResult<Allocation>
where
    S: SampleRepository,
    T: TrayRepository,
{
    config.validate()?;
    if diameter <= 0 {
        return Err(ServiceError::InvalidInput(format!(
            "diameter must be positive, got {diameter}"
        )));
    }

    let sample = samples.find_sample_by_id(sample_id)?;
    if let Some(existing) = trays.find_placement(sample_id)? {
        return Err(ServiceError::Conflict(format!(
            "sample {sample_id} already occupies place {} on tray {}",
            existing.place_no, existing.tray_id
        )));
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        let target = select_target(trays, &sample, diameter, config)?;
        if trays.claim_place(target.tray_id, target.place_no, sample.id)? {
            return Ok(Allocation {
                placement: Placement {
                    tray_id: target.tray_id,
                    place_no: target.place_no,
                    sample_id: sample.id,
                },
                tray_created: target.tray_created,
            });
        }

        warn!(
            "event=place_claim module=allocation status=retry sample_id={} tray_id={} place_no={} attempt={}",
            sample.id, target.tray_id, target.place_no, attempt
        );
        if attempt >= MAX_CLAIM_ATTEMPTS {
            return Err(ServiceError::NoCapacity {
                tray_id: target.tray_id,
            });
        }
    }
}

struct Target {
    tray_id: TrayId,
    place_no: PlaceNo,
    tray_created: bool,
}

fn select_target<T: TrayRepository>(
    trays: &T,
    sample: &Sample,
    diameter: i64,
    config: &AllocationConfig,
) -> ServiceResult<Target> {
    let candidate =
        trays.find_candidate_tray(diameter, sample.expiration_date, config.horizon_policy)?;

    match candidate {
        Some(tray) => {
            let fits = tray.diameter == diameter
                && tray.covers(sample.expiration_date, config.horizon_policy);
            if !fits {
                return Err(ServiceError::DataAccess(RepoError::InvalidData(format!(
                    "candidate tray {} (diameter {}, horizon {:?}) does not fit sample {} (diameter {}, expiration {})",
                    tray.id, tray.diameter, tray.horizon, sample.id, diameter, sample.expiration_date
                ))));
            }
            let place_no = trays
                .find_free_place(tray.id)?
                .ok_or(ServiceError::NoCapacity { tray_id: tray.id })?;
            Ok(Target {
                tray_id: tray.id,
                place_no,
                tray_created: false,
            })
        }
        None => {
            let horizon = sample
                .expiration_date
                .checked_add_days(Days::new(u64::from(config.grace_days)))
                .filter(|date| is_storable_date(*date))
                .ok_or_else(|| {
                    ServiceError::InvalidInput(format!(
                        "tray horizon for sample {} falls past year 9999",
                        sample.id
                    ))
                })?;
            let mut tray = Tray {
                id: 0,
                diameter,
                horizon: Some(horizon),
            };
            if !tray.covers(sample.expiration_date, config.horizon_policy) {
                return Err(ServiceError::InvalidInput(format!(
                    "a {}-day grace window gives sample {} a tray it cannot enter",
                    config.grace_days, sample.id
                )));
            }
            tray.id = trays.insert_tray(diameter, tray.horizon)?;
            trays.insert_place(tray.id, FIRST_PLACE_NO)?;
            info!(
                "event=tray_create module=allocation status=ok tray_id={} diameter={} horizon={}",
                tray.id, diameter, horizon
            );
            Ok(Target {
                tray_id: tray.id,
                place_no: FIRST_PLACE_NO,
                tray_created: true,
            })
        }
    }
}
