//! Cold storage use-case service.
//!
//! # Responsibility
//! - Expose the public cold storage operations over one caller-owned
//!   connection.
//! - Own the transaction boundary of every multi-step operation.
//!
//! # Invariants
//! - A service can only be constructed over a migrated connection, so no
//!   operation runs against an unconfigured store.
//! - Multi-step operations run in one `IMMEDIATE` transaction and leave no
//!   partial state on error.
//! - The connection is borrowed, never opened or closed here.

use crate::config::AllocationConfig;
use crate::db::{ensure_connection_ready, DbError};
use crate::model::sample::{is_storable_date, Sample, SampleId, SampleKind, SampleKindId};
use crate::model::tray::{Place, Placement, Tray, TrayId};
use crate::repo::sample_repo::{SampleRepository, SqliteSampleRepository};
use crate::repo::tray_repo::{SqliteTrayRepository, TrayRepository};
use crate::service::allocation::{allocate, Allocation};
use crate::service::error::{Missing, ServiceError, ServiceResult};
use chrono::{Local, NaiveDate};
use log::{error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::time::Instant;

/// Upper bound on places created by one `provision_tray` call.
pub const MAX_TRAY_CAPACITY: u32 = 1000;

/// Row counts removed by [`CoolingService::clear_tray`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearTrayOutcome {
    pub places_removed: usize,
    pub samples_removed: usize,
}

/// Service facade for sample registration, tray clearing and allocation.
pub struct CoolingService<'conn> {
    conn: &'conn mut Connection,
    config: AllocationConfig,
}

impl<'conn> CoolingService<'conn> {
    /// Binds the service to a migrated connection.
    ///
    /// # Errors
    /// - `InvalidConfig` when `config` fails validation.
    /// - `NotConfigured` when the connection schema is missing or outdated.
    pub fn try_new(conn: &'conn mut Connection, config: AllocationConfig) -> ServiceResult<Self> {
        config.validate()?;
        match ensure_connection_ready(conn) {
            Ok(()) => {}
            Err(DbError::Sqlite(err)) => return Err(err.into()),
            Err(other) => return Err(ServiceError::NotConfigured(other)),
        }
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn, config })
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Returns sample-kind labels ordered by kind id.
    pub fn list_sample_kind_labels(&self) -> ServiceResult<Vec<String>> {
        let repo = SqliteSampleRepository::new(self.conn);
        Ok(repo.list_sample_kind_labels()?)
    }

    /// Registers one sample-kind reference row.
    pub fn register_sample_kind(&mut self, kind: &SampleKind) -> ServiceResult<()> {
        if kind.label.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "sample kind label must not be blank".to_string(),
            ));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let repo = SqliteSampleRepository::new(&tx);
            if repo.get_sample_kind(kind.id)?.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "sample kind {} already exists",
                    kind.id
                )));
            }
            repo.insert_sample_kind(kind)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Loads one sample by id.
    pub fn find_sample_by_id(&self, id: SampleId) -> ServiceResult<Sample> {
        let repo = SqliteSampleRepository::new(self.conn);
        Ok(repo.find_sample_by_id(id)?)
    }

    /// Creates a sample dated today (local time).
    pub fn create_sample(&mut self, id: SampleId, kind_id: SampleKindId) -> ServiceResult<Sample> {
        self.create_sample_on(id, kind_id, Local::now().date_naive())
    }

    /// Creates a sample whose expiration is `today` plus the kind's validity.
    ///
    /// # Errors
    /// - `Conflict` when the sample id is taken or the kind does not exist.
    pub fn create_sample_on(
        &mut self,
        id: SampleId,
        kind_id: SampleKindId,
        today: NaiveDate,
    ) -> ServiceResult<Sample> {
        info!("event=sample_create module=service status=start sample_id={id} kind_id={kind_id}");
        let result = self.create_sample_in_tx(id, kind_id, today);
        match &result {
            Ok(sample) => info!(
                "event=sample_create module=service status=ok sample_id={} expiration={}",
                sample.id, sample.expiration_date
            ),
            Err(err) => log_failure("sample_create", err),
        }
        result
    }

    fn create_sample_in_tx(
        &mut self,
        id: SampleId,
        kind_id: SampleKindId,
        today: NaiveDate,
    ) -> ServiceResult<Sample> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let sample = {
            let repo = SqliteSampleRepository::new(&tx);
            if repo.sample_exists(id)? {
                return Err(ServiceError::Conflict(format!(
                    "sample {id} already exists"
                )));
            }
            let kind = repo.get_sample_kind(kind_id)?.ok_or_else(|| {
                ServiceError::Conflict(format!("sample kind {kind_id} does not exist"))
            })?;
            let expiration_date = kind.expiration_from(today).ok_or_else(|| {
                ServiceError::InvalidInput(format!(
                    "expiration for sample {id} falls past year 9999"
                ))
            })?;

            let sample = Sample {
                id,
                kind_id,
                expiration_date,
            };
            repo.insert_sample(&sample)?;
            sample
        };
        tx.commit()?;
        Ok(sample)
    }

    /// Removes every place of a tray and every sample those places held.
    ///
    /// The tray row itself stays; clearing it again is a no-op.
    pub fn clear_tray(&mut self, tray_id: TrayId) -> ServiceResult<ClearTrayOutcome> {
        let started_at = Instant::now();
        info!("event=tray_clear module=service status=start tray_id={tray_id}");
        let result = self.clear_tray_in_tx(tray_id);
        match &result {
            Ok(outcome) => info!(
                "event=tray_clear module=service status=ok tray_id={} places_removed={} samples_removed={} duration_ms={}",
                tray_id,
                outcome.places_removed,
                outcome.samples_removed,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("tray_clear", err),
        }
        result
    }

    fn clear_tray_in_tx(&mut self, tray_id: TrayId) -> ServiceResult<ClearTrayOutcome> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = {
            let samples = SqliteSampleRepository::new(&tx);
            let trays = SqliteTrayRepository::new(&tx);
            trays
                .get_tray(tray_id)?
                .ok_or(ServiceError::NotFound(Missing::Tray(tray_id)))?;

            let sample_ids = trays.placed_sample_ids(tray_id)?;
            let places_removed = trays.delete_places(tray_id)?;
            let mut samples_removed = 0;
            for sample_id in sample_ids {
                samples_removed += samples.delete_sample(sample_id)?;
            }
            ClearTrayOutcome {
                places_removed,
                samples_removed,
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Creates a tray with places `1..=capacity`, all free.
    ///
    /// `horizon = None` creates an unbounded tray.
    pub fn provision_tray(
        &mut self,
        diameter: i64,
        horizon: Option<NaiveDate>,
        capacity: u32,
    ) -> ServiceResult<Tray> {
        if diameter <= 0 {
            return Err(ServiceError::InvalidInput(format!(
                "diameter must be positive, got {diameter}"
            )));
        }
        if capacity == 0 || capacity > MAX_TRAY_CAPACITY {
            return Err(ServiceError::InvalidInput(format!(
                "capacity must be within 1..={MAX_TRAY_CAPACITY}, got {capacity}"
            )));
        }
        if let Some(date) = horizon.filter(|date| !is_storable_date(*date)) {
            return Err(ServiceError::InvalidInput(format!(
                "tray horizon {date} is past year 9999"
            )));
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let tray = {
            let trays = SqliteTrayRepository::new(&tx);
            let id = trays.insert_tray(diameter, horizon)?;
            for place_no in 1..=i64::from(capacity) {
                trays.insert_place(id, place_no)?;
            }
            Tray {
                id,
                diameter,
                horizon,
            }
        };
        tx.commit()?;
        info!(
            "event=tray_provision module=service status=ok tray_id={} diameter={} capacity={}",
            tray.id, diameter, capacity
        );
        Ok(tray)
    }

    /// Places an existing sample on a compatible tray of `diameter`.
    ///
    /// Creates a tray sized `expiration + grace_days` when no stored tray
    /// covers the sample.
    ///
    /// # Errors
    /// - `NotFound` when the sample does not exist (no tray is created).
    /// - `Conflict` when the sample already holds a place.
    /// - `NoCapacity` when the selected tray has no free place.
    /// - `DataAccess` on store failure.
    pub fn allocate_sample(
        &mut self,
        sample_id: SampleId,
        diameter: i64,
    ) -> ServiceResult<Placement> {
        let started_at = Instant::now();
        info!(
            "event=sample_allocate module=service status=start sample_id={sample_id} diameter={diameter}"
        );
        let result = self.allocate_in_tx(sample_id, diameter);
        match &result {
            Ok(allocation) => info!(
                "event=sample_allocate module=service status=ok sample_id={} tray_id={} place_no={} tray_created={} duration_ms={}",
                sample_id,
                allocation.placement.tray_id,
                allocation.placement.place_no,
                allocation.tray_created,
                started_at.elapsed().as_millis()
            ),
            Err(err) => log_failure("sample_allocate", err),
        }
        result.map(|allocation| allocation.placement)
    }

    fn allocate_in_tx(&mut self, sample_id: SampleId, diameter: i64) -> ServiceResult<Allocation> {
        let config = self.config;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let allocation = {
            let samples = SqliteSampleRepository::new(&tx);
            let trays = SqliteTrayRepository::new(&tx);
            allocate(&samples, &trays, sample_id, diameter, &config)?
        };
        tx.commit()?;
        Ok(allocation)
    }

    /// Returns where a sample is stored, if anywhere.
    pub fn find_placement(&self, sample_id: SampleId) -> ServiceResult<Option<Placement>> {
        let trays = SqliteTrayRepository::new(self.conn);
        Ok(trays.find_placement(sample_id)?)
    }

    pub fn list_trays(&self) -> ServiceResult<Vec<Tray>> {
        let trays = SqliteTrayRepository::new(self.conn);
        Ok(trays.list_trays()?)
    }

    /// Lists the places of an existing tray ordered by place number.
    pub fn list_places(&self, tray_id: TrayId) -> ServiceResult<Vec<Place>> {
        let trays = SqliteTrayRepository::new(self.conn);
        trays
            .get_tray(tray_id)?
            .ok_or(ServiceError::NotFound(Missing::Tray(tray_id)))?;
        Ok(trays.list_places(tray_id)?)
    }
}

fn log_failure(event: &str, err: &ServiceError) {
    let code = err.kind().code();
    match err {
        ServiceError::DataAccess(_) | ServiceError::NotConfigured(_) => {
            error!("event={event} module=service status=error error_code={code} error={err}")
        }
        _ => warn!("event={event} module=service status=error error_code={code} error={err}"),
    }
}
