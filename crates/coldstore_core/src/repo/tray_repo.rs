//! Tray and place repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the candidate-tray and free-place lookups the allocation engine
//!   builds on.
//! - Insert trays/places and claim or remove place assignments.
//!
//! # Invariants
//! - Candidate order is deterministic: dated trays by horizon ascending,
//!   then unbounded trays, ties broken by `trayid ASC`.
//! - A tray without place rows is never a candidate.
//! - `claim_place` only writes into a free place (compare-and-swap).

use crate::config::HorizonPolicy;
use crate::model::sample::SampleId;
use crate::model::tray::{Place, PlaceNo, Placement, Tray, TrayId};
use crate::repo::error::RepoResult;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const TRAY_SELECT_SQL: &str = "SELECT trayid, diameter, expirationdate FROM tray";

/// Repository interface for tray and place rows.
pub trait TrayRepository {
    fn get_tray(&self, id: TrayId) -> RepoResult<Option<Tray>>;
    fn list_trays(&self) -> RepoResult<Vec<Tray>>;
    /// Returns the tray closest to expiring that still covers `expiration`.
    fn find_candidate_tray(
        &self,
        diameter: i64,
        expiration: NaiveDate,
        policy: HorizonPolicy,
    ) -> RepoResult<Option<Tray>>;
    /// Inserts a tray row and returns its store-assigned id.
    fn insert_tray(&self, diameter: i64, horizon: Option<NaiveDate>) -> RepoResult<TrayId>;
    fn insert_place(&self, tray_id: TrayId, place_no: PlaceNo) -> RepoResult<()>;
    /// Returns the lowest free place number on the tray.
    fn find_free_place(&self, tray_id: TrayId) -> RepoResult<Option<PlaceNo>>;
    /// Assigns `sample_id` to a free place. Returns `false` when the place is
    /// missing or already taken.
    fn claim_place(
        &self,
        tray_id: TrayId,
        place_no: PlaceNo,
        sample_id: SampleId,
    ) -> RepoResult<bool>;
    fn find_placement(&self, sample_id: SampleId) -> RepoResult<Option<Placement>>;
    /// Lists every place of a tray ordered by place number.
    fn list_places(&self, tray_id: TrayId) -> RepoResult<Vec<Place>>;
    fn placed_sample_ids(&self, tray_id: TrayId) -> RepoResult<Vec<SampleId>>;
    /// Deletes all place rows of a tray and returns the number removed.
    fn delete_places(&self, tray_id: TrayId) -> RepoResult<usize>;
}

/// SQLite-backed tray repository.
pub struct SqliteTrayRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTrayRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TrayRepository for SqliteTrayRepository<'_> {
    fn get_tray(&self, id: TrayId) -> RepoResult<Option<Tray>> {
        let tray = self
            .conn
            .query_row(
                &format!("{TRAY_SELECT_SQL} WHERE trayid = ?1;"),
                [id],
                parse_tray_row,
            )
            .optional()?;
        Ok(tray)
    }

    fn list_trays(&self) -> RepoResult<Vec<Tray>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TRAY_SELECT_SQL} ORDER BY trayid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut trays = Vec::new();
        while let Some(row) = rows.next()? {
            trays.push(parse_tray_row(row)?);
        }
        Ok(trays)
    }

    fn find_candidate_tray(
        &self,
        diameter: i64,
        expiration: NaiveDate,
        policy: HorizonPolicy,
    ) -> RepoResult<Option<Tray>> {
        let strict = matches!(policy, HorizonPolicy::Strict);
        let tray = self
            .conn
            .query_row(
                "SELECT t.trayid, t.diameter, t.expirationdate
                 FROM tray t
                 WHERE t.diameter = ?1
                   AND (
                        t.expirationdate IS NULL
                        OR (?3 = 0 AND t.expirationdate >= ?2)
                        OR (?3 = 1 AND t.expirationdate > ?2)
                   )
                   AND EXISTS (SELECT 1 FROM place p WHERE p.trayid = t.trayid)
                 ORDER BY t.expirationdate IS NULL ASC, t.expirationdate ASC, t.trayid ASC
                 LIMIT 1;",
                params![diameter, expiration, strict],
                parse_tray_row,
            )
            .optional()?;
        Ok(tray)
    }

    fn insert_tray(&self, diameter: i64, horizon: Option<NaiveDate>) -> RepoResult<TrayId> {
        self.conn.execute(
            "INSERT INTO tray (diameter, expirationdate) VALUES (?1, ?2);",
            params![diameter, horizon],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_place(&self, tray_id: TrayId, place_no: PlaceNo) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO place (trayid, placeno, sampleid) VALUES (?1, ?2, NULL);",
            params![tray_id, place_no],
        )?;
        Ok(())
    }

    fn find_free_place(&self, tray_id: TrayId) -> RepoResult<Option<PlaceNo>> {
        let place_no = self
            .conn
            .query_row(
                "SELECT placeno
                 FROM place
                 WHERE trayid = ?1 AND sampleid IS NULL
                 ORDER BY placeno ASC
                 LIMIT 1;",
                [tray_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(place_no)
    }

    fn claim_place(
        &self,
        tray_id: TrayId,
        place_no: PlaceNo,
        sample_id: SampleId,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE place
             SET sampleid = ?1
             WHERE trayid = ?2
               AND placeno = ?3
               AND sampleid IS NULL;",
            params![sample_id, tray_id, place_no],
        )?;
        Ok(changed == 1)
    }

    fn find_placement(&self, sample_id: SampleId) -> RepoResult<Option<Placement>> {
        let placement = self
            .conn
            .query_row(
                "SELECT trayid, placeno, sampleid FROM place WHERE sampleid = ?1;",
                [sample_id],
                |row| {
                    Ok(Placement {
                        tray_id: row.get("trayid")?,
                        place_no: row.get("placeno")?,
                        sample_id: row.get("sampleid")?,
                    })
                },
            )
            .optional()?;
        Ok(placement)
    }

    fn list_places(&self, tray_id: TrayId) -> RepoResult<Vec<Place>> {
        let mut stmt = self.conn.prepare(
            "SELECT trayid, placeno, sampleid
             FROM place
             WHERE trayid = ?1
             ORDER BY placeno ASC;",
        )?;
        let mut rows = stmt.query([tray_id])?;
        let mut places = Vec::new();
        while let Some(row) = rows.next()? {
            places.push(Place {
                tray_id: row.get("trayid")?,
                place_no: row.get("placeno")?,
                sample_id: row.get("sampleid")?,
            });
        }
        Ok(places)
    }

    fn placed_sample_ids(&self, tray_id: TrayId) -> RepoResult<Vec<SampleId>> {
        let mut stmt = self.conn.prepare(
            "SELECT sampleid
             FROM place
             WHERE trayid = ?1 AND sampleid IS NOT NULL
             ORDER BY placeno ASC;",
        )?;
        let mut rows = stmt.query([tray_id])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }

    fn delete_places(&self, tray_id: TrayId) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM place WHERE trayid = ?1;", [tray_id])?;
        Ok(removed)
    }
}

fn parse_tray_row(row: &Row<'_>) -> rusqlite::Result<Tray> {
    Ok(Tray {
        id: row.get("trayid")?,
        diameter: row.get("diameter")?,
        horizon: row.get("expirationdate")?,
    })
}
