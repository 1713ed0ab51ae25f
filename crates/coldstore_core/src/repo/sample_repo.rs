//! Sample and sample-kind repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read reference `samplekind` rows.
//! - Look up, insert and delete `sample` rows.
//!
//! # Invariants
//! - `find_sample_by_id` reports absence as `RepoError::SampleNotFound`, never
//!   as a DB error.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::sample::{Sample, SampleId, SampleKind, SampleKindId};
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for sample and sample-kind rows.
pub trait SampleRepository {
    /// Returns kind labels ordered by `samplekindid ASC`.
    fn list_sample_kind_labels(&self) -> RepoResult<Vec<String>>;
    fn get_sample_kind(&self, kind_id: SampleKindId) -> RepoResult<Option<SampleKind>>;
    fn insert_sample_kind(&self, kind: &SampleKind) -> RepoResult<()>;
    fn find_sample_by_id(&self, id: SampleId) -> RepoResult<Sample>;
    fn sample_exists(&self, id: SampleId) -> RepoResult<bool>;
    fn insert_sample(&self, sample: &Sample) -> RepoResult<()>;
    /// Deletes one sample row and returns the number of rows removed.
    fn delete_sample(&self, id: SampleId) -> RepoResult<usize>;
}

/// SQLite-backed sample repository.
pub struct SqliteSampleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSampleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SampleRepository for SqliteSampleRepository<'_> {
    fn list_sample_kind_labels(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT text FROM samplekind ORDER BY samplekindid ASC;")?;
        let mut rows = stmt.query([])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(row.get("text")?);
        }
        Ok(labels)
    }

    fn get_sample_kind(&self, kind_id: SampleKindId) -> RepoResult<Option<SampleKind>> {
        let mut stmt = self.conn.prepare(
            "SELECT samplekindid, text, validnoofdays
             FROM samplekind
             WHERE samplekindid = ?1;",
        )?;
        let mut rows = stmt.query([kind_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_sample_kind_row(row)?));
        }
        Ok(None)
    }

    fn insert_sample_kind(&self, kind: &SampleKind) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO samplekind (samplekindid, text, validnoofdays) VALUES (?1, ?2, ?3);",
            params![kind.id, kind.label.as_str(), kind.valid_days],
        )?;
        Ok(())
    }

    fn find_sample_by_id(&self, id: SampleId) -> RepoResult<Sample> {
        let sample = self
            .conn
            .query_row(
                "SELECT sampleid, samplekindid, expirationdate
                 FROM sample
                 WHERE sampleid = ?1;",
                [id],
                |row| {
                    Ok(Sample {
                        id: row.get("sampleid")?,
                        kind_id: row.get("samplekindid")?,
                        expiration_date: row.get("expirationdate")?,
                    })
                },
            )
            .optional()?;

        sample.ok_or(RepoError::SampleNotFound(id))
    }

    fn sample_exists(&self, id: SampleId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sample WHERE sampleid = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_sample(&self, sample: &Sample) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO sample (sampleid, samplekindid, expirationdate) VALUES (?1, ?2, ?3);",
            params![sample.id, sample.kind_id, sample.expiration_date],
        )?;
        Ok(())
    }

    fn delete_sample(&self, id: SampleId) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM sample WHERE sampleid = ?1;", [id])?;
        Ok(removed)
    }
}

fn parse_sample_kind_row(row: &Row<'_>) -> RepoResult<SampleKind> {
    let id: SampleKindId = row.get("samplekindid")?;
    let raw_days: i64 = row.get("validnoofdays")?;
    let valid_days = u32::try_from(raw_days).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid validnoofdays `{raw_days}` for samplekind {id}"
        ))
    })?;

    Ok(SampleKind {
        id,
        label: row.get("text")?,
        valid_days,
    })
}
