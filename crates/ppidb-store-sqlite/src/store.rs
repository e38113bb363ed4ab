//! [`SqliteStore`], the SQLite implementation of [`PredictionStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use ppidb_core::{
  cleanup::{self, CleanupPlan, CleanupReport, DuplicateGroup},
  ingest::screen,
  reconcile::{Action, reconcile},
  record::{NewPrediction, PredictionRecord, Scheme},
  store::{IngestOutcome, PredictionQuery, PredictionStore},
  subject::SubjectKey,
};

use crate::{
  Error, Result,
  encode::{EncodedRecord, RECORD_COLUMNS, RawRecord, decode_records, encode_uuid},
  schema::SCHEMA,
};

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These run on the connection thread, inside whatever transaction the caller
// opened.

fn select_subject(
  conn: &rusqlite::Connection,
  bait: &str,
  prey: &str,
) -> rusqlite::Result<Vec<RawRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {RECORD_COLUMNS} FROM predictions WHERE bait = ?1 AND prey = ?2"
  ))?;
  let rows = stmt
    .query_map(rusqlite::params![bait, prey], RawRecord::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn select_all(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<RawRecord>> {
  let mut stmt = conn.prepare(&format!("SELECT {RECORD_COLUMNS} FROM predictions"))?;
  let rows = stmt
    .query_map([], RawRecord::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub(crate) fn insert_row(
  conn: &rusqlite::Connection,
  record: &PredictionRecord,
) -> rusqlite::Result<()> {
  let e = EncodedRecord::from(record);
  conn.execute(
    &format!(
      "INSERT INTO predictions ({RECORD_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
    ),
    rusqlite::params![
      e.record_id,
      e.bait,
      e.prey,
      e.pairwise_alignment_confidence,
      e.high_confidence_contacts,
      e.medium_confidence_contacts,
      e.interface_plddt,
      e.interface_alignment_score,
      e.alignment_score_class,
      e.confidence_tier,
      e.scheme_version,
      e.provenance_path,
      e.ingested_at,
      e.updated_at,
    ],
  )?;
  Ok(())
}

/// Rewrite every mutable column of an existing row. Returns the number of
/// rows changed (0 if the row is gone).
fn update_row(conn: &rusqlite::Connection, record: &PredictionRecord) -> rusqlite::Result<usize> {
  let e = EncodedRecord::from(record);
  conn.execute(
    "UPDATE predictions SET
       high_confidence_contacts   = ?2,
       medium_confidence_contacts = ?3,
       interface_plddt            = ?4,
       interface_alignment_score  = ?5,
       alignment_score_class      = ?6,
       confidence_tier            = ?7,
       scheme_version             = ?8,
       provenance_path            = ?9,
       updated_at                 = ?10
     WHERE record_id = ?1",
    rusqlite::params![
      e.record_id,
      e.high_confidence_contacts,
      e.medium_confidence_contacts,
      e.interface_plddt,
      e.interface_alignment_score,
      e.alignment_score_class,
      e.confidence_tier,
      e.scheme_version,
      e.provenance_path,
      e.updated_at,
    ],
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A prediction store backed by a single SQLite file.
///
/// Cloning shares the underlying connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub(crate) async fn all_records(&self) -> Result<Vec<PredictionRecord>> {
    let raws = self.conn.call(|conn| Ok(select_all(conn)?)).await?;
    decode_records(raws)
  }

  /// Remove every duplicate group in `plan`, one transaction per group. A
  /// failing group is logged and reported; the rest still run.
  pub(crate) async fn apply_cleanup(&self, plan: &CleanupPlan) -> CleanupReport {
    let mut report = CleanupReport::new(plan);
    for group in &plan.duplicates {
      match self.remove_group(group).await {
        Ok(removed) => report.record_removed(removed),
        Err(e) => {
          tracing::warn!(key = %group.key, keep = %group.keep, error = %e, "duplicate group cleanup failed");
          report.record_failure(group, e);
        }
      }
    }
    report
  }

  /// Delete one duplicate group's losers in a single transaction. Fails with
  /// a conflict if the survivor disappeared since the plan was made.
  async fn remove_group(&self, group: &DuplicateGroup) -> Result<usize> {
    let keep = encode_uuid(group.keep);
    let remove: Vec<String> = group.remove.iter().copied().map(encode_uuid).collect();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let keeper_present = tx
          .query_row(
            "SELECT 1 FROM predictions WHERE record_id = ?1",
            rusqlite::params![keep],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !keeper_present {
          return Ok(None);
        }

        let mut removed = 0;
        {
          let mut stmt = tx.prepare("DELETE FROM predictions WHERE record_id = ?1")?;
          for id in &remove {
            removed += stmt.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(Some(removed))
      })
      .await
      .map_err(|e| Error::from_db(e, &group.key))?;

    removed.ok_or_else(|| {
      Error::Core(ppidb_core::Error::TransactionConflict(group.key.to_string()))
    })
  }
}

// ─── PredictionStore impl ────────────────────────────────────────────────────

impl PredictionStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn ingest(&self, input: NewPrediction) -> Result<IngestOutcome> {
    // A subject that does not survive its stored text form would read back
    // under a different identity key, or not at all.
    input.validate()?;
    if let Some(reason) = screen(&input) {
      tracing::debug!(subject = %input.subject, %reason, "prediction dropped at ingestion");
      return Ok(IngestOutcome::Dropped(reason));
    }

    let key = input.identity_key();
    let bait = input.subject.bait.to_string();
    let prey = input.subject.prey.clone();

    let outcome = self
      .conn
      .call(move |conn| -> tokio_rusqlite::Result<Result<IngestOutcome>> {
        // IMMEDIATE takes the write lock before the read, so no other writer
        // can insert the same identity key between our read and our write.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = match decode_records(select_subject(&tx, &bait, &prey)?) {
          Ok(records) => records,
          Err(e) => return Ok(Err(e)),
        };
        let reconciliation = match reconcile(input, &existing, Utc::now()) {
          Ok(r) => r,
          Err(e) => return Ok(Err(e.into())),
        };

        let outcome = match reconciliation.action {
          Action::Insert => {
            insert_row(&tx, &reconciliation.record)?;
            IngestOutcome::Inserted(reconciliation.record)
          }
          Action::Update { target } => {
            if update_row(&tx, &reconciliation.record)? == 0 {
              return Ok(Err(Error::Core(ppidb_core::Error::TransactionConflict(
                target.to_string(),
              ))));
            }
            IngestOutcome::Updated(reconciliation.record)
          }
        };

        tx.commit()?;
        Ok(Ok(outcome))
      })
      .await
      .map_err(|e| Error::from_db(e, &key))??;

    match &outcome {
      IngestOutcome::Inserted(r) => {
        tracing::debug!(record_id = %r.record_id, %key, tier = %r.confidence_tier, "prediction inserted");
      }
      IngestOutcome::Updated(r) => {
        tracing::debug!(record_id = %r.record_id, %key, tier = %r.confidence_tier, "prediction merged");
      }
      IngestOutcome::Dropped(_) => {}
    }

    Ok(outcome)
  }

  async fn cleanup_duplicates(&self) -> Result<CleanupReport> {
    let records = self.all_records().await?;
    let report = self.apply_cleanup(&cleanup::plan(&records)).await;

    tracing::info!(
      groups = report.groups_processed,
      duplicate_groups = report.duplicate_groups,
      removed = report.duplicates_removed,
      failed = report.failures.len(),
      "duplicate cleanup finished"
    );
    Ok(report)
  }

  async fn recompute_tiers(&self) -> Result<usize> {
    let changed = self
      .conn
      .call(|conn| -> tokio_rusqlite::Result<Result<usize>> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let records = match decode_records(select_all(&tx)?) {
          Ok(records) => records,
          Err(e) => return Ok(Err(e)),
        };

        let mut changed = 0;
        for mut record in records {
          if record.refresh_tiers() {
            record.updated_at = Utc::now();
            update_row(&tx, &record)?;
            changed += 1;
          }
        }
        tx.commit()?;
        Ok(Ok(changed))
      })
      .await
      .map_err(|e| Error::from_db(e, "tier recompute"))??;

    tracing::info!(changed, "tier recompute finished");
    Ok(changed)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(&self, record_id: Uuid) -> Result<Option<PredictionRecord>> {
    let id_str = encode_uuid(record_id);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RECORD_COLUMNS} FROM predictions WHERE record_id = ?1"),
              rusqlite::params![id_str],
              RawRecord::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn for_subject(&self, subject: &SubjectKey) -> Result<Vec<PredictionRecord>> {
    let bait = subject.bait.to_string();
    let prey = subject.prey.clone();

    let raws = self
      .conn
      .call(move |conn| Ok(select_subject(conn, &bait, &prey)?))
      .await?;

    decode_records(raws)
  }

  async fn query(&self, query: &PredictionQuery) -> Result<Vec<PredictionRecord>> {
    let alignment_view = query.scheme == Scheme::InterfaceAlignment;
    let tier_str = query.tier.map(|t| t.to_string());
    let protein = query.protein.clone();
    let limit_val = query.limit.unwrap_or(100) as i64;
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically.
        let mut conds: Vec<&'static str> = vec![];
        if alignment_view {
          conds.push("interface_alignment_score IS NOT NULL");
        }
        if tier_str.is_some() {
          conds.push(if alignment_view {
            "alignment_score_class = ?1"
          } else {
            "confidence_tier = ?1"
          });
        }
        if protein.is_some() {
          conds.push("(prey = ?2 OR instr('+' || bait || '+', '+' || ?2 || '+') > 0)");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };
        let order = if alignment_view {
          "interface_alignment_score DESC"
        } else {
          "pairwise_alignment_confidence DESC"
        };

        let sql = format!(
          "SELECT {RECORD_COLUMNS}
           FROM predictions
           {where_clause}
           ORDER BY {order}, record_id
           LIMIT ?3 OFFSET ?4"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![tier_str.as_deref(), protein.as_deref(), limit_val, offset_val],
            RawRecord::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    decode_records(raws)
  }
}
