//! The `PredictionStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `ppidb-store-sqlite`).
//! Maintenance tooling depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  cleanup::CleanupReport,
  ingest::DropReason,
  record::{NewPrediction, PredictionRecord, Scheme, Tier},
  subject::SubjectKey,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`PredictionStore::query`].
#[derive(Debug, Clone, Default)]
pub struct PredictionQuery {
  /// Which scheme's view to read. [`Scheme::InterfaceAlignment`] only returns
  /// records with an interface-alignment score.
  pub scheme:  Scheme,
  /// Restrict to one tier of the chosen scheme.
  pub tier:    Option<Tier>,
  /// Restrict to predictions involving this protein as prey or as any bait
  /// component.
  pub protein: Option<String>,
  pub limit:   Option<usize>,
  pub offset:  Option<usize>,
}

/// What [`PredictionStore::ingest`] did with a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum IngestOutcome {
  Inserted(PredictionRecord),
  /// Merged into an existing record with the same identity key.
  Updated(PredictionRecord),
  /// Screened out before reaching storage.
  Dropped(DropReason),
}

impl IngestOutcome {
  pub fn record(&self) -> Option<&PredictionRecord> {
    match self {
      Self::Inserted(r) | Self::Updated(r) => Some(r),
      Self::Dropped(_) => None,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a prediction store backend.
///
/// Implementations must make each [`ingest`](Self::ingest) atomic: the read of
/// existing records, the reconciliation, and the write happen in one
/// transaction, so two concurrent ingests of the same identity key cannot
/// both insert.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait PredictionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Screen, reconcile, and persist one prediction.
  fn ingest(
    &self,
    input: NewPrediction,
  ) -> impl Future<Output = Result<IngestOutcome, Self::Error>> + Send + '_;

  /// Remove duplicate records, keeping one per identity key. Each duplicate
  /// group is removed in its own transaction; failed groups are reported,
  /// not fatal.
  fn cleanup_duplicates(
    &self,
  ) -> impl Future<Output = Result<CleanupReport, Self::Error>> + Send + '_;

  /// Recompute every stored tier from its inputs and persist the ones that
  /// changed. Returns the number of records updated.
  fn recompute_tiers(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a record by id. Returns `None` if not found.
  fn get(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<Option<PredictionRecord>, Self::Error>> + Send + '_;

  /// All records for one ordered (bait, prey) pairing.
  fn for_subject<'a>(
    &'a self,
    subject: &'a SubjectKey,
  ) -> impl Future<Output = Result<Vec<PredictionRecord>, Self::Error>> + Send + 'a;

  /// Read a scheme view, most confident first.
  fn query<'a>(
    &'a self,
    query: &'a PredictionQuery,
  ) -> impl Future<Output = Result<Vec<PredictionRecord>, Self::Error>> + Send + 'a;
}
