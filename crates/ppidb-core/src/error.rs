//! Error types for `ppidb-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// An input record failed validation and was neither classified nor
  /// reconciled.
  #[error("malformed record: {field}: {reason}")]
  MalformedRecord { field: &'static str, reason: String },

  /// More than one stored record claims interface-alignment data for the
  /// same identity key.
  #[error("ambiguous merge for {key}: records {candidates:?} all carry interface-alignment scores")]
  AmbiguousMerge { key: String, candidates: Vec<Uuid> },

  /// Another writer touched the same identity key; retry the whole call.
  #[error("transaction conflict on {0}")]
  TransactionConflict(String),
}

impl Error {
  pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
    Self::MalformedRecord { field, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
