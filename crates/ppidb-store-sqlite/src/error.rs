//! Error type for `ppidb-store-sqlite`.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] ppidb_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column held text that does not decode to its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  /// Map a database failure on `key`, turning SQLite lock contention into a
  /// retryable [`ppidb_core::Error::TransactionConflict`].
  pub(crate) fn from_db(err: tokio_rusqlite::Error, key: impl fmt::Display) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _)) = &err
      && matches!(
        failure.code,
        rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
      )
    {
      return Self::Core(ppidb_core::Error::TransactionConflict(key.to_string()));
    }
    Self::Database(err)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
