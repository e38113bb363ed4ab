//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! enums their snake_case names. Scores are stored as REAL, which round-trips
//! `f64` exactly, so identity keys survive storage.

use chrono::{DateTime, Utc};
use ppidb_core::{
  record::{PredictionRecord, Scheme, Tier},
  subject::{Bait, SubjectKey},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn decode_tier(s: &str) -> Result<Tier> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown tier: {s:?}")))
}

pub fn decode_scheme(s: &str) -> Result<Scheme> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown scheme: {s:?}")))
}

// ─── Subjects and counts ──────────────────────────────────────────────────────

pub fn decode_bait(s: &str) -> Result<Bait> {
  Bait::parse(s).map_err(|e| Error::Decode(format!("bait {s:?}: {e}")))
}

pub fn decode_count(column: &str, n: Option<i64>) -> Result<Option<u32>> {
  n.map(|n| {
    u32::try_from(n).map_err(|_| Error::Decode(format!("{column}: {n} is not a count")))
  })
  .transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRecord::from_row`], for `SELECT` statements.
pub const RECORD_COLUMNS: &str = "record_id, bait, prey, \
  pairwise_alignment_confidence, high_confidence_contacts, \
  medium_confidence_contacts, interface_plddt, interface_alignment_score, \
  alignment_score_class, confidence_tier, scheme_version, provenance_path, \
  ingested_at, updated_at";

/// Raw values read directly from a `predictions` row.
pub struct RawRecord {
  pub record_id:                     String,
  pub bait:                          String,
  pub prey:                          String,
  pub pairwise_alignment_confidence: f64,
  pub high_confidence_contacts:      Option<i64>,
  pub medium_confidence_contacts:    Option<i64>,
  pub interface_plddt:               Option<f64>,
  pub interface_alignment_score:     Option<f64>,
  pub alignment_score_class:         Option<String>,
  pub confidence_tier:               String,
  pub scheme_version:                String,
  pub provenance_path:               String,
  pub ingested_at:                   String,
  pub updated_at:                    String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:                     row.get(0)?,
      bait:                          row.get(1)?,
      prey:                          row.get(2)?,
      pairwise_alignment_confidence: row.get(3)?,
      high_confidence_contacts:      row.get(4)?,
      medium_confidence_contacts:    row.get(5)?,
      interface_plddt:               row.get(6)?,
      interface_alignment_score:     row.get(7)?,
      alignment_score_class:         row.get(8)?,
      confidence_tier:               row.get(9)?,
      scheme_version:                row.get(10)?,
      provenance_path:               row.get(11)?,
      ingested_at:                   row.get(12)?,
      updated_at:                    row.get(13)?,
    })
  }

  pub fn into_record(self) -> Result<PredictionRecord> {
    Ok(PredictionRecord {
      record_id: decode_uuid(&self.record_id)?,
      subject: SubjectKey::new(decode_bait(&self.bait)?, self.prey),
      pairwise_alignment_confidence: self.pairwise_alignment_confidence,
      high_confidence_contacts: decode_count(
        "high_confidence_contacts",
        self.high_confidence_contacts,
      )?,
      medium_confidence_contacts: decode_count(
        "medium_confidence_contacts",
        self.medium_confidence_contacts,
      )?,
      interface_plddt: self.interface_plddt,
      interface_alignment_score: self.interface_alignment_score,
      alignment_score_class: self
        .alignment_score_class
        .as_deref()
        .map(decode_tier)
        .transpose()?,
      confidence_tier: decode_tier(&self.confidence_tier)?,
      scheme_version: decode_scheme(&self.scheme_version)?,
      provenance_path: self.provenance_path,
      ingested_at: decode_dt(&self.ingested_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub fn decode_records(raws: Vec<RawRecord>) -> Result<Vec<PredictionRecord>> {
  raws.into_iter().map(RawRecord::into_record).collect()
}

/// Owned column values for writing a record, in [`RECORD_COLUMNS`] order.
pub struct EncodedRecord {
  pub record_id:                     String,
  pub bait:                          String,
  pub prey:                          String,
  pub pairwise_alignment_confidence: f64,
  pub high_confidence_contacts:      Option<i64>,
  pub medium_confidence_contacts:    Option<i64>,
  pub interface_plddt:               Option<f64>,
  pub interface_alignment_score:     Option<f64>,
  pub alignment_score_class:         Option<String>,
  pub confidence_tier:               String,
  pub scheme_version:                String,
  pub provenance_path:               String,
  pub ingested_at:                   String,
  pub updated_at:                    String,
}

impl From<&PredictionRecord> for EncodedRecord {
  fn from(r: &PredictionRecord) -> Self {
    Self {
      record_id:                     encode_uuid(r.record_id),
      bait:                          r.subject.bait.to_string(),
      prey:                          r.subject.prey.clone(),
      pairwise_alignment_confidence: r.pairwise_alignment_confidence,
      high_confidence_contacts:      r.high_confidence_contacts.map(i64::from),
      medium_confidence_contacts:    r.medium_confidence_contacts.map(i64::from),
      interface_plddt:               r.interface_plddt,
      interface_alignment_score:     r.interface_alignment_score,
      alignment_score_class:         r.alignment_score_class.map(|t| t.to_string()),
      confidence_tier:               r.confidence_tier.to_string(),
      scheme_version:                r.scheme_version.to_string(),
      provenance_path:               r.provenance_path.clone(),
      ingested_at:                   encode_dt(r.ingested_at),
      updated_at:                    encode_dt(r.updated_at),
    }
  }
}
