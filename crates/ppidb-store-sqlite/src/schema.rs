//! SQL schema for the ppidb SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per underlying interaction. Rows are rewritten in place when a
-- re-analysis is reconciled into them and deleted only by duplicate cleanup.
CREATE TABLE IF NOT EXISTS predictions (
    record_id                     TEXT PRIMARY KEY,
    bait                          TEXT NOT NULL,   -- '+'-joined for complexes
    prey                          TEXT NOT NULL,
    pairwise_alignment_confidence REAL NOT NULL,   -- ipTM
    high_confidence_contacts      INTEGER,
    medium_confidence_contacts    INTEGER,
    interface_plddt               REAL,
    interface_alignment_score     REAL,            -- ipSAE
    alignment_score_class         TEXT,            -- tier; NULL iff score is NULL
    confidence_tier               TEXT NOT NULL,   -- interface-quality tier
    scheme_version                TEXT NOT NULL,
    provenance_path               TEXT NOT NULL,
    ingested_at                   TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at                    TEXT NOT NULL,
    CHECK ((interface_alignment_score IS NULL) = (alignment_score_class IS NULL))
);

CREATE INDEX IF NOT EXISTS predictions_subject_idx ON predictions(bait, prey);
CREATE INDEX IF NOT EXISTS predictions_prey_idx    ON predictions(prey);
CREATE INDEX IF NOT EXISTS predictions_tier_idx    ON predictions(confidence_tier);
CREATE INDEX IF NOT EXISTS predictions_score_idx   ON predictions(interface_alignment_score);

PRAGMA user_version = 1;
";
