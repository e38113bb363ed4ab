//! Prediction records: one evaluated bait/prey pairing from a structural
//! prediction run.
//!
//! [`NewPrediction`] is validated input; [`PredictionRecord`] is what a store
//! holds, with its derived tiers and timestamps.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Result,
  classify::{self, Metrics},
  normalize,
  subject::SubjectKey,
};

// ─── Tiers and schemes ───────────────────────────────────────────────────────

/// An ordered confidence label. The interface-quality scheme never yields
/// [`Tier::VeryLow`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
  VeryLow,
  Low,
  Medium,
  High,
}

/// A classification scheme, doubling as the analysis-version tag carried on
/// each record. Later variants are more authoritative.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Scheme {
  /// ipTM, contact counts, and interface pLDDT ("scheme B").
  #[default]
  #[serde(alias = "scheme_b")]
  InterfaceQuality,
  /// ipSAE interface-alignment score ("scheme A").
  #[serde(alias = "scheme_a")]
  InterfaceAlignment,
}

impl Scheme {
  /// Mode isolation: the interface-alignment view only shows records that
  /// carry an interface-alignment score; the interface-quality view shows
  /// everything.
  pub fn admits(self, record: &PredictionRecord) -> bool {
    match self {
      Self::InterfaceQuality => true,
      Self::InterfaceAlignment => record.has_alignment_score(),
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// The fields that decide whether two records describe the same underlying
/// interaction. Interface pLDDT and provenance are excluded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdentityKey {
  pub subject:        SubjectKey,
  alignment_bits:     u64,
  pub contacts_tight: u32,
}

impl IdentityKey {
  pub fn new(subject: SubjectKey, alignment: f64, contacts_tight: Option<u32>) -> Self {
    Self {
      subject,
      alignment_bits: normalize::exact_bits(alignment),
      contacts_tight: normalize::contacts(contacts_tight),
    }
  }

  pub fn alignment(&self) -> f64 { f64::from_bits(self.alignment_bits) }
}

impl fmt::Display for IdentityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} (iptm {}, contacts {})",
      self.subject,
      self.alignment(),
      self.contacts_tight
    )
  }
}

// ─── NewPrediction ───────────────────────────────────────────────────────────

/// A validated prediction that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
  pub subject:                       SubjectKey,
  /// Global pairwise alignment confidence (ipTM), 0..1.
  pub pairwise_alignment_confidence: f64,
  /// Contacts under the tight positional-error threshold.
  pub high_confidence_contacts:      Option<u32>,
  /// Contacts under the loose positional-error threshold.
  pub medium_confidence_contacts:    Option<u32>,
  /// Mean interface pLDDT, 0..100.
  pub interface_plddt:               Option<f64>,
  /// ipSAE score, 0..1.
  pub interface_alignment_score:     Option<f64>,
  pub scheme_version:                Scheme,
  /// Originating analysis run. Never part of the identity key.
  pub provenance_path:               String,
}

impl NewPrediction {
  /// Convenience constructor with all optional metrics unset.
  pub fn new(
    subject: SubjectKey,
    pairwise_alignment_confidence: f64,
    scheme_version: Scheme,
    provenance_path: impl Into<String>,
  ) -> Self {
    Self {
      subject,
      pairwise_alignment_confidence,
      high_confidence_contacts: None,
      medium_confidence_contacts: None,
      interface_plddt: None,
      interface_alignment_score: None,
      scheme_version,
      provenance_path: provenance_path.into(),
    }
  }

  pub fn identity_key(&self) -> IdentityKey {
    IdentityKey::new(
      self.subject.clone(),
      self.pairwise_alignment_confidence,
      self.high_confidence_contacts,
    )
  }

  pub fn metrics(&self) -> Metrics {
    Metrics {
      pairwise_alignment:        Some(self.pairwise_alignment_confidence),
      contacts_tight:            self.high_confidence_contacts,
      interface_plddt:           self.interface_plddt,
      interface_alignment_score: self.interface_alignment_score,
    }
  }

  pub fn has_alignment_score(&self) -> bool {
    self.interface_alignment_score.is_some()
  }

  /// Apply the same checks as parsing a
  /// [`RawPrediction`](crate::ingest::RawPrediction), for values built by
  /// hand. Stores call this before anything is classified or written.
  pub fn validate(&self) -> Result<()> {
    self.subject.validate()?;
    normalize::bounded(
      "pairwise_alignment_confidence",
      self.pairwise_alignment_confidence,
      0.0,
      1.0,
    )?;
    if let Some(score) = self.interface_alignment_score {
      normalize::bounded("interface_alignment_score", score, 0.0, 1.0)?;
    }
    if let Some(plddt) = self.interface_plddt {
      normalize::bounded("interface_plddt", plddt, 0.0, 100.0)?;
    }
    Ok(())
  }
}

// ─── PredictionRecord ────────────────────────────────────────────────────────

/// A stored prediction. Tiers are computed when the record is built or its
/// inputs change, never on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
  pub record_id:                     Uuid,
  pub subject:                       SubjectKey,
  pub pairwise_alignment_confidence: f64,
  pub high_confidence_contacts:      Option<u32>,
  pub medium_confidence_contacts:    Option<u32>,
  pub interface_plddt:               Option<f64>,
  pub interface_alignment_score:     Option<f64>,
  /// Interface-alignment tier; present iff the score is.
  pub alignment_score_class:         Option<Tier>,
  /// Interface-quality tier.
  pub confidence_tier:               Tier,
  pub scheme_version:                Scheme,
  pub provenance_path:               String,
  pub ingested_at:                   DateTime<Utc>,
  pub updated_at:                    DateTime<Utc>,
}

impl PredictionRecord {
  /// Build a stored record from validated input, computing both tiers.
  pub fn from_new(input: NewPrediction, record_id: Uuid, at: DateTime<Utc>) -> Self {
    let mut record = Self {
      record_id,
      subject: input.subject,
      pairwise_alignment_confidence: input.pairwise_alignment_confidence,
      high_confidence_contacts: input.high_confidence_contacts,
      medium_confidence_contacts: input.medium_confidence_contacts,
      interface_plddt: input.interface_plddt,
      interface_alignment_score: input.interface_alignment_score,
      alignment_score_class: None,
      confidence_tier: Tier::Low,
      scheme_version: input.scheme_version,
      provenance_path: input.provenance_path,
      ingested_at: at,
      updated_at: at,
    };
    record.refresh_tiers();
    record
  }

  pub fn identity_key(&self) -> IdentityKey {
    IdentityKey::new(
      self.subject.clone(),
      self.pairwise_alignment_confidence,
      self.high_confidence_contacts,
    )
  }

  pub fn metrics(&self) -> Metrics {
    Metrics {
      pairwise_alignment:        Some(self.pairwise_alignment_confidence),
      contacts_tight:            self.high_confidence_contacts,
      interface_plddt:           self.interface_plddt,
      interface_alignment_score: self.interface_alignment_score,
    }
  }

  pub fn has_alignment_score(&self) -> bool {
    self.interface_alignment_score.is_some()
  }

  /// Recompute both tiers from the current inputs. Returns `true` if either
  /// stored tier changed.
  pub fn refresh_tiers(&mut self) -> bool {
    let metrics = self.metrics();
    let tier = classify::classify(Scheme::InterfaceQuality, &metrics);
    let class = self
      .interface_alignment_score
      .map(classify::classify_interface_alignment);

    let changed = tier != self.confidence_tier || class != self.alignment_score_class;
    self.confidence_tier = tier;
    self.alignment_score_class = class;
    changed
  }

  /// Ordering used to pick the most recent of several records.
  pub(crate) fn recency(&self) -> (DateTime<Utc>, &str, Uuid) {
    (self.ingested_at, self.provenance_path.as_str(), self.record_id)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn ts() -> DateTime<Utc> { Utc.timestamp_opt(1_700_000_000, 0).unwrap() }

  fn input() -> NewPrediction {
    let mut p = NewPrediction::new(
      SubjectKey::pair("X", "Y"),
      0.59,
      Scheme::InterfaceQuality,
      "runs/b/x_y.json",
    );
    p.high_confidence_contacts = Some(298);
    p.interface_plddt = Some(86.1);
    p
  }

  #[test]
  fn validate_checks_subject_and_ranges() {
    assert!(input().validate().is_ok());

    let mut p = input();
    p.pairwise_alignment_confidence = 7.5;
    assert!(matches!(
      p.validate(),
      Err(crate::Error::MalformedRecord { field: "pairwise_alignment_confidence", .. })
    ));

    let mut p = input();
    p.interface_plddt = Some(500.0);
    assert!(p.validate().is_err());

    let mut p = input();
    p.interface_alignment_score = Some(f64::NAN);
    assert!(p.validate().is_err());

    let mut p = input();
    p.subject = SubjectKey::pair("A+B", "C");
    assert!(matches!(
      p.validate(),
      Err(crate::Error::MalformedRecord { field: "bait", .. })
    ));
  }

  #[test]
  fn from_new_computes_tiers() {
    let record = PredictionRecord::from_new(input(), Uuid::new_v4(), ts());
    assert_eq!(record.confidence_tier, Tier::High);
    assert_eq!(record.alignment_score_class, None);
    assert_eq!(record.ingested_at, record.updated_at);
  }

  #[test]
  fn refresh_reports_change_only_once() {
    let mut record = PredictionRecord::from_new(input(), Uuid::new_v4(), ts());
    record.interface_alignment_score = Some(0.751);
    assert!(record.refresh_tiers());
    assert_eq!(record.alignment_score_class, Some(Tier::High));
    assert!(!record.refresh_tiers());
  }

  #[test]
  fn null_and_zero_contacts_share_identity() {
    let mut a = input();
    let mut b = input();
    a.high_confidence_contacts = None;
    b.high_confidence_contacts = Some(0);
    assert_eq!(a.identity_key(), b.identity_key());
  }

  #[test]
  fn plddt_and_provenance_are_not_identity() {
    let a = input();
    let mut b = input();
    b.interface_plddt = Some(86.100_000_1);
    b.provenance_path = "elsewhere".into();
    assert_eq!(a.identity_key(), b.identity_key());
  }

  #[test]
  fn tier_order_and_text() {
    assert!(Tier::VeryLow < Tier::Low);
    assert!(Tier::Medium < Tier::High);
    assert_eq!(Tier::VeryLow.to_string(), "very_low");
    assert_eq!("medium".parse::<Tier>().unwrap(), Tier::Medium);
  }

  #[test]
  fn alignment_scheme_is_more_authoritative() {
    assert!(Scheme::InterfaceAlignment > Scheme::InterfaceQuality);
    assert_eq!(Scheme::InterfaceAlignment.as_ref(), "interface_alignment");
  }

  #[test]
  fn scheme_accepts_letter_aliases() {
    let s: Scheme = serde_json::from_str("\"scheme_a\"").unwrap();
    assert_eq!(s, Scheme::InterfaceAlignment);
    let s: Scheme = serde_json::from_str("\"interface_quality\"").unwrap();
    assert_eq!(s, Scheme::InterfaceQuality);
  }

  #[test]
  fn alignment_view_requires_score() {
    let mut record = PredictionRecord::from_new(input(), Uuid::new_v4(), ts());
    assert!(Scheme::InterfaceQuality.admits(&record));
    assert!(!Scheme::InterfaceAlignment.admits(&record));
    record.interface_alignment_score = Some(0.4);
    assert!(Scheme::InterfaceAlignment.admits(&record));
  }
}
