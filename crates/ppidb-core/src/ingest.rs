//! Ingestion boundary: loosely shaped pipeline output in, validated
//! [`NewPrediction`]s out.
//!
//! Pipeline JSON is inconsistent: numbers sometimes arrive as strings, bait
//! complexes as either `"A+B"` or `["A", "B"]`, and field names vary between
//! analysis versions. [`RawPrediction`] accepts all of that; the
//! `TryFrom<RawPrediction>` conversion is the only way to a
//! [`NewPrediction`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  classify::classify_interface_alignment,
  normalize,
  record::{NewPrediction, Scheme, Tier},
  subject::{Bait, SubjectKey},
};

// ─── Raw input ───────────────────────────────────────────────────────────────

/// A number as it appears in pipeline output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
  Number(f64),
  Text(String),
}

impl RawNumber {
  /// `Ok(None)` for blank text.
  fn parse(&self, field: &'static str) -> Result<Option<f64>> {
    match self {
      Self::Number(n) => Ok(Some(*n)),
      Self::Text(s) => {
        let s = s.trim();
        if s.is_empty() {
          return Ok(None);
        }
        s.parse::<f64>()
          .map(Some)
          .map_err(|_| Error::malformed(field, format!("cannot parse {s:?} as a number")))
      }
    }
  }
}

/// A bait as it appears in pipeline output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawBait {
  Joined(String),
  Components(Vec<String>),
}

/// One prediction as emitted by an analysis pipeline, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPrediction {
  #[serde(default)]
  pub bait:                          Option<RawBait>,
  #[serde(default)]
  pub prey:                          Option<String>,
  #[serde(default, alias = "iptm")]
  pub pairwise_alignment_confidence: Option<RawNumber>,
  #[serde(default, alias = "contacts_pae_lt_3")]
  pub high_confidence_contacts:      Option<RawNumber>,
  #[serde(default, alias = "contacts_pae_lt_6")]
  pub medium_confidence_contacts:    Option<RawNumber>,
  #[serde(default)]
  pub interface_plddt:               Option<RawNumber>,
  #[serde(default, alias = "ipsae")]
  pub interface_alignment_score:     Option<RawNumber>,
  #[serde(default)]
  pub scheme_version:                Option<Scheme>,
  #[serde(default, alias = "source_path")]
  pub provenance_path:               Option<String>,
}

fn number(
  raw: Option<&RawNumber>,
  field: &'static str,
  min: f64,
  max: f64,
) -> Result<Option<f64>> {
  match raw {
    None => Ok(None),
    Some(raw) => raw
      .parse(field)?
      .map(|v| normalize::bounded(field, v, min, max))
      .transpose(),
  }
}

fn count(raw: Option<&RawNumber>, field: &'static str) -> Result<Option<u32>> {
  match raw {
    None => Ok(None),
    Some(raw) => raw.parse(field)?.map(|v| normalize::count(field, v)).transpose(),
  }
}

impl TryFrom<RawPrediction> for NewPrediction {
  type Error = Error;

  fn try_from(raw: RawPrediction) -> Result<Self> {
    let bait = match raw.bait {
      None => return Err(Error::malformed("bait", "missing")),
      Some(RawBait::Joined(s)) => Bait::parse(&s)?,
      Some(RawBait::Components(parts)) => Bait::from_components(parts)?,
    };
    let prey = raw
      .prey
      .as_deref()
      .map(str::trim)
      .filter(|p| !p.is_empty())
      .ok_or_else(|| Error::malformed("prey", "missing"))?;

    let pairwise_alignment_confidence = number(
      raw.pairwise_alignment_confidence.as_ref(),
      "pairwise_alignment_confidence",
      0.0,
      1.0,
    )?
    .unwrap_or(0.0);
    let interface_alignment_score = number(
      raw.interface_alignment_score.as_ref(),
      "interface_alignment_score",
      0.0,
      1.0,
    )?;
    let interface_plddt =
      number(raw.interface_plddt.as_ref(), "interface_plddt", 0.0, 100.0)?;

    // Without an explicit tag, the presence of an interface-alignment score
    // is what marks a record as coming from the newer analysis.
    let scheme_version = raw.scheme_version.unwrap_or(if interface_alignment_score.is_some() {
      Scheme::InterfaceAlignment
    } else {
      Scheme::InterfaceQuality
    });

    Ok(Self {
      subject: SubjectKey::new(bait, prey),
      pairwise_alignment_confidence,
      high_confidence_contacts: count(
        raw.high_confidence_contacts.as_ref(),
        "high_confidence_contacts",
      )?,
      medium_confidence_contacts: count(
        raw.medium_confidence_contacts.as_ref(),
        "medium_confidence_contacts",
      )?,
      interface_plddt,
      interface_alignment_score,
      scheme_version,
      provenance_path: raw.provenance_path.unwrap_or_default(),
    })
  }
}

// ─── Screening ───────────────────────────────────────────────────────────────

/// Why a valid prediction was kept out of storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DropReason {
  /// The interface-alignment score classifies as [`Tier::VeryLow`].
  VeryLowAlignment { score: f64 },
}

impl fmt::Display for DropReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::VeryLowAlignment { score } => {
        write!(f, "interface-alignment score {score} is very low")
      }
    }
  }
}

/// Decide whether a prediction may be stored. Predictions whose
/// interface-alignment score classifies as very low are never persisted.
pub fn screen(prediction: &NewPrediction) -> Option<DropReason> {
  let score = prediction.interface_alignment_score?;
  (classify_interface_alignment(score) == Tier::VeryLow)
    .then_some(DropReason::VeryLowAlignment { score })
}
