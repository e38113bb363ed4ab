//! Confidence classification under the two scoring schemes.
//!
//! Both classifiers are pure. Missing inputs classify as zero.

use crate::{
  normalize,
  record::{Scheme, Tier},
};

// ─── Interface-quality thresholds ────────────────────────────────────────────

pub const HIGH_ALIGNMENT: f64 = 0.7;
pub const HIGH_CONTACTS: u32 = 40;
pub const HIGH_PLDDT: f64 = 80.0;
pub const HIGH_SUPPORTED_CONTACTS: u32 = 30;
pub const HIGH_SUPPORTED_ALIGNMENT: f64 = 0.5;

/// Records below both of these are kept out of High regardless of the rules
/// above; a strong global alignment with almost no interface is a degenerate
/// overlap.
pub const EXCLUSION_ALIGNMENT: f64 = 0.75;
pub const EXCLUSION_CONTACTS: u32 = 5;

pub const MEDIUM_ALIGNMENT: f64 = 0.6;
pub const MEDIUM_CONTACTS: u32 = 20;
pub const MEDIUM_PLDDT: f64 = 75.0;
pub const MEDIUM_SUPPORTED_CONTACTS: u32 = 15;
pub const MEDIUM_SUPPORTED_ALIGNMENT: f64 = 0.45;

// ─── Interface-alignment thresholds (exclusive lower bounds) ─────────────────

pub const ALIGNMENT_HIGH: f64 = 0.7;
pub const ALIGNMENT_MEDIUM: f64 = 0.5;
pub const ALIGNMENT_LOW: f64 = 0.3;

/// Raw classifier inputs, any of which may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
  pub pairwise_alignment:        Option<f64>,
  pub contacts_tight:            Option<u32>,
  pub interface_plddt:           Option<f64>,
  pub interface_alignment_score: Option<f64>,
}

/// Classify `metrics` under `scheme`.
pub fn classify(scheme: Scheme, metrics: &Metrics) -> Tier {
  match scheme {
    Scheme::InterfaceQuality => classify_interface_quality(
      normalize::score(metrics.pairwise_alignment),
      normalize::contacts(metrics.contacts_tight),
      normalize::score(metrics.interface_plddt),
    ),
    Scheme::InterfaceAlignment => {
      classify_interface_alignment(normalize::score(metrics.interface_alignment_score))
    }
  }
}

/// Interface-quality ("scheme B") tier. Never returns [`Tier::VeryLow`].
pub fn classify_interface_quality(
  alignment: f64,
  contacts_tight: u32,
  interface_plddt: f64,
) -> Tier {
  let meets_high = alignment >= HIGH_ALIGNMENT
    || (contacts_tight >= HIGH_CONTACTS && interface_plddt >= HIGH_PLDDT)
    || (contacts_tight >= HIGH_SUPPORTED_CONTACTS
      && alignment >= HIGH_SUPPORTED_ALIGNMENT
      && interface_plddt >= HIGH_PLDDT);
  let excluded_from_high =
    alignment < EXCLUSION_ALIGNMENT && contacts_tight < EXCLUSION_CONTACTS;

  if meets_high && !excluded_from_high {
    return Tier::High;
  }

  let meets_medium = alignment >= MEDIUM_ALIGNMENT
    || (contacts_tight >= MEDIUM_CONTACTS && interface_plddt >= MEDIUM_PLDDT)
    || (contacts_tight >= MEDIUM_SUPPORTED_CONTACTS
      && alignment >= MEDIUM_SUPPORTED_ALIGNMENT);

  if meets_medium { Tier::Medium } else { Tier::Low }
}

/// Interface-alignment ("scheme A", ipSAE) tier.
pub fn classify_interface_alignment(score: f64) -> Tier {
  if score > ALIGNMENT_HIGH {
    Tier::High
  } else if score > ALIGNMENT_MEDIUM {
    Tier::Medium
  } else if score > ALIGNMENT_LOW {
    Tier::Low
  } else {
    Tier::VeryLow
  }
}
