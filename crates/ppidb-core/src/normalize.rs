//! Numeric normalisation shared by classification, identity keys, and
//! ingestion validation.

use crate::{Error, Result};

/// Missing contact counts compare and classify as zero.
pub fn contacts(count: Option<u32>) -> u32 { count.unwrap_or(0) }

/// Missing scores classify as zero.
pub fn score(value: Option<f64>) -> f64 { value.unwrap_or(0.0) }

/// Bit pattern used to compare confidences exactly. `-0.0` folds into `0.0`
/// so both land on the same identity key.
pub fn exact_bits(value: f64) -> u64 {
  if value == 0.0 { 0.0_f64.to_bits() } else { value.to_bits() }
}

/// Reject non-finite values and values outside `[min, max]`.
pub fn bounded(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64> {
  if !value.is_finite() {
    return Err(Error::malformed(field, format!("{value} is not finite")));
  }
  if value < min || value > max {
    return Err(Error::malformed(
      field,
      format!("{value} is outside [{min}, {max}]"),
    ));
  }
  Ok(value)
}

/// Interpret a parsed number as a non-negative whole count.
pub fn count(field: &'static str, value: f64) -> Result<u32> {
  let value = bounded(field, value, 0.0, f64::from(u32::MAX))?;
  if value.fract() != 0.0 {
    return Err(Error::malformed(field, format!("{value} is not a whole count")));
  }
  Ok(value as u32)
}
