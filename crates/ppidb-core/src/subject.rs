//! Subject keys: the ordered (bait, prey) pairing a prediction describes.
//!
//! Order is significant: a pairing and its reverse are different subjects.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Joins the components of a complex bait in its textual form.
pub const COMPLEX_SEPARATOR: char = '+';

/// The bait side of a prediction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Bait {
  Protein(String),
  /// A fixed-order group of two or more proteins. `A+B` and `B+A` are
  /// different baits.
  Complex(Vec<String>),
}

impl Bait {
  /// Build a bait from its components. One component yields
  /// [`Bait::Protein`], more yield [`Bait::Complex`].
  pub fn from_components<I, S>(parts: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut components = Vec::new();
    for part in parts {
      let part = part.as_ref().trim();
      if part.is_empty() {
        return Err(Error::malformed("bait", "empty component"));
      }
      if part.contains(COMPLEX_SEPARATOR) {
        return Err(Error::malformed(
          "bait",
          format!("component {part:?} contains {COMPLEX_SEPARATOR:?}"),
        ));
      }
      components.push(part.to_owned());
    }

    match components.len() {
      0 => Err(Error::malformed("bait", "missing")),
      1 => Ok(Self::Protein(components.remove(0))),
      _ => Ok(Self::Complex(components)),
    }
  }

  /// Parse the `+`-joined form produced by [`fmt::Display`].
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_components(s.split(COMPLEX_SEPARATOR))
  }

  pub fn components(&self) -> &[String] {
    match self {
      Self::Protein(id) => std::slice::from_ref(id),
      Self::Complex(ids) => ids,
    }
  }

  pub fn is_complex(&self) -> bool { matches!(self, Self::Complex(_)) }
}

impl fmt::Display for Bait {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, id) in self.components().iter().enumerate() {
      if i > 0 {
        write!(f, "{COMPLEX_SEPARATOR}")?;
      }
      f.write_str(id)?;
    }
    Ok(())
  }
}

/// The ordered (bait, prey) pairing of a prediction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectKey {
  pub bait: Bait,
  pub prey: String,
}

impl SubjectKey {
  pub fn new(bait: Bait, prey: impl Into<String>) -> Self {
    Self { bait, prey: prey.into() }
  }

  /// Shorthand for a single-protein bait.
  pub fn pair(bait: impl Into<String>, prey: impl Into<String>) -> Self {
    Self::new(Bait::Protein(bait.into()), prey)
  }

  /// Check that the key survives a round trip through its stored text form:
  /// the bait must be what [`Bait::from_components`] would build from its
  /// own components, and the prey must be a non-empty trimmed id.
  pub fn validate(&self) -> Result<()> {
    if Bait::from_components(self.bait.components())? != self.bait {
      return Err(Error::malformed(
        "bait",
        format!("{:?} does not match its canonical form", self.bait),
      ));
    }
    if self.prey.trim().is_empty() {
      return Err(Error::malformed("prey", "missing"));
    }
    if self.prey.trim() != self.prey {
      return Err(Error::malformed("prey", format!("{:?} has surrounding whitespace", self.prey)));
    }
    Ok(())
  }

  /// True if `id` is the prey or any bait component.
  pub fn involves(&self, id: &str) -> bool {
    self.prey == id || self.bait.components().iter().any(|c| c == id)
  }
}

impl fmt::Display for SubjectKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.bait, self.prey)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn single_component_is_protein() {
    let bait = Bait::from_components(["P12345"]).unwrap();
    assert_eq!(bait, Bait::Protein("P12345".into()));
    assert!(!bait.is_complex());
  }

  #[test]
  fn complex_keeps_order() {
    let ab = Bait::parse("A+B").unwrap();
    let ba = Bait::parse("B+A").unwrap();
    assert!(ab.is_complex());
    assert_ne!(ab, ba);
    assert_eq!(ab.to_string(), "A+B");
  }

  #[test]
  fn parse_trims_components() {
    let bait = Bait::parse(" A + B ").unwrap();
    assert_eq!(bait.components(), &["A".to_string(), "B".to_string()]);
  }

  #[test]
  fn empty_component_rejected() {
    assert!(matches!(
      Bait::parse("A++B"),
      Err(Error::MalformedRecord { field: "bait", .. })
    ));
    assert!(Bait::parse("").is_err());
    assert!(Bait::from_components(Vec::<String>::new()).is_err());
  }

  #[test]
  fn separator_inside_component_rejected() {
    assert!(Bait::from_components(["A+B", "C"]).is_err());
  }

  #[test]
  fn validate_rejects_non_canonical_keys() {
    assert!(SubjectKey::pair("X", "Y").validate().is_ok());
    assert!(SubjectKey::new(Bait::parse("A+B").unwrap(), "C").validate().is_ok());

    // Would be stored as `A+B` and read back as a complex.
    assert!(SubjectKey::pair("A+B", "C").validate().is_err());
    assert!(SubjectKey::new(Bait::Complex(vec!["A".into()]), "C").validate().is_err());
    assert!(SubjectKey::new(Bait::Complex(vec!["A".into(), "".into()]), "C").validate().is_err());
    assert!(SubjectKey::pair(" A", "C").validate().is_err());
    assert!(SubjectKey::pair("", "C").validate().is_err());
    assert!(matches!(
      SubjectKey::pair("A", "").validate(),
      Err(Error::MalformedRecord { field: "prey", .. })
    ));
    assert!(SubjectKey::pair("A", " C ").validate().is_err());
  }

  #[test]
  fn reverse_pair_is_a_different_subject() {
    assert_ne!(SubjectKey::pair("X", "Y"), SubjectKey::pair("Y", "X"));
  }

  #[test]
  fn involves_matches_bait_components_and_prey() {
    let key = SubjectKey::new(Bait::parse("A+B").unwrap(), "C");
    assert!(key.involves("A"));
    assert!(key.involves("B"));
    assert!(key.involves("C"));
    assert!(!key.involves("A+B"));
    assert_eq!(key.to_string(), "A+B/C");
  }
}
