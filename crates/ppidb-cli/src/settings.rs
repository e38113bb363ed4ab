//! Layered configuration for the `ppidb` binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Runtime settings, read from the config file and then `PPIDB_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Row cap for `list` when `--limit` is not given.
  #[serde(default = "default_list_limit")]
  pub list_limit: usize,
}

fn default_store_path() -> PathBuf { PathBuf::from("ppidb.sqlite3") }

fn default_list_limit() -> usize { 100 }

impl Settings {
  /// Load settings from `path` (optional) layered under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("PPIDB"))
      .build()
      .context("failed to read config file")?;

    let mut settings: Self = raw
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
