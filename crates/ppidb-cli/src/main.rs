//! `ppidb`: maintenance tool for the prediction store.
//!
//! # Usage
//!
//! ```
//! ppidb cleanup
//! ppidb cleanup --snapshot records.json --output cleaned.json
//! ppidb recompute
//! ppidb list --scheme interface_alignment --tier high --protein P12345
//! ```
//!
//! Settings come from `ppidb.toml` (or `--config`) layered under `PPIDB_*`
//! environment variables. Reports and records are written to stdout as JSON.

mod settings;

use std::{
  collections::HashSet,
  convert::Infallible,
  fs,
  io::{self, Write as _},
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use ppidb_core::{
  cleanup::{self, CleanupReport},
  record::{PredictionRecord, Scheme, Tier},
  store::{PredictionQuery, PredictionStore},
};
use ppidb_store_sqlite::SqliteStore;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ppidb", version, about = "Interaction-confidence store maintenance")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "ppidb.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Remove duplicate predictions, keeping one survivor per identity key.
  Cleanup {
    /// Clean a JSON array of records instead of the configured store.
    #[arg(long, value_name = "FILE")]
    snapshot: Option<PathBuf>,

    /// Where to write the surviving records in snapshot mode.
    #[arg(long, value_name = "FILE", requires = "snapshot")]
    output: Option<PathBuf>,
  },

  /// Recompute every stored tier from its metrics.
  Recompute,

  /// Print predictions as JSON lines.
  List {
    /// Which scheme's view to read.
    #[arg(long, default_value_t = Scheme::InterfaceQuality)]
    scheme: Scheme,

    /// Only show this tier of the chosen scheme.
    #[arg(long)]
    tier: Option<Tier>,

    /// Only show predictions involving this protein.
    #[arg(long)]
    protein: Option<String>,

    #[arg(long)]
    limit: Option<usize>,

    #[arg(long)]
    offset: Option<usize>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  match cli.command {
    Command::Cleanup { snapshot: Some(input), output } => {
      let report = cleanup_snapshot(&input, output.as_deref())?;
      print_json(&report)?;
    }
    Command::Cleanup { snapshot: None, .. } => {
      let store = open_store(&settings).await?;
      let report = store
        .cleanup_duplicates()
        .await
        .context("duplicate cleanup failed")?;
      print_json(&report)?;
    }
    Command::Recompute => {
      let store = open_store(&settings).await?;
      let changed = store
        .recompute_tiers()
        .await
        .context("tier recompute failed")?;
      print_json(&serde_json::json!({ "changed": changed }))?;
    }
    Command::List { scheme, tier, protein, limit, offset } => {
      let store = open_store(&settings).await?;
      let query = PredictionQuery {
        scheme,
        tier,
        protein,
        limit: Some(limit.unwrap_or(settings.list_limit)),
        offset,
      };
      let records = store.query(&query).await.context("query failed")?;

      let mut out = io::stdout().lock();
      for record in &records {
        serde_json::to_writer(&mut out, record)?;
        writeln!(out)?;
      }
    }
  }

  Ok(())
}

async fn open_store(settings: &Settings) -> anyhow::Result<SqliteStore> {
  let path = &settings.store_path;
  SqliteStore::open(path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
  let mut out = io::stdout().lock();
  serde_json::to_writer_pretty(&mut out, value)?;
  writeln!(out)?;
  Ok(())
}

// ─── Snapshot cleanup ─────────────────────────────────────────────────────────

/// Run cleanup over a JSON array of records and optionally write the
/// survivors back out, in their original order.
fn cleanup_snapshot(input: &Path, output: Option<&Path>) -> anyhow::Result<CleanupReport> {
  let raw = fs::read_to_string(input)
    .with_context(|| format!("reading snapshot {}", input.display()))?;
  let records: Vec<PredictionRecord> =
    serde_json::from_str(&raw).context("parsing snapshot records")?;

  let (report, survivors) = clean_records(records);
  tracing::info!(
    kept = survivors.len(),
    removed = report.duplicates_removed,
    "snapshot cleanup finished"
  );

  if let Some(output) = output {
    let json = serde_json::to_string_pretty(&survivors)?;
    fs::write(output, json).with_context(|| format!("writing {}", output.display()))?;
  }
  Ok(report)
}

fn clean_records(records: Vec<PredictionRecord>) -> (CleanupReport, Vec<PredictionRecord>) {
  let mut removed: HashSet<Uuid> = HashSet::new();
  let report = cleanup::bulk_cleanup(&records, |group| {
    removed.extend(group.remove.iter().copied());
    Ok::<_, Infallible>(group.remove.len())
  });

  let survivors = records
    .into_iter()
    .filter(|r| !removed.contains(&r.record_id))
    .collect();
  (report, survivors)
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone, Utc};
  use ppidb_core::{record::NewPrediction, subject::SubjectKey};

  use super::*;

  fn record(prey: &str, score: Option<f64>, minutes: i64) -> PredictionRecord {
    let scheme = if score.is_some() { Scheme::InterfaceAlignment } else { Scheme::InterfaceQuality };
    let mut p = NewPrediction::new(SubjectKey::pair("BAIT", prey), 0.62, scheme, format!("{minutes}.json"));
    p.high_confidence_contacts = Some(12);
    p.interface_alignment_score = score;
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::minutes(minutes);
    PredictionRecord::from_new(p, Uuid::new_v4(), at)
  }

  #[test]
  fn snapshot_cleanup_keeps_one_per_key_in_order() {
    let scored = record("A", Some(0.66), 0);
    let records = vec![
      record("A", None, 5),
      scored.clone(),
      record("B", None, 1),
      record("A", None, 9),
    ];

    let (report, survivors) = clean_records(records);
    assert_eq!(report.duplicates_removed, 2);
    assert_eq!(survivors.len(), 2);
    assert_eq!(survivors[0].record_id, scored.record_id);
    assert_eq!(survivors[1].subject.prey, "B");
  }

  #[test]
  fn list_parses_scheme_and_tier_names() {
    let cli = Cli::try_parse_from([
      "ppidb",
      "list",
      "--scheme",
      "interface_alignment",
      "--tier",
      "very_low",
    ])
    .unwrap();
    let Command::List { scheme, tier, .. } = cli.command else {
      panic!("expected list");
    };
    assert_eq!(scheme, Scheme::InterfaceAlignment);
    assert_eq!(tier, Some(Tier::VeryLow));
  }

  #[test]
  fn output_requires_snapshot() {
    assert!(Cli::try_parse_from(["ppidb", "cleanup", "--output", "x.json"]).is_err());
  }
}
