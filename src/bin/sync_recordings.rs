//! bbb-sync: run one recording reconciliation pass from a descriptor file.
//!
//! Usage: `bbb-sync --server <id> --input <descriptors.json> [--full] [--db <path>] [--config <path>]`
//!
//! The input is the `getRecordings` payload as JSON: either a list of
//! recording objects or a single one. The sync report is printed as JSON on
//! stdout, followed by one line per queued meeting statistics task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use serde_json::Value;

use bbb_recordings::config::{load_config, load_config_at};
use bbb_recordings::db::RecordingsDb;
use bbb_recordings::recordings::{Descriptor, InMemoryStatsQueue, RecordingSync, SyncMode};

/// Reconcile a server's recordings into the local store
#[derive(Parser, Debug)]
#[clap(name = "bbb-sync")]
#[clap(about = "Run one recording sync pass from a getRecordings JSON payload")]
struct Args {
    /// Id of the server the recordings came from
    #[clap(long = "server", value_name = "ID")]
    server_id: i64,

    /// JSON file with the recording descriptors
    #[clap(long, value_name = "FILE")]
    input: PathBuf,

    /// The input is the server's complete recording list
    #[clap(long)]
    full: bool,

    /// Database path (defaults to the config's, then ~/.bbb-recordings/recordings.db)
    #[clap(long = "db", value_name = "FILE", env = "BBB_RECORDINGS_DB")]
    db_path: Option<PathBuf>,

    /// Config file (defaults to ~/.bbb-recordings/config.json)
    #[clap(long = "config", value_name = "FILE")]
    config_path: Option<PathBuf>,
}

impl Args {
    fn mode(&self) -> SyncMode {
        if self.full {
            SyncMode::Full
        } else {
            SyncMode::Partial
        }
    }
}

fn read_descriptors(path: &Path) -> anyhow::Result<Vec<Descriptor>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(anyhow!("recording entries must be objects, got {other}")),
            })
            .collect(),
        Value::Object(map) => Ok(vec![map]),
        other => bail!("expected a list of recordings, got {other}"),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let config = match &args.config_path {
        Some(path) => load_config_at(path),
        None => load_config(),
    }
    .context("failed to load sync config")?;

    let db_path = args
        .db_path
        .clone()
        .or_else(|| config.database_path.as_ref().map(PathBuf::from));
    let db = match db_path {
        Some(path) => RecordingsDb::open_at(path),
        None => RecordingsDb::open(),
    }
    .context("failed to open recordings database")?;

    let descriptors = read_descriptors(&args.input)?;
    log::info!(
        "bbb-sync: {} descriptors for server {} ({:?})",
        descriptors.len(),
        args.server_id,
        args.mode()
    );

    let queue = Arc::new(InMemoryStatsQueue::new());
    let sync = RecordingSync::new(config, queue.clone());
    let report = sync.sync(&db, args.server_id, &descriptors, args.mode())?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    for task in queue.drain() {
        println!("{}", serde_json::to_string(&task)?);
    }
    Ok(())
}
