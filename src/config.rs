// src/config.rs
//
// Immutable run parameters plus the session wrapper that carries the
// recorded operation list through its set-once lifecycle.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::constants::{REPLAY_THREAD_MULTIPLIER, SESSION_TIMESTAMP_FORMAT};
use crate::ops::OperationRecord;

/// Validated, immutable run parameters. Invariant (established by
/// `validate::build_config`): `min_size <= max_size <= entropy_size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub cluster_url: String,
    pub volumes: Vec<String>,
    pub threads: usize,
    pub min_size: u64,
    pub max_size: u64,
    pub entropy_size: u64,
    pub entropy_seed: String,
}

/// The recorded-operations list goes through exactly one transition:
/// `Pending` (a record run that has not finished) to `Finalized` (sorted
/// records, ready to persist or replay).
#[derive(Debug, Clone)]
enum Operations {
    Pending,
    Finalized(Vec<OperationRecord>),
}

/// One run of the tool: a config plus, eventually, its recorded
/// operations.
#[derive(Debug, Clone)]
pub struct Session {
    created_at: DateTime<Local>,
    pub config: Config,
    operations: Operations,
}

/// On-disk shape of a session file.
#[derive(Serialize, Deserialize)]
struct SessionFile {
    config: Config,
    #[serde(default)]
    operations: Option<Vec<OperationRecord>>,
}

impl Session {
    /// A fresh session about to record; operations are pending.
    pub fn from_cli(config: Config) -> Self {
        Self {
            created_at: Local::now(),
            config,
            operations: Operations::Pending,
        }
    }

    /// Load a previously saved session for replay.
    ///
    /// The stored thread count is multiplied by
    /// [`REPLAY_THREAD_MULTIPLIER`]: replay needs more workers than
    /// record did to keep deadline dispatch from queueing behind slow
    /// operations.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session file {}", path.display()))?;
        let file: SessionFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("malformed session file {}", path.display()))?;

        let mut config = file.config;
        config.threads *= REPLAY_THREAD_MULTIPLIER;
        Ok(Self {
            created_at: Local::now(),
            config,
            operations: match file.operations {
                Some(records) => Operations::Finalized(records),
                None => Operations::Pending,
            },
        })
    }

    /// The recorded operations, if this session has been finalized.
    pub fn operations(&self) -> Option<&[OperationRecord]> {
        match &self.operations {
            Operations::Pending => None,
            Operations::Finalized(records) => Some(records),
        }
    }

    /// Sort the harvested records by start offset and store them.
    ///
    /// Panics if called twice; a session's operations are set exactly
    /// once.
    pub fn finalize_operations(&mut self, mut records: Vec<OperationRecord>) {
        assert!(
            matches!(self.operations, Operations::Pending),
            "session operations were already finalized"
        );
        records.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.operations = Operations::Finalized(records);
    }

    /// Write the session to `<dir>/sxload-<timestamp>.yaml` and return
    /// the path.
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        let filename = format!(
            "sxload-{}.yaml",
            self.created_at.format(SESSION_TIMESTAMP_FORMAT)
        );
        let path = dir.join(filename);
        let file = SessionFile {
            config: self.config.clone(),
            operations: self.operations().map(<[OperationRecord]>::to_vec),
        };
        let payload = serde_yaml::to_string(&file).context("failed to serialize session")?;
        std::fs::write(&path, payload)
            .with_context(|| format!("failed to write session file {}", path.display()))?;
        Ok(path)
    }
}
