// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JSON-lines history store
//!
//! A directory holding:
//!
//! - `schema_versions.json`: the migration ledger, a JSON array
//! - `history.jsonl`: one JSON object per poll cycle

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::debug;

use super::{AppliedMigration, HistoryRecord, HistoryStore, Migration, StoreError};

pub const LEDGER_FILE: &str = "schema_versions.json";
pub const HISTORY_FILE: &str = "history.jsonl";

#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    dir: PathBuf,
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl JsonLinesStore {
    /// Open the store at `dir`, creating the directory when needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            debug!("Creating history directory {:?}", dir);
            fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        }
        Ok(Self { dir })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    /// Read every stored record back.
    pub fn read_records(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }

    fn write_ledger(&self, ledger: &[AppliedMigration]) -> Result<(), StoreError> {
        let path = self.ledger_path();
        let json = serde_json::to_string_pretty(ledger)?;
        // Replace the ledger atomically.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))
    }
}

impl HistoryStore for JsonLinesStore {
    fn applied(&self) -> Result<Vec<AppliedMigration>, StoreError> {
        let path = self.ledger_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
        let ledger: Vec<AppliedMigration> = serde_json::from_str(&contents)?;
        if ledger.windows(2).any(|w| w[0].version >= w[1].version) {
            return Err(StoreError::Corrupt(format!(
                "{} is not strictly ascending",
                path.display()
            )));
        }
        Ok(ledger)
    }

    fn record_migration(&mut self, migration: &Migration) -> Result<(), StoreError> {
        let mut ledger = self.applied()?;
        if ledger.iter().any(|m| m.version >= migration.version) {
            return Err(StoreError::Corrupt(format!(
                "migration {} is already recorded or out of order",
                migration.version
            )));
        }
        ledger.push(AppliedMigration {
            version: migration.version,
            description: migration.description.to_string(),
            applied_at: Local::now(),
        });
        self.write_ledger(&ledger)
    }

    fn append(&mut self, record: &HistoryRecord) -> Result<(), StoreError> {
        let path = self.history_path();
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| io_error(&path, e))?;
        debug!("Appended history record to {:?}", path);
        Ok(())
    }
}
