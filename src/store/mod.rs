// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Persisted history
//!
//! One record per poll cycle. The store keeps a ledger of applied schema
//! migrations; a record only carries the fields whose migration has been
//! applied, so an older store never receives columns it does not know.
//!
//! | Version | Adds |
//! |---------|------|
//! | 1 | timestamp, hour, status word, raw and calibrated sensors, controller temperatures |
//! | 2 | actuator physical states and discrepancy flags |
//! | 3 | override modes |
//! | 4 | external temperature from the side channel |
//! | 5 | digital-input word |
//! | 6 | reason bytes and decoded reasons |
//! | 7 | runtime hours and start counts |
//! | 8 | system diagnostics and sensor alarm mask |
//! | 9 | multiplexer sensor group |

pub mod file;
pub mod memory;
pub mod record;

use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::JsonLinesStore;
pub use memory::MemoryStore;
pub use record::HistoryRecord;

/// Errors raised by a history store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt store: {0}")]
    Corrupt(String),

    #[error("store rejected the write: {0}")]
    Rejected(String),
}

/// One additive schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
}

/// Every migration, in ascending version order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "base sensor snapshot",
    },
    Migration {
        version: 2,
        description: "actuator states and discrepancy flags",
    },
    Migration {
        version: 3,
        description: "override modes",
    },
    Migration {
        version: 4,
        description: "external temperature",
    },
    Migration {
        version: 5,
        description: "digital input word",
    },
    Migration {
        version: 6,
        description: "reason bytes",
    },
    Migration {
        version: 7,
        description: "runtime hours and start counts",
    },
    Migration {
        version: 8,
        description: "system diagnostics and alarms",
    },
    Migration {
        version: 9,
        description: "sensor group",
    },
];

/// Highest schema version known to this build.
pub const LATEST_VERSION: u32 = 9;

/// Ledger entry of an applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMigration {
    pub version: u32,
    pub description: String,
    pub applied_at: DateTime<Local>,
}

/// Append-only history with a migration ledger.
pub trait HistoryStore {
    /// Ledger of applied migrations.
    fn applied(&self) -> Result<Vec<AppliedMigration>, StoreError>;

    /// Record one migration in the ledger.
    fn record_migration(&mut self, migration: &Migration) -> Result<(), StoreError>;

    /// Append one record.
    fn append(&mut self, record: &HistoryRecord) -> Result<(), StoreError>;

    /// Current schema version, `0` for an empty ledger.
    fn schema_version(&self) -> Result<u32, StoreError> {
        Ok(self
            .applied()?
            .iter()
            .map(|m| m.version)
            .max()
            .unwrap_or(0))
    }

    /// Apply every pending migration up to `target`, in ascending order.
    ///
    /// Returns the versions applied by this call.
    fn migrate_to(&mut self, target: u32) -> Result<Vec<u32>, StoreError> {
        let current = self.schema_version()?;
        let mut applied = Vec::new();
        for migration in MIGRATIONS
            .iter()
            .filter(|m| m.version > current && m.version <= target)
        {
            info!(
                "Applying store migration {}: {}",
                migration.version, migration.description
            );
            self.record_migration(migration)?;
            applied.push(migration.version);
        }
        Ok(applied)
    }
}
