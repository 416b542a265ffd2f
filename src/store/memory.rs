// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory history store

use chrono::Local;

use super::{AppliedMigration, HistoryRecord, HistoryStore, Migration, StoreError};

/// History store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: Vec<AppliedMigration>,
    records: Vec<HistoryRecord>,
    reject_appends: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose ledger already holds every migration up to `version`.
    pub fn at_version(version: u32) -> Result<Self, StoreError> {
        let mut store = Self::new();
        store.migrate_to(version)?;
        Ok(store)
    }

    /// Make every following append fail.
    pub fn reject_appends(&mut self, reject: bool) {
        self.reject_appends = reject;
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }
}

impl HistoryStore for MemoryStore {
    fn applied(&self) -> Result<Vec<AppliedMigration>, StoreError> {
        Ok(self.ledger.clone())
    }

    fn record_migration(&mut self, migration: &Migration) -> Result<(), StoreError> {
        if self.ledger.iter().any(|m| m.version == migration.version) {
            return Err(StoreError::Corrupt(format!(
                "migration {} recorded twice",
                migration.version
            )));
        }
        self.ledger.push(AppliedMigration {
            version: migration.version,
            description: migration.description.to_string(),
            applied_at: Local::now(),
        });
        Ok(())
    }

    fn append(&mut self, record: &HistoryRecord) -> Result<(), StoreError> {
        if self.reject_appends {
            return Err(StoreError::Rejected("appends disabled".to_string()));
        }
        self.records.push(record.clone());
        Ok(())
    }
}
