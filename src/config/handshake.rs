// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Data-ready handshake configuration

use serde::{Deserialize, Serialize};

/// Bounded wait for the data-ready bit of the status word.
///
/// The measurement block is read at most `max_attempts` times,
/// `retry_interval_ms` apart, until bit `ready_bit` of the status word is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    pub ready_bit: u8,
    pub max_attempts: u32,
    pub retry_interval_ms: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            ready_bit: 5,
            max_attempts: 10,
            retry_interval_ms: 1200,
        }
    }
}
