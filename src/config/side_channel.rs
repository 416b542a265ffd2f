// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! External temperature side channel configuration

use serde::{Deserialize, Serialize};

/// Pub/sub channel delivering one external temperature per poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideChannelConfig {
    pub enabled: bool,
    /// Redis connection URL
    pub url: String,
    pub channel: String,
    /// How long to wait for one message before treating the value as absent
    pub timeout_ms: u64,
}

impl Default for SideChannelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "redis://127.0.0.1:6379".to_string(),
            channel: "Node3/pin4".to_string(),
            timeout_ms: 5000,
        }
    }
}
