// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Firmware generation flags
//!
//! Differences between controller firmware generations are expressed here
//! and read by the decoder. There is a single decoder for every generation.

use serde::{Deserialize, Serialize};

/// What the pump bits of the status word carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusWordPolarity {
    /// Raw output bits, still subject to the channel polarity
    Raw,
    /// Pump states already corrected for the channel polarity
    Corrected,
}

/// Where pump runtime and start counts are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeSource {
    /// Seconds and starts from the measurement block
    Measure,
    /// DINT centi-hours and starts from the legacy counter block
    Counters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    pub status_word_polarity: StatusWordPolarity,
    pub runtime_source: RuntimeSource,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            status_word_polarity: StatusWordPolarity::Corrected,
            runtime_source: RuntimeSource::Measure,
        }
    }
}
