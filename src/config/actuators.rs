// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Actuator channel table
//!
//! Wiring and register locations of every pump. Rewiring a relay from
//! normally-open to normally-closed is a change of `polarity` here, not a
//! code change.

use serde::{Deserialize, Serialize};

use crate::decode::{ActuatorId, Polarity};

/// Wiring and register locations of one actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    pub id: ActuatorId,
    /// Bit of the physical output byte driving the relay
    pub output_bit: u8,
    pub polarity: Polarity,
    /// Bit of the status word carrying the controller's view of the pump
    pub status_bit: u8,
    /// Measurement-block offset of the reason byte
    pub reason_offset: u16,
    /// Measurement-block offset of the runtime in seconds
    pub runtime_offset: u16,
    /// Measurement-block offset of the start counter
    pub starts_offset: u16,
    /// Setpoint-block offset of the override word
    pub override_offset: u16,
    /// Index of the DINT pair in the legacy counter block
    pub counter_index: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorsConfig {
    pub channels: Vec<ActuatorConfig>,
}

impl ActuatorsConfig {
    pub fn get(&self, id: ActuatorId) -> Option<&ActuatorConfig> {
        self.channels.iter().find(|c| c.id == id)
    }
}

impl Default for ActuatorsConfig {
    fn default() -> Self {
        Self {
            channels: vec![
                ActuatorConfig {
                    id: ActuatorId::HotWaterPump,
                    output_bit: 1,
                    polarity: Polarity::Inverted,
                    status_bit: 0,
                    reason_offset: 24,
                    runtime_offset: 18,
                    starts_offset: 21,
                    override_offset: 13,
                    counter_index: 0,
                },
                ActuatorConfig {
                    id: ActuatorId::HeatingPump,
                    output_bit: 2,
                    polarity: Polarity::Inverted,
                    status_bit: 1,
                    reason_offset: 25,
                    runtime_offset: 19,
                    starts_offset: 22,
                    override_offset: 14,
                    counter_index: 1,
                },
                ActuatorConfig {
                    id: ActuatorId::WellPump,
                    output_bit: 3,
                    polarity: Polarity::Direct,
                    status_bit: 2,
                    reason_offset: 26,
                    runtime_offset: 20,
                    starts_offset: 23,
                    override_offset: 15,
                    counter_index: 2,
                },
            ],
        }
    }
}
