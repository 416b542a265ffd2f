// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Actuator state resolution
//!
//! Each pump has two independent views:
//!
//! - `physical_on`, taken from the raw output byte (%QB0) through the
//!   channel's polarity. Normally-closed relays are wired so that a cleared
//!   output bit leaves the load running.
//! - `logical_on`, taken from the controller's status word. Older firmware
//!   publishes the raw output bit there, newer firmware publishes the
//!   polarity-corrected state. [`StatusWordPolarity`] selects which one is
//!   in use so the resolver never inverts twice.
//!
//! `physical_on` is authoritative. A mismatch is reported as a
//! [`Discrepancy`], never merged away.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::reason::{decode_reason, DecodedReason};
use super::ActuatorId;
use crate::config::{ActuatorConfig, StatusWordPolarity};
use crate::registers::codec::to_signed;

/// Wiring of an output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Bit set means the load runs
    Direct,
    /// Bit cleared means the load runs (normally-closed relay)
    Inverted,
}

impl Polarity {
    /// Load state for a given output bit.
    pub fn load_on(&self, bit_set: bool) -> bool {
        match self {
            Polarity::Direct => bit_set,
            Polarity::Inverted => !bit_set,
        }
    }
}

/// Tri-state override held in the setpoint block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideMode {
    Auto,
    ForceOn,
    ForceOff,
}

impl OverrideMode {
    /// Decode a signed override word: zero is auto, positive forces on,
    /// negative forces off.
    pub fn from_raw(value: i16) -> Self {
        match value {
            0 => OverrideMode::Auto,
            v if v > 0 => OverrideMode::ForceOn,
            _ => OverrideMode::ForceOff,
        }
    }

    /// Decode an override register word.
    pub fn from_word(word: u16) -> Self {
        Self::from_raw(to_signed(word))
    }

    /// Canonical signed encoding written by this program.
    pub fn encode(&self) -> i16 {
        match self {
            OverrideMode::Auto => 0,
            OverrideMode::ForceOn => 1,
            OverrideMode::ForceOff => -1,
        }
    }
}

impl fmt::Display for OverrideMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverrideMode::Auto => "auto",
            OverrideMode::ForceOn => "force-on",
            OverrideMode::ForceOff => "force-off",
        };
        f.write_str(label)
    }
}

/// Resolved state of one actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub actuator: ActuatorId,
    /// Real-world state derived from the output byte
    pub physical_on: bool,
    /// State as reported by the controller's status word
    pub logical_on: bool,
    pub reason_mask: u8,
    pub reason: DecodedReason,
    /// `None` when the setpoint block could not be read
    pub override_mode: Option<OverrideMode>,
}

impl ActuatorState {
    pub fn has_discrepancy(&self) -> bool {
        self.physical_on != self.logical_on
    }
}

/// Physical and logical views of an actuator disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub actuator: ActuatorId,
    pub physical_on: bool,
    pub logical_on: bool,
}

/// Per-actuator inputs taken from the register blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorInputs {
    pub output_byte: u8,
    pub status_word: u16,
    pub reason_mask: u8,
    pub override_mode: Option<OverrideMode>,
}

/// Resolves actuator states from a channel table.
#[derive(Debug, Clone)]
pub struct ActuatorResolver {
    channels: Vec<ActuatorConfig>,
    status_polarity: StatusWordPolarity,
}

impl ActuatorResolver {
    pub fn new(channels: Vec<ActuatorConfig>, status_polarity: StatusWordPolarity) -> Self {
        Self {
            channels,
            status_polarity,
        }
    }

    pub fn channels(&self) -> &[ActuatorConfig] {
        &self.channels
    }

    /// Resolve one channel.
    pub fn resolve(&self, channel: &ActuatorConfig, inputs: ActuatorInputs) -> ActuatorState {
        let output_bit = inputs.output_byte & (1 << channel.output_bit) != 0;
        let physical_on = channel.polarity.load_on(output_bit);

        let status_bit = inputs.status_word & (1 << channel.status_bit) != 0;
        let logical_on = match self.status_polarity {
            StatusWordPolarity::Corrected => status_bit,
            StatusWordPolarity::Raw => channel.polarity.load_on(status_bit),
        };

        ActuatorState {
            actuator: channel.id,
            physical_on,
            logical_on,
            reason_mask: inputs.reason_mask,
            reason: decode_reason(channel.id, inputs.reason_mask),
            override_mode: inputs.override_mode,
        }
    }

    /// Resolve every configured channel, collecting discrepancies.
    ///
    /// `inputs` holds the register-derived inputs of each channel, in channel
    /// order.
    pub fn resolve_all(&self, inputs: &[ActuatorInputs]) -> (Vec<ActuatorState>, Vec<Discrepancy>) {
        let states: Vec<ActuatorState> = self
            .channels
            .iter()
            .zip(inputs)
            .map(|(channel, inputs)| self.resolve(channel, *inputs))
            .collect();
        let discrepancies = states
            .iter()
            .filter(|state| state.has_discrepancy())
            .map(|state| Discrepancy {
                actuator: state.actuator,
                physical_on: state.physical_on,
                logical_on: state.logical_on,
            })
            .collect();
        (states, discrepancies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActuatorsConfig;

    fn channel(id: ActuatorId) -> ActuatorConfig {
        ActuatorsConfig::default()
            .channels
            .into_iter()
            .find(|c| c.id == id)
            .unwrap()
    }

    fn inputs(output_byte: u8, status_word: u16) -> ActuatorInputs {
        ActuatorInputs {
            output_byte,
            status_word,
            reason_mask: 0,
            override_mode: Some(OverrideMode::Auto),
        }
    }

    #[test]
    fn test_override_mode_encoding() {
        assert_eq!(OverrideMode::from_raw(0), OverrideMode::Auto);
        assert_eq!(OverrideMode::from_raw(5), OverrideMode::ForceOn);
        assert_eq!(OverrideMode::from_raw(-3), OverrideMode::ForceOff);
        assert_eq!(OverrideMode::from_word(0xFFFF), OverrideMode::ForceOff);
        for mode in [
            OverrideMode::Auto,
            OverrideMode::ForceOn,
            OverrideMode::ForceOff,
        ] {
            assert_eq!(OverrideMode::from_raw(mode.encode()), mode);
        }
    }

    #[test]
    fn test_bit_clear_depends_on_polarity() {
        let mut ww = channel(ActuatorId::HotWaterPump);
        let resolver = ActuatorResolver::new(vec![], StatusWordPolarity::Corrected);

        ww.polarity = Polarity::Inverted;
        assert!(resolver.resolve(&ww, inputs(0x00, 0)).physical_on);

        ww.polarity = Polarity::Direct;
        assert!(!resolver.resolve(&ww, inputs(0x00, 0)).physical_on);
    }

    #[test]
    fn test_inverted_channel_with_bit_set_is_off() {
        let resolver = ActuatorResolver::new(vec![], StatusWordPolarity::Corrected);
        let state = resolver.resolve(&channel(ActuatorId::HotWaterPump), inputs(0x02, 0));
        assert!(!state.physical_on);
        assert!(!state.logical_on);
        assert!(!state.has_discrepancy());
    }

    #[test]
    fn test_status_polarity_prevents_double_inversion() {
        let hk = channel(ActuatorId::HeatingPump);
        // Output bit 2 clear: the inverted heating pump runs.
        let output = 0x00;

        let corrected = ActuatorResolver::new(vec![], StatusWordPolarity::Corrected);
        let state = corrected.resolve(&hk, inputs(output, 1 << hk.status_bit));
        assert!(state.physical_on && state.logical_on);

        // Raw firmware mirrors the cleared output bit in the status word.
        let raw = ActuatorResolver::new(vec![], StatusWordPolarity::Raw);
        let state = raw.resolve(&hk, inputs(output, 0));
        assert!(state.physical_on && state.logical_on);
    }

    #[test]
    fn test_resolve_all_reports_discrepancies() {
        let resolver = ActuatorResolver::new(
            ActuatorsConfig::default().channels,
            StatusWordPolarity::Corrected,
        );
        // Bits 1 and 2 set: both inverted pumps off; bit 3 set: well pump on.
        // Status word claims the hot-water pump runs.
        let (states, discrepancies) = resolver.resolve_all(&[inputs(0x0E, 0b001); 3]);
        assert_eq!(states.len(), 3);
        assert_eq!(
            discrepancies,
            vec![
                Discrepancy {
                    actuator: ActuatorId::HotWaterPump,
                    physical_on: false,
                    logical_on: true,
                },
                Discrepancy {
                    actuator: ActuatorId::WellPump,
                    physical_on: true,
                    logical_on: false,
                },
            ]
        );
    }
}
