// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register map configuration
//!
//! Base addresses, word counts and field offsets of the controller's register
//! blocks. The defaults describe the "global map" firmware:
//!
//! | Block | Address | Words |
//! |-------|---------|-------|
//! | measure | 12320 | 32 |
//! | counters | 12336 | 12 |
//! | setpoints | 12384 | 16 |
//! | system | 12416 | 8 |
//! | alarms | 12432 | 8 |
//!
//! The counter block overlaps words 16..28 of the measurement block: the
//! legacy firmware kept its DINT counters where the current firmware stores
//! firmware info, runtimes and start counts. Only one of the two layouts is
//! live on a given controller, see `firmware.runtime_source`.
//!
//! Offsets are relative to the base address of their block. Per-sensor and
//! per-actuator offsets live in the `sensors` and `actuators` sections.

use serde::{Deserialize, Serialize};

use crate::registers::BlockSpec;

/// Block layout of the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterMapConfig {
    pub measure: BlockSpec,
    pub setpoints: BlockSpec,
    pub system: BlockSpec,
    pub alarms: BlockSpec,
    /// Legacy DINT runtime/start counters
    pub counters: BlockSpec,
    /// Absolute address of the hour register the controller schedule reads (%MW0)
    pub clock_register: u16,
    pub measure_fields: MeasureFields,
    pub setpoint_fields: SetpointFields,
    pub system_fields: SystemFields,
    pub alarm_fields: AlarmFields,
    pub status_bits: StatusBits,
}

impl Default for RegisterMapConfig {
    fn default() -> Self {
        Self {
            measure: BlockSpec::new(12320, 32),
            setpoints: BlockSpec::new(12384, 16),
            system: BlockSpec::new(12416, 8),
            alarms: BlockSpec::new(12432, 8),
            counters: BlockSpec::new(12336, 12),
            clock_register: 12288,
            measure_fields: MeasureFields::default(),
            setpoint_fields: SetpointFields::default(),
            system_fields: SystemFields::default(),
            alarm_fields: AlarmFields::default(),
            status_bits: StatusBits::default(),
        }
    }
}

/// Offsets of the non-sensor fields of the measurement block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureFields {
    /// 8-channel digital input card
    pub digital_inputs: u16,
    pub hour_of_day: u16,
    pub status_word: u16,
    /// Boiler minus hot-water differential, ×100
    pub delta_t: u16,
    /// Major version in the high byte, minor in the low byte
    pub firmware_version: u16,
    pub firmware_patch: u16,
    pub serial_number: u16,
    /// Physical output byte (%QB0)
    pub output_byte: u16,
}

impl Default for MeasureFields {
    fn default() -> Self {
        Self {
            digital_inputs: 8,
            hour_of_day: 9,
            status_word: 10,
            delta_t: 11,
            firmware_version: 15,
            firmware_patch: 16,
            serial_number: 17,
            output_byte: 31,
        }
    }
}

/// Offsets inside the setpoint block. Temperatures are ×100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetpointFields {
    pub flow_target: u16,
    pub hot_water_target: u16,
    pub flow_hysteresis: u16,
    pub hot_water_hysteresis: u16,
    /// Hour the night reduction starts (0..=23)
    pub night_start: u16,
    /// Hour the night reduction ends (0..=23)
    pub night_end: u16,
    pub night_reduction: u16,
    pub frost_limit: u16,
    pub run_on_seconds: u16,
    /// Tank temperature pushed by an external writer, 0 when absent
    pub external_tank_temperature: u16,
}

impl Default for SetpointFields {
    fn default() -> Self {
        Self {
            flow_target: 0,
            hot_water_target: 1,
            flow_hysteresis: 2,
            hot_water_hysteresis: 3,
            night_start: 4,
            night_end: 5,
            night_reduction: 6,
            frost_limit: 9,
            run_on_seconds: 11,
            external_tank_temperature: 12,
        }
    }
}

/// Offsets inside the system block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemFields {
    /// Low word of the uptime in seconds, the high word follows
    pub uptime: u16,
    pub error_count: u16,
    pub cpu_load: u16,
    pub cycle_min: u16,
    pub cycle_max: u16,
    pub cycle_avg: u16,
}

impl Default for SystemFields {
    fn default() -> Self {
        Self {
            uptime: 0,
            error_count: 2,
            cpu_load: 3,
            cycle_min: 4,
            cycle_max: 5,
            cycle_avg: 6,
        }
    }
}

/// Offsets inside the alarm block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmFields {
    /// bit0 flow, bit1 outdoor, bit2 boiler, bit3 hot water
    pub sensor_alarms: u16,
}

/// Bit positions inside the status word.
///
/// The data-ready bit belongs to the `handshake` section and the per-pump bits
/// to the `actuators` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusBits {
    pub night_mode: u8,
    /// Set while the multiplexer samples phase A
    pub mux_phase: u8,
    pub sensor_error: u8,
}

impl Default for StatusBits {
    fn default() -> Self {
        Self {
            night_mode: 3,
            mux_phase: 4,
            sensor_error: 6,
        }
    }
}
