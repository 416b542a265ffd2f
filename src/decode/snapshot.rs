// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Snapshot decoding
//!
//! One decode pass turns the blocks read during a poll cycle into a
//! [`DecodedSnapshot`]. The measurement block is mandatory; the setpoint,
//! system, alarm and counter blocks are optional and their sections are left
//! empty when they could not be read.

use chrono::{DateTime, Local};
use log::debug;
use serde::{Deserialize, Serialize};

use super::actuator::{ActuatorInputs, ActuatorResolver, ActuatorState, Discrepancy, OverrideMode};
use super::calibration::SensorReading;
use super::{ActuatorId, DecodeError, SensorId};
use crate::config::{Config, RegisterMapConfig, RuntimeSource, SensorsConfig};
use crate::registers::codec::{centi, scale, CENTI, SECONDS_PER_HOUR};
use crate::registers::RawSnapshot;

/// Blocks captured during one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSet {
    pub measure: RawSnapshot,
    pub setpoints: Option<RawSnapshot>,
    pub system: Option<RawSnapshot>,
    pub alarms: Option<RawSnapshot>,
    pub counters: Option<RawSnapshot>,
}

impl BlockSet {
    /// A block set holding only the measurement block.
    pub fn measure_only(measure: RawSnapshot) -> Self {
        Self {
            measure,
            setpoints: None,
            system: None,
            alarms: None,
            counters: None,
        }
    }
}

/// Decoded status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFlags {
    pub word: u16,
    pub night_mode: bool,
    /// `true` while the multiplexer samples phase A
    pub mux_phase_a: bool,
    pub data_ready: bool,
    pub sensor_error: bool,
}

/// Sensor group sampled by the input multiplexer during this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorGroup {
    A,
    B,
}

impl std::fmt::Display for SensorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorGroup::A => f.write_str("A"),
            SensorGroup::B => f.write_str("B"),
        }
    }
}

impl StatusFlags {
    pub fn sensor_group(&self) -> SensorGroup {
        if self.mux_phase_a {
            SensorGroup::A
        } else {
            SensorGroup::B
        }
    }
}

/// Temperature computed by the controller itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerTemperature {
    pub sensor: SensorId,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareInfo {
    pub major: u8,
    pub minor: u8,
    pub patch: u16,
    pub serial_number: u16,
}

impl FirmwareInfo {
    pub fn version(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The 8-channel digital input card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalInputs {
    pub raw: u16,
    pub channels: [bool; 8],
}

impl DigitalInputs {
    pub fn from_word(raw: u16) -> Self {
        let mut channels = [false; 8];
        for (bit, channel) in channels.iter_mut().enumerate() {
            *channel = raw & (1 << bit) != 0;
        }
        Self { raw, channels }
    }
}

/// Accumulated runtime of one pump.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PumpRuntime {
    pub actuator: ActuatorId,
    pub hours: f64,
    pub starts: i64,
}

/// Operator setpoints. Temperatures in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Setpoints {
    pub flow_target: f64,
    pub hot_water_target: f64,
    pub flow_hysteresis: f64,
    pub hot_water_hysteresis: f64,
    pub night_start: u16,
    pub night_end: u16,
    pub night_reduction: f64,
    pub frost_limit: f64,
    pub run_on_seconds: u16,
    /// `None` when no external writer supplied a value
    pub external_tank_temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemDiagnostics {
    pub uptime_seconds: u32,
    pub error_count: u16,
    pub cpu_load: u16,
    pub cycle_min_ms: u16,
    pub cycle_max_ms: u16,
    pub cycle_avg_ms: u16,
}

impl SystemDiagnostics {
    /// Uptime as `(days, hours, minutes)`.
    pub fn uptime_parts(&self) -> (u32, u32, u32) {
        let s = self.uptime_seconds;
        (s / 86_400, (s % 86_400) / 3600, (s % 3600) / 60)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorAlarms {
    pub mask: u16,
    pub flow: bool,
    pub outdoor: bool,
    pub boiler: bool,
    pub hot_water: bool,
}

impl SensorAlarms {
    pub fn from_mask(mask: u16) -> Self {
        Self {
            mask,
            flow: mask & 0x01 != 0,
            outdoor: mask & 0x02 != 0,
            boiler: mask & 0x04 != 0,
            hot_water: mask & 0x08 != 0,
        }
    }

    pub fn any(&self) -> bool {
        self.flow || self.outdoor || self.boiler || self.hot_water
    }
}

/// Semantic view of one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSnapshot {
    pub timestamp: DateTime<Local>,
    pub hour_of_day: u16,
    pub status: StatusFlags,
    pub sensor_group: SensorGroup,
    pub sensors: Vec<SensorReading>,
    pub controller_temperatures: Vec<ControllerTemperature>,
    /// Boiler minus hot-water differential computed by the controller
    pub delta_t: f64,
    pub firmware: FirmwareInfo,
    pub digital_inputs: DigitalInputs,
    pub output_byte: u8,
    pub actuators: Vec<ActuatorState>,
    pub discrepancies: Vec<Discrepancy>,
    pub runtime: Option<Vec<PumpRuntime>>,
    pub setpoints: Option<Setpoints>,
    pub system: Option<SystemDiagnostics>,
    pub alarms: Option<SensorAlarms>,
}

impl DecodedSnapshot {
    pub fn sensor(&self, id: SensorId) -> Option<&SensorReading> {
        self.sensors.iter().find(|s| s.sensor == id)
    }

    pub fn actuator(&self, id: ActuatorId) -> Option<&ActuatorState> {
        self.actuators.iter().find(|a| a.actuator == id)
    }
}

/// Decoder parameterized by the register map, sensor and actuator tables
/// and the firmware flags.
#[derive(Debug, Clone)]
pub struct SnapshotDecoder {
    map: RegisterMapConfig,
    sensors: SensorsConfig,
    runtime_source: RuntimeSource,
    ready_bit: u8,
    resolver: ActuatorResolver,
}

impl SnapshotDecoder {
    pub fn new(config: &Config) -> Self {
        Self {
            map: config.register_map.clone(),
            sensors: config.sensors.clone(),
            runtime_source: config.firmware.runtime_source,
            ready_bit: config.handshake.ready_bit,
            resolver: ActuatorResolver::new(
                config.actuators.channels.clone(),
                config.firmware.status_word_polarity,
            ),
        }
    }

    /// Decode the status word of a measurement block.
    pub fn status(&self, measure: &RawSnapshot) -> Result<StatusFlags, DecodeError> {
        let word = required(measure, self.map.measure_fields.status_word)?;
        let bits = &self.map.status_bits;
        let bit = |n: u8| word & (1 << n) != 0;
        Ok(StatusFlags {
            word,
            night_mode: bit(bits.night_mode),
            mux_phase_a: bit(bits.mux_phase),
            data_ready: bit(self.ready_bit),
            sensor_error: bit(bits.sensor_error),
        })
    }

    /// Run the full decode pass.
    pub fn decode(
        &self,
        blocks: &BlockSet,
        timestamp: DateTime<Local>,
    ) -> Result<DecodedSnapshot, DecodeError> {
        let measure = &blocks.measure;
        let fields = &self.map.measure_fields;

        let status = self.status(measure)?;

        let mut sensors = Vec::with_capacity(self.sensors.inputs.len());
        let mut controller_temperatures = Vec::new();
        for input in &self.sensors.inputs {
            let raw = required(measure, input.sample_offset)?;
            sensors.push(SensorReading::new(input.id, raw, input.calibration));
            if let Some(offset) = input.controller_offset {
                controller_temperatures.push(ControllerTemperature {
                    sensor: input.id,
                    value: centi(required(measure, offset)?),
                });
            }
        }

        let version = required(measure, fields.firmware_version)?;
        let firmware = FirmwareInfo {
            major: (version >> 8) as u8,
            minor: (version & 0xFF) as u8,
            patch: required(measure, fields.firmware_patch)?,
            serial_number: required(measure, fields.serial_number)?,
        };

        let output_byte = (required(measure, fields.output_byte)? & 0xFF) as u8;

        let mut inputs = Vec::with_capacity(self.resolver.channels().len());
        for channel in self.resolver.channels() {
            let override_mode = blocks
                .setpoints
                .as_ref()
                .and_then(|s| s.word(channel.override_offset))
                .map(OverrideMode::from_word);
            inputs.push(ActuatorInputs {
                output_byte,
                status_word: status.word,
                reason_mask: (required(measure, channel.reason_offset)? & 0xFF) as u8,
                override_mode,
            });
        }
        let (actuators, discrepancies) = self.resolver.resolve_all(&inputs);
        for d in &discrepancies {
            debug!(
                "{}: physical {} but controller reports {}",
                d.actuator,
                on_off(d.physical_on),
                on_off(d.logical_on)
            );
        }

        Ok(DecodedSnapshot {
            timestamp,
            hour_of_day: required(measure, fields.hour_of_day)?,
            sensor_group: status.sensor_group(),
            status,
            sensors,
            controller_temperatures,
            delta_t: centi(required(measure, fields.delta_t)?),
            firmware,
            digital_inputs: DigitalInputs::from_word(required(measure, fields.digital_inputs)?),
            output_byte,
            actuators,
            discrepancies,
            runtime: self.runtime(blocks),
            setpoints: blocks.setpoints.as_ref().and_then(|s| self.setpoints(s)),
            system: blocks.system.as_ref().and_then(|s| self.system(s)),
            alarms: blocks.alarms.as_ref().and_then(|s| {
                s.word(self.map.alarm_fields.sensor_alarms)
                    .map(SensorAlarms::from_mask)
            }),
        })
    }

    fn runtime(&self, blocks: &BlockSet) -> Option<Vec<PumpRuntime>> {
        let channels = self.resolver.channels();
        match self.runtime_source {
            RuntimeSource::Measure => channels
                .iter()
                .map(|c| {
                    Some(PumpRuntime {
                        actuator: c.id,
                        hours: scale(blocks.measure.word(c.runtime_offset)? as i32, SECONDS_PER_HOUR),
                        starts: blocks.measure.word(c.starts_offset)? as i64,
                    })
                })
                .collect(),
            RuntimeSource::Counters => {
                let counters = blocks.counters.as_ref()?;
                let starts_base = channels.len() as u16 * 2;
                channels
                    .iter()
                    .map(|c| {
                        let runtime_offset = c.counter_index * 2;
                        Some(PumpRuntime {
                            actuator: c.id,
                            hours: scale(counters.dint(runtime_offset)?, CENTI),
                            starts: counters.dint(starts_base + runtime_offset)? as i64,
                        })
                    })
                    .collect()
            }
        }
    }

    fn setpoints(&self, block: &RawSnapshot) -> Option<Setpoints> {
        let f = &self.map.setpoint_fields;
        let external = block.word(f.external_tank_temperature)?;
        Some(Setpoints {
            flow_target: block.centi(f.flow_target)?,
            hot_water_target: block.centi(f.hot_water_target)?,
            flow_hysteresis: block.centi(f.flow_hysteresis)?,
            hot_water_hysteresis: block.centi(f.hot_water_hysteresis)?,
            night_start: block.word(f.night_start)?,
            night_end: block.word(f.night_end)?,
            night_reduction: block.centi(f.night_reduction)?,
            frost_limit: block.centi(f.frost_limit)?,
            run_on_seconds: block.word(f.run_on_seconds)?,
            external_tank_temperature: (external != 0).then(|| centi(external)),
        })
    }

    fn system(&self, block: &RawSnapshot) -> Option<SystemDiagnostics> {
        let f = &self.map.system_fields;
        Some(SystemDiagnostics {
            uptime_seconds: block.udint(f.uptime)?,
            error_count: block.word(f.error_count)?,
            cpu_load: block.word(f.cpu_load)?,
            cycle_min_ms: block.word(f.cycle_min)?,
            cycle_max_ms: block.word(f.cycle_max)?,
            cycle_avg_ms: block.word(f.cycle_avg)?,
        })
    }
}

fn required(snapshot: &RawSnapshot, offset: u16) -> Result<u16, DecodeError> {
    snapshot.word(offset).ok_or(DecodeError::OutOfBlock {
        block: snapshot.block(),
        offset,
        len: snapshot.len(),
    })
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}
