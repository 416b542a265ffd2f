// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register decoding
//!
//! Turns raw register snapshots into the semantic model of the heating
//! installation:
//!
//! - [`calibration`]: ADC count → temperature transfer functions
//! - [`reason`]: per-actuator reason masks
//! - [`actuator`]: physical/logical actuator reconciliation
//! - [`snapshot`]: the full decode pass producing a [`DecodedSnapshot`]

pub mod actuator;
pub mod calibration;
pub mod reason;
pub mod snapshot;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use actuator::{
    ActuatorInputs, ActuatorResolver, ActuatorState, Discrepancy, OverrideMode, Polarity,
};
pub use calibration::{Calibration, SensorReading};
pub use reason::{decode_reason, DecodedReason, ReasonCause};
pub use snapshot::{
    BlockSet, ControllerTemperature, DecodedSnapshot, DigitalInputs, FirmwareInfo, PumpRuntime,
    SensorAlarms, SensorGroup, Setpoints, SnapshotDecoder, StatusFlags, SystemDiagnostics,
};

use crate::registers::BlockKind;

/// Temperature inputs of the installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorId {
    Flow,
    Outdoor,
    Indoor,
    Boiler,
    HotWater,
    Tank,
    Return,
    Solar,
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorId::Flow => "flow",
            SensorId::Outdoor => "outdoor",
            SensorId::Indoor => "indoor",
            SensorId::Boiler => "boiler",
            SensorId::HotWater => "hot_water",
            SensorId::Tank => "tank",
            SensorId::Return => "return",
            SensorId::Solar => "solar",
        };
        f.write_str(name)
    }
}

/// Pumps driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorId {
    HotWaterPump,
    HeatingPump,
    WellPump,
}

impl ActuatorId {
    pub const ALL: [ActuatorId; 3] = [
        ActuatorId::HotWaterPump,
        ActuatorId::HeatingPump,
        ActuatorId::WellPump,
    ];
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActuatorId::HotWaterPump => "hot_water_pump",
            ActuatorId::HeatingPump => "heating_pump",
            ActuatorId::WellPump => "well_pump",
        };
        f.write_str(name)
    }
}

/// Errors raised while decoding a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("offset {offset} lies outside the {block} block ({len} words)")]
    OutOfBlock {
        block: BlockKind,
        offset: u16,
        len: usize,
    },
}
