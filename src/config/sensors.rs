// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor input table

use serde::{Deserialize, Serialize};

use crate::decode::{Calibration, SensorId};

/// One analog input of the measurement block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub id: SensorId,
    /// Offset of the sample-and-hold raw count
    pub sample_offset: u16,
    pub calibration: Calibration,
    /// Offset of the controller's own ×100 value for this sensor, if published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_offset: Option<u16>,
}

/// Sensor inputs, in reporting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorsConfig {
    pub inputs: Vec<SensorConfig>,
}

impl SensorsConfig {
    pub fn get(&self, id: SensorId) -> Option<&SensorConfig> {
        self.inputs.iter().find(|s| s.id == id)
    }
}

impl Default for SensorsConfig {
    fn default() -> Self {
        let sensor = |id, sample_offset, calibration, controller_offset| SensorConfig {
            id,
            sample_offset,
            calibration,
            controller_offset,
        };
        Self {
            inputs: vec![
                sensor(SensorId::Flow, 0, Calibration::Pt1000, Some(14)),
                sensor(SensorId::Outdoor, 1, Calibration::Pt1000, Some(27)),
                sensor(SensorId::Indoor, 2, Calibration::Pt1000, Some(28)),
                sensor(SensorId::Boiler, 3, Calibration::Pt1000, Some(12)),
                sensor(SensorId::HotWater, 4, Calibration::BoilerNtc, Some(13)),
                sensor(SensorId::Tank, 5, Calibration::Raw, None),
                sensor(SensorId::Return, 6, Calibration::Pt1000, Some(29)),
                sensor(SensorId::Solar, 7, Calibration::SolarNtc, Some(30)),
            ],
        }
    }
}
