// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor calibration
//!
//! Piecewise-linear transfer functions mapping a raw ADC count captured by the
//! controller's sample-and-hold stage to a temperature in °C. Every function
//! has an exclusive validity window; a raw count on or outside the window
//! yields `None` instead of an extrapolated value.
//!
//! | Kind | Valid raw counts | Formula |
//! |------|------------------|---------|
//! | `pt1000` | 4000 < raw < 25000 | (raw − 7134) / 25 |
//! | `boiler_ntc` | 4000 < raw < 45000 | (40536 − raw) / 303.1 |
//! | `solar_ntc` | 4000 < raw < 40000 | (raw − 26402) / 60 |
//! | `raw` | any | raw count, no unit |

use serde::{Deserialize, Serialize};

use super::SensorId;
use crate::registers::codec::round2;

/// Transfer function of a sensor input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calibration {
    /// Resistance thermometer (PT1000 style)
    Pt1000,
    /// NTC thermistor on the boiler/hot-water input
    BoilerNtc,
    /// NTC thermistor of the solar collector
    SolarNtc,
    /// Uncalibrated input, reported as the raw count
    Raw,
}

impl Calibration {
    /// Exclusive validity window `(lo, hi)` in raw counts.
    pub fn window(&self) -> Option<(u16, u16)> {
        match self {
            Calibration::Pt1000 => Some((4000, 25000)),
            Calibration::BoilerNtc => Some((4000, 45000)),
            Calibration::SolarNtc => Some((4000, 40000)),
            Calibration::Raw => None,
        }
    }

    /// Apply the transfer function, `None` outside the validity window.
    pub fn apply(&self, raw: u16) -> Option<f64> {
        if let Some((lo, hi)) = self.window() {
            if raw <= lo || raw >= hi {
                return None;
            }
        }
        let raw = raw as f64;
        let value = match self {
            Calibration::Pt1000 => (raw - 7134.0) / 25.0,
            Calibration::BoilerNtc => (40536.0 - raw) / 303.1,
            Calibration::SolarNtc => (raw - 26402.0) / 60.0,
            Calibration::Raw => raw,
        };
        Some(value)
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Calibration::Raw => "",
            _ => "°C",
        }
    }
}

/// One calibrated sensor input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor: SensorId,
    /// Raw ADC count as read from the register
    pub raw: u16,
    /// Calibrated value, `None` when `raw` is outside the validity window
    pub value: Option<f64>,
    pub unit: String,
}

impl SensorReading {
    pub fn new(sensor: SensorId, raw: u16, calibration: Calibration) -> Self {
        Self {
            sensor,
            raw,
            value: calibration.apply(raw),
            unit: calibration.unit().to_string(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    /// Value rounded to two decimals, the form used in reports and records.
    pub fn rounded(&self) -> Option<f64> {
        self.value.map(round2)
    }
}
