// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Reason-code decoder
//!
//! Every actuator publishes an 8-bit mask explaining why it is in its current
//! state. Each actuator knows a few named cause bits; bit 7 is the manual
//! override flag shared by all actuators. A bit outside that known set means
//! the state comes from the controller's pump block itself (minimum runtime,
//! run-on, anti-seize) and the mask cannot explain it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ActuatorId;

/// Manual override flag, valid for every actuator.
pub const MANUAL_OVERRIDE_BIT: u8 = 0x80;

/// Named cause carried by one bit of a reason mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCause {
    /// Boiler minus hot-water differential above the start threshold
    TemperatureDifferential,
    /// Outdoor temperature below the frost limit
    FrostProtection,
    /// Flow temperature below target
    HeatDemand,
    /// Heating-circuit override engaged from the setpoint block
    HeatingOverride,
    /// Heating-circuit pump running
    HeatingPumpActive,
    /// Manual override flag (bit 7)
    ManualOverride,
}

impl fmt::Display for ReasonCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReasonCause::TemperatureDifferential => "ΔT threshold met",
            ReasonCause::FrostProtection => "frost protection",
            ReasonCause::HeatDemand => "heat demand",
            ReasonCause::HeatingOverride => "override",
            ReasonCause::HeatingPumpActive => "heating pump active",
            ReasonCause::ManualOverride => "manual override",
        };
        f.write_str(label)
    }
}

/// Decoded form of a reason mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "causes", rename_all = "snake_case")]
pub enum DecodedReason {
    /// No bit set
    NoDemand,
    /// Known bits only, in priority order
    Causes(Vec<ReasonCause>),
    /// At least one unknown bit set
    InternalTiming,
}

impl fmt::Display for DecodedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedReason::NoDemand => f.write_str("off / no demand"),
            DecodedReason::InternalTiming => f.write_str("internal actuator timing logic"),
            DecodedReason::Causes(causes) => {
                let labels: Vec<String> = causes.iter().map(|c| c.to_string()).collect();
                f.write_str(&labels.join("+"))
            }
        }
    }
}

/// Cause bits of an actuator, in reporting order.
pub fn cause_table(actuator: ActuatorId) -> &'static [(u8, ReasonCause)] {
    match actuator {
        ActuatorId::HotWaterPump => &[(0x01, ReasonCause::TemperatureDifferential)],
        ActuatorId::HeatingPump => &[
            (0x01, ReasonCause::FrostProtection),
            (0x02, ReasonCause::HeatDemand),
            (0x04, ReasonCause::HeatingOverride),
        ],
        ActuatorId::WellPump => &[(0x01, ReasonCause::HeatingPumpActive)],
    }
}

/// All bits the decoder can explain for `actuator`.
pub fn known_bits(actuator: ActuatorId) -> u8 {
    cause_table(actuator)
        .iter()
        .fold(MANUAL_OVERRIDE_BIT, |acc, (bit, _)| acc | bit)
}

/// Decode the reason mask of one actuator.
pub fn decode_reason(actuator: ActuatorId, mask: u8) -> DecodedReason {
    if mask & !known_bits(actuator) != 0 {
        return DecodedReason::InternalTiming;
    }
    if mask == 0 {
        return DecodedReason::NoDemand;
    }

    let mut causes: Vec<ReasonCause> = cause_table(actuator)
        .iter()
        .filter(|(bit, _)| mask & bit != 0)
        .map(|(_, cause)| *cause)
        .collect();
    if mask & MANUAL_OVERRIDE_BIT != 0 {
        causes.push(ReasonCause::ManualOverride);
    }
    DecodedReason::Causes(causes)
}
