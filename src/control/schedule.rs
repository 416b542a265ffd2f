// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Night-window writer

use std::fmt;

use super::{block_address, write_if_changed, ControlError, WriteOutcome};
use crate::config::RegisterMapConfig;
use crate::registers::RegisterTransport;

/// Requested night-reduction window. Hours are 0..=23.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub night_start: Option<u8>,
    pub night_end: Option<u8>,
}

impl ScheduleWindow {
    pub fn is_empty(&self) -> bool {
        self.night_start.is_none() && self.night_end.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleField {
    NightStart,
    NightEnd,
}

impl fmt::Display for ScheduleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleField::NightStart => f.write_str("night start"),
            ScheduleField::NightEnd => f.write_str("night end"),
        }
    }
}

/// Write the requested window hours, each only when it differs.
///
/// Stops at the first failing field.
pub async fn apply_schedule<T>(
    transport: &mut T,
    map: &RegisterMapConfig,
    window: ScheduleWindow,
) -> Result<Vec<(ScheduleField, WriteOutcome)>, ControlError>
where
    T: RegisterTransport + ?Sized,
{
    let fields = &map.setpoint_fields;
    let requests = [
        (ScheduleField::NightStart, fields.night_start, window.night_start),
        (ScheduleField::NightEnd, fields.night_end, window.night_end),
    ];

    let mut outcomes = Vec::new();
    for (field, offset, hour) in requests {
        let Some(hour) = hour else { continue };
        let desired = hour as u16;
        let address = block_address(map.setpoints, offset)?;
        let outcome = write_if_changed(transport, address, desired, |current| current == desired)
            .await?;
        outcomes.push((field, outcome));
    }
    Ok(outcomes)
}
