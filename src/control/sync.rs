// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Values pushed into the controller
//!
//! The controller has no clock of its own: its schedule reads the hour from
//! a register the poller keeps current. A tank temperature measured outside
//! the controller is forwarded into the setpoint block the same way.

use log::debug;

use super::{block_address, write_if_changed, ControlError, WriteOutcome};
use crate::config::RegisterMapConfig;
use crate::registers::codec::encode_centi;
use crate::registers::RegisterTransport;

/// Bring the clock register to `hour`.
pub async fn sync_clock<T>(
    transport: &mut T,
    map: &RegisterMapConfig,
    hour: u8,
) -> Result<WriteOutcome, ControlError>
where
    T: RegisterTransport + ?Sized,
{
    let desired = u16::from(hour);
    write_if_changed(transport, map.clock_register, desired, |current| {
        current == desired
    })
    .await
}

/// Forward a tank temperature (°C) into the setpoint block as ×100.
///
/// Readings at or below 0 °C mean the tank sensor is absent and are not
/// forwarded; `Ok(None)` is returned and nothing is read or written.
pub async fn push_tank_temperature<T>(
    transport: &mut T,
    map: &RegisterMapConfig,
    celsius: f64,
) -> Result<Option<WriteOutcome>, ControlError>
where
    T: RegisterTransport + ?Sized,
{
    if celsius.is_nan() || celsius <= 0.0 {
        debug!("Tank temperature {} not forwarded", celsius);
        return Ok(None);
    }
    let desired = encode_centi(celsius).ok_or(ControlError::Unencodable(celsius))?;
    let address = block_address(map.setpoints, map.setpoint_fields.external_tank_temperature)?;
    write_if_changed(transport, address, desired, |current| current == desired)
        .await
        .map(Some)
}
