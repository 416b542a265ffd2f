// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Pump override writer
//!
//! Each pump has a signed override word in the setpoint block: `0` auto,
//! positive forced on, negative forced off. A requested mode is written only
//! when the decoded current mode differs, so `+5` already satisfies a
//! force-on request and is left untouched.

use log::info;

use super::{block_address, write_if_changed, ControlError, WriteOutcome};
use crate::config::{ActuatorsConfig, RegisterMapConfig};
use crate::decode::{ActuatorId, OverrideMode};
use crate::registers::codec::to_unsigned;
use crate::registers::RegisterTransport;

/// Externally requested override for one pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideRequest {
    pub actuator: ActuatorId,
    pub mode: OverrideMode,
}

/// Bring the override word of `request.actuator` to `request.mode`.
pub async fn apply_override<T>(
    transport: &mut T,
    map: &RegisterMapConfig,
    actuators: &ActuatorsConfig,
    request: OverrideRequest,
) -> Result<WriteOutcome, ControlError>
where
    T: RegisterTransport + ?Sized,
{
    let channel = actuators
        .get(request.actuator)
        .ok_or_else(|| ControlError::UnknownActuator(request.actuator.to_string()))?;
    let address = block_address(map.setpoints, channel.override_offset)?;
    let desired = to_unsigned(request.mode.encode());

    let outcome = write_if_changed(transport, address, desired, |current| {
        OverrideMode::from_word(current) == request.mode
    })
    .await?;
    if outcome.was_written() {
        info!("{} override set to {}", request.actuator, request.mode);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registers::transport::MockRegisterTransport;
    use crate::registers::MemoryRegisterBank;
    use mockall::predicate::eq;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_force_on_from_auto_writes_once() {
        let config = Config::default();
        // Hot-water override word: 12384 + 13
        let written = Arc::new(Mutex::new(None));
        let state = Arc::new(Mutex::new(0u16));

        let mut transport = MockRegisterTransport::new();
        let read_state = state.clone();
        transport
            .expect_read()
            .with(eq(12397), eq(1))
            .returning(move |_, _| Ok(vec![*read_state.lock().unwrap()]));
        let write_state = state.clone();
        let written_clone = written.clone();
        transport
            .expect_write()
            .times(1)
            .returning(move |address, value| {
                *written_clone.lock().unwrap() = Some((address, value));
                *write_state.lock().unwrap() = value;
                Ok(())
            });

        let outcome = apply_override(
            &mut transport,
            &config.register_map,
            &config.actuators,
            OverrideRequest {
                actuator: ActuatorId::HotWaterPump,
                mode: OverrideMode::ForceOn,
            },
        )
        .await
        .unwrap();

        assert!(outcome.was_written());
        assert_eq!(*written.lock().unwrap(), Some((12397, 1)));
    }

    #[tokio::test]
    async fn test_equivalent_mode_is_left_alone() {
        let config = Config::default();
        let mut bank = MemoryRegisterBank::new().with_block(12384, &[0; 16]);
        bank.set(12398, 7);

        let outcome = apply_override(
            &mut bank,
            &config.register_map,
            &config.actuators,
            OverrideRequest {
                actuator: ActuatorId::HeatingPump,
                mode: OverrideMode::ForceOn,
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome, WriteOutcome::Unchanged { value: 7 });
        assert!(bank.writes().is_empty());
    }

    #[tokio::test]
    async fn test_force_off_uses_negative_encoding() {
        let config = Config::default();
        let mut bank = MemoryRegisterBank::new().with_block(12384, &[0; 16]);

        apply_override(
            &mut bank,
            &config.register_map,
            &config.actuators,
            OverrideRequest {
                actuator: ActuatorId::WellPump,
                mode: OverrideMode::ForceOff,
            },
        )
        .await
        .unwrap();
        assert_eq!(bank.writes(), vec![(12399, 0xFFFF)]);

        apply_override(
            &mut bank,
            &config.register_map,
            &config.actuators,
            OverrideRequest {
                actuator: ActuatorId::WellPump,
                mode: OverrideMode::Auto,
            },
        )
        .await
        .unwrap();
        assert_eq!(bank.writes(), vec![(12399, 0xFFFF), (12399, 0)]);
    }

    #[tokio::test]
    async fn test_override_past_the_address_space_is_refused() {
        let mut config = Config::default();
        config.register_map.setpoints = crate::registers::BlockSpec::new(65530, 16);
        let mut transport = MockRegisterTransport::new();
        transport.expect_read().times(0);
        transport.expect_write().times(0);

        let err = apply_override(
            &mut transport,
            &config.register_map,
            &config.actuators,
            OverrideRequest {
                actuator: ActuatorId::HotWaterPump,
                mode: OverrideMode::ForceOn,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ControlError::AddressOverflow {
                base: 65530,
                offset: 13
            }
        ));
    }
}
