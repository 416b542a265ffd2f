// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Write-back path
//!
//! Writes go to the setpoint block (pump override words, night-window hours,
//! the forwarded tank temperature) and to the controller clock register.
//! Every write is corrective:
//! the current value is read first and the register is only written when it
//! differs from the requested value. A write is always followed by a
//! read-back that must observe the written word.

pub mod override_writer;
pub mod schedule;
pub mod sync;

use std::fmt;

use log::{debug, info};
use thiserror::Error;

use crate::registers::{BlockSpec, RegisterTransport, TransportError};

pub use override_writer::{apply_override, OverrideRequest};
pub use schedule::{apply_schedule, ScheduleField, ScheduleWindow};
pub use sync::{push_tank_temperature, sync_clock};

/// Errors raised by a corrective write.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("transport failure while writing register {address}: {source}")]
    Transport {
        address: u16,
        #[source]
        source: TransportError,
    },

    #[error("register {address} reads back {actual} after writing {expected}")]
    ReadBackMismatch {
        address: u16,
        expected: u16,
        actual: u16,
    },

    #[error("register {address} returned no data")]
    EmptyRead { address: u16 },

    #[error("actuator {0} has no configured override register")]
    UnknownActuator(String),

    #[error("offset {offset} past block address {base} exceeds the register address space")]
    AddressOverflow { base: u16, offset: u16 },

    #[error("value {0} cannot be encoded in one register word")]
    Unencodable(f64),
}

/// Absolute address of `offset` inside `block`.
pub(crate) fn block_address(block: BlockSpec, offset: u16) -> Result<u16, ControlError> {
    block.address_of(offset).ok_or(ControlError::AddressOverflow {
        base: block.address,
        offset,
    })
}

/// Result of a corrective write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The register already held the requested value
    Unchanged { value: u16 },
    /// The register was written and the read-back matched
    Written { previous: u16, value: u16 },
}

impl WriteOutcome {
    pub fn was_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOutcome::Unchanged { value } => write!(f, "unchanged ({})", value),
            WriteOutcome::Written { previous, value } => {
                write!(f, "written ({} -> {})", previous, value)
            }
        }
    }
}

async fn read_one<T>(transport: &mut T, address: u16) -> Result<u16, ControlError>
where
    T: RegisterTransport + ?Sized,
{
    let words = transport
        .read(address, 1)
        .await
        .map_err(|source| ControlError::Transport { address, source })?;
    words
        .first()
        .copied()
        .ok_or(ControlError::EmptyRead { address })
}

/// Read `address`, write `desired` only when `satisfied` rejects the current
/// word, then verify the write by reading it back.
pub async fn write_if_changed<T, F>(
    transport: &mut T,
    address: u16,
    desired: u16,
    satisfied: F,
) -> Result<WriteOutcome, ControlError>
where
    T: RegisterTransport + ?Sized,
    F: Fn(u16) -> bool,
{
    let current = read_one(transport, address).await?;
    if satisfied(current) {
        debug!("Register {} already holds {}, no write", address, current);
        return Ok(WriteOutcome::Unchanged { value: current });
    }

    transport
        .write(address, desired)
        .await
        .map_err(|source| ControlError::Transport { address, source })?;

    let actual = read_one(transport, address).await?;
    if actual != desired {
        return Err(ControlError::ReadBackMismatch {
            address,
            expected: desired,
            actual,
        });
    }
    info!("Register {} changed from {} to {}", address, current, desired);
    Ok(WriteOutcome::Written {
        previous: current,
        value: desired,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::transport::MockRegisterTransport;
    use crate::registers::MemoryRegisterBank;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_matching_value_is_not_written() {
        let mut transport = MockRegisterTransport::new();
        transport
            .expect_read()
            .with(eq(12388), eq(1))
            .times(1)
            .returning(|_, _| Ok(vec![22]));
        transport.expect_write().times(0);

        let outcome = write_if_changed(&mut transport, 12388, 22, |v| v == 22)
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Unchanged { value: 22 });
    }

    #[tokio::test]
    async fn test_read_back_mismatch_is_reported() {
        let mut transport = MockRegisterTransport::new();
        let mut reads = vec![vec![5u16], vec![5u16]].into_iter();
        transport
            .expect_read()
            .times(2)
            .returning(move |_, _| Ok(reads.next().unwrap_or_default()));
        transport.expect_write().times(1).returning(|_, _| Ok(()));

        let err = write_if_changed(&mut transport, 12389, 6, |v| v == 6)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ControlError::ReadBackMismatch {
                address: 12389,
                expected: 6,
                actual: 5
            }
        ));
    }

    #[tokio::test]
    async fn test_write_then_read_observes_value() {
        let mut bank = MemoryRegisterBank::new().with_block(12384, &[0; 16]);
        let outcome = write_if_changed(&mut bank, 12388, 21, |v| v == 21)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WriteOutcome::Written {
                previous: 0,
                value: 21
            }
        );
        assert_eq!(bank.get(12388), Some(21));
    }

    #[test]
    fn test_block_address_overflow() {
        let block = BlockSpec::new(65530, 16);
        assert_eq!(block_address(block, 5).unwrap(), 65535);
        assert!(matches!(
            block_address(block, 13),
            Err(ControlError::AddressOverflow {
                base: 65530,
                offset: 13
            })
        ));
    }
}
