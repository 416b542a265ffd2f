// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register transport abstraction
//!
//! The decoder never talks to the wire directly. It goes through
//! [`RegisterTransport`], implemented by [`super::ModbusTransport`] for the
//! real controller and by [`super::MemoryRegisterBank`] for the simulator
//! and the test-suite.

use async_trait::async_trait;
use log::debug;
use thiserror::Error;
use tokio_modbus::ExceptionCode;

use super::{BlockKind, BlockSpec, RawSnapshot};

/// Errors raised by a register transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to connect to controller at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("modbus transport failure: {0}")]
    Protocol(#[from] tokio_modbus::Error),

    #[error("controller rejected the request with exception {0:?}")]
    Exception(ExceptionCode),

    #[error("request for register {address} timed out after {timeout_ms} ms")]
    Timeout { address: u16, timeout_ms: u64 },

    #[error("short read at register {address}: expected {expected} words, got {got}")]
    ShortRead {
        address: u16,
        expected: u16,
        got: usize,
    },
}

/// Word-level access to the controller's register bank.
///
/// One connection, one request at a time: implementations take `&mut self`
/// so the poll cycle can never issue overlapping requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegisterTransport: Send {
    /// Read `count` consecutive holding registers starting at `address`.
    async fn read(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError>;

    /// Write a single holding register.
    async fn write(&mut self, address: u16, value: u16) -> Result<(), TransportError>;
}

/// Read one whole block and wrap it into a [`RawSnapshot`].
///
/// Fails with [`TransportError::ShortRead`] when the transport returns a
/// different number of words than requested.
pub async fn read_block<T>(
    transport: &mut T,
    kind: BlockKind,
    spec: BlockSpec,
) -> Result<RawSnapshot, TransportError>
where
    T: RegisterTransport + ?Sized,
{
    debug!(
        "Reading {} block: {} words at {}",
        kind, spec.count, spec.address
    );
    let words = transport.read(spec.address, spec.count).await?;
    if words.len() != spec.count as usize {
        return Err(TransportError::ShortRead {
            address: spec.address,
            expected: spec.count,
            got: words.len(),
        });
    }
    Ok(RawSnapshot::new(kind, spec.address, words))
}
