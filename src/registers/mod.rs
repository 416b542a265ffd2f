// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register bank access
//!
//! This module groups everything that touches raw 16-bit words:
//!
//! - [`codec`]: signed/unsigned/DINT conversions and fixed-point scaling
//! - [`transport`]: the [`RegisterTransport`] trait and its error type
//! - [`modbus_transport`]: the Modbus TCP implementation used in production
//! - [`memory`]: an in-process register bank used by the simulator and tests
//!
//! A read always targets one contiguous block and yields a [`RawSnapshot`].
//! Snapshots are never mutated; every read produces a fresh one.

pub mod codec;
pub mod memory;
pub mod modbus_transport;
pub mod transport;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use memory::MemoryRegisterBank;
pub use modbus_transport::ModbusTransport;
pub use transport::{read_block, RegisterTransport, TransportError};

/// Named register blocks of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Sampled inputs, status word, outputs and pump counters
    Measure,
    /// Operator setpoints and override words
    Setpoints,
    /// Controller uptime, CPU load and cycle times
    System,
    /// Sensor alarm masks
    Alarms,
    /// DINT runtime/start counters of the legacy firmware
    Counters,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Measure => "measure",
            BlockKind::Setpoints => "setpoints",
            BlockKind::System => "system",
            BlockKind::Alarms => "alarms",
            BlockKind::Counters => "counters",
        };
        f.write_str(name)
    }
}

/// Location and size of one register block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    /// Modbus address of the first word
    pub address: u16,
    /// Number of words read in one call
    pub count: u16,
}

impl BlockSpec {
    pub const fn new(address: u16, count: u16) -> Self {
        Self { address, count }
    }

    /// Absolute register address of a word inside the block, `None` past 65535.
    pub fn address_of(&self, offset: u16) -> Option<u16> {
        self.address.checked_add(offset)
    }

    /// Whether every word of the block has a register address.
    pub fn fits_address_space(&self) -> bool {
        self.address as u32 + self.count as u32 <= u16::MAX as u32 + 1
    }

    /// Whether `offset` (and `width - 1` following words) fit inside the block.
    pub fn contains(&self, offset: u16, width: u16) -> bool {
        offset as u32 + width as u32 <= self.count as u32
    }
}

/// The words captured by one read call.
///
/// The length always equals the requested count; [`read_block`] rejects
/// anything else. Word `i` therefore always maps to the same logical field
/// for a given register map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSnapshot {
    block: BlockKind,
    address: u16,
    words: Vec<u16>,
}

impl RawSnapshot {
    pub fn new(block: BlockKind, address: u16, words: Vec<u16>) -> Self {
        Self {
            block,
            address,
            words,
        }
    }

    pub fn block(&self) -> BlockKind {
        self.block
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn words(&self) -> &[u16] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Raw word at `offset`, `None` when the offset lies outside the block.
    pub fn word(&self, offset: u16) -> Option<u16> {
        self.words.get(offset as usize).copied()
    }

    /// DINT stored at `offset` (low word) and `offset + 1` (high word).
    pub fn dint(&self, offset: u16) -> Option<i32> {
        Some(codec::compose_dint(
            self.word(offset)?,
            self.word(offset.checked_add(1)?)?,
        ))
    }

    /// UDINT stored at `offset` (low word) and `offset + 1` (high word).
    pub fn udint(&self, offset: u16) -> Option<u32> {
        Some(codec::compose_udint(
            self.word(offset)?,
            self.word(offset.checked_add(1)?)?,
        ))
    }

    /// Signed centi-unit value at `offset`.
    pub fn centi(&self, offset: u16) -> Option<f64> {
        self.word(offset).map(codec::centi)
    }
}
