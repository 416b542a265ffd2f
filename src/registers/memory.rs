// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-process register bank
//!
//! A `HashMap<u16, u16>` behind an `Arc<Mutex<_>>` that behaves like the
//! controller's holding registers: reading or writing an address that was
//! never populated fails with `IllegalDataAddress`, exactly like the real
//! device. Clones share the same registers, so one clone can be handed to
//! the Modbus simulator while the test inspects another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, error};
use tokio_modbus::ExceptionCode;

use super::transport::{RegisterTransport, TransportError};

/// Shared, thread-safe register image.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegisterBank {
    registers: Arc<Mutex<HashMap<u16, u16>>>,
    writes: Arc<Mutex<Vec<(u16, u16)>>>,
}

impl MemoryRegisterBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate `words.len()` consecutive registers starting at `address`.
    pub fn with_block(self, address: u16, words: &[u16]) -> Self {
        self.load_block(address, words);
        self
    }

    /// Populate (or overwrite) consecutive registers starting at `address`.
    pub fn load_block(&self, address: u16, words: &[u16]) {
        let mut registers = self.registers();
        for (i, word) in words.iter().enumerate() {
            registers.insert(address + i as u16, *word);
        }
    }

    /// Remove a block so that reads touching it fail.
    pub fn remove_block(&self, address: u16, count: u16) {
        let mut registers = self.registers();
        for i in 0..count {
            registers.remove(&(address + i));
        }
    }

    /// Set one register, creating it when missing.
    pub fn set(&self, address: u16, value: u16) {
        self.registers().insert(address, value);
    }

    pub fn get(&self, address: u16) -> Option<u16> {
        self.registers().get(&address).copied()
    }

    /// Every successful write seen so far, in order.
    pub fn writes(&self) -> Vec<(u16, u16)> {
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Read registers the way a Modbus server answers a holding-register request.
    pub fn register_read(&self, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
        let registers = self.registers();
        let mut response_values = vec![0; cnt.into()];

        for i in 0..cnt {
            let reg_addr = addr.wrapping_add(i);
            match registers.get(&reg_addr) {
                Some(r) => response_values[i as usize] = *r,
                None => {
                    error!(
                        "Exception::IllegalDataAddress - Register {} not found",
                        reg_addr
                    );
                    return Err(ExceptionCode::IllegalDataAddress);
                }
            }
        }

        debug!("Read {} registers from address {}", cnt, addr);
        Ok(response_values)
    }

    /// Write registers the way a Modbus server answers a write request.
    ///
    /// Only existing registers can be written.
    pub fn register_write(&self, addr: u16, values: &[u16]) -> Result<(), ExceptionCode> {
        let mut registers = self.registers();

        let all_present = (0..values.len())
            .all(|i| registers.contains_key(&addr.wrapping_add(i as u16)));
        if !all_present {
            error!(
                "Exception::IllegalDataAddress - write of {} values at {} touches unknown registers",
                values.len(),
                addr
            );
            return Err(ExceptionCode::IllegalDataAddress);
        }

        let mut writes = self
            .writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for (i, value) in values.iter().enumerate() {
            let reg_addr = addr.wrapping_add(i as u16);
            registers.insert(reg_addr, *value);
            writes.push((reg_addr, *value));
            debug!("Written value {} to register {}", value, reg_addr);
        }
        Ok(())
    }

    fn registers(&self) -> MutexGuard<'_, HashMap<u16, u16>> {
        self.registers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RegisterTransport for MemoryRegisterBank {
    async fn read(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        self.register_read(address, count)
            .map_err(TransportError::Exception)
    }

    async fn write(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        self.register_write(address, std::slice::from_ref(&value))
            .map_err(TransportError::Exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read_observes_value() {
        let mut bank = MemoryRegisterBank::new().with_block(12384, &[0; 16]);
        bank.write(12397, 0xFFFF).await.unwrap();
        assert_eq!(bank.read(12397, 1).await.unwrap(), vec![0xFFFF]);
        assert_eq!(bank.writes(), vec![(12397, 0xFFFF)]);
    }

    #[tokio::test]
    async fn test_unknown_registers_are_rejected() {
        let mut bank = MemoryRegisterBank::new().with_block(100, &[1, 2, 3]);
        assert!(matches!(
            bank.read(101, 3).await,
            Err(TransportError::Exception(ExceptionCode::IllegalDataAddress))
        ));
        assert!(bank.write(200, 1).await.is_err());
        assert!(bank.writes().is_empty());
    }

    #[test]
    fn test_clones_share_registers() {
        let bank = MemoryRegisterBank::new().with_block(0, &[0; 4]);
        let other = bank.clone();
        other.set(2, 42);
        assert_eq!(bank.get(2), Some(42));
        bank.remove_block(0, 4);
        assert_eq!(other.get(2), None);
    }
}
