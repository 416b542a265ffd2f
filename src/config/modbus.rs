// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP client configuration
//!
//! This module defines where the controller's Modbus TCP server lives and how
//! long a single request may take.

use serde::{Deserialize, Serialize};

/// Configuration of the connection to the controller.
///
/// # Example
///
/// ```
/// use rust_heating_poller::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     address: "192.168.1.20".to_string(),
///     port: 502,
///     unit_id: 1,
///     timeout_ms: 2000,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Host name or IP address of the controller.
    pub address: String,

    /// The TCP port of the controller's Modbus server.
    ///
    /// Valid range is 1-65534. Default value is 502, which is the standard Modbus TCP port.
    pub port: u16,

    /// Modbus unit identifier. The controller answers on unit 0.
    pub unit_id: u8,

    /// Timeout applied to the connection and to every request, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            address: "192.168.178.2".to_string(),
            port: 502, // Standard Modbus TCP port
            unit_id: 0,
            timeout_ms: 3000,
        }
    }
}
