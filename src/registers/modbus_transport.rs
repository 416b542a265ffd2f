// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP register transport
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The controller is the server, this
//! program is the client.
//!
//! Every request is wrapped in a timeout taken from the `modbus` configuration
//! section. The TCP stream is closed when the transport is dropped, so the
//! connection is released on every exit path; [`ModbusTransport::disconnect`]
//! only makes the shutdown explicit on the success path.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::net::lookup_host;
use tokio::time::timeout;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;

use super::transport::{RegisterTransport, TransportError};
use crate::config::ModbusConfig;

/// Register transport talking Modbus TCP to the controller.
pub struct ModbusTransport {
    ctx: Context,
    peer: SocketAddr,
    timeout: Duration,
}

impl ModbusTransport {
    /// Open a TCP connection to the controller described by `config`.
    pub async fn connect(config: &ModbusConfig) -> Result<Self, TransportError> {
        let target = format!("{}:{}", config.address, config.port);
        let request_timeout = Duration::from_millis(config.timeout_ms);

        let peer = lookup_host(&target)
            .await
            .map_err(|source| TransportError::Connect {
                address: target.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| TransportError::Connect {
                address: target.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "address did not resolve"),
            })?;

        debug!("Connecting to controller at {} (unit {})", peer, config.unit_id);
        let ctx = timeout(
            request_timeout,
            tcp::connect_slave(peer, Slave(config.unit_id)),
        )
        .await
        .map_err(|_| TransportError::Connect {
            address: target.clone(),
            source: io::Error::new(io::ErrorKind::TimedOut, "connection timed out"),
        })?
        .map_err(|source| TransportError::Connect {
            address: target.clone(),
            source,
        })?;

        info!("Connected to controller at {}", peer);
        Ok(Self {
            ctx,
            peer,
            timeout: request_timeout,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Close the connection.
    pub async fn disconnect(mut self) {
        if let Err(e) = self.ctx.disconnect().await {
            warn!("Error while disconnecting from {}: {}", self.peer, e);
        } else {
            debug!("Disconnected from {}", self.peer);
        }
    }

    fn timeout_error(&self, address: u16) -> TransportError {
        TransportError::Timeout {
            address,
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

#[async_trait]
impl RegisterTransport for ModbusTransport {
    async fn read(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let response = timeout(self.timeout, self.ctx.read_holding_registers(address, count))
            .await
            .map_err(|_| self.timeout_error(address))?;
        response?.map_err(TransportError::Exception)
    }

    async fn write(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        debug!("Writing value {} to holding register {}", value, address);
        let response = timeout(
            self.timeout,
            self.ctx.write_single_register(address, value),
        )
        .await
        .map_err(|_| self.timeout_error(address))?;
        response?.map_err(TransportError::Exception)
    }
}
