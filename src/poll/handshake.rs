// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Data-ready handshake
//!
//! ```text
//! Idle ──► Polling ──► DataReady
//!            │  ▲
//!            └──┘ (bit clear, attempts left)
//!            │
//!            └──────► Timeout
//! ```
//!
//! The controller raises the data-ready bit once its sampling cycle has
//! completed. The measurement block is read until the bit is set, and the
//! block read in that last attempt is the one handed to the decoder.

use std::time::Duration;

use log::{debug, warn};

use crate::config::HandshakeConfig;
use crate::error::PollError;
use crate::registers::{read_block, BlockKind, BlockSpec, RawSnapshot, RegisterTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    Polling { attempt: u32 },
    DataReady { attempts: u32 },
    Timeout { attempts: u32 },
}

/// Bounded wait for the data-ready bit.
#[derive(Debug, Clone)]
pub struct Handshake {
    block: BlockSpec,
    status_offset: u16,
    ready_bit: u8,
    max_attempts: u32,
    retry_interval: Duration,
    state: HandshakeState,
}

impl Handshake {
    pub fn new(config: &HandshakeConfig, block: BlockSpec, status_offset: u16) -> Self {
        Self {
            block,
            status_offset,
            ready_bit: config.ready_bit,
            max_attempts: config.max_attempts.max(1),
            retry_interval: Duration::from_millis(config.retry_interval_ms),
            state: HandshakeState::Idle,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    fn is_ready(&self, snapshot: &RawSnapshot) -> bool {
        snapshot
            .word(self.status_offset)
            .is_some_and(|status| status & (1 << self.ready_bit) != 0)
    }

    /// Poll the measurement block until the data-ready bit is set.
    ///
    /// Returns the snapshot that carried the bit. A read failure aborts the
    /// wait immediately with [`PollError::MeasureRead`].
    pub async fn wait_for_data<T>(&mut self, transport: &mut T) -> Result<RawSnapshot, PollError>
    where
        T: RegisterTransport + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            self.state = HandshakeState::Polling { attempt };
            let snapshot = read_block(transport, BlockKind::Measure, self.block)
                .await
                .map_err(PollError::MeasureRead)?;

            if self.is_ready(&snapshot) {
                debug!("Data ready after {} attempt(s)", attempt);
                self.state = HandshakeState::DataReady { attempts: attempt };
                return Ok(snapshot);
            }

            debug!(
                "Data-ready bit clear (attempt {}/{})",
                attempt, self.max_attempts
            );
            if attempt < self.max_attempts {
                tokio::time::sleep(self.retry_interval).await;
            }
        }

        warn!(
            "Controller did not signal data ready after {} attempts",
            self.max_attempts
        );
        self.state = HandshakeState::Timeout {
            attempts: self.max_attempts,
        };
        Err(PollError::HandshakeTimeout {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::transport::MockRegisterTransport;
    use crate::registers::TransportError;
    use tokio_modbus::ExceptionCode;

    fn config(max_attempts: u32) -> HandshakeConfig {
        HandshakeConfig {
            ready_bit: 5,
            max_attempts,
            retry_interval_ms: 0,
        }
    }

    fn block(status: u16) -> Vec<u16> {
        let mut words = vec![0u16; 32];
        words[10] = status;
        words
    }

    #[tokio::test]
    async fn test_ready_on_third_attempt() {
        let mut transport = MockRegisterTransport::new();
        let mut answers = vec![block(0), block(1 << 4), block(1 << 5)].into_iter();
        transport
            .expect_read()
            .times(3)
            .returning(move |_, _| Ok(answers.next().unwrap_or_default()));

        let mut handshake = Handshake::new(&config(10), BlockSpec::new(12320, 32), 10);
        let snapshot = handshake.wait_for_data(&mut transport).await.unwrap();
        assert_eq!(snapshot.word(10), Some(1 << 5));
        assert_eq!(handshake.state(), HandshakeState::DataReady { attempts: 3 });
    }

    #[tokio::test]
    async fn test_timeout_after_max_attempts() {
        let mut transport = MockRegisterTransport::new();
        transport
            .expect_read()
            .times(4)
            .returning(|_, _| Ok(block(0)));

        let mut handshake = Handshake::new(&config(4), BlockSpec::new(12320, 32), 10);
        let err = handshake.wait_for_data(&mut transport).await.unwrap_err();
        assert!(matches!(err, PollError::HandshakeTimeout { attempts: 4 }));
        assert_eq!(handshake.state(), HandshakeState::Timeout { attempts: 4 });
    }

    #[tokio::test]
    async fn test_read_failure_aborts() {
        let mut transport = MockRegisterTransport::new();
        transport
            .expect_read()
            .times(1)
            .returning(|_, _| Err(TransportError::Exception(ExceptionCode::ServerDeviceBusy)));

        let mut handshake = Handshake::new(&config(10), BlockSpec::new(12320, 32), 10);
        let err = handshake.wait_for_data(&mut transport).await.unwrap_err();
        assert!(matches!(err, PollError::MeasureRead(_)));
        assert_eq!(handshake.state(), HandshakeState::Polling { attempt: 1 });
    }
}
