// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll cycle errors and process exit codes

use thiserror::Error;

use crate::control::ControlError;
use crate::decode::DecodeError;
use crate::registers::TransportError;
use crate::store::StoreError;

/// Failure of one poll cycle.
///
/// Optional diagnostic blocks never produce one of these: their read
/// failures only leave the matching snapshot section empty.
#[derive(Error, Debug)]
pub enum PollError {
    /// The controller could not be reached. Nothing was decoded.
    #[error("transport connect failure: {0}")]
    Connect(#[source] TransportError),

    /// The data-ready bit never came up. Nothing was decoded or written.
    #[error("data-ready flag not set after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },

    /// The core measurement block could not be read. Nothing was persisted.
    #[error("failed to read the measurement block: {0}")]
    MeasureRead(#[source] TransportError),

    #[error("failed to decode the measurement block: {0}")]
    Decode(#[from] DecodeError),

    /// A corrective write failed. The decoded snapshot was still persisted.
    #[error("register write failed: {0}")]
    Write(#[from] ControlError),

    /// The record could not be stored. Register writes already performed
    /// are not rolled back.
    #[error("failed to persist the poll record: {0}")]
    Store(#[from] StoreError),
}

impl PollError {
    /// Get the corresponding exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PollError::Connect(_) => 2,
            PollError::HandshakeTimeout { .. } => 3,
            PollError::MeasureRead(_) | PollError::Decode(_) => 4,
            PollError::Store(_) => 5,
            PollError::Write(_) => 1,
        }
    }
}
