// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust heating poller library
//!
//! Reads the register bank of a WAGO 750-881 based heating controller over
//! Modbus TCP, decodes it into temperatures, pump states and diagnostics,
//! optionally writes pump overrides and the night window, and appends one
//! record per cycle to a versioned history store.

pub mod config;
pub mod control;
pub mod decode;
pub mod error;
pub mod poll;
pub mod registers;
pub mod report;
pub mod side_channel;
pub mod simulator;
pub mod store;

pub use error::PollError;
