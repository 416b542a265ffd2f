// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll cycle orchestration

pub mod cycle;
pub mod handshake;

pub use cycle::{CyclePlan, CycleReport, PollCycle, WriteTarget};
pub use handshake::{Handshake, HandshakeState};
