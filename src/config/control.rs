// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Values the poller pushes into the controller on every cycle

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Keep `register_map.clock_register` at the current local hour
    pub sync_clock: bool,
    /// Forward the side-channel temperature as the external tank temperature
    pub forward_tank_temperature: bool,
}
