// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use std::collections::HashSet;

use anyhow::{Context, Result};
use log::debug;

use super::Config;
use crate::registers::BlockSpec;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./heating_poller --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    // Parse the schema to a JSON Value to pretty-format it
    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string looks like a usable controller address
///
/// Accepts IPv4/IPv6 literals and plain host names.
pub fn is_valid_host(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    !addr.is_empty()
        && addr.len() <= 253
        && addr
            .split('.')
            .all(|label| {
                !label.is_empty()
                    && !label.starts_with('-')
                    && !label.ends_with('-')
                    && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            })
}

fn check_offset(block_name: &str, block: &BlockSpec, field: &str, offset: u16, width: u16) -> Result<()> {
    if !block.contains(offset, width) {
        anyhow::bail!(
            "{} offset {} of field '{}' lies outside the {} block ({} words)",
            if width > 1 { "Double-word" } else { "Word" },
            offset,
            field,
            block_name,
            block.count
        );
    }
    Ok(())
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Port Range**: the controller port is within 1-65534
/// - **Address Format**: the controller address is an IP literal or a host name
/// - **Blocks**: every block ends at or below register 65535
/// - **Offsets**: every configured offset lies inside its block, so decoding
///   never indexes past a snapshot
/// - **Uniqueness**: sensor and actuator ids appear once, output bits and
///   status bits are not shared between actuators
/// - **Bits**: output bits fit in a byte, status bits in a word, and pump
///   status bits do not collide with the data-ready bit
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.modbus.port < 1 || config.modbus.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.modbus.port);
    }

    if !is_valid_host(&config.modbus.address) {
        anyhow::bail!("Invalid controller address: {}", config.modbus.address);
    }

    let map = &config.register_map;

    for (name, block) in [
        ("measure", &map.measure),
        ("setpoints", &map.setpoints),
        ("system", &map.system),
        ("alarms", &map.alarms),
        ("counters", &map.counters),
    ] {
        if !block.fits_address_space() {
            anyhow::bail!(
                "The {} block ({} words at {}) runs past register 65535",
                name,
                block.count,
                block.address
            );
        }
    }

    let m = &map.measure_fields;
    for (field, offset) in [
        ("digital_inputs", m.digital_inputs),
        ("hour_of_day", m.hour_of_day),
        ("status_word", m.status_word),
        ("delta_t", m.delta_t),
        ("firmware_version", m.firmware_version),
        ("firmware_patch", m.firmware_patch),
        ("serial_number", m.serial_number),
        ("output_byte", m.output_byte),
    ] {
        check_offset("measure", &map.measure, field, offset, 1)?;
    }

    let s = &map.setpoint_fields;
    for (field, offset) in [
        ("flow_target", s.flow_target),
        ("hot_water_target", s.hot_water_target),
        ("flow_hysteresis", s.flow_hysteresis),
        ("hot_water_hysteresis", s.hot_water_hysteresis),
        ("night_start", s.night_start),
        ("night_end", s.night_end),
        ("night_reduction", s.night_reduction),
        ("frost_limit", s.frost_limit),
        ("run_on_seconds", s.run_on_seconds),
        ("external_tank_temperature", s.external_tank_temperature),
    ] {
        check_offset("setpoints", &map.setpoints, field, offset, 1)?;
    }

    let sys = &map.system_fields;
    check_offset("system", &map.system, "uptime", sys.uptime, 2)?;
    for (field, offset) in [
        ("error_count", sys.error_count),
        ("cpu_load", sys.cpu_load),
        ("cycle_min", sys.cycle_min),
        ("cycle_max", sys.cycle_max),
        ("cycle_avg", sys.cycle_avg),
    ] {
        check_offset("system", &map.system, field, offset, 1)?;
    }
    check_offset(
        "alarms",
        &map.alarms,
        "sensor_alarms",
        map.alarm_fields.sensor_alarms,
        1,
    )?;

    let mut sensor_ids = HashSet::new();
    for sensor in &config.sensors.inputs {
        if !sensor_ids.insert(sensor.id) {
            anyhow::bail!("Sensor {} is configured more than once", sensor.id);
        }
        check_offset("measure", &map.measure, "sample_offset", sensor.sample_offset, 1)?;
        if let Some(offset) = sensor.controller_offset {
            check_offset("measure", &map.measure, "controller_offset", offset, 1)?;
        }
    }

    let ready_bit = config.handshake.ready_bit;
    if ready_bit > 15 {
        anyhow::bail!("Data-ready bit {} does not fit in the status word", ready_bit);
    }
    let bits = &map.status_bits;
    for (field, bit) in [
        ("night_mode", bits.night_mode),
        ("mux_phase", bits.mux_phase),
        ("sensor_error", bits.sensor_error),
    ] {
        if bit > 15 {
            anyhow::bail!("Status bit '{}' ({}) does not fit in the status word", field, bit);
        }
    }

    let mut actuator_ids = HashSet::new();
    let mut output_bits = HashSet::new();
    let mut status_bits = HashSet::new();
    for channel in &config.actuators.channels {
        if !actuator_ids.insert(channel.id) {
            anyhow::bail!("Actuator {} is configured more than once", channel.id);
        }
        if channel.output_bit > 7 {
            anyhow::bail!(
                "Output bit {} of {} does not fit in the output byte",
                channel.output_bit,
                channel.id
            );
        }
        if channel.status_bit > 15 || channel.status_bit == ready_bit {
            anyhow::bail!(
                "Status bit {} of {} is out of range or collides with the data-ready bit",
                channel.status_bit,
                channel.id
            );
        }
        if !output_bits.insert(channel.output_bit) {
            anyhow::bail!("Output bit {} is shared by two actuators", channel.output_bit);
        }
        if !status_bits.insert(channel.status_bit) {
            anyhow::bail!("Status bit {} is shared by two actuators", channel.status_bit);
        }
        check_offset("measure", &map.measure, "reason_offset", channel.reason_offset, 1)?;
        check_offset("measure", &map.measure, "runtime_offset", channel.runtime_offset, 1)?;
        check_offset("measure", &map.measure, "starts_offset", channel.starts_offset, 1)?;
        check_offset(
            "setpoints",
            &map.setpoints,
            "override_offset",
            channel.override_offset,
            1,
        )?;
        let counter_runtime = channel.counter_index * 2;
        let counter_starts = counter_runtime + config.actuators.channels.len() as u16 * 2;
        check_offset("counters", &map.counters, "counter_index", counter_runtime, 2)?;
        check_offset("counters", &map.counters, "counter_index", counter_starts, 2)?;
    }

    if config.handshake.max_attempts == 0 {
        anyhow::bail!("handshake.max_attempts must be at least 1");
    }

    Ok(())
}
