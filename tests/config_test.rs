// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_heating_poller::config::{Config, RuntimeSource, StatusWordPolarity};
use rust_heating_poller::decode::{ActuatorId, Calibration, Polarity, SensorId};
use std::fs;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

#[test]
fn test_missing_file_is_created_with_defaults() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let config = Config::from_file(&config_path)?;
    assert!(config_path.exists(), "Default config file was not written");
    assert_eq!(config, Config::default());

    // The written file loads back to the same configuration
    let reloaded = Config::from_file(&config_path)?;
    assert_eq!(reloaded, config);
    Ok(())
}

#[test]
fn test_partial_file_keeps_defaults_for_missing_sections() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
modbus:
  address: "10.0.0.17"
  port: 5020
  unit_id: 1
  timeout_ms: 800
firmware:
  status_word_polarity: raw
  runtime_source: counters
actuators:
  channels:
    - id: well_pump
      output_bit: 4
      polarity: inverted
      status_bit: 2
      reason_offset: 26
      runtime_offset: 20
      starts_offset: 23
      override_offset: 15
      counter_index: 0
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.modbus.address, "10.0.0.17");
    assert_eq!(config.modbus.port, 5020);
    assert_eq!(config.firmware.status_word_polarity, StatusWordPolarity::Raw);
    assert_eq!(config.firmware.runtime_source, RuntimeSource::Counters);

    let well = config.actuators.get(ActuatorId::WellPump).unwrap();
    assert_eq!(well.output_bit, 4);
    assert_eq!(well.polarity, Polarity::Inverted);
    assert!(config.actuators.get(ActuatorId::HotWaterPump).is_none());

    assert_eq!(
        config.sensors.get(SensorId::HotWater).unwrap().calibration,
        Calibration::BoilerNtc
    );
    assert_eq!(config.register_map.measure.address, 12320);
    Ok(())
}

#[test]
fn test_schema_violation_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
modbus:
  address: "192.168.178.2"
  port: 99999
  unit_id: 0
  timeout_ms: 3000
"#,
    )?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Out of range port should be rejected");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(sample_path.exists(), "Sample config file was not created");
    let sample = Config::from_file(&sample_path)?;
    assert_eq!(sample.modbus.port, 502);
    Ok(())
}

#[test]
fn test_unknown_calibration_is_rejected() {
    let yaml = r#"
sensors:
  inputs:
    - id: flow
      sample_offset: 0
      calibration: thermocouple
"#;
    let err = Config::validate_document(yaml).unwrap_err();
    assert!(!err.to_string().is_empty());
}

#[test]
fn test_rule_violation_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Schema valid, but the offset lies past the 8-word system block
    fs::write(
        &config_path,
        r#"
register_map:
  system_fields:
    cpu_load: 12
"#,
    )?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(err.to_string().contains("cpu_load"), "unexpected error: {err}");
    assert!(config_path.with_extension("sample.yaml").exists());
    Ok(())
}

#[test]
fn test_save_and_reload_round_trip() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("saved.yaml");

    let mut config = Config::default();
    config.handshake.max_attempts = 3;
    config.side_channel.enabled = false;
    config.store.path = temp_dir.path().join("history").display().to_string();
    config.save_to_file(&config_path)?;

    assert_eq!(Config::from_file(&config_path)?, config);
    Ok(())
}
