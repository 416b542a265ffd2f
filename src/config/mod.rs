// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the heating poller
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before it is deserialized.
//!
//! ## Configuration Structure
//!
//! - `modbus`: where the controller lives and the request timeout
//! - `register_map`: block addresses, sizes and field offsets
//! - `sensors`: analog inputs and their calibration
//! - `actuators`: output bits, polarity and register locations of every pump
//! - `firmware`: firmware generation flags used by the decoder
//! - `handshake`: bounded wait for the data-ready bit
//! - `side_channel`: pub/sub source of the external temperature
//! - `control`: values pushed into the controller every cycle
//! - `store`: history store location
//!
//! ## Usage
//!
//! ```no_run
//! use rust_heating_poller::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("heating.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("10.0.0.5".to_string()), // Controller address
//!     Some(502),                    // Controller port
//!     Some(false),                  // Persist
//!     None,                         // Side channel
//! );
//!
//! println!("Controller: {}:{}", config.modbus.address, config.modbus.port);
//! ```

pub mod actuators;
pub mod control;
pub mod firmware;
pub mod handshake;
pub mod modbus;
pub mod register_map;
pub mod sensors;
pub mod side_channel;
pub mod store;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use actuators::{ActuatorConfig, ActuatorsConfig};
pub use control::ControlConfig;
pub use firmware::{FirmwareConfig, RuntimeSource, StatusWordPolarity};
pub use handshake::HandshakeConfig;
pub use modbus::ModbusConfig;
pub use register_map::{
    AlarmFields, MeasureFields, RegisterMapConfig, SetpointFields, StatusBits, SystemFields,
};
pub use sensors::{SensorConfig, SensorsConfig};
pub use side_channel::SideChannelConfig;
pub use store::StoreConfig;
pub use utils::{is_valid_host, output_config_schema};

/// Root configuration structure of the heating poller.
///
/// Every section falls back to its defaults when it is missing from the
/// file, so an empty file describes the stock installation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Connection to the controller.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Register block layout.
    ///
    /// Hardware or firmware revisions that move fields around are a change
    /// here, never in the decoder.
    #[serde(default)]
    pub register_map: RegisterMapConfig,

    #[serde(default)]
    pub sensors: SensorsConfig,

    #[serde(default)]
    pub actuators: ActuatorsConfig,

    /// Firmware generation flags.
    #[serde(default)]
    pub firmware: FirmwareConfig,

    #[serde(default)]
    pub handshake: HandshakeConfig,

    /// External temperature source.
    ///
    /// The value is optional: when the channel stays silent the record is
    /// written without it.
    #[serde(default)]
    pub side_channel: SideChannelConfig,

    #[serde(default)]
    pub control: ControlConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        // Create parent directories if they don't exist
        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        Self::validate_document(&contents)
            .with_context(|| format!("Configuration validation failed for {:?}", path))
            .inspect_err(|_| {
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
            })?;

        // Now that YAML has been validated, deserialize to Config
        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        // Perform additional specific validations
        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Validate a YAML document against the embedded JSON schema.
    pub fn validate_document(contents: &str) -> Result<()> {
        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        // Load and validate with the schema
        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            anyhow::bail!("{}", error);
        }
        Ok(())
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided override the loaded configuration.
    ///
    /// # Parameters
    ///
    /// * `modbus_address` - Host name or IP address of the controller
    /// * `modbus_port` - TCP port of the controller
    /// * `persist` - Enable or disable the history store for this run
    /// * `side_channel` - Enable or disable the external temperature source
    pub fn apply_args(
        &mut self,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
        persist: Option<bool>,
        side_channel: Option<bool>,
    ) {
        if let Some(address) = modbus_address {
            debug!("Overriding Modbus address from command line: {}", address);
            self.modbus.address = address;
        }

        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }

        if let Some(persist) = persist {
            debug!("Overriding history store enabled from command line: {}", persist);
            self.store.enabled = persist;
        }

        if let Some(enabled) = side_channel {
            debug!("Overriding side channel enabled from command line: {}", enabled);
            self.side_channel.enabled = enabled;
        }
    }
}
