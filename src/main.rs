// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the heating controller poller
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use chrono::{Local, Timelike};
use clap::{Parser, ValueEnum};
use log::{debug, error, info};

use rust_heating_poller::config::{self, Config};
use rust_heating_poller::control::{OverrideRequest, ScheduleWindow};
use rust_heating_poller::decode::{ActuatorId, OverrideMode};
use rust_heating_poller::poll::{CyclePlan, PollCycle};
use rust_heating_poller::registers::ModbusTransport;
use rust_heating_poller::report;
use rust_heating_poller::side_channel::{self, RedisValueSource};
use rust_heating_poller::store::{HistoryStore, JsonLinesStore, LATEST_VERSION};
use rust_heating_poller::PollError;

/// Exit code for configuration and other failures
const EXIT_FAILURE: u8 = 1;

/// Requested pump override mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OverrideArg {
    Auto,
    ForceOn,
    ForceOff,
}

impl From<OverrideArg> for OverrideMode {
    fn from(arg: OverrideArg) -> Self {
        match arg {
            OverrideArg::Auto => OverrideMode::Auto,
            OverrideArg::ForceOn => OverrideMode::ForceOn,
            OverrideArg::ForceOff => OverrideMode::ForceOff,
        }
    }
}

/// Poll, decode and persist one cycle of a WAGO 750-881 heating controller
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Controller address
    #[arg(long)]
    modbus_address: Option<String>,

    /// Controller Modbus TCP port
    #[arg(long)]
    modbus_port: Option<u16>,

    /// Override mode of the hot-water pump
    #[arg(long, value_enum)]
    hot_water_pump: Option<OverrideArg>,

    /// Override mode of the heating-circuit pump
    #[arg(long, value_enum)]
    heating_pump: Option<OverrideArg>,

    /// Override mode of the well pump
    #[arg(long, value_enum)]
    well_pump: Option<OverrideArg>,

    /// Hour at which the night window starts (0-23)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=23))]
    night_start: Option<u8>,

    /// Hour at which the night window ends (0-23)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=23))]
    night_end: Option<u8>,

    /// Write the current hour to the controller clock register
    #[arg(long)]
    sync_clock: bool,

    /// Tank temperature in °C to forward to the controller
    #[arg(long, allow_hyphen_values = true)]
    tank_temperature: Option<f64>,

    /// Do not write the cycle to the history store
    #[arg(long)]
    no_persist: bool,

    /// Do not wait for the external temperature
    #[arg(long)]
    no_side_channel: bool,

    /// Print the decoded cycle as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn plan(&self) -> CyclePlan {
        let overrides = [
            (ActuatorId::HotWaterPump, self.hot_water_pump),
            (ActuatorId::HeatingPump, self.heating_pump),
            (ActuatorId::WellPump, self.well_pump),
        ]
        .into_iter()
        .filter_map(|(actuator, mode)| {
            mode.map(|mode| OverrideRequest {
                actuator,
                mode: mode.into(),
            })
        })
        .collect();

        CyclePlan {
            overrides,
            schedule: ScheduleWindow {
                night_start: self.night_start,
                night_end: self.night_end,
            },
            tank_temperature: self.tank_temperature,
            ..Default::default()
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    // One cycle, strictly sequential
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start the async runtime: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn exit_code(err: &PollError) -> u8 {
    u8::try_from(err.exit_code()).unwrap_or(EXIT_FAILURE)
}

async fn run(args: Args) -> Result<u8> {
    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        config::output_config_schema()?;
        return Ok(0);
    }

    // Validate configuration file if --validate-config is set
    if let Some(validate_path) = &args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {:#}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(0);
    }

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    // Apply command line overrides
    config.apply_args(
        args.modbus_address.clone(),
        args.modbus_port,
        args.no_persist.then_some(false),
        args.no_side_channel.then_some(false),
    );

    // External temperature: one bounded receive, absent on any failure
    let external_temperature = if config.side_channel.enabled {
        let mut source = RedisValueSource::from_config(&config.side_channel);
        side_channel::receive_or_absent(
            &mut source,
            Duration::from_millis(config.side_channel.timeout_ms),
        )
        .await
    } else {
        debug!("Side channel disabled");
        None
    };

    let mut plan = args.plan();
    if args.sync_clock || config.control.sync_clock {
        plan.clock_hour = u8::try_from(Local::now().hour()).ok();
    }
    if plan.tank_temperature.is_none() && config.control.forward_tank_temperature {
        plan.tank_temperature = external_temperature;
    }
    if !plan.is_empty() {
        info!(
            "Requested {} override(s), night window {:?}, clock {:?}, tank {:?}",
            plan.overrides.len(),
            plan.schedule,
            plan.clock_hour,
            plan.tank_temperature
        );
    }

    let mut store = if config.store.enabled {
        let opened = JsonLinesStore::open(&config.store.path).and_then(|mut store| {
            let applied = store.migrate_to(LATEST_VERSION)?;
            if !applied.is_empty() {
                info!("Applied history schema migrations {:?}", applied);
            }
            Ok(store)
        });
        match opened {
            Ok(store) => Some(store),
            Err(e) => {
                let err = PollError::Store(e);
                error!("{}", err);
                return Ok(exit_code(&err));
            }
        }
    } else {
        None
    };

    let mut transport = match ModbusTransport::connect(&config.modbus).await {
        Ok(transport) => transport,
        Err(e) => {
            let err = PollError::Connect(e);
            error!("{}", err);
            return Ok(exit_code(&err));
        }
    };

    debug!("Polling controller at {}", transport.peer());
    let cycle = PollCycle::new(&config, plan);
    let result = cycle
        .run(
            &mut transport,
            store.as_mut().map(|s| s as &mut dyn HistoryStore),
            external_temperature,
        )
        .await;
    transport.disconnect().await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!("Poll cycle failed: {}", e);
            return Ok(exit_code(&e));
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report::to_json(&report))?);
    } else {
        for line in report::summary_lines(&report) {
            println!("{}", line);
        }
    }

    match report.write_error {
        Some(e) => {
            let err = PollError::Write(e);
            error!("{}", err);
            Ok(exit_code(&err))
        }
        None => Ok(0),
    }
}
