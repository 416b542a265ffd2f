// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use rust_heating_poller::config::Config;
use rust_heating_poller::registers::codec::{compose_udint, split_dint};
use rust_heating_poller::simulator::{demo_bank, serve};
use tokio::net::TcpListener;

/// Modbus TCP simulator of the heating controller register bank
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// Listen port
    #[arg(long, default_value_t = 5020)]
    port: u16,

    /// Configuration file providing the register map (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.address, args.port))?;
    let listener = TcpListener::bind(socket_addr).await?;

    let bank = demo_bank(&config);

    // Tick the uptime counter and the multiplexer phase once per second.
    let ticker = bank.clone();
    let map = &config.register_map;
    let uptime_at = map
        .system
        .address_of(map.system_fields.uptime)
        .context("Uptime register lies past the address space")?;
    let uptime_high_at = uptime_at
        .checked_add(1)
        .context("Uptime register lies past the address space")?;
    let status_at = map
        .measure
        .address_of(map.measure_fields.status_word)
        .context("Status word lies past the address space")?;
    let mux_mask = 1u16 << map.status_bits.mux_phase;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            if let (Some(low), Some(high)) = (ticker.get(uptime_at), ticker.get(uptime_high_at)) {
                let (low, high) = split_dint(compose_udint(low, high).wrapping_add(1) as i32);
                ticker.set(uptime_at, low);
                ticker.set(uptime_high_at, high);
            }
            if let Some(status) = ticker.get(status_at) {
                ticker.set(status_at, status ^ mux_mask);
            }
            debug!("Simulator tick");
        }
    });

    info!("Serving the demo register image on {}", socket_addr);
    serve(listener, bank).await?;
    Ok(())
}
