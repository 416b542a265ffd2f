// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP controller simulator
//!
//! Serves a [`MemoryRegisterBank`] over Modbus TCP so the poller can be run
//! and tested without the real controller. In Modbus terms the simulator is
//! the slave (server) and the poller the master (client).

use std::future;
use std::io;

use log::{debug, error, info};
use tokio::net::TcpListener;
use tokio_modbus::{
    prelude::*,
    server::tcp::{accept_tcp_connection, Server},
};

use crate::config::{Config, RuntimeSource};
use crate::decode::{ActuatorId, Calibration, OverrideMode, SensorId};
use crate::registers::codec::{encode_centi, split_dint};
use crate::registers::MemoryRegisterBank;

/// Modbus service answering from a shared register bank.
#[derive(Debug, Clone)]
pub struct ControllerSimulator {
    bank: MemoryRegisterBank,
}

impl ControllerSimulator {
    pub fn new(bank: MemoryRegisterBank) -> Self {
        Self { bank }
    }

    pub fn bank(&self) -> &MemoryRegisterBank {
        &self.bank
    }
}

impl tokio_modbus::server::Service for ControllerSimulator {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let res = match req {
            Request::ReadHoldingRegisters(addr, cnt) => self
                .bank
                .register_read(addr, cnt)
                .map(Response::ReadHoldingRegisters),
            Request::ReadInputRegisters(addr, cnt) => self
                .bank
                .register_read(addr, cnt)
                .map(Response::ReadInputRegisters),
            Request::WriteMultipleRegisters(addr, values) => self
                .bank
                .register_write(addr, &values)
                .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16)),
            Request::WriteSingleRegister(addr, value) => self
                .bank
                .register_write(addr, std::slice::from_ref(&value))
                .map(|_| Response::WriteSingleRegister(addr, value)),
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {:?}",
                    req
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };
        future::ready(res)
    }
}

/// Serve `bank` on `listener` until the listener fails.
pub async fn serve(listener: TcpListener, bank: MemoryRegisterBank) -> io::Result<()> {
    let local_addr = listener.local_addr()?;
    info!("Controller simulator listening on {}", local_addr);

    let server = Server::new(listener);

    let on_connected = move |stream, socket_addr| {
        let bank = bank.clone();
        async move {
            accept_tcp_connection(stream, socket_addr, move |socket_addr| {
                debug!("Poller connected from {}", socket_addr);
                Ok(Some(ControllerSimulator::new(bank.clone())))
            })
        }
    };
    let on_process_error = |err| {
        error!("Modbus server error: {err}");
    };

    server.serve(&on_connected, on_process_error).await
}

/// Raw count the controller would sample for `celsius`.
pub fn raw_for(calibration: Calibration, celsius: f64) -> u16 {
    let raw = match calibration {
        Calibration::Pt1000 => celsius * 25.0 + 7134.0,
        Calibration::BoilerNtc => 40536.0 - celsius * 303.1,
        Calibration::SolarNtc => celsius * 60.0 + 26402.0,
        Calibration::Raw => celsius,
    };
    raw.round().clamp(0.0, u16::MAX as f64) as u16
}

fn demo_temperature(sensor: SensorId) -> f64 {
    match sensor {
        SensorId::Flow => 45.0,
        SensorId::Outdoor => 8.0,
        SensorId::Indoor => 21.0,
        SensorId::Boiler => 62.0,
        SensorId::HotWater => 50.0,
        SensorId::Tank => 12000.0,
        SensorId::Return => 38.0,
        SensorId::Solar => 25.0,
    }
}

fn centi_word(celsius: f64) -> u16 {
    encode_centi(celsius).unwrap_or_default()
}

/// Build a plausible register image for `config`'s register map.
///
/// The heating pump runs on heat demand, the other two pumps are off, every
/// block is populated and the data-ready bit is set. The legacy counter block
/// shares its registers with the measurement block and is only laid over it
/// when `firmware.runtime_source` selects the counters.
pub fn demo_bank(config: &Config) -> MemoryRegisterBank {
    let map = &config.register_map;
    let bank = MemoryRegisterBank::new();

    let mut measure = vec![0u16; map.measure.count as usize];
    let mut put = |offset: u16, value: u16| {
        if let Some(word) = measure.get_mut(offset as usize) {
            *word = value;
        }
    };

    for input in &config.sensors.inputs {
        let celsius = demo_temperature(input.id);
        put(input.sample_offset, raw_for(input.calibration, celsius));
        if let Some(offset) = input.controller_offset {
            put(offset, centi_word(celsius));
        }
    }

    let fields = &map.measure_fields;
    put(fields.digital_inputs, 0b0000_0101);
    put(fields.hour_of_day, 14);
    put(fields.delta_t, centi_word(12.0));
    put(fields.firmware_version, 0x0203);
    put(fields.firmware_patch, 7);
    put(fields.serial_number, 4711);

    let mut status = (1u16 << config.handshake.ready_bit) | (1u16 << map.status_bits.mux_phase);
    let mut output_byte = 0u16;
    for channel in &config.actuators.channels {
        let on = channel.id == ActuatorId::HeatingPump;
        if on {
            status |= 1 << channel.status_bit;
        }
        if channel.polarity.load_on(false) != on {
            output_byte |= 1 << channel.output_bit;
        }
        put(channel.reason_offset, if on { 0x02 } else { 0x00 });
        put(channel.runtime_offset, 3600 * (5 + channel.counter_index));
        put(channel.starts_offset, 40 + channel.counter_index);
    }
    put(fields.status_word, status);
    put(fields.output_byte, output_byte);
    bank.load_block(map.measure.address, &measure);

    let f = &map.setpoint_fields;
    let mut setpoints = vec![0u16; map.setpoints.count as usize];
    for (offset, value) in [
        (f.flow_target, centi_word(55.0)),
        (f.hot_water_target, centi_word(48.0)),
        (f.flow_hysteresis, centi_word(3.0)),
        (f.hot_water_hysteresis, centi_word(5.0)),
        (f.night_start, 22),
        (f.night_end, 6),
        (f.night_reduction, centi_word(4.0)),
        (f.frost_limit, centi_word(3.0)),
        (f.run_on_seconds, 120),
    ] {
        if let Some(word) = setpoints.get_mut(offset as usize) {
            *word = value;
        }
    }
    for channel in &config.actuators.channels {
        if let Some(word) = setpoints.get_mut(channel.override_offset as usize) {
            *word = OverrideMode::Auto.encode() as u16;
        }
    }
    bank.load_block(map.setpoints.address, &setpoints);

    let f = &map.system_fields;
    let mut system = vec![0u16; map.system.count as usize];
    let (uptime_low, uptime_high) = split_dint(3 * 86_400 + 5 * 3600 + 17 * 60);
    for (offset, value) in [
        (f.uptime, uptime_low),
        (f.uptime + 1, uptime_high),
        (f.error_count, 0),
        (f.cpu_load, 23),
        (f.cycle_min, 4),
        (f.cycle_max, 19),
        (f.cycle_avg, 7),
    ] {
        if let Some(word) = system.get_mut(offset as usize) {
            *word = value;
        }
    }
    bank.load_block(map.system.address, &system);

    bank.load_block(map.alarms.address, &vec![0u16; map.alarms.count as usize]);
    bank.load_block(map.clock_register, &[14]);

    if config.firmware.runtime_source == RuntimeSource::Measure {
        return bank;
    }
    let mut counters = vec![0u16; map.counters.count as usize];
    let starts_base = config.actuators.channels.len() * 2;
    for channel in &config.actuators.channels {
        let index = channel.counter_index as usize * 2;
        let hours_centi = 100 * (5 + channel.counter_index as i32);
        for (at, value) in [
            (index, hours_centi),
            (starts_base + index, 40 + channel.counter_index as i32),
        ] {
            let (low, high) = split_dint(value);
            if at + 1 < counters.len() {
                counters[at] = low;
                counters[at + 1] = high;
            }
        }
    }
    bank.load_block(map.counters.address, &counters);

    bank
}
