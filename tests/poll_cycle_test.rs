// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End-to-end poll cycles against an in-memory register bank
//!
//! The bank answers like the controller running the current firmware: every
//! block of the default register map is populated unless a test removes it,
//! and reads of missing registers fail with `IllegalDataAddress`. The legacy
//! counter block shares words 16..28 of the measurement block, so it is not
//! loaded separately.

use approx::assert_relative_eq;
use async_trait::async_trait;
use rust_heating_poller::config::{Config, RuntimeSource};
use rust_heating_poller::control::{
    ControlError, OverrideRequest, ScheduleField, ScheduleWindow, WriteOutcome,
};
use rust_heating_poller::decode::{ActuatorId, OverrideMode, SensorId};
use rust_heating_poller::poll::{CyclePlan, PollCycle, WriteTarget};
use rust_heating_poller::registers::codec::split_dint;
use rust_heating_poller::registers::{MemoryRegisterBank, RegisterTransport, TransportError};
use rust_heating_poller::store::{HistoryStore, MemoryStore, LATEST_VERSION};
use rust_heating_poller::PollError;
use serde_json::{json, Value};

const MEASURE: u16 = 12320;
const SETPOINTS: u16 = 12384;
const SYSTEM: u16 = 12416;
const ALARMS: u16 = 12432;
const COUNTERS: u16 = 12336;
const CLOCK: u16 = 12288;

const READY: u16 = 1 << 5;

fn measure_block(status: u16) -> Vec<u16> {
    let mut words = vec![0u16; 32];
    words[0] = 10000; // flow
    words[1] = 8000; // outdoor
    words[2] = 12000; // indoor
    words[3] = 9000; // boiler
    words[4] = 46000; // hot water, outside the NTC window
    words[10] = status;
    words[11] = 1250;
    words[15] = 0x0102;
    words[16] = 3;
    words[17] = 815;
    words[18] = 7200; // hot-water pump runtime seconds
    words[21] = 12; // hot-water pump starts
    words[25] = 0x02; // heating pump: heat demand
    words[31] = 0x02; // bit1 set: hot-water pump off (inverted)
    words
}

fn controller(status: u16) -> MemoryRegisterBank {
    let mut system = vec![0u16; 8];
    let (low, high) = split_dint(90_061);
    system[0] = low;
    system[1] = high;
    system[2] = 4;
    system[3] = 37;

    MemoryRegisterBank::new()
        .with_block(MEASURE, &measure_block(status))
        .with_block(SETPOINTS, &[0u16; 16])
        .with_block(SYSTEM, &system)
        .with_block(ALARMS, &[0x0004, 0, 0, 0, 0, 0, 0, 0])
        .with_block(CLOCK, &[0u16; 16])
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.handshake.max_attempts = 3;
    config.handshake.retry_interval_ms = 1;
    config
}

fn force_on(actuator: ActuatorId) -> CyclePlan {
    CyclePlan {
        overrides: vec![OverrideRequest {
            actuator,
            mode: OverrideMode::ForceOn,
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_end_to_end_cycle() {
    let config = fast_config();
    let mut bank = controller(READY);
    let mut store = MemoryStore::at_version(LATEST_VERSION).unwrap();

    let report = PollCycle::new(&config, CyclePlan::default())
        .run(&mut bank, Some(&mut store), Some(6.5))
        .await
        .unwrap();

    let snapshot = &report.snapshot;
    assert_eq!(report.handshake_attempts, 1);
    assert_relative_eq!(
        snapshot.sensor(SensorId::Flow).unwrap().value.unwrap(),
        114.64,
        epsilon = 1e-9
    );
    assert_eq!(snapshot.sensor(SensorId::HotWater).unwrap().value, None);
    assert!(!snapshot.actuator(ActuatorId::HotWaterPump).unwrap().physical_on);
    assert!(snapshot.actuator(ActuatorId::HeatingPump).unwrap().physical_on);
    assert_eq!(snapshot.firmware.version(), "1.2.3");
    assert_eq!(snapshot.system.unwrap().uptime_parts(), (1, 1, 1));
    assert!(snapshot.alarms.unwrap().boiler);
    assert!(report.writes.is_empty());
    assert!(bank.writes().is_empty());

    assert_eq!(report.persisted_version, Some(LATEST_VERSION));
    let record = &store.records()[0];
    assert_eq!(record.get("temp_flow"), Some(&json!(114.64)));
    assert_eq!(record.get("temp_hot_water"), Some(&Value::Null));
    assert_eq!(record.get("hot_water_pump_on"), Some(&json!(false)));
    assert_eq!(record.get("heating_pump_reason"), Some(&json!("heat demand")));
    assert_eq!(record.get("hot_water_pump_runtime_hours"), Some(&json!(2.0)));
    assert_eq!(record.get("hot_water_pump_starts"), Some(&json!(12)));
    assert_eq!(record.get("external_temperature"), Some(&json!(6.5)));
    assert_eq!(record.get("uptime_seconds"), Some(&json!(90_061)));
    assert_eq!(record.get("sensor_alarms"), Some(&json!(4)));
    assert_eq!(record.get("sensor_group"), Some(&json!("B")));
}

#[tokio::test]
async fn test_handshake_timeout_writes_nothing() {
    let config = fast_config();
    let mut bank = controller(0);
    let mut store = MemoryStore::at_version(LATEST_VERSION).unwrap();

    let err = PollCycle::new(&config, force_on(ActuatorId::HotWaterPump))
        .run(&mut bank, Some(&mut store), None)
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::HandshakeTimeout { attempts: 3 }));
    assert_eq!(err.exit_code(), 3);
    assert!(bank.writes().is_empty());
    assert!(store.records().is_empty());
}

/// Sets the data-ready bit once the measurement block has been read `after` times.
struct ReadyAfter {
    bank: MemoryRegisterBank,
    reads: u32,
    after: u32,
}

#[async_trait]
impl RegisterTransport for ReadyAfter {
    async fn read(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        if address == MEASURE {
            self.reads += 1;
            if self.reads == self.after {
                self.bank.set(MEASURE + 10, READY);
            }
        }
        self.bank.read(address, count).await
    }

    async fn write(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        self.bank.write(address, value).await
    }
}

#[tokio::test]
async fn test_ready_bit_on_a_later_attempt() {
    let config = fast_config();
    let mut transport = ReadyAfter {
        bank: controller(0),
        reads: 0,
        after: 3,
    };

    let report = PollCycle::new(&config, CyclePlan::default())
        .run(&mut transport, None, None)
        .await
        .unwrap();

    assert_eq!(report.handshake_attempts, 3);
    assert!(report.snapshot.status.data_ready);
    assert_eq!(report.persisted_version, None);
}

#[tokio::test]
async fn test_missing_diagnostic_blocks_still_persist() {
    let config = fast_config();
    let mut bank = controller(READY);
    bank.remove_block(SYSTEM, 8);
    bank.remove_block(ALARMS, 8);
    let mut store = MemoryStore::at_version(LATEST_VERSION).unwrap();

    let report = PollCycle::new(&config, CyclePlan::default())
        .run(&mut bank, Some(&mut store), None)
        .await
        .unwrap();

    assert!(report.snapshot.system.is_none());
    assert!(report.snapshot.alarms.is_none());
    let record = &store.records()[0];
    assert_eq!(record.get("temp_flow"), Some(&json!(114.64)));
    assert_eq!(record.get("uptime_seconds"), Some(&Value::Null));
    assert_eq!(record.get("sensor_alarms"), Some(&Value::Null));
}

#[tokio::test]
async fn test_missing_setpoint_block_leaves_overrides_unknown() {
    let config = fast_config();
    let mut bank = controller(READY);
    bank.remove_block(SETPOINTS, 16);
    let mut store = MemoryStore::at_version(3).unwrap();

    let report = PollCycle::new(&config, CyclePlan::default())
        .run(&mut bank, Some(&mut store), None)
        .await
        .unwrap();

    assert!(report.snapshot.setpoints.is_none());
    assert_eq!(
        store.records()[0].get("heating_pump_override"),
        Some(&Value::Null)
    );
}

#[tokio::test]
async fn test_missing_measure_block_persists_nothing() {
    let config = fast_config();
    let mut bank = controller(READY);
    bank.remove_block(MEASURE, 32);
    let mut store = MemoryStore::at_version(LATEST_VERSION).unwrap();

    let err = PollCycle::new(&config, CyclePlan::default())
        .run(&mut bank, Some(&mut store), None)
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::MeasureRead(_)));
    assert_eq!(err.exit_code(), 4);
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_override_is_written_once() {
    let config = fast_config();
    let mut bank = controller(READY);

    let cycle = PollCycle::new(&config, force_on(ActuatorId::HotWaterPump));
    let report = cycle.run(&mut bank, None, None).await.unwrap();
    assert_eq!(bank.writes(), vec![(SETPOINTS + 13, 1)]);
    assert_eq!(
        report.writes,
        vec![(
            WriteTarget::Override(ActuatorId::HotWaterPump),
            WriteOutcome::Written {
                previous: 0,
                value: 1
            }
        )]
    );

    // Same instruction again: the register already holds it
    let report = cycle.run(&mut bank, None, None).await.unwrap();
    assert_eq!(bank.writes().len(), 1);
    assert!(!report.writes[0].1.was_written());
    assert_eq!(
        report
            .snapshot
            .actuator(ActuatorId::HotWaterPump)
            .unwrap()
            .override_mode,
        Some(OverrideMode::ForceOn)
    );
}

#[tokio::test]
async fn test_no_instruction_no_write() {
    let config = fast_config();
    let mut bank = controller(READY);
    bank.set(SETPOINTS + 14, 0xFFFF);

    let report = PollCycle::new(&config, CyclePlan::default())
        .run(&mut bank, None, None)
        .await
        .unwrap();

    assert!(bank.writes().is_empty());
    assert_eq!(
        report
            .snapshot
            .actuator(ActuatorId::HeatingPump)
            .unwrap()
            .override_mode,
        Some(OverrideMode::ForceOff)
    );
}

#[tokio::test]
async fn test_night_window_write() {
    let config = fast_config();
    let mut bank = controller(READY);
    bank.set(SETPOINTS + 4, 22);
    bank.set(SETPOINTS + 5, 6);

    let plan = CyclePlan {
        schedule: ScheduleWindow {
            night_start: Some(22),
            night_end: Some(5),
        },
        ..Default::default()
    };
    let report = PollCycle::new(&config, plan)
        .run(&mut bank, None, None)
        .await
        .unwrap();

    assert_eq!(bank.writes(), vec![(SETPOINTS + 5, 5)]);
    assert_eq!(report.writes.len(), 2);
    assert_eq!(
        report.writes[1],
        (
            WriteTarget::Schedule(ScheduleField::NightEnd),
            WriteOutcome::Written {
                previous: 6,
                value: 5
            }
        )
    );
}

#[tokio::test]
async fn test_store_failure_keeps_register_writes() {
    let config = fast_config();
    let mut bank = controller(READY);
    let mut store = MemoryStore::at_version(LATEST_VERSION).unwrap();
    store.reject_appends(true);

    let err = PollCycle::new(&config, force_on(ActuatorId::WellPump))
        .run(&mut bank, Some(&mut store), None)
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::Store(_)));
    assert_eq!(err.exit_code(), 5);
    assert_eq!(bank.get(SETPOINTS + 15), Some(1));
}

#[tokio::test]
async fn test_schema_gate_follows_store_version() {
    let config = fast_config();
    let mut bank = controller(READY);
    let mut store = MemoryStore::at_version(6).unwrap();

    let cycle = PollCycle::new(&config, CyclePlan::default());
    cycle.run(&mut bank, Some(&mut store), None).await.unwrap();
    store.migrate_to(7).unwrap();
    let report = cycle.run(&mut bank, Some(&mut store), None).await.unwrap();

    assert_eq!(report.persisted_version, Some(7));
    let (v6, v7) = (&store.records()[0], &store.records()[1]);
    assert!(!v6.contains("hot_water_pump_runtime_hours"));
    assert_eq!(v7.get("hot_water_pump_runtime_hours"), Some(&json!(2.0)));
    assert!(!v7.contains("uptime_seconds"));
    for key in v6.keys().filter(|k| k.as_str() != "timestamp") {
        assert_eq!(v6.get(key), v7.get(key), "field {} changed", key);
    }
}

#[tokio::test]
async fn test_runtime_from_legacy_counters() {
    let mut config = fast_config();
    config.firmware.runtime_source = RuntimeSource::Counters;
    let mut bank = controller(READY);

    // heating pump: 1234.56 h, 77 starts
    let (low, high) = split_dint(123_456);
    bank.set(COUNTERS + 2, low);
    bank.set(COUNTERS + 3, high);
    bank.set(COUNTERS + 8, 77);

    let report = PollCycle::new(&config, CyclePlan::default())
        .run(&mut bank, None, None)
        .await
        .unwrap();

    let runtime = report.snapshot.runtime.unwrap();
    let heating = runtime
        .iter()
        .find(|r| r.actuator == ActuatorId::HeatingPump)
        .unwrap();
    assert_relative_eq!(heating.hours, 1234.56, epsilon = 1e-9);
    assert_eq!(heating.starts, 77);
}

#[tokio::test]
async fn test_clock_and_tank_temperature_are_pushed() {
    let config = fast_config();
    let mut bank = controller(READY);
    bank.set(CLOCK, 13);

    let plan = CyclePlan {
        clock_hour: Some(14),
        tank_temperature: Some(38.4),
        ..Default::default()
    };
    let cycle = PollCycle::new(&config, plan);
    let report = cycle.run(&mut bank, None, None).await.unwrap();

    assert_eq!(bank.writes(), vec![(CLOCK, 14), (SETPOINTS + 12, 3840)]);
    assert_eq!(report.writes[0].0, WriteTarget::Clock);
    assert_eq!(report.writes[1].0, WriteTarget::TankTemperature);

    // Next cycle at the same hour and temperature writes nothing
    let report = cycle.run(&mut bank, None, None).await.unwrap();
    assert_eq!(bank.writes().len(), 2);
    assert!(report.writes.iter().all(|(_, outcome)| !outcome.was_written()));
    assert_relative_eq!(
        report
            .snapshot
            .setpoints
            .unwrap()
            .external_tank_temperature
            .unwrap(),
        38.4,
        epsilon = 1e-9
    );
}

#[tokio::test]
async fn test_absent_tank_temperature_is_not_forwarded() {
    let config = fast_config();
    let mut bank = controller(READY);

    let plan = CyclePlan {
        tank_temperature: Some(0.0),
        ..Default::default()
    };
    let report = PollCycle::new(&config, plan)
        .run(&mut bank, None, None)
        .await
        .unwrap();

    assert!(report.writes.is_empty());
    assert!(bank.writes().is_empty());
}

#[tokio::test]
async fn test_failed_clock_write_skips_later_writes_but_persists() {
    let config = fast_config();
    let mut bank = controller(READY);
    bank.remove_block(CLOCK, 16);
    let mut store = MemoryStore::at_version(LATEST_VERSION).unwrap();

    let plan = CyclePlan {
        clock_hour: Some(7),
        ..force_on(ActuatorId::HotWaterPump)
    };
    let report = PollCycle::new(&config, plan)
        .run(&mut bank, Some(&mut store), None)
        .await
        .unwrap();

    assert!(matches!(
        report.write_error,
        Some(ControlError::Transport { address: CLOCK, .. })
    ));
    assert!(report.writes.is_empty());
    assert!(bank.writes().is_empty());
    assert_eq!(store.records().len(), 1);
}
