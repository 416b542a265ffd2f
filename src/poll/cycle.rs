// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! One poll cycle
//!
//! 1. wait for the data-ready bit and keep the measurement block it came with
//! 2. read the optional blocks (setpoints, system, alarms, legacy counters)
//! 3. decode
//! 4. push the clock hour and tank temperature, apply requested overrides
//!    and night-window hours
//! 5. persist one record shaped for the store's schema version
//!
//! A failing optional block only empties its snapshot section. A failing
//! write is reported but does not stop the record from being persisted.

use std::fmt;

use chrono::Local;
use log::{debug, error, info, warn};

use super::handshake::Handshake;
use crate::config::{Config, RuntimeSource};
use crate::control::{
    apply_override, apply_schedule, push_tank_temperature, sync_clock, ControlError,
    OverrideRequest, ScheduleField, ScheduleWindow, WriteOutcome,
};
use crate::decode::{ActuatorId, BlockSet, DecodedSnapshot, SnapshotDecoder};
use crate::error::PollError;
use crate::registers::{read_block, BlockKind, BlockSpec, RawSnapshot, RegisterTransport};
use crate::store::{HistoryRecord, HistoryStore};

/// Writes requested for this cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CyclePlan {
    /// Hour written to the clock register
    pub clock_hour: Option<u8>,
    /// Tank temperature (°C) forwarded into the setpoint block
    pub tank_temperature: Option<f64>,
    pub overrides: Vec<OverrideRequest>,
    pub schedule: ScheduleWindow,
}

impl CyclePlan {
    pub fn is_empty(&self) -> bool {
        self.clock_hour.is_none()
            && self.tank_temperature.is_none()
            && self.overrides.is_empty()
            && self.schedule.is_empty()
    }
}

/// What a write targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Clock,
    TankTemperature,
    Override(ActuatorId),
    Schedule(ScheduleField),
}

impl fmt::Display for WriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteTarget::Clock => f.write_str("clock"),
            WriteTarget::TankTemperature => f.write_str("tank temperature"),
            WriteTarget::Override(id) => write!(f, "{} override", id),
            WriteTarget::Schedule(field) => write!(f, "{}", field),
        }
    }
}

/// Result of a completed cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub snapshot: DecodedSnapshot,
    pub external_temperature: Option<f64>,
    pub handshake_attempts: u32,
    pub writes: Vec<(WriteTarget, WriteOutcome)>,
    /// First failed write; later writes were skipped
    pub write_error: Option<ControlError>,
    /// Schema version the record was shaped for, `None` when not persisted
    pub persisted_version: Option<u32>,
}

/// One read-decode-write-persist pass.
pub struct PollCycle<'a> {
    config: &'a Config,
    decoder: SnapshotDecoder,
    plan: CyclePlan,
}

impl<'a> PollCycle<'a> {
    pub fn new(config: &'a Config, plan: CyclePlan) -> Self {
        Self {
            config,
            decoder: SnapshotDecoder::new(config),
            plan,
        }
    }

    async fn read_optional<T>(
        transport: &mut T,
        kind: BlockKind,
        spec: BlockSpec,
    ) -> Option<RawSnapshot>
    where
        T: RegisterTransport + ?Sized,
    {
        match read_block(transport, kind, spec).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Could not read the {} block: {}", kind, e);
                None
            }
        }
    }

    /// Run the cycle against `transport`, persisting into `store` when given.
    pub async fn run<T>(
        &self,
        transport: &mut T,
        store: Option<&mut dyn HistoryStore>,
        external_temperature: Option<f64>,
    ) -> Result<CycleReport, PollError>
    where
        T: RegisterTransport + ?Sized,
    {
        let map = &self.config.register_map;

        let mut handshake = Handshake::new(
            &self.config.handshake,
            map.measure,
            map.measure_fields.status_word,
        );
        let measure = handshake.wait_for_data(transport).await?;
        let handshake_attempts = match handshake.state() {
            super::HandshakeState::DataReady { attempts } => attempts,
            _ => 1,
        };

        let blocks = BlockSet {
            measure,
            setpoints: Self::read_optional(transport, BlockKind::Setpoints, map.setpoints).await,
            system: Self::read_optional(transport, BlockKind::System, map.system).await,
            alarms: Self::read_optional(transport, BlockKind::Alarms, map.alarms).await,
            counters: match self.config.firmware.runtime_source {
                RuntimeSource::Counters => {
                    Self::read_optional(transport, BlockKind::Counters, map.counters).await
                }
                RuntimeSource::Measure => None,
            },
        };

        let snapshot = self.decoder.decode(&blocks, Local::now())?;
        for d in &snapshot.discrepancies {
            warn!(
                "{} output says {} but the controller reports {}",
                d.actuator,
                if d.physical_on { "ON" } else { "OFF" },
                if d.logical_on { "ON" } else { "OFF" }
            );
        }

        let (writes, write_error) = self.apply_plan(transport).await;

        let persisted_version = match store {
            Some(store) => {
                let version = store.schema_version()?;
                let record = HistoryRecord::from_snapshot(&snapshot, external_temperature, version);
                store.append(&record)?;
                info!("Persisted record with {} fields (schema v{})", record.len(), version);
                Some(version)
            }
            None => {
                debug!("History store disabled, record not persisted");
                None
            }
        };

        Ok(CycleReport {
            snapshot,
            external_temperature,
            handshake_attempts,
            writes,
            write_error,
            persisted_version,
        })
    }

    async fn apply_plan<T>(
        &self,
        transport: &mut T,
    ) -> (Vec<(WriteTarget, WriteOutcome)>, Option<ControlError>)
    where
        T: RegisterTransport + ?Sized,
    {
        let mut writes = Vec::new();
        if self.plan.is_empty() {
            return (writes, None);
        }
        let map = &self.config.register_map;

        if let Some(hour) = self.plan.clock_hour {
            match sync_clock(transport, map, hour).await {
                Ok(outcome) => writes.push((WriteTarget::Clock, outcome)),
                Err(e) => {
                    error!("Clock update failed: {}", e);
                    return (writes, Some(e));
                }
            }
        }

        if let Some(celsius) = self.plan.tank_temperature {
            match push_tank_temperature(transport, map, celsius).await {
                Ok(Some(outcome)) => writes.push((WriteTarget::TankTemperature, outcome)),
                Ok(None) => {}
                Err(e) => {
                    error!("Tank temperature update failed: {}", e);
                    return (writes, Some(e));
                }
            }
        }

        for request in &self.plan.overrides {
            match apply_override(transport, map, &self.config.actuators, *request).await {
                Ok(outcome) => writes.push((WriteTarget::Override(request.actuator), outcome)),
                Err(e) => {
                    error!("Override of {} failed: {}", request.actuator, e);
                    return (writes, Some(e));
                }
            }
        }

        match apply_schedule(transport, map, self.plan.schedule).await {
            Ok(outcomes) => writes.extend(
                outcomes
                    .into_iter()
                    .map(|(field, outcome)| (WriteTarget::Schedule(field), outcome)),
            ),
            Err(e) => {
                error!("Night window update failed: {}", e);
                return (writes, Some(e));
            }
        }
        (writes, None)
    }
}
