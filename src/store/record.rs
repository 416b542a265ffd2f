// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Persisted record of one poll cycle
//!
//! A flat JSON object. Every field belongs to one schema migration and is
//! only emitted when the store is at or above that version. The values
//! themselves never depend on the version: migrating the store later makes
//! the same decode output populate more fields, never different ones.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::decode::DecodedSnapshot;
use crate::registers::codec::round2;

/// One row of the history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryRecord {
    fields: Map<String, Value>,
}

/// Collects fields, dropping those above the store version.
struct RecordBuilder {
    schema_version: u32,
    record: HistoryRecord,
}

impl RecordBuilder {
    fn put(&mut self, version: u32, key: impl Into<String>, value: Value) {
        if version <= self.schema_version {
            self.record.insert(key, value);
        }
    }
}

fn rounded(value: Option<f64>) -> Value {
    value.map(round2).map_or(Value::Null, |v| json!(v))
}

impl HistoryRecord {
    /// Shape the record of `snapshot` for a store at `schema_version`.
    pub fn from_snapshot(
        snapshot: &DecodedSnapshot,
        external_temperature: Option<f64>,
        schema_version: u32,
    ) -> Self {
        let mut b = RecordBuilder {
            schema_version,
            record: HistoryRecord::default(),
        };

        // 1: base sensor snapshot
        b.put(1, "timestamp", json!(snapshot.timestamp.to_rfc3339()));
        b.put(1, "hour_of_day", json!(snapshot.hour_of_day));
        b.put(1, "status_word", json!(snapshot.status.word));
        for reading in &snapshot.sensors {
            b.put(1, format!("raw_{}", reading.sensor), json!(reading.raw));
            b.put(1, format!("temp_{}", reading.sensor), rounded(reading.value));
        }
        for t in &snapshot.controller_temperatures {
            b.put(1, format!("controller_{}", t.sensor), json!(round2(t.value)));
        }
        b.put(1, "delta_t", json!(round2(snapshot.delta_t)));

        for state in &snapshot.actuators {
            let id = state.actuator;
            // 2: physical state and discrepancy flag
            b.put(2, format!("{}_on", id), json!(state.physical_on));
            b.put(2, format!("{}_discrepancy", id), json!(state.has_discrepancy()));
            // 3: override mode
            b.put(
                3,
                format!("{}_override", id),
                state
                    .override_mode
                    .map_or(Value::Null, |m| json!(m.to_string())),
            );
            // 6: reasons
            b.put(6, format!("{}_reason_mask", id), json!(state.reason_mask));
            b.put(6, format!("{}_reason", id), json!(state.reason.to_string()));
        }

        // 4: side channel
        b.put(4, "external_temperature", rounded(external_temperature));

        // 5: digital inputs
        b.put(5, "di8_raw", json!(snapshot.digital_inputs.raw));

        // 7: runtime and starts
        for channel in &snapshot.actuators {
            let id = channel.actuator;
            let runtime = snapshot
                .runtime
                .as_ref()
                .and_then(|r| r.iter().find(|r| r.actuator == id));
            b.put(
                7,
                format!("{}_runtime_hours", id),
                rounded(runtime.map(|r| r.hours)),
            );
            b.put(
                7,
                format!("{}_starts", id),
                runtime.map_or(Value::Null, |r| json!(r.starts)),
            );
        }

        // 8: diagnostics
        let system = snapshot.system.as_ref();
        b.put(8, "uptime_seconds", system.map_or(Value::Null, |s| json!(s.uptime_seconds)));
        b.put(8, "error_count", system.map_or(Value::Null, |s| json!(s.error_count)));
        b.put(8, "cpu_load", system.map_or(Value::Null, |s| json!(s.cpu_load)));
        b.put(8, "cycle_min_ms", system.map_or(Value::Null, |s| json!(s.cycle_min_ms)));
        b.put(8, "cycle_max_ms", system.map_or(Value::Null, |s| json!(s.cycle_max_ms)));
        b.put(8, "cycle_avg_ms", system.map_or(Value::Null, |s| json!(s.cycle_avg_ms)));
        b.put(
            8,
            "sensor_alarms",
            snapshot.alarms.map_or(Value::Null, |a| json!(a.mask)),
        );

        // 9: multiplexer phase
        b.put(9, "sensor_group", json!(snapshot.sensor_group.to_string()));

        b.record
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
