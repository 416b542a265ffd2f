// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Human readable and JSON summaries of a poll cycle

use serde_json::{json, Value};

use crate::poll::CycleReport;
use crate::registers::codec::round2;

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) if unit.is_empty() => format!("{:.0}", v),
        Some(v) => format!("{:.2} {}", round2(v), unit),
        None => "invalid".to_string(),
    }
}

/// Summary lines printed after a cycle.
pub fn summary_lines(report: &CycleReport) -> Vec<String> {
    let s = &report.snapshot;
    let mut lines = vec![format!(
        "{}  hour {}  group {}  firmware {} (serial {})  data ready after {} attempt(s)",
        s.timestamp.format("%Y-%m-%d %H:%M:%S"),
        s.hour_of_day,
        s.sensor_group,
        s.firmware.version(),
        s.firmware.serial_number,
        report.handshake_attempts
    )];

    for reading in &s.sensors {
        lines.push(format!(
            "  {:<10} raw {:>5}  {}",
            reading.sensor.to_string(),
            reading.raw,
            format_value(reading.value, &reading.unit)
        ));
    }
    lines.push(format!("  delta T     {:.2} °C", s.delta_t));
    if let Some(t) = report.external_temperature {
        lines.push(format!("  external    {:.2} °C", t));
    }

    for state in &s.actuators {
        let mut line = format!(
            "  {:<15} {:<3} reason: {}",
            state.actuator.to_string(),
            on_off(state.physical_on),
            state.reason
        );
        if let Some(mode) = state.override_mode {
            line.push_str(&format!("  override: {}", mode));
        }
        if state.has_discrepancy() {
            line.push_str(&format!(
                "  (controller reports {})",
                on_off(state.logical_on)
            ));
        }
        lines.push(line);
    }

    if let Some(runtime) = &s.runtime {
        for r in runtime {
            lines.push(format!(
                "  {:<15} {:.2} h, {} starts",
                r.actuator.to_string(),
                r.hours,
                r.starts
            ));
        }
    }

    if let Some(system) = &s.system {
        let (days, hours, minutes) = system.uptime_parts();
        lines.push(format!(
            "  uptime {}d {}h {}m  errors {}  cpu {}%  cycle {}/{}/{} ms",
            days,
            hours,
            minutes,
            system.error_count,
            system.cpu_load,
            system.cycle_min_ms,
            system.cycle_avg_ms,
            system.cycle_max_ms
        ));
    }
    if let Some(alarms) = &s.alarms {
        if alarms.any() {
            lines.push(format!("  sensor alarms: 0x{:04X}", alarms.mask));
        }
    }

    for (target, outcome) in &report.writes {
        lines.push(format!("  write {}: {}", target, outcome));
    }
    if let Some(e) = &report.write_error {
        lines.push(format!("  write failed: {}", e));
    }
    match report.persisted_version {
        Some(v) => lines.push(format!("  persisted (schema v{})", v)),
        None => lines.push("  not persisted".to_string()),
    }
    lines
}

/// JSON document printed by `--json`.
pub fn to_json(report: &CycleReport) -> Value {
    let writes: Vec<Value> = report
        .writes
        .iter()
        .map(|(target, outcome)| {
            json!({
                "target": target.to_string(),
                "written": outcome.was_written(),
                "outcome": outcome.to_string(),
            })
        })
        .collect();
    json!({
        "snapshot": report.snapshot,
        "external_temperature": report.external_temperature,
        "handshake_attempts": report.handshake_attempts,
        "writes": writes,
        "write_error": report.write_error.as_ref().map(|e| e.to_string()),
        "persisted_version": report.persisted_version,
    })
}
