// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! External temperature side channel
//!
//! A sensor node publishes its temperature on a pub/sub channel. Each poll
//! cycle performs one bounded receive: the first message within the timeout
//! is the value, silence means the value is absent. Nothing outlives the
//! call.

pub mod redis;

use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use thiserror::Error;

pub use self::redis::RedisValueSource;

#[derive(Error, Debug)]
pub enum SideChannelError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Single-shot source of one external value.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ValueSource: Send {
    /// Wait at most `timeout` for one value. `Ok(None)` when nothing usable
    /// arrived in time.
    async fn receive(&mut self, timeout: Duration) -> Result<Option<f64>, SideChannelError>;
}

/// One bounded receive. Silence and failures both leave the value absent.
pub async fn receive_or_absent(source: &mut dyn ValueSource, timeout: Duration) -> Option<f64> {
    match source.receive(timeout).await {
        Ok(value) => value,
        Err(e) => {
            warn!("External temperature unavailable: {}", e);
            None
        }
    }
}

/// Parse a published payload.
///
/// Accepts a bare number or a JSON object with a numeric `value` or
/// `temperature` member.
pub fn parse_payload(payload: &str) -> Option<f64> {
    let trimmed = payload.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return value.is_finite().then_some(value);
    }
    let json: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    ["value", "temperature"]
        .iter()
        .find_map(|key| json.get(key).and_then(|v| v.as_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::poll::{CyclePlan, PollCycle};
    use crate::simulator::demo_bank;
    use crate::store::{MemoryStore, LATEST_VERSION};
    use mockall::predicate::eq;
    use serde_json::Value;

    #[tokio::test]
    async fn test_silent_channel_persists_a_null_temperature() {
        let config = Config::default();
        let mut source = MockValueSource::new();
        source
            .expect_receive()
            .with(eq(Duration::from_millis(config.side_channel.timeout_ms)))
            .times(1)
            .returning(|_| Ok(None));

        let external = receive_or_absent(
            &mut source,
            Duration::from_millis(config.side_channel.timeout_ms),
        )
        .await;
        assert_eq!(external, None);

        let mut bank = demo_bank(&config);
        let mut store = MemoryStore::at_version(LATEST_VERSION).unwrap();
        let report = PollCycle::new(&config, CyclePlan::default())
            .run(&mut bank, Some(&mut store), external)
            .await
            .unwrap();

        assert_eq!(report.external_temperature, None);
        assert_eq!(
            store.records()[0].get("external_temperature"),
            Some(&Value::Null)
        );
        assert!(store.records()[0].contains("temp_flow"));
    }

    #[tokio::test]
    async fn test_failing_channel_is_absent() {
        let mut source = MockValueSource::new();
        source.expect_receive().times(1).returning(|_| {
            Err(SideChannelError::Redis(::redis::RedisError::from(
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )))
        });
        assert_eq!(
            receive_or_absent(&mut source, Duration::from_millis(10)).await,
            None
        );
    }

    #[tokio::test]
    async fn test_received_value_is_passed_through() {
        let mut source = MockValueSource::new();
        source.expect_receive().returning(|_| Ok(Some(7.25)));
        assert_eq!(
            receive_or_absent(&mut source, Duration::from_millis(10)).await,
            Some(7.25)
        );
    }

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload("21.5"), Some(21.5));
        assert_eq!(parse_payload(" -3.25\n"), Some(-3.25));
        assert_eq!(parse_payload(r#"{"value": 18.0}"#), Some(18.0));
        assert_eq!(parse_payload(r#"{"temperature": 7}"#), Some(7.0));
        assert_eq!(parse_payload("NaN"), None);
        assert_eq!(parse_payload("offline"), None);
        assert_eq!(parse_payload(r#"{"humidity": 40}"#), None);
    }
}
