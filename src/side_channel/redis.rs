// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-heating-poller project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Redis pub/sub value source

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, warn};
use redis::Client;

use super::{parse_payload, SideChannelError, ValueSource};
use crate::config::SideChannelConfig;

/// Subscribes to one channel for the duration of a single receive.
#[derive(Debug, Clone)]
pub struct RedisValueSource {
    url: String,
    channel: String,
}

impl RedisValueSource {
    pub fn new(url: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            channel: channel.into(),
        }
    }

    pub fn from_config(config: &SideChannelConfig) -> Self {
        Self::new(config.url.clone(), config.channel.clone())
    }
}

#[async_trait]
impl ValueSource for RedisValueSource {
    async fn receive(&mut self, timeout: Duration) -> Result<Option<f64>, SideChannelError> {
        let receive = async {
            let client = Client::open(self.url.as_str())?;
            let mut pubsub = client.get_async_pubsub().await?;
            pubsub.subscribe(&self.channel).await?;
            debug!("Subscribed to side channel {}", self.channel);

            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = msg.get_payload()?;
                match parse_payload(&payload) {
                    Some(value) => return Ok::<_, SideChannelError>(Some(value)),
                    None => warn!(
                        "Ignoring unparsable payload on {}: {:?}",
                        self.channel, payload
                    ),
                }
            }
            Ok(None)
        };

        match tokio::time::timeout(timeout, receive).await {
            Ok(result) => result,
            Err(_) => {
                debug!(
                    "No value on {} within {} ms",
                    self.channel,
                    timeout.as_millis()
                );
                Ok(None)
            }
        }
    }
}
