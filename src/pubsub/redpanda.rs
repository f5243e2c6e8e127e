//! Redpanda (Kafka-compatible) publisher implementation.
//!
//! Every notification is written to a single notifications topic, keyed by
//! the subscriber topic so that messages for one subscriber topic stay in
//! order within their partition.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::info;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use serde::Serialize;
use serde_json::Value;

use super::Publisher;
use crate::config::RedpandaSettings;

/// Envelope written to the notifications topic.
#[derive(Debug, Serialize)]
struct Notification<'a> {
    topic: &'a str,
    event: &'a str,
    payload: &'a Value,
}

/// Redpanda publisher for subscriber notifications.
pub struct RedpandaPublisher {
    producer: FutureProducer,
    notifications_topic: String,
}

impl RedpandaPublisher {
    pub fn new(settings: &RedpandaSettings) -> anyhow::Result<Self> {
        info!("Connecting to Redpanda brokers: {}", settings.brokers);

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &settings.brokers)
            .set("message.timeout.ms", "5000")
            .set("queue.buffering.max.messages", "100000")
            .set("linger.ms", "5") // Small delay to batch messages
            .create()
            .context("Failed to create Redpanda producer")?;

        let notifications_topic = settings.notifications_topic();
        info!(
            "Redpanda publisher initialized, notifications go to {}",
            notifications_topic
        );

        Ok(Self {
            producer,
            notifications_topic,
        })
    }

    /// Flush any pending messages (call on shutdown).
    pub fn flush(&self) {
        self.producer.flush(Duration::from_secs(5)).ok();
    }
}

#[async_trait]
impl Publisher for RedpandaPublisher {
    async fn publish(&self, topic: &str, event: &str, payload: Value) -> anyhow::Result<()> {
        let message = serde_json::to_string(&Notification {
            topic,
            event,
            payload: &payload,
        })
        .with_context(|| format!("Failed to serialize {} notification for {}", event, topic))?;

        let record = FutureRecord::to(&self.notifications_topic)
            .key(topic)
            .payload(&message);

        self.producer
            .send(record, Duration::from_millis(100))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("Failed to send {} to {}: {}", event, topic, e))?;

        Ok(())
    }
}

impl Drop for RedpandaPublisher {
    fn drop(&mut self) {
        self.flush();
    }
}
