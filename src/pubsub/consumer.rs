//! Inbound chain events.
//!
//! The indexing pipeline writes every chain event as JSON to
//! `{prefix}.chain_events`. Each event is dispatched on its own task so a
//! slow handler never holds up the stream.

use std::sync::Arc;

use anyhow::Context;
use log::{error, info, warn};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::RedpandaSettings;
use crate::events::ChainEvent;
use crate::notifier::Notifier;

pub struct EventConsumer {
    consumer: StreamConsumer,
    topic: String,
    notifier: Arc<Notifier>,
    dispatches: TaskTracker,
}

impl EventConsumer {
    pub fn new(settings: &RedpandaSettings, notifier: Arc<Notifier>) -> anyhow::Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &settings.brokers)
            .set("group.id", &settings.group_id)
            .set("enable.auto.commit", "true")
            // Missed events are not replayed
            .set("auto.offset.reset", "latest")
            .create()
            .context("Failed to create Redpanda consumer")?;

        Ok(Self {
            consumer,
            topic: settings.chain_events_topic(),
            notifier,
            dispatches: TaskTracker::new(),
        })
    }

    /// Consume until cancelled, then wait for in-flight dispatches.
    pub async fn run(self, cancellation_token: CancellationToken) -> anyhow::Result<()> {
        self.consumer
            .subscribe(&[self.topic.as_str()])
            .with_context(|| format!("Failed to subscribe to {}", self.topic))?;

        info!("Consumer: Subscribed to {}", self.topic);

        loop {
            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => {
                    info!("Consumer: Received cancellation signal");
                    break;
                }

                message = self.consumer.recv() => {
                    let message = match message {
                        Ok(message) => message,
                        Err(e) => {
                            error!("Consumer: Failed to receive chain event: {}", e);
                            continue;
                        }
                    };

                    let Some(payload) = message.payload() else {
                        warn!("Consumer: Skipping empty message at offset {}", message.offset());
                        continue;
                    };

                    match ChainEvent::from_json(payload) {
                        Ok(event) => {
                            let notifier = self.notifier.clone();
                            self.dispatches.spawn(async move {
                                notifier.dispatch(event).await;
                            });
                        }
                        Err(e) => {
                            warn!(
                                "Consumer: Dropping malformed chain event at offset {}: {}",
                                message.offset(),
                                e
                            );
                        }
                    }
                }
            }
        }

        self.dispatches.close();
        self.dispatches.wait().await;

        info!("Consumer: Shutdown complete");
        Ok(())
    }
}
