//! Pub/Sub messaging over Redpanda.
//!
//! Chain events come in through [`EventConsumer`]; notifications leave
//! through a [`Publisher`], normally the [`RedpandaPublisher`].

mod consumer;
mod redpanda;

use async_trait::async_trait;
use serde_json::Value;

pub use consumer::EventConsumer;
pub use redpanda::RedpandaPublisher;

/// Publication sink: delivers `payload` under `event` to subscribers of `topic`.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, event: &str, payload: Value) -> anyhow::Result<()>;
}
