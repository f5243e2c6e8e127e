//! Real-time notifier.
//!
//! Turns chain events from the indexing pipeline into topic-scoped
//! notifications:
//!
//! - [`Notifier::dispatch`] routes every event to its handler
//! - [`sequencer`] keeps "new block" notifications in order
//! - [`fan_out`] delivers address-keyed entities once per participant
//! - [`topics`] names the subscriber topics

pub mod fan_out;
mod handlers;
mod router;
pub mod sequencer;
pub mod topics;
pub mod verification;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use serde_json::{json, Value};

use crate::config::NotifierSettings;
use crate::db::ChainStore;
use crate::events::models::Block;
use crate::pubsub::Publisher;

pub use sequencer::{BlockSequencer, BlockSink, SequencerSettings};
pub use verification::{CompilerVersions, StaticCompilerVersions};

/// Upper bound on optional store lookups made for a block notification
const STORE_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Publish and log delivery failures; a notification is best-effort.
pub(crate) async fn broadcast(publisher: &dyn Publisher, topic: &str, event: &str, payload: Value) {
    if let Err(e) = publisher.publish(topic, event, payload).await {
        warn!("Failed to broadcast {} to {}: {:#}", event, topic, e);
    }
}

/// Publishes a block on the global and the miner's block topics.
pub struct BlockBroadcaster {
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn ChainStore>,
}

impl BlockBroadcaster {
    pub fn new(publisher: Arc<dyn Publisher>, store: Arc<dyn ChainStore>) -> Self {
        Self { publisher, store }
    }
}

#[async_trait]
impl BlockSink for BlockBroadcaster {
    async fn prepare_block(&self, block: &Block) -> Value {
        let average_block_time =
            match tokio::time::timeout(STORE_LOOKUP_TIMEOUT, self.store.average_block_time()).await {
                Ok(Ok(time)) => time.map(|t| t.as_millis() as u64),
                Ok(Err(e)) => {
                    warn!("Average block time unavailable: {:#}", e);
                    None
                },
                Err(_) => {
                    warn!(
                        "Average block time lookup timed out after {:?}",
                        STORE_LOOKUP_TIMEOUT
                    );
                    None
                },
            };

        json!({
            "block": block,
            "average_block_time": average_block_time,
        })
    }

    async fn broadcast_block(&self, block: &Block, payload: Value) -> anyhow::Result<()> {
        let publisher = self.publisher.as_ref();
        broadcast(publisher, topics::NEW_BLOCK, "new_block", payload.clone()).await;
        broadcast(
            publisher,
            &topics::blocks_by_miner(&block.miner_hash),
            "new_block",
            payload,
        )
        .await;

        Ok(())
    }
}

/// Event router and the state shared by its handlers.
pub struct Notifier {
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn ChainStore>,
    compilers: Arc<dyn CompilerVersions>,
    sequencer: BlockSequencer,
    settings: NotifierSettings,
}

impl Notifier {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        store: Arc<dyn ChainStore>,
        compilers: Arc<dyn CompilerVersions>,
        settings: NotifierSettings,
    ) -> Self {
        let sink = Arc::new(BlockBroadcaster::new(publisher.clone(), store.clone()));
        let sequencer = BlockSequencer::new(sink, SequencerSettings::from(&settings));

        Self {
            publisher,
            store,
            compilers,
            sequencer,
            settings,
        }
    }

    pub fn sequencer(&self) -> &BlockSequencer {
        &self.sequencer
    }

    /// Release blocks still waiting in the sequencer.
    pub async fn shutdown(&self) {
        self.sequencer.shutdown().await;
    }

    async fn broadcast(&self, topic: &str, event: &str, payload: Value) {
        broadcast(self.publisher.as_ref(), topic, event, payload).await;
    }
}
