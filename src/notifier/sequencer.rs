//! Ordering guard for "new block" notifications.
//!
//! Blocks reach the notifier in sorted batches, but batches race each other
//! and reorgs replay older heights. The guard keeps the observable block
//! stream in increasing order for the common case of small disorder:
//!
//! - the immediate successor of the last broadcast block, the first block
//!   ever, or a block more than `tolerance` ahead is broadcast at once and
//!   becomes the new last broadcast block;
//! - a block at or below the last broadcast one is broadcast without moving
//!   the counter back;
//! - a block a few heights ahead waits in a background task, re-checking
//!   every `check_interval` until its predecessor has been broadcast.
//!
//! Every block is broadcast exactly once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::NotifierSettings;
use crate::events::models::Block;

/// Publication of a single block on the new-block topics.
#[async_trait]
pub trait BlockSink: Send + Sync {
    /// Notification payload for `block`. Called before the ordering lock is
    /// taken, so lookups here never hold up other blocks.
    async fn prepare_block(&self, block: &Block) -> Value {
        json!({ "block": block })
    }

    async fn broadcast_block(&self, block: &Block, payload: Value) -> anyhow::Result<()>;
}

/// Highest block number broadcast so far; unset until the first one.
///
/// Read-decide-write sequences hold the lock for their whole duration.
#[derive(Debug, Default)]
pub struct LastBroadcast(Mutex<Option<u64>>);

impl LastBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<u64> {
        *self.0.lock().await
    }
}

/// What to do with a block given the last broadcast number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Broadcast and make it the last broadcast block
    Advance,
    /// Broadcast, already superseded
    Stale,
    /// Predecessor is missing but may still come
    Wait,
}

/// Decision for a freshly received block.
pub fn decide(last: Option<u64>, number: u64, tolerance: u64) -> Decision {
    let Some(last) = last else {
        return Decision::Advance;
    };

    if last.checked_add(1) == Some(number) || last.saturating_add(tolerance) < number {
        Decision::Advance
    } else if last >= number {
        Decision::Stale
    } else {
        Decision::Wait
    }
}

/// Decision for a block that is already waiting.
///
/// The gap can only shrink while waiting, so there is no forced path here.
/// A forced broadcast of a later block may overtake the waiting one, which
/// is then broadcast as stale instead of waiting forever.
fn decide_waiting(last: Option<u64>, number: u64) -> Decision {
    match last {
        Some(last) if last.checked_add(1) == Some(number) => Decision::Advance,
        Some(last) if last >= number => Decision::Stale,
        _ => Decision::Wait,
    }
}

#[derive(Debug, Clone)]
pub struct SequencerSettings {
    pub tolerance: u64,
    pub check_interval: Duration,
    /// Broadcast anyway after this many checks
    pub max_retries: Option<u32>,
}

impl From<&NotifierSettings> for SequencerSettings {
    fn from(settings: &NotifierSettings) -> Self {
        Self {
            tolerance: settings.block_gap_tolerance,
            check_interval: settings.broadcast_check_interval(),
            max_retries: settings.max_broadcast_retries,
        }
    }
}

/// Block sequencing guard.
///
/// Cheap to clone; clones share the counter and the waiting tasks.
#[derive(Clone)]
pub struct BlockSequencer {
    last_broadcast: Arc<LastBroadcast>,
    sink: Arc<dyn BlockSink>,
    settings: SequencerSettings,
    waiters: TaskTracker,
    shutdown: CancellationToken,
}

impl BlockSequencer {
    pub fn new(sink: Arc<dyn BlockSink>, settings: SequencerSettings) -> Self {
        Self {
            last_broadcast: Arc::new(LastBroadcast::new()),
            sink,
            settings,
            waiters: TaskTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn last_broadcast(&self) -> &LastBroadcast {
        &self.last_broadcast
    }

    /// Number of blocks currently waiting for their predecessor.
    pub fn waiting(&self) -> usize {
        self.waiters.len()
    }

    /// Route one block through the guard. Never waits for a missing
    /// predecessor; such blocks are handed to a background task.
    pub async fn submit(&self, block: Block) {
        let payload = self.sink.prepare_block(&block).await;
        let mut last = self.last_broadcast.0.lock().await;

        match decide(*last, block.number, self.settings.tolerance) {
            Decision::Advance => {
                if let Some(previous) = *last {
                    if block.number > previous + 1 {
                        info!(
                            "Sequencer: gap of {} blocks before #{}, broadcasting without waiting",
                            block.number - previous - 1,
                            block.number
                        );
                    }
                }
                self.broadcast(&block, payload).await;
                *last = Some(block.number);
            },
            Decision::Stale => {
                drop(last);
                debug!("Sequencer: block #{} is behind the stream", block.number);
                self.broadcast(&block, payload).await;
            },
            Decision::Wait => {
                drop(last);
                debug!(
                    "Sequencer: block #{} waits for block #{}",
                    block.number,
                    block.number - 1
                );
                self.spawn_waiter(block, payload);
            },
        }
    }

    fn spawn_waiter(&self, block: Block, payload: Value) {
        let this = self.clone();
        self.waiters
            .spawn(async move { this.wait_for_predecessor(block, payload).await });
    }

    async fn wait_for_predecessor(&self, block: Block, payload: Value) {
        let mut checks: u32 = 0;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    warn!(
                        "Sequencer: shutting down, block #{} was never broadcast",
                        block.number
                    );
                    return;
                }
                _ = tokio::time::sleep(self.settings.check_interval) => {}
            }
            checks = checks.saturating_add(1);

            let mut last = self.last_broadcast.0.lock().await;
            match decide_waiting(*last, block.number) {
                Decision::Advance => {
                    self.broadcast(&block, payload).await;
                    *last = Some(block.number);
                    return;
                },
                Decision::Stale => {
                    drop(last);
                    self.broadcast(&block, payload).await;
                    return;
                },
                Decision::Wait => {
                    let exhausted = self.settings.max_retries.is_some_and(|max| checks >= max);
                    if exhausted {
                        warn!(
                            "Sequencer: block #{} still missing its predecessor after {} checks, broadcasting",
                            block.number, checks
                        );
                        self.broadcast(&block, payload).await;
                        if last.map_or(true, |l| l < block.number) {
                            *last = Some(block.number);
                        }
                        return;
                    }
                },
            }
        }
    }

    async fn broadcast(&self, block: &Block, payload: Value) {
        if let Err(e) = self.sink.broadcast_block(block, payload).await {
            warn!("Sequencer: failed to broadcast block #{}: {:#}", block.number, e);
        }
    }

    /// Cancel waiting blocks and wait for their tasks to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.waiters.close();
        self.waiters.wait().await;
        info!("Sequencer: all waiting blocks released");
    }
}
