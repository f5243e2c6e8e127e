use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::events::models::{ExchangeRate, MarketHistory, TransactionStats};

pub mod postgres;

pub use postgres::PostgresClient;

/// Read access to the explorer database.
///
/// Chain events arrive with their entities preloaded; the store only serves
/// the aggregates some notifications attach to their payload.
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Fast estimate of the number of known addresses
    async fn address_estimated_count(&self) -> anyhow::Result<u64>;

    /// Latest coin exchange rate, if the market fetcher has produced one
    async fn coin_exchange_rate(&self) -> anyhow::Result<Option<ExchangeRate>>;

    /// Daily market history for the last `days` days, oldest first
    async fn market_history(&self, days: u32) -> anyhow::Result<Vec<MarketHistory>>;

    /// Average time between recent consensus blocks
    async fn average_block_time(&self) -> anyhow::Result<Option<Duration>>;

    /// Daily transaction stats in `[from, to]`, oldest first
    async fn transaction_stats(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<TransactionStats>>;
}
