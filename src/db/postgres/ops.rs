use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::db::{postgres::PostgresClient, ChainStore};
use crate::events::models::{ExchangeRate, MarketHistory, TransactionStats};

/// Number of recent blocks the average block time is computed over
const AVERAGE_BLOCK_TIME_WINDOW: i64 = 100;

/// Mean spacing of block timestamps sorted newest first.
fn average_interval(timestamps: &[NaiveDateTime]) -> Option<Duration> {
    let (newest, oldest) = (timestamps.first()?, timestamps.last()?);
    let intervals = timestamps.len().checked_sub(1).filter(|n| *n > 0)?;

    let span = newest.signed_duration_since(*oldest).to_std().ok()?;
    Some(span / intervals as u32)
}

impl PostgresClient {
    async fn query_address_count(&self) -> anyhow::Result<u64> {
        let client = self.pool.get().await?;
        // Planner estimate; an exact count over addresses is far too slow
        let row = client
            .query_one(
                "SELECT reltuples::bigint AS count FROM pg_class WHERE relname = 'addresses'",
                &[],
            )
            .await?;
        let count: i64 = row.get("count");
        Ok(count.max(0) as u64)
    }

    async fn query_average_block_time(&self) -> anyhow::Result<Option<Duration>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT timestamp FROM blocks
                WHERE consensus = true
                ORDER BY number DESC
                LIMIT $1
                "#,
                &[&AVERAGE_BLOCK_TIME_WINDOW],
            )
            .await?;

        let timestamps: Vec<NaiveDateTime> = rows.iter().map(|row| row.get("timestamp")).collect();
        Ok(average_interval(&timestamps))
    }
}

#[async_trait]
impl ChainStore for PostgresClient {
    async fn address_estimated_count(&self) -> anyhow::Result<u64> {
        self.address_count
            .try_get_with((), self.query_address_count())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to estimate address count: {:#}", e))
    }

    async fn coin_exchange_rate(&self) -> anyhow::Result<Option<ExchangeRate>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT date, closing_price::float8 AS closing_price, market_cap::float8 AS market_cap
                FROM market_history
                WHERE secondary_coin = false
                ORDER BY date DESC
                LIMIT 1
                "#,
                &[],
            )
            .await?;

        Ok(row.map(|row| {
            let date: NaiveDate = row.get("date");
            ExchangeRate {
                usd_value: row.get("closing_price"),
                market_cap_usd: row.get("market_cap"),
                volume_24h_usd: None,
                fetched_at: date.and_time(NaiveTime::MIN).and_utc(),
            }
        }))
    }

    async fn market_history(&self, days: u32) -> anyhow::Result<Vec<MarketHistory>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT date,
                       closing_price::float8 AS closing_price,
                       opening_price::float8 AS opening_price,
                       market_cap::float8 AS market_cap
                FROM market_history
                WHERE secondary_coin = false
                  AND date > CURRENT_DATE - $1::int
                ORDER BY date ASC
                "#,
                &[&(days as i32)],
            )
            .await?;

        let history = rows
            .iter()
            .map(|row| MarketHistory {
                date: row.get("date"),
                closing_price: row.get("closing_price"),
                opening_price: row.get("opening_price"),
                market_cap: row.get("market_cap"),
            })
            .collect();

        Ok(history)
    }

    async fn average_block_time(&self) -> anyhow::Result<Option<Duration>> {
        self.average_block_time
            .try_get_with((), self.query_average_block_time())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to compute average block time: {:#}", e))
    }

    async fn transaction_stats(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<TransactionStats>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT date,
                       number_of_transactions::bigint AS number_of_transactions,
                       gas_used::float8 AS gas_used,
                       total_fee::float8 AS total_fee
                FROM transaction_stats
                WHERE date BETWEEN $1 AND $2
                ORDER BY date ASC
                "#,
                &[&from, &to],
            )
            .await?;

        let stats = rows
            .iter()
            .map(|row| TransactionStats {
                date: row.get("date"),
                number_of_transactions: row.get("number_of_transactions"),
                gas_used: row.get("gas_used"),
                total_fee: row.get("total_fee"),
            })
            .collect();

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> NaiveDateTime {
        chrono::DateTime::from_timestamp(secs, 0).unwrap().naive_utc()
    }

    #[test]
    fn test_average_interval_of_evenly_spaced_blocks() {
        let timestamps = vec![at(1_000_036), at(1_000_024), at(1_000_012), at(1_000_000)];
        assert_eq!(average_interval(&timestamps), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_average_interval_needs_two_blocks() {
        assert_eq!(average_interval(&[]), None);
        assert_eq!(average_interval(&[at(1_000_000)]), None);
    }

    #[test]
    fn test_average_interval_rejects_unsorted_input() {
        // Oldest first yields a negative span
        assert_eq!(average_interval(&[at(1_000_000), at(1_000_012)]), None);
    }
}
