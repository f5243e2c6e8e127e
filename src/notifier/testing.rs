//! Test doubles for the publication sink and the chain store.

use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::db::ChainStore;
use crate::events::models::{
    Block, ExchangeRate, InternalTransaction, MarketHistory, TokenTransfer, Transaction,
    TransactionStats,
};
use crate::pubsub::Publisher;

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub event: String,
    pub payload: Value,
}

/// Publisher that keeps every message in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<Published>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            published: Mutex::default(),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.published().into_iter().map(|p| p.topic).collect()
    }

    pub fn on_topic(&self, topic: &str) -> Vec<Published> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, topic: &str, event: &str, payload: Value) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("transport unavailable");
        }
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
        });
        Ok(())
    }
}

/// Store answering every query with fixed data, or failing every query.
#[derive(Default)]
pub struct FixedStore {
    pub fail: bool,
    /// `average_block_time` never returns
    pub stall_block_time: bool,
}

impl FixedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn stalled() -> Self {
        Self {
            stall_block_time: true,
            ..Self::default()
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("database unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl ChainStore for FixedStore {
    async fn address_estimated_count(&self) -> anyhow::Result<u64> {
        self.check()?;
        Ok(1_234)
    }

    async fn coin_exchange_rate(&self) -> anyhow::Result<Option<ExchangeRate>> {
        self.check()?;
        Ok(Some(ExchangeRate {
            usd_value: Some(2_000.5),
            market_cap_usd: None,
            volume_24h_usd: None,
            fetched_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }))
    }

    async fn market_history(&self, _days: u32) -> anyhow::Result<Vec<MarketHistory>> {
        self.check()?;
        Ok(vec![MarketHistory {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            closing_price: Some(2_000.5),
            opening_price: Some(1_990.0),
            market_cap: None,
        }])
    }

    async fn average_block_time(&self) -> anyhow::Result<Option<Duration>> {
        if self.stall_block_time {
            std::future::pending::<()>().await;
        }
        self.check()?;
        Ok(Some(Duration::from_secs(12)))
    }

    async fn transaction_stats(
        &self,
        from: NaiveDate,
        _to: NaiveDate,
    ) -> anyhow::Result<Vec<TransactionStats>> {
        self.check()?;
        Ok(vec![TransactionStats {
            date: from,
            number_of_transactions: 10,
            gas_used: Some(210_000.0),
            total_fee: None,
        }])
    }
}

pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

pub fn hash(n: u8) -> B256 {
    B256::repeat_byte(n)
}

pub fn block(number: u64) -> Block {
    Block {
        number,
        hash: B256::with_last_byte(number as u8),
        miner_hash: addr(0xaa),
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        extra: Map::new(),
    }
}

pub fn transaction(id: u8, from: Address, to: Option<Address>) -> Transaction {
    Transaction {
        hash: hash(id),
        block_number: Some(100),
        from_address_hash: from,
        to_address_hash: to,
        value: Default::default(),
        extra: Map::new(),
    }
}

pub fn token_transfer(id: u8, token: Address, from: Address, to: Address) -> TokenTransfer {
    TokenTransfer {
        transaction_hash: hash(id),
        log_index: id as u64,
        block_number: Some(100),
        token_contract_address_hash: token,
        from_address_hash: from,
        to_address_hash: to,
        amount: None,
        token_ids: None,
        extra: Map::new(),
    }
}

pub fn internal_transaction(index: u64, from: Address, to: Option<Address>) -> InternalTransaction {
    InternalTransaction {
        transaction_hash: hash(0x77),
        index,
        from_address_hash: from,
        to_address_hash: to,
        value: Default::default(),
        extra: Map::new(),
    }
}
