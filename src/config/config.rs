use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

/// Number of blocks behind the last broadcast one after which a new block is
/// published immediately instead of waiting for its predecessor.
pub const DEFAULT_BLOCK_GAP_TOLERANCE: u64 = 4;

/// Period between two checks of a block waiting for its predecessor.
pub const DEFAULT_BROADCAST_CHECK_INTERVAL_MS: u64 = 500;

/// PostgreSQL database connection configuration.
///
/// Read-only access to the explorer database for:
/// - Address counters
/// - Exchange rate and market history
/// - Average block time
/// - Daily transaction stats
#[derive(Debug, Deserialize, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_pool_size() -> usize {
    16
}

/// Redpanda (Kafka-compatible) configuration.
///
/// Chain events are consumed from `{prefix}.chain_events` and notifications
/// are produced to `{prefix}.notifications`, keyed by notification topic.
#[derive(Debug, Deserialize, Clone)]
pub struct RedpandaSettings {
    /// Comma-separated list of broker addresses (e.g., "localhost:9092")
    #[serde(default = "default_redpanda_brokers")]
    pub brokers: String,
    #[serde(default = "default_redpanda_topic_prefix")]
    pub topic_prefix: String,
    #[serde(default = "default_redpanda_group_id")]
    pub group_id: String,
}

impl RedpandaSettings {
    pub fn chain_events_topic(&self) -> String {
        format!("{}.chain_events", self.topic_prefix)
    }

    pub fn notifications_topic(&self) -> String {
        format!("{}.notifications", self.topic_prefix)
    }
}

fn default_redpanda_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_redpanda_topic_prefix() -> String {
    "herald".to_string()
}

fn default_redpanda_group_id() -> String {
    "herald-notifier".to_string()
}

/// Notifier behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct NotifierSettings {
    #[serde(default = "default_block_gap_tolerance")]
    pub block_gap_tolerance: u64,
    #[serde(default = "default_broadcast_check_interval_ms")]
    pub broadcast_check_interval_ms: u64,
    /// Upper bound on checks for a waiting block. Unset means wait until the
    /// predecessor is broadcast or the process stops.
    #[serde(default)]
    pub max_broadcast_retries: Option<u32>,
    /// Chains with an emission funds contract publish block rewards
    #[serde(default)]
    pub has_emission_funds: bool,
    /// Days of history included in `transactions:stats` updates
    #[serde(default = "default_transaction_stats_days")]
    pub transaction_stats_days: u32,
    /// Days of market history sent with exchange rate updates
    #[serde(default = "default_market_history_days")]
    pub market_history_days: u32,
    #[serde(default)]
    pub solc_versions: Vec<String>,
    #[serde(default)]
    pub vyper_versions: Vec<String>,
}

impl NotifierSettings {
    pub fn broadcast_check_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_check_interval_ms)
    }
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            block_gap_tolerance: default_block_gap_tolerance(),
            broadcast_check_interval_ms: default_broadcast_check_interval_ms(),
            max_broadcast_retries: None,
            has_emission_funds: false,
            transaction_stats_days: default_transaction_stats_days(),
            market_history_days: default_market_history_days(),
            solc_versions: Vec::new(),
            vyper_versions: Vec::new(),
        }
    }
}

fn default_block_gap_tolerance() -> u64 {
    DEFAULT_BLOCK_GAP_TOLERANCE
}

fn default_broadcast_check_interval_ms() -> u64 {
    DEFAULT_BROADCAST_CHECK_INTERVAL_MS
}

fn default_transaction_stats_days() -> u32 {
    30
}

fn default_market_history_days() -> u32 {
    30
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub postgres: PostgresSettings,
    pub redpanda: RedpandaSettings,
    #[serde(default)]
    pub notifier: NotifierSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
