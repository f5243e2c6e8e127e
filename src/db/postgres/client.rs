use std::time::Duration;

use anyhow::Context;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use log::{info, warn};
use moka::future::Cache;
use tokio_postgres::NoTls;

use crate::config::PostgresSettings;

/// How long slow aggregates are served from memory
const AGGREGATE_CACHE_TTL: Duration = Duration::from_secs(30);

const EXPLORER_TABLES: [&str; 4] = ["addresses", "blocks", "market_history", "transaction_stats"];

/// PostgreSQL client with connection pooling.
///
/// Read-only access to the explorer database. Uses `deadpool-postgres`
/// for connection management and caches the expensive aggregates.
#[derive(Clone)]
pub struct PostgresClient {
    pub pool: Pool,
    pub(super) address_count: Cache<(), u64>,
    pub(super) average_block_time: Cache<(), Option<Duration>>,
}

impl PostgresClient {
    pub async fn new(settings: PostgresSettings) -> anyhow::Result<Self> {
        info!("Connecting to PostgreSQL");

        let mut retries = 0;
        let max_retries = 3;

        loop {
            let mut pg_config = tokio_postgres::Config::new();
            pg_config
                .host(&settings.host)
                .port(settings.port)
                .user(&settings.user)
                .password(&settings.password)
                .dbname(&settings.database);

            let mgr_config = ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            };

            let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
            let pool = Pool::builder(mgr)
                .max_size(settings.pool_size)
                .build()
                .context("Failed to create PostgreSQL connection pool")?;

            // Test the connection
            match pool.get().await {
                Ok(_conn) => {
                    info!("Successfully connected to PostgreSQL");
                    return Ok(Self {
                        pool,
                        address_count: aggregate_cache(),
                        average_block_time: aggregate_cache(),
                    });
                },
                Err(e) => {
                    retries += 1;

                    if retries >= max_retries {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to PostgreSQL after {} attempts: {}",
                            max_retries,
                            e
                        ));
                    }

                    let delay = Duration::from_millis(100 * 2_u64.pow(retries));
                    warn!(
                        "Failed to connect to PostgreSQL (attempt {}/{}), retrying in {:?}...",
                        retries, max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                },
            }
        }
    }

    /// Fail early when a table the notifier reads is missing.
    pub async fn verify_schema(&self) -> anyhow::Result<()> {
        let client = self.pool.get().await?;

        for table in EXPLORER_TABLES {
            let row = client
                .query_one(
                    "SELECT EXISTS (SELECT 1 FROM pg_tables WHERE schemaname = current_schema() AND tablename = $1)",
                    &[&table],
                )
                .await
                .with_context(|| format!("Failed to look up table {}", table))?;

            let exists: bool = row.get(0);
            if !exists {
                anyhow::bail!("Explorer table {} not found", table);
            }
        }

        Ok(())
    }
}

fn aggregate_cache<V: Clone + Send + Sync + 'static>() -> Cache<(), V> {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(AGGREGATE_CACHE_TTL)
        .build()
}
