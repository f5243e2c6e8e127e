use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use herald::{
    notifier::StaticCompilerVersions, EventConsumer, Notifier, PostgresClient, RedpandaPublisher,
    Settings,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .context("Failed to initialize logger")?;

    // Load configuration
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    let store = PostgresClient::new(settings.postgres.clone())
        .await
        .context("Failed to initialize database connection")?;
    store
        .verify_schema()
        .await
        .context("Explorer database is missing notifier tables")?;

    let publisher = Arc::new(
        RedpandaPublisher::new(&settings.redpanda)
            .context("Failed to initialize notification publisher")?,
    );

    let notifier = Arc::new(Notifier::new(
        publisher.clone(),
        Arc::new(store),
        Arc::new(StaticCompilerVersions::new(&settings.notifier)),
        settings.notifier.clone(),
    ));

    let consumer = EventConsumer::new(&settings.redpanda, notifier.clone())
        .context("Failed to initialize chain event consumer")?;

    let cancellation_token = CancellationToken::new();

    let consumer_token = cancellation_token.child_token();
    let consumer_handle = tokio::spawn(async move {
        if let Err(e) = consumer.run(consumer_token).await {
            error!("Chain event consumer failed: {:#}", e);
        }
    });

    info!("Notifier started - dispatching chain events");

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Notifier running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    cancellation_token.cancel();

    // Stop taking events, let in-flight dispatches finish
    info!("Waiting for chain event consumer to stop...");
    let _ = consumer_handle.await;

    info!("Releasing blocks waiting for broadcast...");
    notifier.shutdown().await;

    info!("Flushing pending notifications...");
    publisher.flush();

    info!("Notifier stopped");
    Ok(())
}
