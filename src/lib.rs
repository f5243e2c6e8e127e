pub mod config;
pub mod db;
pub mod events;
pub mod notifier;
pub mod pubsub;

pub use self::config::Settings;
pub use db::{ChainStore, PostgresClient};
pub use events::{ChainEvent, DeliveryMode, EventKind};
pub use notifier::Notifier;
pub use pubsub::{EventConsumer, Publisher, RedpandaPublisher};
