mod config;

pub use self::config::{NotifierSettings, PostgresSettings, RedpandaSettings, Settings};
