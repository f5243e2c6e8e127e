//! Chain events produced by the indexing pipeline and the entities they carry.

mod event;
pub mod models;

pub use event::{ChainEvent, DeliveryMode, EventKind, RawChainEvent};
