//! Recipient fan-out for address-keyed entities.
//!
//! Every entity has a sender and, usually, a receiver. A batch is delivered
//! as one message per distinct participant, and a participant that is both
//! sender and receiver of an entity gets that entity once.

use std::hash::Hash;

use alloy::primitives::{Address, B256};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{broadcast, topics};
use crate::events::models::{InternalTransaction, TokenTransfer, Transaction};
use crate::pubsub::Publisher;

/// Entity delivered to the addresses taking part in it.
pub trait Addressable {
    /// Stable identity used to drop duplicates
    type Id: Eq + Hash;

    fn entity_id(&self) -> Self::Id;

    fn from_identity(&self) -> Address;

    /// `None` when there is no receiver, e.g. contract creation
    fn to_identity(&self) -> Option<Address>;

    /// The sender, then the receiver if it is another address.
    fn recipients(&self) -> Vec<Address> {
        let from = self.from_identity();
        match self.to_identity() {
            Some(to) if to != from => vec![from, to],
            _ => vec![from],
        }
    }
}

impl Addressable for Transaction {
    type Id = B256;

    fn entity_id(&self) -> B256 {
        self.hash
    }

    fn from_identity(&self) -> Address {
        self.from_address_hash
    }

    fn to_identity(&self) -> Option<Address> {
        self.to_address_hash
    }
}

impl Addressable for TokenTransfer {
    type Id = (B256, u64);

    fn entity_id(&self) -> (B256, u64) {
        (self.transaction_hash, self.log_index)
    }

    fn from_identity(&self) -> Address {
        self.from_address_hash
    }

    fn to_identity(&self) -> Option<Address> {
        Some(self.to_address_hash)
    }
}

impl Addressable for InternalTransaction {
    type Id = (B256, u64);

    fn entity_id(&self) -> (B256, u64) {
        (self.transaction_hash, self.index)
    }

    fn from_identity(&self) -> Address {
        self.from_address_hash
    }

    fn to_identity(&self) -> Option<Address> {
        self.to_address_hash
    }
}

/// Group `entities` by participating address.
///
/// Receiver groups come first, sender groups are merged in with duplicates
/// removed by entity id. The result is ordered by address.
pub fn group_by_recipient<T: Addressable>(entities: &[T]) -> Vec<(Address, Vec<&T>)> {
    let mut by_to: FxHashMap<Address, Vec<&T>> = FxHashMap::default();
    let mut by_from: FxHashMap<Address, Vec<&T>> = FxHashMap::default();

    for entity in entities {
        by_from.entry(entity.from_identity()).or_default().push(entity);
        if let Some(to) = entity.to_identity() {
            by_to.entry(to).or_default().push(entity);
        }
    }

    for (address, sent) in by_from {
        let received = by_to.entry(address).or_default();
        let mut seen: FxHashSet<T::Id> = received.iter().map(|e| e.entity_id()).collect();
        for entity in sent {
            if seen.insert(entity.entity_id()) {
                received.push(entity);
            }
        }
    }

    let mut grouped: Vec<(Address, Vec<&T>)> = by_to.into_iter().collect();
    grouped.sort_unstable_by_key(|(address, _)| *address);
    grouped
}

/// Publish one `{key: [entities]}` message per participating address.
pub async fn publish_by_recipient<T>(
    publisher: &dyn Publisher,
    entities: &[T],
    event: &str,
    key: &str,
) where
    T: Addressable + Serialize,
{
    for (address, group) in group_by_recipient(entities) {
        let mut payload = Map::new();
        payload.insert(key.to_string(), json!(group));
        broadcast(publisher, &topics::address(&address), event, Value::Object(payload)).await;
    }
}

/// Publish a single entity to its sender and, if different, its receiver.
///
/// `payload_key` names the entity in the payload, next to `address_hash`.
pub async fn publish_to_recipients<T>(
    publisher: &dyn Publisher,
    entity: &T,
    event: &str,
    payload_key: &str,
) where
    T: Addressable + Serialize,
{
    for address in entity.recipients() {
        let mut payload = Map::new();
        payload.insert("address_hash".to_string(), json!(topics::identity(&address)));
        payload.insert(payload_key.to_string(), json!(entity));
        broadcast(publisher, &topics::address(&address), event, Value::Object(payload)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::testing::{addr, token_transfer, transaction, RecordingPublisher};

    #[test]
    fn test_self_transfer_is_grouped_once() {
        let a = addr(0x0a);
        let transfers = vec![token_transfer(1, addr(0xee), a, a)];

        let grouped = group_by_recipient(&transfers);

        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].0, a);
        assert_eq!(grouped[0].1.len(), 1);
    }

    #[test]
    fn test_batch_groups_cover_every_participant() {
        let (a, b, c) = (addr(0x0a), addr(0x0b), addr(0x0c));
        let token = addr(0xee);
        let transfers = vec![
            token_transfer(1, token, a, b),
            token_transfer(2, token, b, c),
            token_transfer(3, token, c, c),
            token_transfer(4, token, a, c),
        ];

        let grouped: FxHashMap<Address, Vec<u64>> = group_by_recipient(&transfers)
            .into_iter()
            .map(|(address, group)| {
                let mut ids: Vec<u64> = group.iter().map(|t| t.log_index).collect();
                ids.sort_unstable();
                (address, ids)
            })
            .collect();

        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[&a], vec![1, 4]);
        assert_eq!(grouped[&b], vec![1, 2]);
        assert_eq!(grouped[&c], vec![2, 3, 4]);
    }

    #[test]
    fn test_contract_creation_groups_only_sender() {
        let a = addr(0x0a);
        let transactions = vec![transaction(1, a, None)];

        let grouped = group_by_recipient(&transactions);

        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].0, a);
    }

    #[test]
    fn test_recipients_skip_duplicate_receiver() {
        let a = addr(0x0a);
        assert_eq!(transaction(1, a, Some(a)).recipients(), vec![a]);
        assert_eq!(
            transaction(1, a, Some(addr(0x0b))).recipients(),
            vec![a, addr(0x0b)]
        );
    }

    #[tokio::test]
    async fn test_publish_by_recipient_sends_one_message_per_address() {
        let publisher = RecordingPublisher::new();
        let (a, b) = (addr(0x0a), addr(0x0b));
        let transactions = vec![
            transaction(1, a, Some(b)),
            transaction(2, b, Some(a)),
            transaction(3, a, Some(a)),
        ];

        publish_by_recipient(&publisher, &transactions, "transaction", "transactions").await;

        let published = publisher.published();
        assert_eq!(published.len(), 2);

        let to_a = publisher.on_topic(&topics::address(&a));
        assert_eq!(to_a.len(), 1);
        assert_eq!(to_a[0].event, "transaction");
        assert_eq!(to_a[0].payload["transactions"].as_array().unwrap().len(), 3);

        let to_b = publisher.on_topic(&topics::address(&b));
        assert_eq!(to_b[0].payload["transactions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_publish_to_recipients_skips_self_transfer_duplicate() {
        let publisher = RecordingPublisher::new();
        let a = addr(0x0a);

        publish_to_recipients(&publisher, &transaction(1, a, Some(a)), "transaction", "transaction")
            .await;

        assert_eq!(publisher.topics(), vec![topics::address(&a)]);
    }
}
