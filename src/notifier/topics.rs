//! Subscriber topic names.
//!
//! Topics are `"<kind>:<scope>"` where the scope is a fixed literal or an
//! entity identity rendered as lowercase `0x` hex. Subscribers key off these
//! exact strings.

use std::fmt::LowerHex;

use alloy::primitives::{Address, B256};

pub const NEW_ADDRESS: &str = "addresses:new_address";
pub const NEW_BLOCK: &str = "blocks:new_block";
pub const NEW_TRANSACTION: &str = "transactions:new_transaction";
pub const NEW_PENDING_TRANSACTION: &str = "transactions:new_pending_transaction";
pub const TRANSACTION_STATS: &str = "transactions:stats";
pub const NEW_TOKEN_TRANSFER: &str = "token_transfers:new_token_transfer";
pub const NEW_RATE: &str = "exchange_rate:new_rate";
pub const NEW_ZKEVM_CONFIRMED_BATCH: &str = "zkevm_batches:new_zkevm_confirmed_batch";
pub const NEW_OPTIMISM_DEPOSITS: &str = "optimism_deposits:new_deposits";

/// Lowercase `0x`-prefixed hex, the canonical identity rendering.
pub fn identity<T: LowerHex>(value: &T) -> String {
    format!("{:#x}", value)
}

pub fn address(hash: &Address) -> String {
    format!("addresses:{}", identity(hash))
}

pub fn blocks_by_miner(miner_hash: &Address) -> String {
    format!("blocks:{}", identity(miner_hash))
}

pub fn transaction(hash: &B256) -> String {
    format!("transactions:{}", identity(hash))
}

pub fn token(contract_address_hash: &Address) -> String {
    format!("tokens:{}", identity(contract_address_hash))
}

pub fn token_instances(contract_address_hash: &Address) -> String {
    format!("token_instances:{}", identity(contract_address_hash))
}

pub fn rewards(address_hash: &Address) -> String {
    format!("rewards:{}", identity(address_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    #[test]
    fn test_identity_topics_are_lowercase_hex() {
        let miner = address!("0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(
            blocks_by_miner(&miner),
            "blocks:0xabcdef0123456789abcdef0123456789abcdef01"
        );
        assert_eq!(
            address(&miner),
            "addresses:0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn test_transaction_topic_keeps_full_hash() {
        let hash = b256!("0x00000000000000000000000000000000000000000000000000000000000000ff");
        assert_eq!(
            transaction(&hash),
            "transactions:0x00000000000000000000000000000000000000000000000000000000000000ff"
        );
    }
}
