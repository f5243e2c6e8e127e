use alloy::primitives::Address;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::models::{
    AddressRecord, Block, BlockReward, CoinBalance, ConfirmedBatch, ContractVerification,
    CurrentTokenBalances, FetchedBytecode, FetchedTokenInstanceMetadata, InternalTransaction,
    Token, TokenBalance, TokenTransfer, Transaction,
};

/// How an event was produced: by the realtime indexer, or as a one-off
/// reaction to an explicit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Realtime,
    OnDemand,
}

/// Category-specific payload of a chain event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Addresses(Vec<AddressRecord>),
    AddressCoinBalances(Vec<CoinBalance>),
    AddressTokenBalances(Vec<TokenBalance>),
    ContractVerificationResult(ContractVerification),
    BlockRewards(Vec<BlockReward>),
    Blocks(Vec<Block>),
    ZkevmConfirmedBatches(Vec<ConfirmedBatch>),
    ExchangeRate,
    InternalTransactions(Vec<InternalTransaction>),
    TokenTransfers(Vec<TokenTransfer>),
    Transactions(Vec<Transaction>),
    TransactionStats,
    TokenTotalSupply(Vec<Token>),
    FetchedBytecode(FetchedBytecode),
    FetchedTokenInstanceMetadata(FetchedTokenInstanceMetadata),
    ChangedBytecode(Address),
    OptimismDeposits(Vec<Value>),
    SmartContractWasVerified(Address),
    SmartContractWasNotVerified(Address),
    EthBytecodeDbLookupStarted(Address),
    AddressCurrentTokenBalances(CurrentTokenBalances),
    /// Category unknown to this build, or a payload that does not have the
    /// shape of its category
    Unrecognized { category: String, payload: Value },
}

impl EventKind {
    /// Category name as it appears on the wire.
    pub fn category(&self) -> &str {
        match self {
            EventKind::Addresses(_) => "addresses",
            EventKind::AddressCoinBalances(_) => "address_coin_balances",
            EventKind::AddressTokenBalances(_) => "address_token_balances",
            EventKind::ContractVerificationResult(_) => "contract_verification_result",
            EventKind::BlockRewards(_) => "block_rewards",
            EventKind::Blocks(_) => "blocks",
            EventKind::ZkevmConfirmedBatches(_) => "zkevm_confirmed_batches",
            EventKind::ExchangeRate => "exchange_rate",
            EventKind::InternalTransactions(_) => "internal_transactions",
            EventKind::TokenTransfers(_) => "token_transfers",
            EventKind::Transactions(_) => "transactions",
            EventKind::TransactionStats => "transaction_stats",
            EventKind::TokenTotalSupply(_) => "token_total_supply",
            EventKind::FetchedBytecode(_) => "fetched_bytecode",
            EventKind::FetchedTokenInstanceMetadata(_) => "fetched_token_instance_metadata",
            EventKind::ChangedBytecode(_) => "changed_bytecode",
            EventKind::OptimismDeposits(_) => "optimism_deposits",
            EventKind::SmartContractWasVerified(_) => "smart_contract_was_verified",
            EventKind::SmartContractWasNotVerified(_) => "smart_contract_was_not_verified",
            EventKind::EthBytecodeDbLookupStarted(_) => "eth_bytecode_db_lookup_started",
            EventKind::AddressCurrentTokenBalances(_) => "address_current_token_balances",
            EventKind::Unrecognized { category, .. } => category,
        }
    }
}

/// Domain event emitted by the indexing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainEvent {
    pub mode: DeliveryMode,
    pub kind: EventKind,
}

impl ChainEvent {
    pub fn new(mode: DeliveryMode, kind: EventKind) -> Self {
        Self { mode, kind }
    }

    pub fn realtime(kind: EventKind) -> Self {
        Self::new(DeliveryMode::Realtime, kind)
    }

    pub fn on_demand(kind: EventKind) -> Self {
        Self::new(DeliveryMode::OnDemand, kind)
    }

    /// Decode a JSON chain event as found on the inbound topic.
    ///
    /// Only a malformed envelope is an error. Unknown categories and payloads
    /// of the wrong shape decode to [`EventKind::Unrecognized`] so the router
    /// can drop them.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        let raw: RawChainEvent = serde_json::from_slice(bytes)?;
        Ok(raw.into())
    }
}

/// Wire envelope: `{"category": ..., "mode": ..., "payload": ...}`
#[derive(Debug, Deserialize)]
pub struct RawChainEvent {
    pub category: String,
    pub mode: DeliveryMode,
    #[serde(default)]
    pub payload: Value,
}

fn decode<T: DeserializeOwned>(payload: &Value) -> Option<T> {
    serde_json::from_value(payload.clone()).ok()
}

/// Markers carrying a single address arrive as `[address]`.
fn decode_marker(payload: &Value) -> Option<Address> {
    decode::<(Address,)>(payload).map(|(address,)| address)
}

impl From<RawChainEvent> for ChainEvent {
    fn from(raw: RawChainEvent) -> Self {
        let payload = &raw.payload;
        let kind = match raw.category.as_str() {
            "addresses" => decode(payload).map(EventKind::Addresses),
            "address_coin_balances" => decode(payload).map(EventKind::AddressCoinBalances),
            "address_token_balances" => decode(payload).map(EventKind::AddressTokenBalances),
            "contract_verification_result" => {
                decode(payload).map(EventKind::ContractVerificationResult)
            },
            "block_rewards" => decode(payload).map(EventKind::BlockRewards),
            "blocks" => decode(payload).map(EventKind::Blocks),
            "zkevm_confirmed_batches" => decode(payload).map(EventKind::ZkevmConfirmedBatches),
            "exchange_rate" => Some(EventKind::ExchangeRate),
            "internal_transactions" => decode(payload).map(EventKind::InternalTransactions),
            "token_transfers" => decode(payload).map(EventKind::TokenTransfers),
            "transactions" => decode(payload).map(EventKind::Transactions),
            "transaction_stats" => Some(EventKind::TransactionStats),
            "token_total_supply" => decode(payload).map(EventKind::TokenTotalSupply),
            "fetched_bytecode" => decode(payload).map(EventKind::FetchedBytecode),
            "fetched_token_instance_metadata" => {
                decode(payload).map(EventKind::FetchedTokenInstanceMetadata)
            },
            "changed_bytecode" => decode_marker(payload).map(EventKind::ChangedBytecode),
            "optimism_deposits" => decode(payload).map(EventKind::OptimismDeposits),
            "smart_contract_was_verified" => {
                decode_marker(payload).map(EventKind::SmartContractWasVerified)
            },
            "smart_contract_was_not_verified" => {
                decode_marker(payload).map(EventKind::SmartContractWasNotVerified)
            },
            "eth_bytecode_db_lookup_started" => {
                decode_marker(payload).map(EventKind::EthBytecodeDbLookupStarted)
            },
            "address_current_token_balances" => {
                decode(payload).map(EventKind::AddressCurrentTokenBalances)
            },
            _ => None,
        };

        let kind = kind.unwrap_or(EventKind::Unrecognized {
            category: raw.category,
            payload: raw.payload,
        });

        ChainEvent::new(raw.mode, kind)
    }
}
