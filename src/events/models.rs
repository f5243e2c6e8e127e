use alloy::primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Indexed block, as preloaded by the indexing pipeline.
///
/// Only the fields the notifier reads are typed; everything else used by
/// subscribers to render the block travels in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub number: u64,
    pub hash: B256,
    pub miner_hash: Address,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Collated or pending transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub hash: B256,
    /// `None` while the transaction is pending
    #[serde(default)]
    pub block_number: Option<u64>,
    pub from_address_hash: Address,
    /// `None` for contract creation
    #[serde(default)]
    pub to_address_hash: Option<Address>,
    #[serde(default)]
    pub value: U256,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    pub fn is_pending(&self) -> bool {
        self.block_number.is_none()
    }
}

/// ERC-20/721/1155 token transfer log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenTransfer {
    pub transaction_hash: B256,
    pub log_index: u64,
    #[serde(default)]
    pub block_number: Option<u64>,
    pub token_contract_address_hash: Address,
    pub from_address_hash: Address,
    pub to_address_hash: Address,
    #[serde(default)]
    pub amount: Option<U256>,
    #[serde(default)]
    pub token_ids: Option<Vec<U256>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Internal call produced by transaction tracing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InternalTransaction {
    pub transaction_hash: B256,
    pub index: u64,
    pub from_address_hash: Address,
    #[serde(default)]
    pub to_address_hash: Option<Address>,
    #[serde(default)]
    pub value: U256,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Address row touched by an import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddressRecord {
    pub hash: Address,
    #[serde(default)]
    pub fetched_coin_balance: Option<U256>,
    #[serde(default)]
    pub fetched_coin_balance_block_number: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Native coin balance of an address at a block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoinBalance {
    pub address_hash: Address,
    pub block_number: u64,
    #[serde(default)]
    pub value: Option<U256>,
}

/// Token balance of an address at a block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenBalance {
    pub address_hash: Address,
    pub block_number: u64,
    pub token_contract_address_hash: Address,
    #[serde(default)]
    pub value: Option<U256>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RewardAddressType {
    Validator,
    EmissionFunds,
    Uncle,
}

/// Block reward paid to a validator, an uncle or the emission funds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockReward {
    pub address_hash: Address,
    pub address_type: RewardAddressType,
    pub block_hash: B256,
    pub reward: U256,
}

/// Rollup batch confirmed on L1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmedBatch {
    pub number: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub contract_address_hash: Address,
    #[serde(default)]
    pub total_supply: Option<U256>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Snapshot of the current token balances of one address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentTokenBalances {
    pub address_hash: Address,
    pub address_current_token_balances: Vec<Value>,
}

/// `[address_hash, bytecode]`
pub type FetchedBytecode = (Address, Bytes);

/// `[token_contract_address_hash, token_id, metadata]`
pub type FetchedTokenInstanceMetadata = (Address, U256, Value);

/// Outcome of a contract verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationResult {
    Ok {
        smart_contract: Value,
    },
    Error {
        /// Field name to validation messages
        errors: Map<String, Value>,
    },
}

/// Request parameters of the verification form the result belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerificationContext {
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractVerification {
    pub address_hash: Address,
    pub result: VerificationResult,
    #[serde(default)]
    pub context: Option<VerificationContext>,
}

/// Coin price as stored by the market fetcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExchangeRate {
    pub usd_value: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketHistory {
    pub date: chrono::NaiveDate,
    pub closing_price: Option<f64>,
    pub opening_price: Option<f64>,
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionStats {
    pub date: chrono::NaiveDate,
    pub number_of_transactions: i64,
    pub gas_used: Option<f64>,
    pub total_fee: Option<f64>,
}
