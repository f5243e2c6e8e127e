//! Per-category publication.

use alloy::primitives::{Address, Bytes, U256};
use chrono::{Days, Utc};
use log::{info, warn};
use rustc_hash::FxHashMap;
use serde_json::{json, Value};

use super::fan_out::{publish_by_recipient, publish_to_recipients};
use super::verification::form_result;
use super::{topics, Notifier};
use crate::events::models::{
    AddressRecord, Block, BlockReward, CoinBalance, ConfirmedBatch, ContractVerification,
    CurrentTokenBalances, ExchangeRate, InternalTransaction, RewardAddressType, Token, TokenBalance,
    TokenTransfer, Transaction,
};
use crate::events::EventKind;

impl Notifier {
    pub(super) async fn on_addresses(&self, addresses: Vec<AddressRecord>) {
        match self.store.address_estimated_count().await {
            Ok(count) => {
                self.broadcast(topics::NEW_ADDRESS, "count", json!({ "count": count }))
                    .await;
            },
            Err(e) => warn!("Address count unavailable, skipping count update: {:#}", e),
        }

        let with_balance: Vec<&AddressRecord> = addresses
            .iter()
            .filter(|address| address.fetched_coin_balance.is_some())
            .collect();
        if with_balance.is_empty() {
            return;
        }

        let exchange_rate = self.exchange_rate_or_default().await;

        for address in with_balance {
            self.broadcast(
                &topics::address(&address.hash),
                "balance_update",
                json!({ "address": address, "exchange_rate": exchange_rate }),
            )
            .await;
        }
    }

    pub(super) async fn on_address_coin_balances(&self, balances: Vec<CoinBalance>) {
        for balance in balances {
            self.broadcast(
                &topics::address(&balance.address_hash),
                "coin_balance",
                json!({ "block_number": balance.block_number }),
            )
            .await;
        }
    }

    pub(super) async fn on_address_token_balances(&self, balances: Vec<TokenBalance>) {
        for balance in balances {
            self.broadcast(
                &topics::address(&balance.address_hash),
                "token_balance",
                json!({ "block_number": balance.block_number }),
            )
            .await;
        }
    }

    pub(super) async fn on_contract_verification_result(&self, verification: ContractVerification) {
        info!(
            "Broadcast smart-contract verification results for {}",
            topics::identity(&verification.address_hash)
        );

        let result = match &verification.context {
            Some(context) => form_result(verification.result, context, self.compilers.as_ref()).await,
            None => json!(verification.result),
        };

        self.broadcast(
            &topics::address(&verification.address_hash),
            "verification_result",
            json!({ "result": result }),
        )
        .await;
    }

    pub(super) async fn on_block_rewards(&self, rewards: Vec<BlockReward>) {
        if !self.settings.has_emission_funds {
            return;
        }

        let (emission, others): (Vec<BlockReward>, Vec<BlockReward>) = rewards
            .into_iter()
            .partition(|reward| reward.address_type == RewardAddressType::EmissionFunds);
        let emission_funds = emission.first();

        for reward in &others {
            self.broadcast(
                &topics::rewards(&reward.address_hash),
                "new_reward",
                json!({ "emission_funds": emission_funds, "validator": reward }),
            )
            .await;
        }
    }

    pub(super) async fn on_blocks(&self, mut blocks: Vec<Block>) {
        blocks.sort_by_key(|block| block.number);
        for block in blocks {
            self.sequencer.submit(block).await;
        }
    }

    pub(super) async fn on_zkevm_confirmed_batches(&self, mut batches: Vec<ConfirmedBatch>) {
        batches.sort_by_key(|batch| batch.number);
        for batch in batches {
            self.broadcast(
                topics::NEW_ZKEVM_CONFIRMED_BATCH,
                "new_zkevm_confirmed_batch",
                json!({ "batch": batch }),
            )
            .await;
        }
    }

    pub(super) async fn on_exchange_rate(&self) {
        let exchange_rate = self.exchange_rate_or_default().await;
        let market_history = match self
            .store
            .market_history(self.settings.market_history_days)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!("Market history unavailable: {:#}", e);
                Vec::new()
            },
        };

        self.broadcast(
            topics::NEW_RATE,
            "new_rate",
            json!({ "exchange_rate": exchange_rate, "market_history_data": market_history }),
        )
        .await;
    }

    /// Current coin exchange rate, or none when the store cannot provide it.
    async fn exchange_rate_or_default(&self) -> Option<ExchangeRate> {
        match self.store.coin_exchange_rate().await {
            Ok(rate) => rate,
            Err(e) => {
                warn!("Exchange rate unavailable: {:#}", e);
                None
            },
        }
    }

    /// The trace of an already indexed transaction has been fetched.
    pub(super) async fn on_raw_trace(&self, internal: &InternalTransaction) {
        self.broadcast(
            &topics::transaction(&internal.transaction_hash),
            "raw_trace",
            json!({ "raw_trace_origin": internal.transaction_hash }),
        )
        .await;
    }

    pub(super) async fn on_internal_transactions(&self, internal: Vec<InternalTransaction>) {
        for internal_transaction in &internal {
            publish_to_recipients(
                self.publisher.as_ref(),
                internal_transaction,
                "internal_transaction",
                "internal_transaction",
            )
            .await;
        }
    }

    pub(super) async fn on_token_transfers(&self, transfers: Vec<TokenTransfer>) {
        let publisher = self.publisher.as_ref();

        let mut by_token: FxHashMap<Address, Vec<&TokenTransfer>> = FxHashMap::default();
        for transfer in &transfers {
            by_token
                .entry(transfer.token_contract_address_hash)
                .or_default()
                .push(transfer);
        }
        for (token, token_transfers) in &by_token {
            self.broadcast(
                &topics::token(token),
                "token_transfer",
                json!({ "token_transfers": token_transfers }),
            )
            .await;
        }
        publish_by_recipient(publisher, &transfers, "token_transfer", "token_transfers").await;

        for transfer in &transfers {
            let payload = json!({ "token_transfer": transfer });
            self.broadcast(topics::NEW_TOKEN_TRANSFER, "token_transfer", payload.clone())
                .await;
            self.broadcast(
                &topics::token(&transfer.token_contract_address_hash),
                "token_transfer",
                payload,
            )
            .await;
            publish_to_recipients(publisher, transfer, "token_transfer", "token_transfer").await;
        }
    }

    pub(super) async fn on_transactions(&self, transactions: Vec<Transaction>) {
        let publisher = self.publisher.as_ref();
        let (pending, validated): (Vec<Transaction>, Vec<Transaction>) =
            transactions.into_iter().partition(Transaction::is_pending);

        for (batch, channel, event) in [
            (&pending, topics::NEW_PENDING_TRANSACTION, "pending_transaction"),
            (&validated, topics::NEW_TRANSACTION, "transaction"),
        ] {
            if batch.is_empty() {
                continue;
            }
            self.broadcast(channel, event, json!({ "transactions": batch }))
                .await;
            publish_by_recipient(publisher, batch, event, "transactions").await;

            for transaction in batch {
                self.broadcast(&topics::transaction(&transaction.hash), "collated", json!({}))
                    .await;
                self.broadcast(channel, event, json!({ "transaction": transaction }))
                    .await;
                publish_to_recipients(publisher, transaction, event, "transaction").await;
            }
        }
    }

    pub(super) async fn on_transaction_stats(&self) -> anyhow::Result<()> {
        let today = Utc::now().date_naive();
        let from = today
            .checked_sub_days(Days::new(self.settings.transaction_stats_days.into()))
            .unwrap_or(today);

        let stats = self.store.transaction_stats(from, today).await?;
        self.broadcast(topics::TRANSACTION_STATS, "update", json!({ "stats": stats }))
            .await;

        Ok(())
    }

    pub(super) async fn on_token_total_supply(&self, token: &Token) {
        self.broadcast(
            &topics::token(&token.contract_address_hash),
            "token_total_supply",
            json!({ "token": token }),
        )
        .await;
    }

    pub(super) async fn on_fetched_bytecode(&self, address_hash: Address, bytecode: Bytes) {
        self.broadcast(
            &topics::address(&address_hash),
            "fetched_bytecode",
            json!({ "fetched_bytecode": bytecode }),
        )
        .await;
    }

    pub(super) async fn on_fetched_token_instance_metadata(
        &self,
        token: Address,
        token_id: U256,
        metadata: Value,
    ) {
        self.broadcast(
            &topics::token_instances(&token),
            "fetched_token_instance_metadata",
            json!({ "token_id": token_id, "fetched_metadata": metadata }),
        )
        .await;
    }

    pub(super) async fn on_changed_bytecode(&self, address_hash: Address) {
        self.broadcast(&topics::address(&address_hash), "changed_bytecode", json!({}))
            .await;
    }

    pub(super) async fn on_optimism_deposits(&self, deposits: Vec<Value>) {
        self.broadcast(
            topics::NEW_OPTIMISM_DEPOSITS,
            "deposits",
            json!({ "deposits": deposits }),
        )
        .await;
    }

    /// Automatic verification progress markers, published under their own
    /// category name.
    pub(super) async fn on_verification_lifecycle(&self, kind: &EventKind) {
        let address_hash = match kind {
            EventKind::SmartContractWasVerified(address)
            | EventKind::SmartContractWasNotVerified(address)
            | EventKind::EthBytecodeDbLookupStarted(address) => address,
            _ => return,
        };

        self.broadcast(&topics::address(address_hash), kind.category(), json!({}))
            .await;
    }

    pub(super) async fn on_address_current_token_balances(&self, balances: CurrentTokenBalances) {
        self.broadcast(
            &topics::address(&balances.address_hash),
            "address_current_token_balances",
            json!({ "address_current_token_balances": balances.address_current_token_balances }),
        )
        .await;
    }
}
