use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use log::{error, warn};

use super::Notifier;
use crate::events::{ChainEvent, DeliveryMode, EventKind};

impl Notifier {
    /// Route one chain event to its handler.
    ///
    /// Never fails: handler errors and panics are logged, unmatched events
    /// are logged and dropped.
    pub async fn dispatch(&self, event: ChainEvent) {
        let category = event.kind.category().to_string();

        match AssertUnwindSafe(self.handle(event)).catch_unwind().await {
            Ok(Ok(())) => {},
            Ok(Err(e)) => {
                error!("Notifier: failed to broadcast {} event: {:#}", category, e);
            },
            Err(_) => {
                error!("Notifier: handler for {} event panicked", category);
            },
        }
    }

    /// Handler selection. Arms are ordered from the most specific payload
    /// shape to the most general one; the last arm takes everything else.
    async fn handle(&self, event: ChainEvent) -> anyhow::Result<()> {
        use DeliveryMode::{OnDemand, Realtime};

        match (event.mode, event.kind) {
            (_, EventKind::Addresses(addresses)) => {
                self.on_addresses(addresses).await;
                Ok(())
            },
            (_, EventKind::AddressCoinBalances(balances)) => {
                self.on_address_coin_balances(balances).await;
                Ok(())
            },
            (_, EventKind::AddressTokenBalances(balances)) => {
                self.on_address_token_balances(balances).await;
                Ok(())
            },
            (OnDemand, EventKind::ContractVerificationResult(verification)) => {
                self.on_contract_verification_result(verification).await;
                Ok(())
            },
            (Realtime, EventKind::BlockRewards(rewards)) => {
                self.on_block_rewards(rewards).await;
                Ok(())
            },
            (Realtime, EventKind::Blocks(blocks)) => {
                self.on_blocks(blocks).await;
                Ok(())
            },
            (Realtime, EventKind::ZkevmConfirmedBatches(batches)) => {
                self.on_zkevm_confirmed_batches(batches).await;
                Ok(())
            },
            (_, EventKind::ExchangeRate) => {
                self.on_exchange_rate().await;
                Ok(())
            },
            (OnDemand, EventKind::InternalTransactions(internal))
                if internal.len() == 1 && internal[0].index == 0 =>
            {
                self.on_raw_trace(&internal[0]).await;
                Ok(())
            },
            (Realtime, EventKind::InternalTransactions(internal)) => {
                self.on_internal_transactions(internal).await;
                Ok(())
            },
            (Realtime, EventKind::TokenTransfers(transfers)) => {
                self.on_token_transfers(transfers).await;
                Ok(())
            },
            (Realtime, EventKind::Transactions(transactions)) => {
                self.on_transactions(transactions).await;
                Ok(())
            },
            (_, EventKind::TransactionStats) => self.on_transaction_stats().await,
            (OnDemand, EventKind::TokenTotalSupply(tokens))
                if tokens.len() == 1 && tokens[0].total_supply.is_some() =>
            {
                self.on_token_total_supply(&tokens[0]).await;
                Ok(())
            },
            (OnDemand, EventKind::FetchedBytecode((address_hash, bytecode))) => {
                self.on_fetched_bytecode(address_hash, bytecode).await;
                Ok(())
            },
            (OnDemand, EventKind::FetchedTokenInstanceMetadata((token, token_id, metadata))) => {
                self.on_fetched_token_instance_metadata(token, token_id, metadata)
                    .await;
                Ok(())
            },
            (OnDemand, EventKind::ChangedBytecode(address_hash)) => {
                self.on_changed_bytecode(address_hash).await;
                Ok(())
            },
            (Realtime, EventKind::OptimismDeposits(deposits)) => {
                self.on_optimism_deposits(deposits).await;
                Ok(())
            },
            (
                OnDemand,
                kind @ (EventKind::SmartContractWasVerified(_)
                | EventKind::SmartContractWasNotVerified(_)
                | EventKind::EthBytecodeDbLookupStarted(_)),
            ) => {
                self.on_verification_lifecycle(&kind).await;
                Ok(())
            },
            (OnDemand, EventKind::AddressCurrentTokenBalances(balances)) => {
                self.on_address_current_token_balances(balances).await;
                Ok(())
            },
            (mode, kind) => {
                warn!(
                    "Unknown broadcasted event {} ({:?}): {:?}",
                    kind.category(),
                    mode,
                    kind
                );
                Ok(())
            },
        }
    }
}
