use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;

pub mod abi;
pub mod callback;
#[cfg(test)]
pub(crate) mod fake;
pub mod rpc;

pub use callback::{CallbackError, LogNotifier, TransferEvent, TransferNotifier, WebhookNotifier};
pub use rpc::JsonRpcClient;

/// Gas accounting of a submitted transaction as reported by the node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxInfo {
    pub gas: u64,
    pub gas_price: U256,
    pub value: U256,
    pub network_id: String,
}

/// Everything the service needs from an Ethereum node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn is_address(&self, address: &str) -> bool;

    /// Native balance in wei.
    async fn eth_balance(&self, address: &str) -> anyhow::Result<U256>;

    /// Token balance in contract units.
    async fn token_balance(&self, address: &str) -> anyhow::Result<U256>;

    async fn new_account(&self, password: &str) -> anyhow::Result<String>;

    async fn unlock_account(
        &self,
        address: &str,
        password: &str,
        duration: Duration,
    ) -> anyhow::Result<bool>;

    async fn lock_account(&self, address: &str) -> anyhow::Result<()>;

    /// Sends `transfer(to, amount)` on the token contract; returns the tx hash.
    async fn transfer_token(&self, from: &str, to: &str, amount: u64) -> anyhow::Result<String>;

    async fn transaction_info(&self, tx_hash: &str) -> anyhow::Result<TxInfo>;
}
