use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use tokio::sync::Notify;

use super::{abi, ChainClient, TxInfo};

/// Holds `transfer_token` open until released, so tests can act while a
/// transfer is in flight on the node.
#[derive(Clone, Default)]
pub struct TransferGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl TransferGate {
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Scripted node that records the methods it was asked to run.
pub struct FakeChain {
    pub token_balance: U256,
    pub unlock_ok: bool,
    pub transfer_ok: bool,
    pub info_ok: bool,
    pub gate: Option<TransferGate>,
    calls: Mutex<Vec<String>>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            token_balance: U256::from(1_000_000u64),
            unlock_ok: true,
            transfer_ok: true,
            info_ok: true,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    fn is_address(&self, address: &str) -> bool {
        abi::is_valid_address(address)
    }

    async fn eth_balance(&self, address: &str) -> anyhow::Result<U256> {
        self.record(format!("eth_balance {}", address));
        Ok(U256::from(2_500_000_000_000_000_000u128))
    }

    async fn token_balance(&self, address: &str) -> anyhow::Result<U256> {
        self.record(format!("token_balance {}", address));
        Ok(self.token_balance)
    }

    async fn new_account(&self, _password: &str) -> anyhow::Result<String> {
        self.record("new_account");
        Ok(format!("0x{}", "ab".repeat(20)))
    }

    async fn unlock_account(
        &self,
        address: &str,
        _password: &str,
        duration: Duration,
    ) -> anyhow::Result<bool> {
        self.record(format!("unlock {} {}", address, duration.as_secs()));
        Ok(self.unlock_ok)
    }

    async fn lock_account(&self, address: &str) -> anyhow::Result<()> {
        self.record(format!("lock {}", address));
        Ok(())
    }

    async fn transfer_token(&self, from: &str, to: &str, amount: u64) -> anyhow::Result<String> {
        self.record(format!("transfer {} {} {}", from, to, amount));
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if !self.transfer_ok {
            anyhow::bail!("intrinsic gas too low");
        }
        Ok(format!("0x{}", "cd".repeat(32)))
    }

    async fn transaction_info(&self, tx_hash: &str) -> anyhow::Result<TxInfo> {
        self.record(format!("transaction_info {}", tx_hash));
        if !self.info_ok {
            anyhow::bail!("not found");
        }
        Ok(TxInfo {
            gas: 90_000,
            gas_price: U256::from(20_000_000_000u64),
            value: U256::ZERO,
            network_id: "1337".into(),
        })
    }
}
