use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::U256;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{abi, ChainClient, TxInfo};
use crate::config::ChainConfig;

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    gas: String,
    gas_price: Option<String>,
    value: String,
}

/// JSON-RPC 2.0 client for a geth-style node with the `personal` API enabled.
pub struct JsonRpcClient {
    http_client: HttpClient,
    rpc_url: String,
    token_address: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(cfg: &ChainConfig) -> anyhow::Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(cfg.rpc_timeout())
            .build()
            .context("build rpc http client")?;
        Ok(Self {
            http_client,
            rpc_url: cfg.provider_url.clone(),
            token_address: cfg.token_address.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> anyhow::Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let resp = self
            .http_client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("rpc {} request", method))?;

        let rpc_resp: RpcResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("rpc {} response", method))?;

        if let Some(error) = rpc_resp.error {
            return Err(anyhow!("rpc {} error: {} ({})", method, error.message, error.code));
        }
        debug!(method, id, "rpc call ok");
        rpc_resp
            .result
            .ok_or_else(|| anyhow!("rpc {} returned no result", method))
    }
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    fn is_address(&self, address: &str) -> bool {
        abi::is_valid_address(address)
    }

    #[instrument(skip(self))]
    async fn eth_balance(&self, address: &str) -> anyhow::Result<U256> {
        let raw: String = self
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        abi::parse_quantity(&raw)
    }

    #[instrument(skip(self))]
    async fn token_balance(&self, address: &str) -> anyhow::Result<U256> {
        let data = abi::encode_balance_of(address)?;
        let raw: String = self
            .call(
                "eth_call",
                json!([{ "to": self.token_address, "data": data }, "latest"]),
            )
            .await?;
        abi::parse_quantity(&raw)
    }

    #[instrument(skip(self, password))]
    async fn new_account(&self, password: &str) -> anyhow::Result<String> {
        self.call("personal_newAccount", json!([password])).await
    }

    #[instrument(skip(self, password))]
    async fn unlock_account(
        &self,
        address: &str,
        password: &str,
        duration: Duration,
    ) -> anyhow::Result<bool> {
        self.call(
            "personal_unlockAccount",
            json!([address, password, duration.as_secs()]),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn lock_account(&self, address: &str) -> anyhow::Result<()> {
        let locked: bool = self.call("personal_lockAccount", json!([address])).await?;
        if !locked {
            anyhow::bail!("node refused to lock {}", address);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn transfer_token(&self, from: &str, to: &str, amount: u64) -> anyhow::Result<String> {
        let data = abi::encode_transfer(to, U256::from(amount))?;
        self.call(
            "eth_sendTransaction",
            json!([{ "from": from, "to": self.token_address, "data": data }]),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn transaction_info(&self, tx_hash: &str) -> anyhow::Result<TxInfo> {
        let tx: RpcTransaction = self
            .call("eth_getTransactionByHash", json!([tx_hash]))
            .await?;
        let network_id: String = self.call("net_version", json!([])).await?;
        let gas = abi::parse_quantity(&tx.gas)?;
        let gas = u64::try_from(gas).map_err(|_| anyhow!("gas {} exceeds u64", gas))?;
        let gas_price = match tx.gas_price.as_deref() {
            Some(raw) => abi::parse_quantity(raw)?,
            None => U256::ZERO,
        };
        Ok(TxInfo {
            gas,
            gas_price,
            value: abi::parse_quantity(&tx.value)?,
            network_id,
        })
    }
}
