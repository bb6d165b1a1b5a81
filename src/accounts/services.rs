use alloy_primitives::U256;
use anyhow::Context;
use bytes::Bytes;
use qrcode::{render::svg, QrCode};
use rand::{rngs::OsRng, RngCore};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::accounts::dto::BalanceResponse;
use crate::accounts::repo_types::EthAccount;
use crate::chain::ChainClient;
use crate::storage::StorageClient;

pub const LEDGER_ADDRESS_PREFIX: &str = "UT";
pub const LEDGER_ADDRESS_LEN: usize = 42;

/// Decimals of the token contract; one UTCoin is 1000 units.
pub const TOKEN_DECIMALS: u32 = 3;
const WEI_DECIMALS: u32 = 18;

const QR_CONTENT_TYPE: &str = "image/svg+xml";
const QR_URL_TTL_SECS: u64 = 30 * 60;

pub fn generate_ledger_address() -> String {
    let mut bytes = [0u8; 20];
    OsRng.fill_bytes(&mut bytes);
    format!("{}{}", LEDGER_ADDRESS_PREFIX, hex::encode(bytes))
}

/// Shape check only; existence is up to the ledger.
pub fn is_ledger_address(address: &str) -> bool {
    address.len() == LEDGER_ADDRESS_LEN && address.starts_with(LEDGER_ADDRESS_PREFIX)
}

/// `None` for amounts that are negative, too large, or finer than one unit.
pub fn to_token_units(amount: Decimal) -> Option<u64> {
    let units = amount.checked_mul(Decimal::from(10u64.pow(TOKEN_DECIMALS)))?;
    if units.fract() != Decimal::ZERO {
        return None;
    }
    units.to_u64()
}

pub fn units_to_tokens(units: U256) -> String {
    scaled(units, TOKEN_DECIMALS)
}

pub fn wei_to_ether(wei: U256) -> String {
    scaled(wei, WEI_DECIMALS)
}

/// Places the decimal point `scale` digits from the right, dropping trailing zeros.
fn scaled(raw: U256, scale: u32) -> String {
    let digits = format!("{:0>width$}", raw.to_string(), width = scale as usize + 1);
    let (int, frac) = digits.split_at(digits.len() - scale as usize);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{}.{}", int, frac)
    }
}

/// Live balances; nothing here is cached.
pub async fn query_balance(
    chain: &dyn ChainClient,
    address: &str,
) -> anyhow::Result<BalanceResponse> {
    let wei = chain.eth_balance(address).await?;
    let balance_int = chain.token_balance(address).await?;
    Ok(BalanceResponse {
        address: address.to_string(),
        eth_balance: wei_to_ether(wei),
        balance: units_to_tokens(balance_int),
        balance_int: balance_int.to_string(),
    })
}

pub fn qrcode_key(address: &str) -> String {
    format!("images/qrcode/{}.svg", address)
}

pub fn render_qr_svg(address: &str) -> anyhow::Result<String> {
    let code = QrCode::new(address.as_bytes()).context("encode qr code")?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .build())
}

/// Storage key of the account's QR image, rendering and uploading it on
/// first use. The bool is true when a new image was stored.
pub async fn ensure_qrcode(
    storage: &dyn StorageClient,
    account: &EthAccount,
) -> anyhow::Result<(String, bool)> {
    if let Some(key) = account.qrcode.as_deref().filter(|k| !k.is_empty()) {
        debug!(address = %account.address, "qrcode cache hit");
        return Ok((key.to_string(), false));
    }

    let key = qrcode_key(&account.address);
    let svg = render_qr_svg(&account.address)?;
    storage
        .put_object(&key, Bytes::from(svg), QR_CONTENT_TYPE)
        .await
        .with_context(|| format!("store qrcode {}", key))?;
    info!(address = %account.address, %key, "qrcode generated");
    Ok((key, true))
}

pub async fn presign_qrcode(storage: &dyn StorageClient, key: &str) -> anyhow::Result<String> {
    storage
        .presign_get(key, QR_URL_TTL_SECS)
        .await
        .with_context(|| format!("presign url for {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::FakeStorage;
    use std::sync::atomic::Ordering;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn eth_account(qrcode: Option<&str>) -> EthAccount {
        EthAccount {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            address: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".into(),
            password: "secret".into(),
            qrcode: qrcode.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
            modified_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn ledger_addresses_have_prefix_and_length() {
        let address = generate_ledger_address();
        assert!(is_ledger_address(&address));
        assert_ne!(address, generate_ledger_address());
        assert!(!is_ledger_address("UT1234"));
        assert!(!is_ledger_address(&format!("0x{}", "a".repeat(40))));
    }

    #[test]
    fn token_unit_conversion() {
        assert_eq!(to_token_units(Decimal::new(10_123, 3)), Some(10_123));
        assert_eq!(to_token_units(Decimal::new(1, 3)), Some(1));
        assert_eq!(to_token_units(Decimal::new(1, 4)), None);
        assert_eq!(to_token_units(Decimal::new(-5, 0)), None);
        assert_eq!(units_to_tokens(U256::from(69_500u64)), "69.5");
        assert_eq!(units_to_tokens(U256::from(1_000_000u64)), "1000");
        assert_eq!(units_to_tokens(U256::from(7u64)), "0.007");
    }

    #[test]
    fn wei_is_scaled_to_ether() {
        assert_eq!(wei_to_ether(U256::from(2_500_000_000_000_000_000u128)), "2.5");
        assert_eq!(wei_to_ether(U256::ZERO), "0");
        assert_eq!(wei_to_ether(U256::from(1u64)), "0.000000000000000001");
    }

    #[test]
    fn qr_svg_renders() {
        let svg = render_qr_svg("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert!(svg.contains("<svg"));
    }

    #[tokio::test]
    async fn qrcode_generated_once() {
        let storage = FakeStorage::default();

        let (key, created) = ensure_qrcode(&storage, &eth_account(None)).await.unwrap();
        assert!(created);
        assert_eq!(key, "images/qrcode/0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed.svg");
        assert_eq!(storage.puts.load(Ordering::SeqCst), 1);

        let (again, created) = ensure_qrcode(&storage, &eth_account(Some(&key))).await.unwrap();
        assert!(!created);
        assert_eq!(again, key);
        assert_eq!(storage.puts.load(Ordering::SeqCst), 1);

        let url = presign_qrcode(&storage, &key).await.unwrap();
        assert!(url.ends_with(&key));
    }

    #[tokio::test]
    async fn balance_reads_both_currencies() {
        let chain = crate::chain::fake::FakeChain::new();
        let resp = query_balance(&chain, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
            .await
            .unwrap();
        assert_eq!(resp.eth_balance, "2.5");
        assert_eq!(resp.balance, "1000");
        assert_eq!(resp.balance_int, "1000000");
        assert_eq!(chain.calls().len(), 2);
    }

    #[tokio::test]
    async fn balance_above_128_bits_is_reported() {
        let mut chain = crate::chain::fake::FakeChain::new();
        chain.token_balance = U256::from(1u64) << 200usize;
        let resp = query_balance(&chain, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed")
            .await
            .unwrap();
        let raw = (U256::from(1u64) << 200usize).to_string();
        assert_eq!(resp.balance_int, raw);
        assert!(raw.ends_with("376"));
        let (int, frac) = raw.split_at(raw.len() - 3);
        assert_eq!(resp.balance, format!("{}.{}", int, frac));
    }
}
