//! Hex quantities, address checks and the two ERC20 calls the bridge makes.

use std::str::FromStr;

use alloy_primitives::{keccak256, Address, U256};
use anyhow::anyhow;

const BALANCE_OF: &str = "balanceOf(address)";
const TRANSFER: &str = "transfer(address,uint256)";

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// `0x` + 40 hex digits. All-lowercase and all-uppercase forms are accepted
/// as-is; mixed case has to match the EIP-55 checksum.
pub fn parse_address(address: &str) -> Option<Address> {
    let body = address.strip_prefix("0x")?;
    if body.len() != 40 {
        return None;
    }
    let mixed = body.chars().any(|c| c.is_ascii_lowercase())
        && body.chars().any(|c| c.is_ascii_uppercase());
    if mixed {
        Address::parse_checksummed(address, None).ok()
    } else {
        Address::from_str(address).ok()
    }
}

pub fn is_valid_address(address: &str) -> bool {
    parse_address(address).is_some()
}

fn address_word(address: &str) -> anyhow::Result<String> {
    let parsed = parse_address(address).ok_or_else(|| anyhow!("invalid address {}", address))?;
    Ok(hex::encode(parsed.into_word()))
}

pub fn encode_balance_of(owner: &str) -> anyhow::Result<String> {
    Ok(format!(
        "0x{}{}",
        hex::encode(selector(BALANCE_OF)),
        address_word(owner)?
    ))
}

pub fn encode_transfer(to: &str, amount: U256) -> anyhow::Result<String> {
    Ok(format!(
        "0x{}{}{}",
        hex::encode(selector(TRANSFER)),
        address_word(to)?,
        hex::encode(amount.to_be_bytes::<32>())
    ))
}

/// Parses an RPC quantity or a 32-byte return word.
pub fn parse_quantity(raw: &str) -> anyhow::Result<U256> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("quantity without 0x prefix: {}", raw))?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| anyhow!("bad quantity {}: {}", raw, e))
}
