use std::time::Duration;

use serde::Deserialize;

const MIN_UNLOCK_SECS: u64 = 60;
const MAX_UNLOCK_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

/// Ethereum node and token contract settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub provider_url: String,
    pub token_address: String,
    /// Account that signs bridge transfers; its unlock password lives in `eth_accounts`.
    pub custodial_address: String,
    pub unlock_duration_secs: u64,
    pub rpc_timeout_secs: u64,
    pub callback_url: Option<String>,
}

impl ChainConfig {
    pub fn unlock_duration(&self) -> Duration {
        Duration::from_secs(clamp_unlock_secs(self.unlock_duration_secs))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub chain: ChainConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "utcoin".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "utcoin-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("MINIO_ENDPOINT")?,
            bucket: std::env::var("MINIO_BUCKET")?,
            access_key: std::env::var("MINIO_ACCESS_KEY")?,
            secret_key: std::env::var("MINIO_SECRET_KEY")?,
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };
        let chain = ChainConfig {
            provider_url: std::env::var("WEB3_PROVIDER")?,
            token_address: std::env::var("UTCOIN_ADDRESS")?,
            custodial_address: std::env::var("CUSTODIAL_ADDRESS")?,
            unlock_duration_secs: env_parse("UNLOCK_DURATION_SECS").unwrap_or(MIN_UNLOCK_SECS),
            rpc_timeout_secs: env_parse("RPC_TIMEOUT_SECS").unwrap_or(30),
            callback_url: std::env::var("CALLBACK_URL").ok().filter(|v| !v.is_empty()),
        };
        Ok(Self {
            database_url,
            jwt,
            storage,
            chain,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// The node re-locks the account once this window closes.
pub fn clamp_unlock_secs(secs: u64) -> u64 {
    secs.clamp(MIN_UNLOCK_SECS, MAX_UNLOCK_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_duration_is_clamped() {
        assert_eq!(clamp_unlock_secs(0), 60);
        assert_eq!(clamp_unlock_secs(120), 120);
        assert_eq!(clamp_unlock_secs(3600), 300);
    }

    #[test]
    fn rpc_timeout_never_zero() {
        let cfg = ChainConfig {
            provider_url: "http://localhost:8545".into(),
            token_address: "0x0".into(),
            custodial_address: "0x0".into(),
            unlock_duration_secs: 60,
            rpc_timeout_secs: 0,
            callback_url: None,
        };
        assert_eq!(cfg.rpc_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.unlock_duration(), Duration::from_secs(60));
    }
}
