//! Process configuration.
//!
//! Values are read through a key lookup so the native server (environment,
//! `.env`) and the Spin component (component variables) share one parser.
//! Keys are lowercase; the environment form is `SOCIALITE_<KEY>`.

use anyhow::{anyhow, Context, Result};

pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 1000;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_NAME_LENGTH: usize = 100;

const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    /// HMAC secret used to sign session tokens.
    pub secret_key: String,
    pub host: String,
    pub port: u16,
    /// Tokens never expire when unset.
    pub token_expiration_hours: Option<i64>,
    pub password_memory_kib: u32,
    pub password_iterations: u32,
    pub seed_demo_data: bool,
}

impl Config {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            token_expiration_hours: None,
            password_memory_kib: argon2::Params::DEFAULT_M_COST,
            password_iterations: argon2::Params::DEFAULT_T_COST,
            seed_demo_data: false,
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("secret_key")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("secret_key must be set"))?;
        if secret_key.len() < MIN_SECRET_BYTES {
            tracing::warn!(
                length = secret_key.len(),
                "secret_key is shorter than {} bytes",
                MIN_SECRET_BYTES
            );
        }

        let mut config = Config::new(secret_key);
        if let Some(host) = lookup("host") {
            config.host = host;
        }
        if let Some(port) = lookup("port") {
            config.port = port.parse().with_context(|| format!("invalid port {port:?}"))?;
        }
        if let Some(hours) = lookup("token_expiration_hours") {
            let hours: i64 = hours
                .parse()
                .with_context(|| format!("invalid token_expiration_hours {hours:?}"))?;
            config.token_expiration_hours = (hours > 0).then_some(hours);
        }
        if let Some(kib) = lookup("password_memory_kib") {
            config.password_memory_kib =
                kib.parse().with_context(|| format!("invalid password_memory_kib {kib:?}"))?;
        }
        if let Some(iterations) = lookup("password_iterations") {
            config.password_iterations = iterations
                .parse()
                .with_context(|| format!("invalid password_iterations {iterations:?}"))?;
        }
        if let Some(seed) = lookup("seed_demo_data") {
            config.seed_demo_data = matches!(seed.as_str(), "1" | "true" | "yes");
        }
        Ok(config)
    }

    /// Loads `.env` when present, then reads `SOCIALITE_*` variables.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(format!("SOCIALITE_{}", key.to_uppercase())).ok())
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_spin_variables() -> Result<Self> {
        Self::from_lookup(|key| spin_sdk::variables::get(key).ok())
    }
}
