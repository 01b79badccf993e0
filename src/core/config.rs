use serde::Deserialize;
use std::env;
use std::str::FromStr;
use warp::http::uri::{Authority, Scheme};

use super::error::{Result, ServiceError};

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://carbozen.netlify.app",
    "https://app.carbozen.it",
    "capacitor://localhost",
    "http://10.0.2.2",
    "https://cz4.netlify.app",
    "ionic://localhost",
    "https://localhost",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub ensemble: EnsembleConfig,
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_concurrent: usize,
    pub requests_per_minute: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnsembleConfig {
    pub primary_model: String,
    pub primary_verbosity: String,
    pub support_model: String,
    pub support_calls: usize,
    pub support_temperature: f32,
    pub judge_model: String,
    pub primary_weight_percent: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_address: [u8; 4],
    pub port: u16,
    pub max_body_bytes: u64,
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            primary_model: "gpt-5".to_string(),
            primary_verbosity: "low".to_string(),
            support_model: "gpt-4o".to_string(),
            support_calls: 2,
            support_temperature: 0.7,
            judge_model: "gpt-4o".to_string(),
            primary_weight_percent: 65,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Malformed
    /// numbers fall back to their defaults; a missing API key or a
    /// malformed CORS origin is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ServiceError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let defaults = EnsembleConfig::default();

        let allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(raw) => parse_origins(&raw)?,
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        let bind_address = lookup("BIND_ADDRESS")
            .and_then(|raw| raw.parse::<std::net::Ipv4Addr>().ok())
            .map(|ip| ip.octets())
            .unwrap_or([0, 0, 0, 0]);

        Ok(Config {
            openai: OpenAiConfig {
                api_key,
                base_url: lookup("OPENAI_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                timeout_secs: parse_or(&lookup, "OPENAI_TIMEOUT_SECS", 120),
                max_concurrent: parse_or(&lookup, "OPENAI_MAX_CONCURRENT", 16),
                requests_per_minute: parse_or(&lookup, "OPENAI_REQUESTS_PER_MINUTE", 300),
            },
            ensemble: EnsembleConfig {
                primary_model: lookup("PRIMARY_MODEL").unwrap_or(defaults.primary_model),
                primary_verbosity: lookup("PRIMARY_VERBOSITY")
                    .unwrap_or(defaults.primary_verbosity),
                support_model: lookup("SUPPORT_MODEL").unwrap_or(defaults.support_model),
                support_calls: parse_or(&lookup, "SUPPORT_CALLS", defaults.support_calls),
                support_temperature: parse_or(
                    &lookup,
                    "SUPPORT_TEMPERATURE",
                    defaults.support_temperature,
                ),
                judge_model: lookup("JUDGE_MODEL").unwrap_or(defaults.judge_model),
                primary_weight_percent: parse_or(
                    &lookup,
                    "PRIMARY_WEIGHT_PERCENT",
                    defaults.primary_weight_percent,
                )
                .min(100),
            },
            server: ServerConfig {
                bind_address,
                port: parse_or(&lookup, "PORT", 5000),
                max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", 20 * 1024 * 1024),
                allowed_origins,
            },
            monitoring: MonitoringConfig {
                log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_origins(raw: &str) -> Result<Vec<String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|origin| {
            let origin = origin.trim_end_matches('/');
            if is_valid_origin(origin) {
                Ok(origin.to_string())
            } else {
                Err(ServiceError::Config(format!(
                    "invalid CORS origin '{}': expected scheme://host[:port]",
                    origin
                )))
            }
        })
        .collect()
}

/// `scheme://host[:port]` with nothing after the authority, the only shape
/// `warp::cors` accepts.
pub fn is_valid_origin(origin: &str) -> bool {
    let Some((scheme, authority)) = origin.split_once("://") else {
        return false;
    };
    if scheme.is_empty()
        || authority.is_empty()
        || authority.contains(|c: char| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@'))
    {
        return false;
    }
    scheme.parse::<Scheme>().is_ok() && authority.parse::<Authority>().is_ok()
}
