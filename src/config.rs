/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, tenant, audiences, key set 更新間隔など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - ValidatorOptions / HttpLimits への変換
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::middleware::http::HttpLimits;
use crate::services::auth::validator::{DEFAULT_AUTHORITY_HOST, DEFAULT_STS_HOST};
use crate::services::auth::{JwksOptions, ValidatorOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("development").to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub tenant_id: String,
    pub audiences: Vec<String>,
    pub audience_check: bool,
    pub authority_host: String,
    pub sts_host: String,
    pub access_token_leeway_seconds: u64,

    pub jwks_refresh_interval: Duration,
    pub jwks_fetch_timeout: Duration,

    pub http: HttpLimits,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(get("PORT"), "PORT", 3000)?;
        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV").as_deref());

        let tenant_id = get("AZURE_TENANT_ID")
            .map(|v| v.trim().to_string())
            .ok_or(ConfigError::Missing("AZURE_TENANT_ID"))?;

        let audiences = get("AZURE_AUDIENCES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let audience_check = !parse_flag(get("AZURE_DISABLE_AUDIENCE_CHECK").as_deref());
        if audience_check && audiences.is_empty() {
            return Err(ConfigError::Missing("AZURE_AUDIENCES"));
        }

        let authority_host = match get("AZURE_AUTHORITY_HOST") {
            Some(value) => parse_host(&value).ok_or(ConfigError::Invalid("AZURE_AUTHORITY_HOST"))?,
            None => DEFAULT_AUTHORITY_HOST.to_string(),
        };
        let sts_host = match get("AZURE_STS_HOST") {
            Some(value) => parse_host(&value).ok_or(ConfigError::Invalid("AZURE_STS_HOST"))?,
            None => DEFAULT_STS_HOST.to_string(),
        };

        let access_token_leeway_seconds = parse_or(
            get("ACCESS_TOKEN_LEEWAY_SECONDS"),
            "ACCESS_TOKEN_LEEWAY_SECONDS",
            60,
        )?;

        let jwks_refresh_interval = Duration::from_secs(parse_or(
            get("JWKS_REFRESH_INTERVAL_SECONDS"),
            "JWKS_REFRESH_INTERVAL_SECONDS",
            3600,
        )?);
        if jwks_refresh_interval.is_zero() {
            return Err(ConfigError::Invalid("JWKS_REFRESH_INTERVAL_SECONDS"));
        }

        let jwks_fetch_timeout = Duration::from_secs(parse_or(
            get("JWKS_FETCH_TIMEOUT_SECONDS"),
            "JWKS_FETCH_TIMEOUT_SECONDS",
            60,
        )?);

        let http = HttpLimits {
            request_timeout: Duration::from_secs(parse_or(
                get("HTTP_REQUEST_TIMEOUT_SECONDS"),
                "HTTP_REQUEST_TIMEOUT_SECONDS",
                30,
            )?),
            body_limit_bytes: parse_or(get("HTTP_BODY_LIMIT_BYTES"), "HTTP_BODY_LIMIT_BYTES", 1024 * 1024)?,
        };

        Ok(Self {
            addr,
            app_env,
            tenant_id,
            audiences,
            audience_check,
            authority_host,
            sts_host,
            access_token_leeway_seconds,
            jwks_refresh_interval,
            jwks_fetch_timeout,
            http,
        })
    }

    pub fn validator_options(&self) -> ValidatorOptions {
        let options = ValidatorOptions {
            authority_host: self.authority_host.clone(),
            sts_host: self.sts_host.clone(),
            leeway_seconds: self.access_token_leeway_seconds,
            jwks: JwksOptions {
                refresh_interval: self.jwks_refresh_interval,
                fetch_timeout: self.jwks_fetch_timeout,
                ..JwksOptions::default()
            },
            ..ValidatorOptions::default()
        }
        .with_audiences(self.audiences.iter().cloned());

        if self.audience_check {
            options
        } else {
            options.without_audience_validation()
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

// Accepts `login.microsoftonline.us` as well as `https://login.microsoftonline.us/`.
fn parse_host(value: &str) -> Option<String> {
    let value = value.trim();
    let url = if value.contains("://") {
        Url::parse(value).ok()?
    } else {
        Url::parse(&format!("https://{value}")).ok()?
    };
    url.host_str().map(str::to_string)
}
