use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::domain::payment::BackUrls;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// A credential whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Secret,
    pub pool_size: u32,
    /// Applies to pool checkout and to every statement.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: Secret,
    pub token_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: Secret,
}

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub access_token: Option<Secret>,
    pub api_base: String,
    pub back_urls: BackUrls,
    pub notification_url: Option<String>,
    pub currency: String,
    pub statement_descriptor: String,
    pub timeout: Duration,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base: "https://api.mercadopago.com".to_string(),
            back_urls: BackUrls {
                success: "http://localhost:3000".to_string(),
                pending: "http://localhost:3000".to_string(),
                failure: "http://localhost:3000".to_string(),
            },
            notification_url: None,
            currency: "ARS".to_string(),
            statement_descriptor: "ALMENDRA".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub admin: Option<AdminBootstrap>,
    pub payments: PaymentSettings,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);
        let defaults = PaymentSettings::default();

        let admin = match (vars.get("ADMIN_EMAIL"), vars.get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                email,
                password: Secret::new(password),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL")),
        };

        Ok(Self {
            host: vars.get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: vars.parse_or("PORT", 8080)?,
            database: DatabaseSettings {
                url: Secret::new(vars.require("DATABASE_URL")?),
                pool_size: vars.parse_or("DB_POOL_SIZE", 10)?,
                timeout: Duration::from_secs(vars.parse_or("DB_TIMEOUT_SECS", 5)?),
            },
            auth: AuthSettings {
                jwt_secret: Secret::new(vars.require("JWT_SECRET")?),
                token_ttl: Duration::from_secs(vars.parse_or::<u64>("JWT_TTL_HOURS", 168)? * 3600),
            },
            admin,
            payments: PaymentSettings {
                access_token: vars.get("MP_ACCESS_TOKEN").map(Secret::new),
                api_base: vars.get("MP_API_BASE").unwrap_or(defaults.api_base),
                back_urls: BackUrls {
                    success: vars
                        .get("MP_SUCCESS_URL")
                        .unwrap_or(defaults.back_urls.success),
                    pending: vars
                        .get("MP_PENDING_URL")
                        .unwrap_or(defaults.back_urls.pending),
                    failure: vars
                        .get("MP_FAILURE_URL")
                        .unwrap_or(defaults.back_urls.failure),
                },
                notification_url: vars.get("MP_WEBHOOK_URL"),
                currency: vars.get("MP_CURRENCY").unwrap_or(defaults.currency),
                statement_descriptor: vars
                    .get("MP_STATEMENT_DESCRIPTOR")
                    .unwrap_or(defaults.statement_descriptor),
                timeout: Duration::from_secs(vars.parse_or("MP_TIMEOUT_SECS", 10)?),
            },
        })
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Blank values count as unset.
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, name: &'static str) -> Result<String, ConfigError> {
        self.get(name).ok_or(ConfigError::Missing(name))
    }

    fn parse_or<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/store"),
        ("JWT_SECRET", "s3cret"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = load(&REQUIRED).expect("config should load");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.auth.token_ttl, Duration::from_secs(7 * 24 * 3600));
        assert!(config.admin.is_none());
        assert!(config.payments.access_token.is_none());
        assert_eq!(config.payments.currency, "ARS");
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = load(&[("JWT_SECRET", "x")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn invalid_port_is_reported() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        let err = load(&pairs).unwrap_err();
        assert_eq!(err.to_string(), "PORT has an invalid value 'eighty'");
    }

    #[test]
    fn admin_bootstrap_needs_both_halves() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ADMIN_EMAIL", "admin@store.test"));
        assert!(matches!(
            load(&pairs).unwrap_err(),
            ConfigError::Missing("ADMIN_PASSWORD")
        ));
    }

    #[test]
    fn blank_access_token_counts_as_unset() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MP_ACCESS_TOKEN", "   "));
        let config = load(&pairs).unwrap();
        assert!(config.payments.access_token.is_none());
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let config = load(&REQUIRED).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("postgres://"));
    }
}
