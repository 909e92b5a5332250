//! Engine configuration.
//!
//! Configuration is read from `SPG_*` environment variables. Use [`EngineConfig::from_env_or_default`] to log and
//! skip over bad values, or [`EngineConfig::try_from_env`] to reject them.
use std::{env, fmt::Display, str::FromStr};

use log::*;
use spg_common::helpers::{parse_boolean_flag, parse_comma_list};
use thiserror::Error;

use crate::{
    db_types::Provider,
    sms::{MessageExtractor, ProviderDetector, SenderToken, SenderWhitelist},
};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/sms_payments.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_MAX_CLAIM_ATTEMPTS: u32 = 3;
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value ({value}). {reason}")]
    InvalidValue { name: String, value: String, reason: String },
    #[error("The sender list for {0} contains no usable tokens")]
    EmptySenderList(Provider),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// How many times the matcher re-selects a candidate after losing a claim before giving up
    pub max_claim_attempts: u32,
    /// Identify the provider from message content when the sender is blank or a test marker. Never enable this on an
    /// endpoint that untrusted parties can reach.
    pub diagnostic_sender_fallback: bool,
    pub event_buffer_size: usize,
    pub whitelist: SenderWhitelist,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_claim_attempts: DEFAULT_MAX_CLAIM_ATTEMPTS,
            diagnostic_sender_fallback: false,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            whitelist: SenderWhitelist::default(),
        }
    }
}

fn sender_list_var(provider: Provider) -> String {
    format!("SPG_SENDERS_{}", provider.as_str().to_ascii_uppercase())
}

impl EngineConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup_or_default(|name| env::var(name).ok())
    }

    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::try_from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to its value. Invalid values are logged,
    /// and the default is used instead.
    pub fn from_lookup_or_default<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let default = Self::default();
        let database_url = lookup("SPG_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ SPG_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            default.database_url.clone()
        });
        let max_connections = parse_var_or_default(&lookup, "SPG_DB_MAX_CONNECTIONS", default.max_connections);
        let max_claim_attempts = parse_var_or_default(&lookup, "SPG_MAX_CLAIM_ATTEMPTS", default.max_claim_attempts);
        let event_buffer_size = parse_var_or_default(&lookup, "SPG_EVENT_BUFFER_SIZE", default.event_buffer_size);
        let diagnostic_sender_fallback = parse_boolean_flag(lookup("SPG_DIAGNOSTIC_SENDER_FALLBACK"), false);
        let mut whitelist = default.whitelist;
        for provider in Provider::ALL {
            match sender_tokens(&lookup, provider) {
                Ok(Some(tokens)) => whitelist = whitelist.with_tokens(provider, tokens),
                Ok(None) => {},
                Err(e) => warn!("🪛️ {e} Keeping the default senders for {provider}."),
            }
        }
        let config = Self {
            database_url,
            max_connections: max_connections.max(1),
            max_claim_attempts: max_claim_attempts.max(1),
            diagnostic_sender_fallback,
            event_buffer_size: event_buffer_size.max(1),
            whitelist,
        };
        config.log_summary();
        config
    }

    pub fn try_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where F: Fn(&str) -> Option<String> {
        let default = Self::default();
        let positive = |name: &str, v: u64| {
            if v == 0 {
                Err(ConfigError::InvalidValue { name: name.into(), value: v.to_string(), reason: "Must be > 0".into() })
            } else {
                Ok(())
            }
        };
        let max_connections =
            parse_var::<u32, _>(&lookup, "SPG_DB_MAX_CONNECTIONS")?.unwrap_or(default.max_connections);
        positive("SPG_DB_MAX_CONNECTIONS", u64::from(max_connections))?;
        let max_claim_attempts =
            parse_var::<u32, _>(&lookup, "SPG_MAX_CLAIM_ATTEMPTS")?.unwrap_or(default.max_claim_attempts);
        positive("SPG_MAX_CLAIM_ATTEMPTS", u64::from(max_claim_attempts))?;
        let event_buffer_size =
            parse_var::<usize, _>(&lookup, "SPG_EVENT_BUFFER_SIZE")?.unwrap_or(default.event_buffer_size);
        positive("SPG_EVENT_BUFFER_SIZE", event_buffer_size as u64)?;
        let mut whitelist = default.whitelist;
        for provider in Provider::ALL {
            if let Some(tokens) = sender_tokens(&lookup, provider)? {
                whitelist = whitelist.with_tokens(provider, tokens);
            }
        }
        let config = Self {
            database_url: lookup("SPG_DATABASE_URL").unwrap_or(default.database_url),
            max_connections,
            max_claim_attempts,
            diagnostic_sender_fallback: parse_boolean_flag(lookup("SPG_DIAGNOSTIC_SENDER_FALLBACK"), false),
            event_buffer_size,
            whitelist,
        };
        config.log_summary();
        Ok(config)
    }

    /// The message extractor described by this configuration.
    pub fn extractor(&self) -> MessageExtractor {
        let detector =
            ProviderDetector::new(self.whitelist.clone()).with_content_fallback(self.diagnostic_sender_fallback);
        MessageExtractor::new(detector)
    }

    fn log_summary(&self) {
        info!("🪛️ Database: {}. Max connections: {}", self.database_url, self.max_connections);
        info!("🪛️ Max claim attempts per transaction: {}", self.max_claim_attempts);
        for provider in Provider::ALL {
            let tokens = self.whitelist.tokens_for(provider).iter().map(|t| t.to_string()).collect::<Vec<_>>();
            info!("🪛️ Accepted {provider} senders: {}", tokens.join(", "));
        }
        if self.diagnostic_sender_fallback {
            warn!(
                "🚨️ The diagnostic sender fallback is enabled. Messages from blank or test senders will be identified \
                 by their content. Do not use this setting in production."
            );
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|s| {
            s.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                value: s.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_var_or_default<T, F>(lookup: &F, name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    parse_var(lookup, name)
        .unwrap_or_else(|e| {
            error!("🪛️ {e} Using the default, {default}, instead.");
            None
        })
        .unwrap_or(default)
}

/// Reads the sender tokens for `provider`. `Ok(None)` means the variable is not set.
fn sender_tokens<F>(lookup: &F, provider: Provider) -> Result<Option<Vec<SenderToken>>, ConfigError>
where F: Fn(&str) -> Option<String> {
    let Some(value) = lookup(&sender_list_var(provider)) else {
        return Ok(None);
    };
    let tokens = parse_comma_list(&value).iter().filter_map(|s| SenderToken::parse(s)).collect::<Vec<_>>();
    if tokens.is_empty() {
        return Err(ConfigError::EmptySenderList(provider));
    }
    Ok(Some(tokens))
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::from_lookup_or_default(lookup(&[]));
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_claim_attempts, 3);
        assert!(!config.diagnostic_sender_fallback);
        assert_eq!(config.whitelist, SenderWhitelist::default());
    }

    #[test]
    fn values_from_the_environment() {
        let vars = [
            ("SPG_DATABASE_URL", "sqlite://other.db"),
            ("SPG_MAX_CLAIM_ATTEMPTS", "5"),
            ("SPG_DIAGNOSTIC_SENDER_FALLBACK", "true"),
            ("SPG_SENDERS_BKASH", "247, *bkash*"),
        ];
        let config = EngineConfig::try_from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.database_url, "sqlite://other.db");
        assert_eq!(config.max_claim_attempts, 5);
        assert!(config.diagnostic_sender_fallback);
        assert_eq!(config.whitelist.tokens_for(Provider::Bkash), &[
            SenderToken::exact("247"),
            SenderToken::contains("bkash")
        ]);
        let defaults = SenderWhitelist::default();
        assert_eq!(config.whitelist.tokens_for(Provider::Nagad), defaults.tokens_for(Provider::Nagad));
        let extractor = config.extractor();
        assert!(extractor.detector().content_fallback_enabled());
        assert_eq!(extractor.detector().detect("247", ""), Some(Provider::Bkash));
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let vars = [("SPG_MAX_CLAIM_ATTEMPTS", "lots"), ("SPG_SENDERS_ROCKET", " , "), ("SPG_DB_MAX_CONNECTIONS", "0")];
        let config = EngineConfig::from_lookup_or_default(lookup(&vars));
        assert_eq!(config.max_claim_attempts, DEFAULT_MAX_CLAIM_ATTEMPTS);
        assert_eq!(config.max_connections, 1);
        let defaults = SenderWhitelist::default();
        assert_eq!(config.whitelist.tokens_for(Provider::Rocket), defaults.tokens_for(Provider::Rocket));
    }

    #[test]
    fn bad_values_are_rejected_in_strict_mode() {
        let err = EngineConfig::try_from_lookup(lookup(&[("SPG_MAX_CLAIM_ATTEMPTS", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "SPG_MAX_CLAIM_ATTEMPTS"));
        let err = EngineConfig::try_from_lookup(lookup(&[("SPG_MAX_CLAIM_ATTEMPTS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        let err = EngineConfig::try_from_lookup(lookup(&[("SPG_SENDERS_BANK", "**")])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySenderList(Provider::Bank)));
    }
}
