//! Resolver configuration (header names, session lookup timeout).

use std::time::Duration;

use thiserror::Error;

use crate::headers::HeaderNames;

pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_millis(2_000);

pub const ENV_SESSION_TIMEOUT_MS: &str = "BACKOFFICE_SESSION_TIMEOUT_MS";
pub const ENV_USER_HEADER: &str = "BACKOFFICE_USER_HEADER";
pub const ENV_IMPERSONATION_HEADER: &str = "BACKOFFICE_IMPERSONATION_HEADER";
pub const ENV_REASON_HEADER: &str = "BACKOFFICE_REASON_HEADER";
pub const ENV_TENANT_HEADER: &str = "BACKOFFICE_TENANT_HEADER";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub headers: HeaderNames,
    /// Upper bound for each session service call.
    pub session_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            headers: HeaderNames::default(),
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

impl ResolverConfig {
    /// Defaults overridden by `BACKOFFICE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SESSION_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: ENV_SESSION_TIMEOUT_MS,
                reason: format!("{e}"),
            })?;
            if millis == 0 {
                return Err(ConfigError::InvalidValue {
                    key: ENV_SESSION_TIMEOUT_MS,
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.session_timeout = Duration::from_millis(millis);
        }

        override_header(&lookup, ENV_USER_HEADER, &mut config.headers.backoffice_user)?;
        override_header(&lookup, ENV_IMPERSONATION_HEADER, &mut config.headers.impersonated_party)?;
        override_header(&lookup, ENV_REASON_HEADER, &mut config.headers.impersonation_reason)?;
        override_header(&lookup, ENV_TENANT_HEADER, &mut config.headers.tenant)?;

        Ok(config)
    }
}

fn override_header<F>(lookup: &F, key: &'static str, target: &mut String) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    let name = raw.trim();
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !valid {
        return Err(ConfigError::InvalidValue {
            key,
            reason: format!("'{raw}' is not a valid header name"),
        });
    }
    *target = name.to_string();
    Ok(())
}
