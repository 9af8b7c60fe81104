//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use thiserror::Error;

use edugate_auth::GateSettings;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is not a valid socket address: {value}")]
    InvalidAddress { name: &'static str, value: String },

    #[error("{name} must be a boolean (true/false/1/0/yes/no), got {value}")]
    InvalidBool { name: &'static str, value: String },

    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

/// Names of the cookies the gate reads and expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    pub auth: String,
    pub session: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self {
            auth: "edugate_auth".to_string(),
            session: "edugate_session".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    pub token_secret: String,
    pub database_url: Option<String>,
    pub cookies: CookieNames,
    /// Read the network identity from `X-Forwarded-Host` (behind a proxy).
    pub trust_forwarded_host: bool,
    pub gate: GateSettings,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            token_secret: "dev-secret".to_string(),
            database_url: None,
            cookies: CookieNames::default(),
            trust_forwarded_host: false,
            gate: GateSettings::default(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string());

        let bind = match var("EDUGATE_BIND") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidAddress {
                name: "EDUGATE_BIND",
                value,
            })?,
            None => defaults.bind,
        };

        let token_secret = match var("EDUGATE_TOKEN_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            Some(_) => return Err(ConfigError::Empty { name: "EDUGATE_TOKEN_SECRET" }),
            None => {
                tracing::warn!("EDUGATE_TOKEN_SECRET not set; using insecure dev default");
                defaults.token_secret
            }
        };

        let database_url = var("EDUGATE_DATABASE_URL").filter(|url| !url.is_empty());
        if database_url.is_none() {
            tracing::warn!("EDUGATE_DATABASE_URL not set; using empty in-memory stores");
        }

        let cookies = CookieNames {
            auth: non_empty(&var, "EDUGATE_AUTH_COOKIE", defaults.cookies.auth)?,
            session: non_empty(&var, "EDUGATE_SESSION_COOKIE", defaults.cookies.session)?,
        };

        let gate = GateSettings {
            denied_path: non_empty(&var, "EDUGATE_DENIED_PATH", defaults.gate.denied_path)?,
            return_param: non_empty(&var, "EDUGATE_RETURN_PARAM", defaults.gate.return_param)?,
            persist_confirmed_tenant: flag(
                &var,
                "EDUGATE_PERSIST_CONFIRMED_TENANT",
                defaults.gate.persist_confirmed_tenant,
            )?,
            catalog_diagnostics: flag(
                &var,
                "EDUGATE_CATALOG_DIAGNOSTICS",
                defaults.gate.catalog_diagnostics,
            )?,
        };

        Ok(Self {
            bind,
            token_secret,
            database_url,
            cookies,
            trust_forwarded_host: flag(
                &var,
                "EDUGATE_TRUST_FORWARDED_HOST",
                defaults.trust_forwarded_host,
            )?,
            gate,
        })
    }
}

fn non_empty<F>(var: &F, name: &'static str, default: String) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(value) if value.is_empty() => Err(ConfigError::Empty { name }),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

fn flag<F>(var: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = var(name) else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { name, value }),
    }
}
