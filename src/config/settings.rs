//! Runtime settings read from the environment (after `dotenvy::dotenv()` in the binaries).

use crate::error::ConfigError;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

impl FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "production" | "prod" => Ok(AppEnv::Production),
            "test" => Ok(AppEnv::Test),
            other => Err(ConfigError::InvalidValue {
                name: "APP_ENV",
                value: other.to_string(),
            }),
        }
    }
}

/// How the local shim turns JSON text columns back into structured values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JsonFieldMode {
    /// Only columns the table registry declares as JSON.
    #[default]
    Declared,
    /// Any text value starting with `[` or `{`.
    Sniff,
}

impl FromStr for JsonFieldMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "declared" => Ok(JsonFieldMode::Declared),
            "sniff" => Ok(JsonFieldMode::Sniff),
            other => Err(ConfigError::InvalidValue {
                name: "JSON_FIELD_MODE",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: String,
    pub env: AppEnv,
    /// Echo failing SQL text in 500 bodies.
    pub expose_sql_errors: bool,
    pub cookie_secure: bool,
    pub session_days: i64,
    pub json_field_mode: JsonFieldMode,
    pub body_limit_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::MissingVar("DATABASE_URL"))?;
        let env = match get("APP_ENV") {
            Some(v) => v.parse()?,
            None => AppEnv::Development,
        };
        let production = env == AppEnv::Production;

        Ok(Settings {
            database_url,
            max_connections: parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            env,
            expose_sql_errors: parse_bool_or(get("EXPOSE_SQL_ERRORS"), "EXPOSE_SQL_ERRORS", !production)?,
            cookie_secure: parse_bool_or(get("COOKIE_SECURE"), "COOKIE_SECURE", production)?,
            session_days: parse_or(get("SESSION_DAYS"), "SESSION_DAYS", 7)?,
            json_field_mode: match get("JSON_FIELD_MODE") {
                Some(v) => v.parse()?,
                None => JsonFieldMode::default(),
            },
            body_limit_bytes: parse_or(get("BODY_LIMIT_BYTES"), "BODY_LIMIT_BYTES", 1024 * 1024)?,
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue { name, value: v }),
        None => Ok(default),
    }
}

fn parse_bool_or(raw: Option<String>, name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::InvalidValue {
            name,
            value: raw.unwrap_or_default(),
        }),
    }
}
