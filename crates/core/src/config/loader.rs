use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Config file picked up from the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Flat env names used by earlier deployments, mapped onto config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("API_TOKEN", "source.api.token"),
    ("TELEGRAM_BOT_TOKEN", "telegram.bot_token"),
    ("TELEGRAM_CHAT_ID", "telegram.chat_id"),
    ("EMAIL", "email.username"),
    ("EMAIL_PASSWORD", "email.password"),
    ("EMAIL_FROM", "email.from"),
    ("EMAIL_TO", "email.to"),
    ("APPLICANT_BIRTH", "applicant.birth_date"),
    ("SERIES", "applicant.passport_series"),
    ("NUMBER", "applicant.passport_number"),
    ("APPLICANT_RES_ADDRESS", "applicant.residence_address"),
    ("APPLICANT_INN", "applicant.inn"),
    ("APPLICANT_OGRNIP", "applicant.ogrnip"),
    ("OGRNIP_BIRTH", "applicant.ogrnip_date"),
    ("APPLICANT_PHONE", "applicant.phone"),
    ("APPLICANT_EMAIL", "applicant.email"),
];

/// Load configuration from defaults, an optional TOML file and the environment.
///
/// Precedence (lowest first): built-in defaults, the TOML file, legacy flat
/// env names (`API_TOKEN`, `PORT`, ...), then `BANKROT_`-prefixed variables
/// with `__` separating nested keys (`BANKROT_TELEGRAM__CHAT_ID`).
///
/// A file passed explicitly must exist; otherwise `config.toml` is used
/// only when present.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let toml = match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            Toml::file(path)
        }
        None => Toml::file(DEFAULT_CONFIG_FILE),
    };

    let mut figment = Figment::new().merge(toml);
    for (key, value) in legacy_env_overrides(|name| std::env::var(name).ok()) {
        figment = figment.merge(Serialized::default(key, value));
    }
    if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
        figment = figment.merge(Serialized::default("server.port", port));
    }

    figment
        .merge(Env::prefixed("BANKROT_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Resolve legacy env names through `lookup`, skipping unset and empty values.
///
/// Values stay strings so passport numbers and INNs keep leading zeros.
pub fn legacy_env_overrides<F>(lookup: F) -> Vec<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    LEGACY_ENV
        .iter()
        .filter_map(|(name, key)| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .map(|v| (*key, v))
        })
        .collect()
}
