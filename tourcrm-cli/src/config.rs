//! Configuration: `.env` files, TOML and environment overrides
//!
//! Lookup order (later wins):
//! 1. `./tourcrm.toml`, else `~/.tourcrm/config.toml`
//! 2. `DATABASE_URL`, `BITRIX24_WEBHOOK_URL`, `BITRIX24_TOURIST_ENTITY_TYPE_ID`
//! 3. command-line flags
//!
//! `.env` in the current directory and `~/.tourcrm/.env` are loaded into
//! the process environment first; variables already set are kept.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tourcrm_bitrix::BitrixConfig;

const CONFIG_FILE: &str = "tourcrm.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TourcrmConfig {
    pub database_url: Option<String>,
    pub server: ServerSection,
    pub bitrix: BitrixSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: Option<SocketAddr>,
    pub cors_permissive: bool,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BitrixSection {
    /// `false` switches the integration off even with a webhook set
    pub enabled: Option<bool>,
    pub webhook_url: Option<String>,
    pub tourist_entity_type_id: Option<i64>,
    pub event_field: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Home directory for per-user files: `~/.tourcrm`
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".tourcrm"))
}

/// Load `.env` files into the environment.
pub fn load_env() {
    dotenvy::dotenv().ok();
    if let Some(dir) = home_dir() {
        dotenvy::from_path(dir.join(".env")).ok();
    }
}

impl TourcrmConfig {
    /// Load the first config file found and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_file() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn find_file() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        home_dir()
            .map(|dir| dir.join("config.toml"))
            .filter(|path| path.exists())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file (invalid TOML): {}", path.display()))
    }

    /// Apply environment overrides read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = set("DATABASE_URL") {
            self.database_url = Some(url);
        }
        if let Some(url) = set("BITRIX24_WEBHOOK_URL") {
            self.bitrix.webhook_url = Some(url);
        }
        if let Some(raw) = set("BITRIX24_TOURIST_ENTITY_TYPE_ID") {
            match raw.trim().parse() {
                Ok(id) => self.bitrix.tourist_entity_type_id = Some(id),
                Err(_) => tracing::warn!(value = %raw, "BITRIX24_TOURIST_ENTITY_TYPE_ID is not an integer, ignored"),
            }
        }
    }

    /// Database URL from the flag, else config and environment.
    pub fn database_url(&self, flag: Option<String>) -> Result<String> {
        flag.or_else(|| self.database_url.clone()).context(
            "DATABASE_URL not set. Set via --database-url, DATABASE_URL env, or ~/.tourcrm/.env",
        )
    }

    /// Bitrix24 client settings; `None` when the integration is off.
    pub fn bitrix_config(&self) -> Result<Option<BitrixConfig>> {
        let section = &self.bitrix;
        if section.enabled == Some(false) {
            return Ok(None);
        }
        let Some(webhook) = section.webhook_url.as_deref() else {
            return Ok(None);
        };

        let mut config = BitrixConfig::new(webhook)
            .context("Invalid Bitrix24 webhook URL")?
            .with_tourist_entity_type(section.tourist_entity_type_id);
        if let Some(field) = &section.event_field {
            config = config.with_event_field(field.clone());
        }
        if let Some(secs) = section.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_url = "postgres://localhost/tourcrm"

[server]
bind = "0.0.0.0:9000"
cors_permissive = true

[bitrix]
webhook_url = "https://acme.bitrix24.ru/rest/1/secret/"
tourist_entity_type_id = 1032
timeout_secs = 5
"#
        )
        .unwrap();

        let config = TourcrmConfig::load_from(file.path()).unwrap();
        assert_eq!(config.server.bind, Some("0.0.0.0:9000".parse().unwrap()));
        assert!(config.server.cors_permissive);
        assert_eq!(config.bitrix.tourist_entity_type_id, Some(1032));

        let bitrix = config.bitrix_config().unwrap().unwrap();
        assert_eq!(bitrix.portal(), "acme.bitrix24.ru");
        assert_eq!(bitrix.timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nbind = 1").unwrap();
        assert!(TourcrmConfig::load_from(file.path()).is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = TourcrmConfig {
            database_url: Some("postgres://file/tourcrm".into()),
            ..Default::default()
        };
        config.apply_env(env(&[
            ("DATABASE_URL", "postgres://env/tourcrm"),
            ("BITRIX24_TOURIST_ENTITY_TYPE_ID", "not-a-number"),
            ("BITRIX24_WEBHOOK_URL", "  "),
        ]));

        assert_eq!(config.database_url.as_deref(), Some("postgres://env/tourcrm"));
        assert_eq!(config.bitrix.tourist_entity_type_id, None);
        assert_eq!(config.bitrix.webhook_url, None);
    }

    #[test]
    fn flag_beats_config_for_database_url() {
        let config = TourcrmConfig {
            database_url: Some("postgres://config/tourcrm".into()),
            ..Default::default()
        };
        assert_eq!(
            config.database_url(Some("postgres://flag/tourcrm".into())).unwrap(),
            "postgres://flag/tourcrm"
        );
        assert!(TourcrmConfig::default().database_url(None).is_err());
    }

    #[test]
    fn disabled_integration_has_no_client_config() {
        let mut config = TourcrmConfig::default();
        assert!(config.bitrix_config().unwrap().is_none());

        config.bitrix.webhook_url = Some("https://acme.bitrix24.ru/rest/1/secret/".into());
        config.bitrix.enabled = Some(false);
        assert!(config.bitrix_config().unwrap().is_none());
    }
}
