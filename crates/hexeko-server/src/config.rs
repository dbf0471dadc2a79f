//! Layered server configuration.
//!
//! Sources, highest priority last:
//! 1. Built-in defaults
//! 2. `hexeko.toml` in the working directory (optional)
//! 3. Environment variables prefixed `HEXEKO_`, with `__` separating
//!    sections (`HEXEKO_INVITATION__EXPIRY_DAYS=14` → `invitation.expiry_days`)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use hexeko_access::InvitationConfig;
use hexeko_db::DbConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "hexeko.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HexekoConfig {
    #[serde(default)]
    pub database: DbConfig,
    #[serde(default)]
    pub invitation: InvitationConfig,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Seconds between two runs of the invitation expiry sweep.
    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_interval_secs: u64,
}

fn default_log_filter() -> String {
    "hexeko=info".into()
}

fn default_sweep_interval() -> u64 {
    3600
}

impl Default for HexekoConfig {
    fn default() -> Self {
        Self {
            database: DbConfig::default(),
            invitation: InvitationConfig::default(),
            log_filter: default_log_filter(),
            expiry_sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl HexekoConfig {
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// Build the provider chain.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("HEXEKO_").split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_sources() {
        Jail::expect_with(|_jail| {
            let config = HexekoConfig::load()?;
            assert_eq!(config.database.namespace, "hexeko");
            assert_eq!(config.invitation.expiry_days, 7);
            assert_eq!(config.invitation.default_currency, "EUR");
            assert_eq!(config.log_filter, "hexeko=info");
            assert_eq!(config.expiry_sweep_interval_secs, 3600);
            Ok(())
        });
    }

    #[test]
    fn file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                log_filter = "hexeko=debug"

                [database]
                url = "db.internal:8000"

                [invitation]
                token_cache_ttl_secs = 0
                "#,
            )?;

            let config = HexekoConfig::load()?;
            assert_eq!(config.log_filter, "hexeko=debug");
            assert_eq!(config.database.url, "db.internal:8000");
            assert_eq!(config.database.database, "main");
            assert_eq!(config.invitation.token_cache_ttl_secs, 0);
            assert_eq!(config.invitation.token_retry_attempts, 3);
            Ok(())
        });
    }

    #[test]
    fn env_beats_file() {
        Jail::expect_with(|jail| {
            jail.create_file(CONFIG_FILE, "[invitation]\nexpiry_days = 10\n")?;
            jail.set_env("HEXEKO_INVITATION__EXPIRY_DAYS", "14");
            jail.set_env("HEXEKO_INVITATION__DEFAULT_LOCALE", "nl-BE");

            let config = HexekoConfig::load()?;
            assert_eq!(config.invitation.expiry_days, 14);
            assert_eq!(config.invitation.default_locale, "nl-BE");
            Ok(())
        });
    }
}
