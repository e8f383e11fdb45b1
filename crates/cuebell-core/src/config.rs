use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCAN_INTERVAL_HOURS: u64 = 6;
pub const DEFAULT_IDLE_POLL_SECS: u64 = 60;
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_FETCH_DELAY_MS: u64 = 500;
pub const DEFAULT_LANG: &str = "en";

/// Top-level config (cuebell.toml + CUEBELL_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CuebellConfig {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Without it nothing can be delivered.
    pub bot_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Root directory of the on-disk schedule cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// Age after which a cached document is refetched. 0 keeps it forever.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: u64,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Pause between consecutive fetches when prefetching many schedules.
    #[serde(default = "default_fetch_delay")]
    pub fetch_delay_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_ttl_minutes: DEFAULT_CACHE_TTL_MINUTES,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fetch_delay_ms: DEFAULT_FETCH_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Hours between scans. Also the far horizon: items starting later than
    /// this are left for a future scan.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_hours: u64,
    /// Dispatch loop wait when the pending queue is empty.
    #[serde(default = "default_idle_poll")]
    pub idle_poll_secs: u64,
    /// Evict dedup keys older than this many hours. 0 keeps every key.
    #[serde(default)]
    pub ledger_retention_hours: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            scan_interval_hours: DEFAULT_SCAN_INTERVAL_HOURS,
            idle_poll_secs: DEFAULT_IDLE_POLL_SECS,
            ledger_retention_hours: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Directory holding `<lang>.json` template overrides.
    pub dir: Option<String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            dir: None,
        }
    }
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cuebell/cuebell.db", home)
}
fn default_cache_dir() -> String {
    "./cache".to_string()
}
fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_MINUTES
}
fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}
fn default_fetch_delay() -> u64 {
    DEFAULT_FETCH_DELAY_MS
}
fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_HOURS
}
fn default_idle_poll() -> u64 {
    DEFAULT_IDLE_POLL_SECS
}
fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

impl CuebellConfig {
    /// Load config from a TOML file with CUEBELL_* env var overrides.
    ///
    /// Nested keys use a double underscore: `CUEBELL_DISCORD__BOT_TOKEN`.
    /// A missing file is not an error; defaults fill every gap.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CuebellConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CUEBELL_").split("__"))
            .extract()
            .map_err(|e| crate::error::CuebellError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cuebell/cuebell.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cuebell.toml");
        std::fs::write(
            &path,
            r#"
[discord]
bot_token = "abc"

[notifier]
scan_interval_hours = 3
ledger_retention_hours = 24

[locale]
lang = "ja"
dir = "loc"
"#,
        )
        .unwrap();

        let config = CuebellConfig::load(path.to_str()).unwrap();
        assert_eq!(config.discord.bot_token.as_deref(), Some("abc"));
        assert_eq!(config.notifier.scan_interval_hours, 3);
        assert_eq!(config.notifier.idle_poll_secs, DEFAULT_IDLE_POLL_SECS);
        assert_eq!(config.notifier.ledger_retention_hours, 24);
        assert_eq!(config.schedule.cache_ttl_minutes, DEFAULT_CACHE_TTL_MINUTES);
        assert_eq!(config.locale.lang, "ja");
        assert_eq!(config.locale.dir.as_deref(), Some("loc"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = CuebellConfig::load(path.to_str()).unwrap();
        assert!(config.discord.bot_token.is_none());
        assert_eq!(config.notifier.scan_interval_hours, DEFAULT_SCAN_INTERVAL_HOURS);
        assert_eq!(config.schedule.cache_dir, "./cache");
    }

    #[test]
    fn malformed_value_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cuebell.toml");
        std::fs::write(&path, "[notifier]\nscan_interval_hours = \"often\"\n").unwrap();

        let err = CuebellConfig::load(path.to_str()).unwrap_err();
        assert!(matches!(err, crate::error::CuebellError::Config(_)));
    }
}
