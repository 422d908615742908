use anyhow::Context;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Database {
    pub in_memory: bool,
    /// directory holding `bs.db`, created if missing
    pub data_dir: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            in_memory: false,
            data_dir: PathBuf::from("bs_data"),
            busy_timeout_ms: 5000,
        }
    }
}

impl Database {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
    pub max_body_bytes: u64,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8585,
            max_body_bytes: 100_000,
            request_timeout_secs: 5,
        }
    }
}

impl HttpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// remote tralbum details endpoint
    pub api_url: String,
    pub band_id: u64,
    /// ingestion endpoint of the collector
    pub collector_url: String,
    /// sampling attempts per submitted batch
    pub batch_size: usize,
    pub pacing_ms: u64,
    pub default_retry_after_secs: u64,
    pub connect_timeout_secs: u64,
    pub io_timeout_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            api_url: "https://bandcamp.com/api/mobile/26/tralbum_details".to_string(),
            band_id: 1,
            collector_url: "http://127.0.0.1:8585/submit".to_string(),
            batch_size: 100,
            pacing_ms: 1000,
            default_retry_after_secs: 3,
            connect_timeout_secs: 5,
            io_timeout_secs: 15,
        }
    }
}

impl DiscoveryConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn default_retry_after(&self) -> Duration {
        Duration::from_secs(self.default_retry_after_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_config_toml() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[database]
data_dir = "/var/lib/bandscrape"

[http]
bind_addr = "127.0.0.1"
port = 8080

[discovery]
collector_url = "https://collector.example/submit"
batch_size = 10
"#;

        let cfg: Config = toml::from_str(toml_str)?;

        assert_eq!(cfg.version, 1);

        assert!(!cfg.database.in_memory);
        assert_eq!(cfg.database.data_dir, PathBuf::from("/var/lib/bandscrape"));

        assert_eq!(cfg.http.bind_addr, "127.0.0.1");
        assert_eq!(cfg.http.port, 8080);
        // unspecified keys keep their defaults
        assert_eq!(cfg.http.max_body_bytes, 100_000);

        assert_eq!(
            cfg.discovery.collector_url,
            "https://collector.example/submit"
        );
        assert_eq!(cfg.discovery.batch_size, 10);
        assert_eq!(cfg.discovery.pacing(), Duration::from_secs(1));

        Ok(())
    }

    #[test]
    fn test_parse_minimal_config() -> anyhow::Result<()> {
        let cfg: Config = toml::from_str("version = 1\n")?;

        assert_eq!(cfg.database.data_dir, PathBuf::from("bs_data"));
        assert_eq!(cfg.http.port, 8585);
        assert_eq!(cfg.http.request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.discovery.band_id, 1);
        assert_eq!(cfg.discovery.batch_size, 100);
        assert_eq!(cfg.discovery.default_retry_after(), Duration::from_secs(3));

        Ok(())
    }

    #[test]
    fn test_in_memory_database_config() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[database]
in_memory = true
"#;

        let cfg: Config = toml::from_str(toml_str)?;

        assert!(cfg.database.in_memory);

        Ok(())
    }
}
