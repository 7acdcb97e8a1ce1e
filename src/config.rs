//! Configuration (A1): the enumerated mount-time options, deserialized
//! from TOML via `serde`.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

fn default_port() -> u16 {
    4045
}

fn default_block_size() -> u64 {
    4000
}

fn default_initial_blocks() -> u64 {
    1024
}

fn default_monitor_initial_countdown() -> u32 {
    3
}

fn default_monitor_tick_interval_ms() -> u64 {
    200
}

fn default_monitor_idle_eviction() -> u32 {
    5
}

fn default_rendezvous_url() -> Option<String> {
    None
}

/// `mount_point`, `port`, `start_cli`, `block_size`/`initial_blocks`,
/// `monitor_initial_countdown`/`monitor_tick_interval`/
/// `monitor_idle_eviction`, plus `rendezvous_url` for the Bootstrap
/// Client (A2) carrying the rendezvous service's base URL.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mount_point: PathBuf,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub start_cli: bool,

    #[serde(default = "default_block_size")]
    pub block_size: u64,

    #[serde(default = "default_initial_blocks")]
    pub initial_blocks: u64,

    #[serde(default = "default_monitor_initial_countdown")]
    pub monitor_initial_countdown: u32,

    #[serde(default = "default_monitor_tick_interval_ms")]
    pub monitor_tick_interval_ms: u64,

    #[serde(default = "default_monitor_idle_eviction")]
    pub monitor_idle_eviction: u32,

    /// Base URL of the bootstrap rendezvous service. Absent means this
    /// peer starts as its own bootstrap peer
    /// (`start_with_bootstrap_server`).
    #[serde(default = "default_rendezvous_url")]
    pub rendezvous_url: Option<String>,
}

impl Config {
    /// Parses a TOML document into a `Config`. The `mount_point` field is
    /// mandatory; every other option falls back to a sensible default.
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn monitor_tick_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_when_only_mount_point_given() {
        let config = Config::from_toml(r#"mount_point = "/mnt/meshfs""#).unwrap();
        assert_eq!(config.mount_point, PathBuf::from("/mnt/meshfs"));
        assert_eq!(config.port, 4045);
        assert!(!config.start_cli);
        assert_eq!(config.block_size, 4000);
        assert_eq!(config.monitor_initial_countdown, 3);
        assert!(config.rendezvous_url.is_none());
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let toml = r#"
            mount_point = "/mnt/meshfs"
            port = 9000
            start_cli = true
            monitor_initial_countdown = 5
            rendezvous_url = "http://bootstrap.local:8000"
        "#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.start_cli);
        assert_eq!(config.monitor_initial_countdown, 5);
        assert_eq!(config.rendezvous_url.as_deref(), Some("http://bootstrap.local:8000"));
    }
}
