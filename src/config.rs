// Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP API binds to
    pub listen: String,
    pub monitor_interval_secs: u64,
    /// Points kept per history series
    pub history_size: usize,
    /// Upper bound for any single systemd call or proxy reload
    pub command_timeout_secs: u64,
    pub proxy: ProxyConfig,
    pub services: Vec<ServiceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Directory holding the symlinks of enabled sites
    pub sites_enabled: PathBuf,
    /// Command run after a site is toggled; empty disables the reload
    pub reload_command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    pub key: String,
    pub name: String,
    pub unit: String,
    pub port: u16,
    /// Site definition under sites-available
    pub proxy_config: PathBuf,
    #[serde(default)]
    pub exclusive_with: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5001".to_string(),
            monitor_interval_secs: 5,
            history_size: 60,
            command_timeout_secs: 10,
            proxy: ProxyConfig::default(),
            services: vec![
                ServiceConfig {
                    key: "webgui".to_string(),
                    name: "OpenHSI WebGUI".to_string(),
                    unit: "simple-web-controller.service".to_string(),
                    port: 5000,
                    proxy_config: PathBuf::from("/etc/nginx/sites-available/openhsi-web-controller"),
                    exclusive_with: vec!["jupyter".to_string()],
                },
                ServiceConfig {
                    key: "jupyter".to_string(),
                    name: "Jupyter Server".to_string(),
                    unit: "openhsi-jupyter.service".to_string(),
                    port: 8888,
                    proxy_config: PathBuf::from("/etc/nginx/sites-available/openhsi-jupyter"),
                    exclusive_with: vec!["webgui".to_string()],
                },
            ],
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            sites_enabled: PathBuf::from("/etc/nginx/sites-enabled"),
            reload_command: vec!["nginx".to_string(), "-s".to_string(), "reload".to_string()],
        }
    }
}

impl Config {
    /// Get default config path: ~/.config/hostswitch/config.yaml
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("hostswitch").join("config.yaml"))
    }

    /// Load config from path, falling back to defaults if not found
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = path.unwrap_or_else(|| Self::default_path().unwrap_or_default());

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_yaml::from_str(&contents)?;
            tracing::info!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            tracing::info!(
                "No configuration at {}, using defaults",
                config_path.display()
            );
            Ok(Self::default())
        }
    }

    /// Save config to path
    pub fn save(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Delay between monitor cycles (minimum 1 s)
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}
