// Reverse-proxy site toggling (nginx sites-enabled symlinks)

use crate::config::ProxyConfig;
use crate::systemd::{ActionError, ActionResult, ProxyRoute};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Enables and disables proxy routes by linking site definitions into
/// `sites-enabled`, then reloading the proxy.
#[derive(Debug, Clone)]
pub struct ProxySites {
    sites_enabled: PathBuf,
    reload_command: Vec<String>,
    timeout: Duration,
}

impl ProxySites {
    pub fn new(config: &ProxyConfig, timeout: Duration) -> Self {
        Self {
            sites_enabled: config.sites_enabled.clone(),
            reload_command: config.reload_command.clone(),
            timeout,
        }
    }

    /// Path of the symlink that enables `route`
    pub fn link_path(&self, route: &ProxyRoute) -> Result<PathBuf, ActionError> {
        route
            .site_name()
            .map(|name| self.sites_enabled.join(name))
            .ok_or_else(|| {
                ActionError::new(format!(
                    "Invalid proxy site path: {}",
                    route.config_path().display()
                ))
            })
    }

    /// Link or unlink the site, then reload the proxy
    pub async fn set_enabled(&self, route: &ProxyRoute, enabled: bool) -> ActionResult {
        let link = self.link_path(route)?;

        if enabled {
            // Equivalent of `ln -sf`: replace whatever is there
            remove_if_present(&link).await.map_err(|e| {
                ActionError::new(format!("Failed to enable proxy site: {}", e))
            })?;
            tokio::fs::symlink(route.config_path(), &link)
                .await
                .map_err(|e| ActionError::new(format!("Failed to enable proxy site: {}", e)))?;
        } else {
            remove_if_present(&link).await.map_err(|e| {
                ActionError::new(format!("Failed to disable proxy site: {}", e))
            })?;
        }

        tracing::debug!(
            "Proxy site {} {}",
            link.display(),
            if enabled { "enabled" } else { "disabled" }
        );

        self.reload().await
    }

    async fn reload(&self) -> ActionResult {
        let Some((program, args)) = self.reload_command.split_first() else {
            return Ok(());
        };

        let output = tokio::time::timeout(self.timeout, Command::new(program).args(args).output())
            .await
            .map_err(|_| {
                ActionError::new(format!(
                    "Failed to reload proxy: timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ActionError::new(format!("Failed to reload proxy: {}", e)))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ActionError::new(format!(
                "Failed to reload proxy: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

async fn remove_if_present(path: &std::path::Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
