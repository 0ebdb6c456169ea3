// Unit controller seam used by the coordinator and the monitor

use crate::systemd::{ActionError, ActionResult, ProxyRoute, ProxySites, ServiceController, UnitAction};
use async_trait::async_trait;
use std::time::Duration;

/// Host operations on units and proxy routes.
///
/// Calls never fail by panicking or by returning an opaque error: actions
/// report an [`ActionError`] detail, queries degrade to `false` / `None`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UnitController: Send + Sync {
    async fn set_unit_state(&self, unit: &str, action: UnitAction) -> ActionResult;

    async fn is_unit_active(&self, unit: &str) -> bool;

    /// Main process of the unit, `None` when it has none
    async fn main_process_id(&self, unit: &str) -> Option<u32>;

    async fn set_proxy_route(&self, route: &ProxyRoute, enabled: bool) -> ActionResult;
}

/// systemd over D-Bus plus nginx sites, each call bounded by `timeout`
#[derive(Clone)]
pub struct HostUnitController {
    systemd: ServiceController,
    proxy: ProxySites,
    timeout: Duration,
}

impl HostUnitController {
    pub fn new(systemd: ServiceController, proxy: ProxySites, timeout: Duration) -> Self {
        Self {
            systemd,
            proxy,
            timeout,
        }
    }
}

#[async_trait]
impl UnitController for HostUnitController {
    async fn set_unit_state(&self, unit: &str, action: UnitAction) -> ActionResult {
        match tokio::time::timeout(self.timeout, self.systemd.run_action(unit, action)).await {
            Ok(Ok(())) => {
                tracing::info!("{} {}: done", action, unit);
                Ok(())
            }
            Ok(Err(e)) => Err(ActionError::new(e.to_string())),
            Err(_) => Err(ActionError::new(format!(
                "Timed out after {}s waiting for {} of {}",
                self.timeout.as_secs(),
                action,
                unit
            ))),
        }
    }

    async fn is_unit_active(&self, unit: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.systemd.active_state(unit)).await {
            Ok(Ok(state)) => state == "active",
            Ok(Err(e)) => {
                tracing::debug!("Could not read state of {}: {}", unit, e);
                false
            }
            Err(_) => {
                tracing::debug!("Timed out reading state of {}", unit);
                false
            }
        }
    }

    async fn main_process_id(&self, unit: &str) -> Option<u32> {
        match tokio::time::timeout(self.timeout, self.systemd.main_pid(unit)).await {
            Ok(Ok(0)) => None,
            Ok(Ok(pid)) => Some(pid),
            Ok(Err(e)) => {
                tracing::debug!("Could not read MainPID of {}: {}", unit, e);
                None
            }
            Err(_) => None,
        }
    }

    async fn set_proxy_route(&self, route: &ProxyRoute, enabled: bool) -> ActionResult {
        self.proxy.set_enabled(route, enabled).await
    }
}
