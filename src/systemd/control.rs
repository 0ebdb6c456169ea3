// Systemd unit control operations over D-Bus

use crate::error::{Result, SwitchError};
use crate::systemd::{ConnectionManager, UnitAction};
use std::collections::HashMap;
use std::time::Duration;
use zbus::zvariant::{OwnedObjectPath, OwnedValue};
use zbus::Connection;

const SYSTEMD_DESTINATION: &str = "org.freedesktop.systemd1";
const SYSTEMD_PATH: &str = "/org/freedesktop/systemd1";
const MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";

/// Interval between checks while waiting for a queued job to finish
const JOB_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Service controller for systemd operations
#[derive(Clone)]
pub struct ServiceController {
    connection: Connection,
}

impl ServiceController {
    /// Connect to the system bus through the retrying connection manager
    pub async fn connect(manager: &ConnectionManager) -> Result<Self> {
        let connection = manager.connect_systemd().await?;
        Ok(Self { connection })
    }

    async fn manager_proxy(&self) -> std::result::Result<zbus::Proxy<'static>, SwitchError> {
        zbus::Proxy::new(
            &self.connection,
            SYSTEMD_DESTINATION,
            SYSTEMD_PATH,
            MANAGER_INTERFACE,
        )
        .await
        .map_err(|e| SwitchError::SystemdConnection(e.to_string()))
    }

    /// Queue a start/stop/restart job and wait until systemd has finished it.
    ///
    /// Like `systemctl`, the call only succeeds once the job is gone and the
    /// unit reached the state the action asks for.
    pub async fn run_action(&self, unit: &str, action: UnitAction) -> std::result::Result<(), SwitchError> {
        let proxy = self.manager_proxy().await?;

        // Returns the job object path; the call triggers polkit if privileges are needed
        let job_path: OwnedObjectPath = proxy
            .call(action.dbus_method(), &(unit, "replace"))
            .await
            .map_err(|e| control_error(unit, action, e))?;

        tracing::debug!("Queued {} job {} for {}", action, job_path.as_str(), unit);

        while self.job_pending(&job_path).await {
            tokio::time::sleep(JOB_POLL_INTERVAL).await;
        }

        let state = self.active_state(unit).await?;
        if action.is_settled(&state) {
            Ok(())
        } else {
            let result = self
                .unit_properties(unit)
                .await
                .ok()
                .and_then(|props| string_property(&props, "Result"))
                .unwrap_or_default();
            Err(SwitchError::ActionFailed {
                service: unit.to_string(),
                action: action.label().to_string(),
                detail: format!(
                    "Job for {} finished with unit in state '{}' (result: {})",
                    unit,
                    state,
                    if result.is_empty() { "unknown" } else { &result }
                ),
            })
        }
    }

    /// Whether a job object still exists on the bus
    async fn job_pending(&self, job_path: &OwnedObjectPath) -> bool {
        let proxy = match zbus::Proxy::new(
            &self.connection,
            SYSTEMD_DESTINATION,
            job_path.as_str(),
            "org.freedesktop.DBus.Properties",
        )
        .await
        {
            Ok(proxy) => proxy,
            Err(_) => return false,
        };

        // Finished jobs are removed from the bus, so the lookup fails
        proxy
            .call::<_, _, OwnedValue>("Get", &("org.freedesktop.systemd1.Job", "State"))
            .await
            .is_ok()
    }

    /// Current `ActiveState` of a unit (`active`, `inactive`, `failed`, ...)
    pub async fn active_state(&self, unit: &str) -> std::result::Result<String, SwitchError> {
        let props = self.unit_properties(unit).await?;
        string_property(&props, "ActiveState")
            .ok_or_else(|| SwitchError::ServiceInfo(format!("No ActiveState reported for {}", unit)))
    }

    /// `MainPID` of a unit; 0 when nothing is running
    pub async fn main_pid(&self, unit: &str) -> std::result::Result<u32, SwitchError> {
        let props = self.unit_properties(unit).await?;
        Ok(props
            .get("MainPID")
            .and_then(|v| v.downcast_ref::<u32>().ok())
            .unwrap_or(0))
    }

    /// Get unit properties from systemd
    async fn unit_properties(
        &self,
        unit: &str,
    ) -> std::result::Result<HashMap<String, OwnedValue>, SwitchError> {
        let proxy = self.manager_proxy().await?;

        // LoadUnit works for units that are not currently loaded, unlike GetUnit
        let unit_path: OwnedObjectPath = proxy
            .call("LoadUnit", &(unit,))
            .await
            .map_err(|e| SwitchError::ServiceInfo(e.to_string()))?;

        let props_proxy = zbus::fdo::PropertiesProxy::builder(&self.connection)
            .destination(SYSTEMD_DESTINATION)
            .and_then(|builder| builder.path(unit_path.as_str()))
            .map_err(|e| SwitchError::SystemdConnection(e.to_string()))?
            .build()
            .await
            .map_err(|e| SwitchError::SystemdConnection(e.to_string()))?;

        use zbus::zvariant::Optional;
        let props = props_proxy
            .get_all(Optional::default())
            .await
            .map_err(|e| SwitchError::ServiceInfo(e.to_string()))?;

        Ok(props)
    }
}

fn string_property(props: &HashMap<String, OwnedValue>, name: &str) -> Option<String> {
    props
        .get(name)
        .and_then(|v| v.downcast_ref::<String>().ok())
}

fn control_error(unit: &str, action: UnitAction, error: zbus::Error) -> SwitchError {
    let error_msg = error.to_string();
    let detail = if error_msg.contains("Access denied") || error_msg.contains("Authentication") {
        "Access denied. Authentication required - run hostswitch as root or grant it a polkit rule for systemd units.".to_string()
    } else {
        format!("Failed to {} {}: {}", action, unit, error)
    };

    SwitchError::ActionFailed {
        service: unit.to_string(),
        action: action.label().to_string(),
        detail,
    }
}
