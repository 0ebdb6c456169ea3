// Service coordination: exclusive switching plus merged telemetry snapshots

use crate::error::SwitchError;
use crate::registry::{ServiceDescriptor, ServiceRegistry};
use crate::systemd::{ServiceStatus, UnitAction, UnitController};
use crate::telemetry::{
    HistoryStore, NetworkCounters, ResourceSampler, ServiceHistory, SystemHistory, Usage,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// System part of a resource snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemResources {
    pub cpu: f64,
    pub memory: Usage,
    pub disk: Usage,
    /// Most recent per-cycle network rate recorded by the monitor
    pub network: NetworkCounters,
    pub history: SystemHistory,
}

/// Per-service part of a resource snapshot. Live fields are absent when the
/// process tree could not be measured; the history is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceResources {
    pub pid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_processes: Option<usize>,
    pub history: ServiceHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    pub system: SystemResources,
    pub services: BTreeMap<String, ServiceResources>,
}

/// Orchestrates unit actions across the registry.
///
/// Switching is best effort and not transactional: conflicting services are
/// stopped first, a failure to stop one does not prevent the start, and a
/// failed start does not restart what was stopped. Proxy toggles after a
/// successful unit action only log on failure.
///
/// Coordinator operations are not serialized against each other. Two
/// concurrent `start` calls on overlapping exclusion sets can both act on a
/// stale view of which services are active.
#[derive(Clone)]
pub struct ServiceCoordinator {
    registry: Arc<ServiceRegistry>,
    controller: Arc<dyn UnitController>,
    sampler: Arc<dyn ResourceSampler>,
    history: Arc<HistoryStore>,
}

impl ServiceCoordinator {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        controller: Arc<dyn UnitController>,
        sampler: Arc<dyn ResourceSampler>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            registry,
            controller,
            sampler,
            history,
        }
    }

    /// Start `key`, stopping every active service it is exclusive with first
    pub async fn start(&self, key: &str) -> Result<(), SwitchError> {
        let service = self.registry.describe(key)?;

        for other_key in &service.exclusive_with {
            let Ok(other) = self.registry.describe(other_key) else {
                continue;
            };
            if !self.controller.is_unit_active(&other.unit).await {
                continue;
            }

            tracing::info!("Stopping mutually exclusive service: {}", other.key);
            match self.controller.set_unit_state(&other.unit, UnitAction::Stop).await {
                Ok(()) => {
                    if let Err(e) = self.controller.set_proxy_route(&other.route, false).await {
                        tracing::warn!("Stopped {} but proxy toggle failed: {}", other.key, e);
                    }
                }
                Err(e) => tracing::warn!("Failed to stop {}: {}", other.key, e),
            }
        }

        self.run(service, UnitAction::Start).await?;

        if let Err(e) = self.controller.set_proxy_route(&service.route, true).await {
            tracing::warn!("Service {} started but proxy toggle failed: {}", service.key, e);
        }

        Ok(())
    }

    pub async fn stop(&self, key: &str) -> Result<(), SwitchError> {
        let service = self.registry.describe(key)?;

        self.run(service, UnitAction::Stop).await?;

        if let Err(e) = self.controller.set_proxy_route(&service.route, false).await {
            tracing::warn!("Service {} stopped but proxy toggle failed: {}", service.key, e);
        }

        Ok(())
    }

    /// Restart in place; the proxy route keeps whatever state it had
    pub async fn restart(&self, key: &str) -> Result<(), SwitchError> {
        let service = self.registry.describe(key)?;
        self.run(service, UnitAction::Restart).await
    }

    async fn run(&self, service: &ServiceDescriptor, action: UnitAction) -> Result<(), SwitchError> {
        tracing::info!("Requested {} of {} ({})", action, service.key, service.unit);

        self.controller
            .set_unit_state(&service.unit, action)
            .await
            .map_err(|e| {
                tracing::warn!("Failed to {} {}: {}", action, service.key, e);
                SwitchError::ActionFailed {
                    service: service.key.clone(),
                    action: action.label().to_string(),
                    detail: e.detail().to_string(),
                }
            })
    }

    pub async fn status_of(&self, key: &str) -> Result<ServiceStatus, SwitchError> {
        let service = self.registry.describe(key)?;
        Ok(self.status(service).await)
    }

    /// Status of every registered service, in registry order
    pub async fn status_all(&self) -> Vec<ServiceStatus> {
        let mut statuses = Vec::with_capacity(self.registry.len());
        for service in self.registry.all() {
            statuses.push(self.status(service).await);
        }
        statuses
    }

    async fn status(&self, service: &ServiceDescriptor) -> ServiceStatus {
        ServiceStatus {
            key: service.key.clone(),
            name: service.name.clone(),
            active: self.controller.is_unit_active(&service.unit).await,
            unit: service.unit.clone(),
            port: service.port,
        }
    }

    /// Fresh readings merged with recorded history
    pub async fn snapshot(&self) -> Result<ResourceSnapshot, SwitchError> {
        let sample = self.sampler.system_sample().await?;
        let network = self
            .history
            .latest_network_rate()
            .map(|(bytes_sent, bytes_recv)| NetworkCounters {
                bytes_sent,
                bytes_recv,
            })
            .unwrap_or_default();

        let system = SystemResources {
            cpu: sample.cpu,
            memory: sample.memory,
            disk: sample.disk,
            network,
            history: self.history.snapshot_system(),
        };

        let mut services = BTreeMap::new();
        for service in self.registry.all() {
            if !self.controller.is_unit_active(&service.unit).await {
                continue;
            }
            let Some(pid) = self.controller.main_process_id(&service.unit).await else {
                continue;
            };

            let live = self.sampler.process_sample(pid).await;
            services.insert(
                service.key.clone(),
                ServiceResources {
                    pid,
                    cpu: live.map(|s| s.cpu_percent),
                    memory: live.map(|s| s.memory_bytes),
                    memory_percent: live.map(|s| s.memory_percent),
                    num_processes: live.map(|s| s.process_count),
                    history: self.history.snapshot_service(&service.key),
                },
            );
        }

        Ok(ResourceSnapshot { system, services })
    }
}
