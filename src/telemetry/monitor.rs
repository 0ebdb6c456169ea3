// Background resource monitor

use crate::error::SwitchError;
use crate::registry::ServiceRegistry;
use crate::systemd::UnitController;
use crate::telemetry::{
    now_timestamp, HistoryStore, NetworkCounters, ResourceSampler, ServicePoint, SystemPoint,
};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Turns cumulative network counters into per-cycle deltas
#[derive(Debug, Clone, Default)]
pub struct NetworkRate {
    last: Option<NetworkCounters>,
}

impl NetworkRate {
    /// Delta since the previous observation. The first observation and any
    /// counter that went backwards (interface reset) yield 0.
    pub fn observe(&mut self, counters: NetworkCounters) -> NetworkCounters {
        let delta = match self.last {
            Some(prev) => NetworkCounters {
                bytes_sent: counters.bytes_sent.saturating_sub(prev.bytes_sent),
                bytes_recv: counters.bytes_recv.saturating_sub(prev.bytes_recv),
            },
            None => NetworkCounters::default(),
        };
        self.last = Some(counters);
        delta
    }
}

/// Samples the host at a fixed period and records into [`HistoryStore`].
///
/// Runs for the lifetime of the process. The period is the sleep between
/// cycles, so the effective cadence is `interval` plus the sampling time.
pub struct Monitor {
    registry: Arc<ServiceRegistry>,
    controller: Arc<dyn UnitController>,
    sampler: Arc<dyn ResourceSampler>,
    history: Arc<HistoryStore>,
    interval: Duration,
    network: NetworkRate,
}

impl Monitor {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        controller: Arc<dyn UnitController>,
        sampler: Arc<dyn ResourceSampler>,
        history: Arc<HistoryStore>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            controller,
            sampler,
            history,
            interval,
            network: NetworkRate::default(),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Loop forever; a failed or panicking cycle is logged and the next one
    /// runs after the usual delay.
    pub async fn run(mut self) {
        tracing::info!("Resource monitor started, sampling every {:?}", self.interval);

        loop {
            match AssertUnwindSafe(self.cycle()).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Error in resource monitoring: {}", e),
                Err(_) => tracing::error!("Resource monitoring cycle panicked"),
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    /// One sampling pass: system first, then every active service
    pub async fn cycle(&mut self) -> Result<(), SwitchError> {
        let sample = self.sampler.system_sample().await?;
        let rate = self.network.observe(sample.network);
        let timestamp = now_timestamp();

        self.history.append_system(
            SystemPoint {
                cpu: sample.cpu,
                memory_percent: sample.memory.percent,
                disk_percent: sample.disk.percent,
                network_sent: rate.bytes_sent,
                network_recv: rate.bytes_recv,
            },
            timestamp,
        );

        for service in self.registry.all() {
            if !self.controller.is_unit_active(&service.unit).await {
                continue;
            }
            let Some(pid) = self.controller.main_process_id(&service.unit).await else {
                continue;
            };
            let Some(process) = self.sampler.process_sample(pid).await else {
                continue;
            };

            tracing::debug!(
                "{}: pid {} cpu {:.1}% memory {} ({} processes)",
                service.key,
                pid,
                process.cpu_percent,
                process.memory_formatted(),
                process.process_count
            );

            self.history.append_service(
                &service.key,
                ServicePoint {
                    cpu: process.cpu_percent,
                    memory_percent: process.memory_percent,
                },
                timestamp,
            );
        }

        Ok(())
    }
}
