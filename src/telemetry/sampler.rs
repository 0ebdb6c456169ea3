// Host resource sampling

use crate::error::SwitchError;
use crate::telemetry::{NetworkCounters, ProcessSample, SystemSample, Usage};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, Networks, ProcessRefreshKind, ProcessesToUpdate,
    RefreshKind, System,
};

/// Reads instantaneous resource usage from the host
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceSampler: Send + Sync {
    /// System-wide CPU, memory, disk and raw network counters
    async fn system_sample(&self) -> Result<SystemSample, SwitchError>;

    /// Aggregate of `pid` and all its descendants.
    ///
    /// `None` when the process is gone, or any member of its tree exited
    /// while it was being measured.
    async fn process_sample(&self, pid: u32) -> Option<ProcessSample>;
}

/// One row of a process table snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub parent: Option<u32>,
    pub cpu_percent: f64,
    pub memory_bytes: u64,
}

/// `root` followed by all of its descendants, breadth first.
/// `None` when `root` is not in the table.
pub fn process_tree(root: u32, table: &[ProcessEntry]) -> Option<Vec<u32>> {
    if !table.iter().any(|entry| entry.pid == root) {
        return None;
    }

    let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
    for entry in table {
        if let Some(parent) = entry.parent {
            if parent != entry.pid {
                children.entry(parent).or_default().push(entry.pid);
            }
        }
    }

    let mut tree = vec![root];
    let mut seen: HashSet<u32> = HashSet::from([root]);
    let mut next = 0;
    while next < tree.len() {
        if let Some(kids) = children.get(&tree[next]) {
            for &kid in kids {
                if seen.insert(kid) {
                    tree.push(kid);
                }
            }
        }
        next += 1;
    }

    Some(tree)
}

/// Sum usage over `members` as found in `table`.
/// `None` if any member is missing from `table`.
pub fn aggregate_tree(
    root: u32,
    members: &[u32],
    table: &[ProcessEntry],
    total_memory: u64,
) -> Option<ProcessSample> {
    let by_pid: HashMap<u32, &ProcessEntry> = table.iter().map(|entry| (entry.pid, entry)).collect();

    let mut sample = ProcessSample {
        pid: root,
        ..ProcessSample::default()
    };

    for pid in members {
        let entry = by_pid.get(pid)?;
        sample.cpu_percent += entry.cpu_percent;
        sample.memory_bytes += entry.memory_bytes;
        sample.process_count += 1;
    }

    if total_memory > 0 {
        sample.memory_percent = (sample.memory_bytes as f64 / total_memory as f64) * 100.0;
    }

    Some(sample)
}

/// [`ResourceSampler`] backed by `sysinfo`.
///
/// Each call builds its own `System`, so concurrent samples never wait on
/// each other.
#[derive(Debug, Clone)]
pub struct SysinfoSampler {
    cpu_interval: Duration,
    disk_mount: PathBuf,
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self {
            cpu_interval: Duration::from_millis(100),
            disk_mount: PathBuf::from("/"),
        }
    }
}

impl SysinfoSampler {
    pub fn new(cpu_interval: Duration, disk_mount: impl Into<PathBuf>) -> Self {
        Self {
            cpu_interval,
            disk_mount: disk_mount.into(),
        }
    }

    fn cpu_wait(&self) -> Duration {
        self.cpu_interval.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)
    }

    fn disk_usage(&self) -> Result<Usage, SwitchError> {
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .iter()
            .find(|disk| disk.mount_point() == self.disk_mount.as_path())
            .ok_or_else(|| {
                SwitchError::Sampling(format!("No disk mounted at {}", self.disk_mount.display()))
            })?;

        let total = disk.total_space();
        Ok(Usage::new(total, total.saturating_sub(disk.available_space())))
    }

    fn process_table(sys: &System) -> Vec<ProcessEntry> {
        sys.processes()
            .iter()
            // Linux threads show up as processes; only count real ones
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                parent: process.parent().map(|parent| parent.as_u32()),
                cpu_percent: process.cpu_usage() as f64,
                memory_bytes: process.memory(),
            })
            .collect()
    }
}

#[async_trait]
impl ResourceSampler for SysinfoSampler {
    async fn system_sample(&self) -> Result<SystemSample, SwitchError> {
        let mut sys = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::new().with_cpu_usage())
                .with_memory(MemoryRefreshKind::new().with_ram()),
        );

        // CPU usage is a delta between two refreshes
        tokio::time::sleep(self.cpu_wait()).await;
        sys.refresh_cpu_usage();

        let networks = Networks::new_with_refreshed_list();
        let network = networks
            .iter()
            .fold(NetworkCounters::default(), |acc, (_, data)| NetworkCounters {
                bytes_sent: acc.bytes_sent + data.total_transmitted(),
                bytes_recv: acc.bytes_recv + data.total_received(),
            });

        Ok(SystemSample {
            cpu: sys.global_cpu_usage() as f64,
            memory: Usage::new(sys.total_memory(), sys.used_memory()),
            disk: self.disk_usage()?,
            network,
        })
    }

    async fn process_sample(&self, pid: u32) -> Option<ProcessSample> {
        let refresh = ProcessRefreshKind::new().with_cpu().with_memory();
        let mut sys = System::new_with_specifics(
            RefreshKind::new()
                .with_memory(MemoryRefreshKind::new().with_ram())
                .with_processes(refresh),
        );

        let members = process_tree(pid, &Self::process_table(&sys))?;

        tokio::time::sleep(self.cpu_wait()).await;
        sys.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh);

        let sample = aggregate_tree(pid, &members, &Self::process_table(&sys), sys.total_memory());
        if sample.is_none() {
            tracing::debug!("Process tree of {} changed while sampling", pid);
        }
        sample
    }
}
