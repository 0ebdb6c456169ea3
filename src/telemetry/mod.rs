// Resource telemetry: sampling, bounded history and the background monitor

pub mod history;
pub mod models;
pub mod monitor;
pub mod sampler;


pub use history::{
    HistoryStore, ServiceHistory, ServicePoint, SystemHistory, SystemPoint, DEFAULT_HISTORY_SIZE,
};
pub use models::{format_bytes, now_timestamp, NetworkCounters, ProcessSample, SystemSample, Usage};
pub use monitor::{Monitor, NetworkRate};
pub use sampler::{aggregate_tree, process_tree, ProcessEntry, ResourceSampler, SysinfoSampler};

#[cfg(test)]
pub use sampler::MockResourceSampler;
