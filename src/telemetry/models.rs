// Resource sample data models

use serde::{Deserialize, Serialize};

/// Total/used pair with the derived percentage
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub total: u64,
    pub used: u64,
    pub percent: f64,
}

impl Usage {
    pub fn new(total: u64, used: u64) -> Self {
        let percent = if total > 0 {
            (used as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        Self { total, used, percent }
    }
}

/// Network byte counters, either raw cumulative totals or per-cycle deltas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}

/// Instantaneous system-wide resource reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSample {
    pub cpu: f64,
    pub memory: Usage,
    pub disk: Usage,
    /// Raw cumulative counters since boot
    pub network: NetworkCounters,
}

/// Aggregated reading for a process and all of its descendants
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub cpu_percent: f64,
    /// Sum of resident set sizes in bytes
    pub memory_bytes: u64,
    pub memory_percent: f64,
    pub process_count: usize,
}

impl ProcessSample {
    pub fn memory_formatted(&self) -> String {
        format_bytes(self.memory_bytes)
    }
}

/// Format bytes as human-readable string (e.g., "45.2 MiB")
pub fn format_bytes(bytes: u64) -> String {
    use byte_unit::{Byte, UnitType};

    let byte = Byte::from_u64(bytes);
    format!("{:.1}", byte.get_appropriate_unit(UnitType::Binary))
}

/// Current wall-clock time as fractional Unix seconds
pub fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
