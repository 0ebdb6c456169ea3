// Bounded, lock-protected metric history

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Points kept per subject: five minutes at the default 5 s cadence
pub const DEFAULT_HISTORY_SIZE: usize = 60;

/// One recorded system-wide point
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SystemPoint {
    pub cpu: f64,
    pub memory_percent: f64,
    pub disk_percent: f64,
    pub network_sent: u64,
    pub network_recv: u64,
}

/// One recorded per-service point
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServicePoint {
    pub cpu: f64,
    pub memory_percent: f64,
}

/// Copied-out system series, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemHistory {
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    pub disk: Vec<f64>,
    pub network_sent: Vec<u64>,
    pub network_recv: Vec<u64>,
    pub timestamps: Vec<f64>,
}

impl SystemHistory {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Copied-out series of one service, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceHistory {
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    pub timestamps: Vec<f64>,
}

impl ServiceHistory {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// FIFO of timestamped points; a point and its timestamp live in the same
/// slot so every derived series has the same length.
#[derive(Debug)]
struct Series<T> {
    points: VecDeque<(f64, T)>,
    capacity: usize,
}

impl<T: Copy> Series<T> {
    fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, timestamp: f64, point: T) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back((timestamp, point));
    }

    fn latest(&self) -> Option<&T> {
        self.points.back().map(|(_, point)| point)
    }
}

#[derive(Debug)]
struct Histories {
    system: Series<SystemPoint>,
    services: HashMap<String, Series<ServicePoint>>,
}

/// Thread-safe store for all metric history.
///
/// A single mutex guards every append and every snapshot. Snapshots are
/// copied while the lock is held, so a reader never sees half of a point.
#[derive(Debug)]
pub struct HistoryStore {
    inner: Mutex<Histories>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl HistoryStore {
    /// Create a store keeping at most `capacity` points per subject (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Histories {
                system: Series::new(capacity),
                services: HashMap::new(),
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panic while holding the lock cannot leave a half-written point behind,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Histories> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append_system(&self, point: SystemPoint, timestamp: f64) {
        self.lock().system.push(timestamp, point);
    }

    /// Append a point for `key`, creating its series on first use
    pub fn append_service(&self, key: &str, point: ServicePoint, timestamp: f64) {
        let capacity = self.capacity;
        let mut inner = self.lock();
        if let Some(series) = inner.services.get_mut(key) {
            series.push(timestamp, point);
        } else {
            let mut series = Series::new(capacity);
            series.push(timestamp, point);
            inner.services.insert(key.to_string(), series);
        }
    }

    pub fn snapshot_system(&self) -> SystemHistory {
        let inner = self.lock();
        let points = &inner.system.points;
        let mut history = SystemHistory {
            cpu: Vec::with_capacity(points.len()),
            memory: Vec::with_capacity(points.len()),
            disk: Vec::with_capacity(points.len()),
            network_sent: Vec::with_capacity(points.len()),
            network_recv: Vec::with_capacity(points.len()),
            timestamps: Vec::with_capacity(points.len()),
        };

        for (timestamp, point) in points {
            history.cpu.push(point.cpu);
            history.memory.push(point.memory_percent);
            history.disk.push(point.disk_percent);
            history.network_sent.push(point.network_sent);
            history.network_recv.push(point.network_recv);
            history.timestamps.push(*timestamp);
        }

        history
    }

    /// Series recorded for `key`; empty when the service was never sampled
    pub fn snapshot_service(&self, key: &str) -> ServiceHistory {
        let inner = self.lock();
        let Some(series) = inner.services.get(key) else {
            return ServiceHistory::default();
        };

        let (timestamps, points): (Vec<f64>, Vec<ServicePoint>) = series.points.iter().copied().unzip();
        ServiceHistory {
            cpu: points.iter().map(|p| p.cpu).collect(),
            memory: points.iter().map(|p| p.memory_percent).collect(),
            timestamps,
        }
    }

    /// Network rates of the newest system point
    pub fn latest_network_rate(&self) -> Option<(u64, u64)> {
        self.lock()
            .system
            .latest()
            .map(|point| (point.network_sent, point.network_recv))
    }
}
