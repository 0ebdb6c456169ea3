// In-memory collaborators for tests

use crate::config::Config;
use crate::error::SwitchError;
use crate::registry::ServiceRegistry;
use crate::systemd::{ActionError, ActionResult, ProxyRoute, UnitAction, UnitController};
use crate::telemetry::{NetworkCounters, ProcessSample, ResourceSampler, SystemSample, Usage};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const WEBGUI_UNIT: &str = "simple-web-controller.service";
pub const JUPYTER_UNIT: &str = "openhsi-jupyter.service";

/// Registry with the default webgui/jupyter pair
pub fn default_registry() -> Arc<ServiceRegistry> {
    Arc::new(ServiceRegistry::from_config(&Config::default().services).unwrap())
}

#[derive(Default)]
struct UnitState {
    active: HashMap<String, u32>,
    next_pid: u32,
    calls: Vec<String>,
    failing: HashSet<(String, UnitAction)>,
    failing_proxy: bool,
    enabled_routes: HashSet<PathBuf>,
}

/// Records every call and keeps a simple active/inactive model per unit
#[derive(Default)]
pub struct FakeUnitController {
    state: Mutex<UnitState>,
}

impl FakeUnitController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active(self, unit: &str, pid: u32) -> Self {
        self.state.lock().unwrap().active.insert(unit.to_string(), pid);
        self
    }

    pub fn failing(self, unit: &str, action: UnitAction) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert((unit.to_string(), action));
        self
    }

    pub fn failing_proxy(self) -> Self {
        self.state.lock().unwrap().failing_proxy = true;
        self
    }

    /// Calls in the order they were made, e.g. `stop openhsi-jupyter.service`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Only unit actions, without queries or proxy toggles
    pub fn actions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| {
                call.starts_with("start ") || call.starts_with("stop ") || call.starts_with("restart ")
            })
            .collect()
    }

    pub fn route_enabled(&self, site: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .enabled_routes
            .iter()
            .any(|path| path.file_name().and_then(|n| n.to_str()) == Some(site))
    }
}

#[async_trait]
impl UnitController for FakeUnitController {
    async fn set_unit_state(&self, unit: &str, action: UnitAction) -> ActionResult {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{} {}", action, unit));

        if state.failing.contains(&(unit.to_string(), action)) {
            return Err(ActionError::new(format!("Job for {} failed", unit)));
        }

        match action {
            UnitAction::Start | UnitAction::Restart => {
                state.next_pid += 1;
                let pid = 4000 + state.next_pid;
                state.active.insert(unit.to_string(), pid);
            }
            UnitAction::Stop => {
                state.active.remove(unit);
            }
        }
        Ok(())
    }

    async fn is_unit_active(&self, unit: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("is-active {}", unit));
        state.active.contains_key(unit)
    }

    async fn main_process_id(&self, unit: &str) -> Option<u32> {
        self.state.lock().unwrap().active.get(unit).copied()
    }

    async fn set_proxy_route(&self, route: &ProxyRoute, enabled: bool) -> ActionResult {
        let mut state = self.state.lock().unwrap();
        let site = route.site_name().unwrap_or_default().to_string();
        state
            .calls
            .push(format!("proxy {} {}", site, if enabled { "on" } else { "off" }));

        if state.failing_proxy {
            return Err(ActionError::new("Failed to reload proxy: config test failed"));
        }

        if enabled {
            state.enabled_routes.insert(route.config_path().to_path_buf());
        } else {
            state.enabled_routes.remove(route.config_path());
        }
        Ok(())
    }
}

/// Sampler returning scripted readings
#[derive(Default)]
pub struct FakeSampler {
    network: Mutex<VecDeque<NetworkCounters>>,
    processes: Mutex<HashMap<u32, ProcessSample>>,
    system_failures: Mutex<usize>,
    system_panics: Mutex<usize>,
}

impl FakeSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw network totals returned by successive system samples
    pub fn with_network(self, totals: &[(u64, u64)]) -> Self {
        self.network.lock().unwrap().extend(
            totals
                .iter()
                .map(|&(bytes_sent, bytes_recv)| NetworkCounters { bytes_sent, bytes_recv }),
        );
        self
    }

    pub fn with_process(self, pid: u32, cpu_percent: f64, memory_percent: f64) -> Self {
        self.processes.lock().unwrap().insert(
            pid,
            ProcessSample {
                pid,
                cpu_percent,
                memory_bytes: 64 * 1024 * 1024,
                memory_percent,
                process_count: 3,
            },
        );
        self
    }

    /// Make the next `count` system samples panic, before any scripted failures
    pub fn panicking_system(self, count: usize) -> Self {
        *self.system_panics.lock().unwrap() = count;
        self
    }

    /// Make the next `count` system samples fail
    pub fn failing_system(self, count: usize) -> Self {
        *self.system_failures.lock().unwrap() = count;
        self
    }
}

#[async_trait]
impl ResourceSampler for FakeSampler {
    async fn system_sample(&self) -> Result<SystemSample, SwitchError> {
        let panic_now = {
            let mut panics = self.system_panics.lock().unwrap();
            let due = *panics > 0;
            if due {
                *panics -= 1;
            }
            due
        };
        // The lock is released first so later calls still work
        if panic_now {
            panic!("sampler crashed");
        }

        {
            let mut failures = self.system_failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(SwitchError::Sampling("No disk mounted at /".to_string()));
            }
        }

        let network = self.network.lock().unwrap().pop_front().unwrap_or_default();
        Ok(SystemSample {
            cpu: 12.5,
            memory: Usage::new(8_000, 2_000),
            disk: Usage::new(100_000, 40_000),
            network,
        })
    }

    async fn process_sample(&self, pid: u32) -> Option<ProcessSample> {
        self.processes.lock().unwrap().get(&pid).copied()
    }
}
