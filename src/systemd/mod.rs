// Systemd and reverse-proxy integration module

pub mod control;
pub mod controller;
pub mod models;
pub mod proxy;
pub mod resilience;


pub use control::ServiceController;
pub use controller::{HostUnitController, UnitController};
pub use models::{ActionError, ActionResult, ProxyRoute, ServiceStatus, UnitAction};
pub use proxy::ProxySites;
pub use resilience::ConnectionManager;

#[cfg(test)]
pub use controller::MockUnitController;
