// Hostswitch - Exclusive host service switcher with resource telemetry
// Library root

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod systemd;
pub mod telemetry;
pub mod version;

#[cfg(test)]
mod coordinator_tests;
#[cfg(test)]
mod testing;
