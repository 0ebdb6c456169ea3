// Static table of switchable services

use crate::config::ServiceConfig;
use crate::error::SwitchError;
use crate::systemd::ProxyRoute;
use std::collections::{BTreeSet, HashMap};

/// Immutable description of one switchable service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub key: String,
    pub name: String,
    pub unit: String,
    pub route: ProxyRoute,
    pub port: u16,
    /// Services that must be stopped before this one starts
    pub exclusive_with: BTreeSet<String>,
}

/// Ordered, read-only registry of the services this host can switch between
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<ServiceDescriptor>,
    index: HashMap<String, usize>,
}

impl ServiceRegistry {
    /// Build the registry from configuration, keeping configuration order.
    ///
    /// Duplicate keys and malformed unit names are rejected. Exclusion entries
    /// that name an unknown service (or the service itself) are dropped with a
    /// warning.
    pub fn from_config(services: &[ServiceConfig]) -> Result<Self, SwitchError> {
        let mut index = HashMap::with_capacity(services.len());

        for (position, service) in services.iter().enumerate() {
            if service.key.trim().is_empty() {
                return Err(SwitchError::Config("Service key cannot be empty".to_string()));
            }
            validate_unit_name(&service.unit)?;
            if index.insert(service.key.clone(), position).is_some() {
                return Err(SwitchError::Config(format!(
                    "Duplicate service key '{}'",
                    service.key
                )));
            }
        }

        let descriptors = services
            .iter()
            .map(|service| {
                let exclusive_with = service
                    .exclusive_with
                    .iter()
                    .filter(|other| {
                        if *other == &service.key {
                            tracing::warn!("Service '{}' lists itself as exclusive, ignoring", service.key);
                            false
                        } else if !index.contains_key(other.as_str()) {
                            tracing::warn!(
                                "Service '{}' is exclusive with unknown service '{}', ignoring",
                                service.key,
                                other
                            );
                            false
                        } else {
                            true
                        }
                    })
                    .cloned()
                    .collect();

                ServiceDescriptor {
                    key: service.key.clone(),
                    name: service.name.clone(),
                    unit: service.unit.clone(),
                    route: ProxyRoute::new(service.proxy_config.clone()),
                    port: service.port,
                    exclusive_with,
                }
            })
            .collect();

        Ok(Self {
            services: descriptors,
            index,
        })
    }

    /// Look up a service by key
    pub fn describe(&self, key: &str) -> Result<&ServiceDescriptor, SwitchError> {
        self.index
            .get(key)
            .map(|&position| &self.services[position])
            .ok_or_else(|| SwitchError::ServiceNotFound(key.to_string()))
    }

    /// All services in configuration order
    pub fn all(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Validate unit name format and prevent injection
pub(crate) fn validate_unit_name(unit: &str) -> Result<(), SwitchError> {
    if unit.is_empty() {
        return Err(SwitchError::Config("Unit name cannot be empty".to_string()));
    }

    if unit.contains("..") || unit.contains('\0') || unit.contains('/') || unit.len() > 256 {
        return Err(SwitchError::Config(format!("Invalid unit name format: '{}'", unit)));
    }

    if !unit.ends_with(".service") {
        return Err(SwitchError::Config(format!(
            "Unit name must end with .service: '{}'",
            unit
        )));
    }

    Ok(())
}
