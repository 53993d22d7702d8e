use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::domain::LoadCalculator;
use crate::repo::DeviceRegistry;

/// Everything a request handler needs, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub calculator: Arc<LoadCalculator>,
    pub registry: Arc<DeviceRegistry>,
}

impl AppState {
    pub fn new(cfg: &Config) -> Self {
        let calculator = LoadCalculator {
            active_power_coefficient: cfg.calculator.active_power_coefficient,
            reactive_power_coefficient: cfg.calculator.reactive_power_coefficient,
            workshop: cfg.calculator.workshop,
        };
        let registry = DeviceRegistry::new(
            cfg.registry.max_devices_per_session,
            cfg.registry.max_sessions,
        );

        info!(
            active_power_coefficient = calculator.active_power_coefficient,
            reactive_power_coefficient = calculator.reactive_power_coefficient,
            max_devices_per_session = registry.max_devices_per_session(),
            max_sessions = registry.max_sessions(),
            "application state initialised"
        );

        Self {
            calculator: Arc::new(calculator),
            registry: Arc::new(registry),
        }
    }
}
