use anyhow::{ensure, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::domain::{
    WorkshopReference, DEFAULT_ACTIVE_POWER_COEFFICIENT, DEFAULT_REACTIVE_POWER_COEFFICIENT,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub calculator: CalculatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            enable_cors: false,
            cors_origin: "http://localhost:3000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub max_devices_per_session: usize,
    /// Sessions kept before the least recently used one is evicted
    pub max_sessions: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_devices_per_session: 500,
            max_sessions: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub active_power_coefficient: f64,
    pub reactive_power_coefficient: f64,
    pub workshop: WorkshopReference,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            active_power_coefficient: DEFAULT_ACTIVE_POWER_COEFFICIENT,
            reactive_power_coefficient: DEFAULT_REACTIVE_POWER_COEFFICIENT,
            workshop: WorkshopReference::default(),
        }
    }
}

impl Config {
    /// Built-in defaults, then `config/default.toml`, then `LOADCALC__*` env vars.
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Self::defaults()
                .merge(Toml::file("config/default.toml"))
                .merge(Env::prefixed("LOADCALC__").split("__")),
        )
    }

    pub fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let cfg: Self = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.registry.max_devices_per_session >= 1,
            "registry.max_devices_per_session must be at least 1"
        );
        ensure!(
            self.registry.max_sessions >= 1,
            "registry.max_sessions must be at least 1"
        );
        ensure!(
            self.server.request_timeout_secs >= 1,
            "server.request_timeout_secs must be at least 1"
        );
        Ok(())
    }
}
