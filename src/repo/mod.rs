pub mod devices;

pub use devices::{DeviceRegistry, RegistryError, SessionId};
