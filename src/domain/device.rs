use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// An electrical load unit (motor, heater, welding set...) as submitted by the user.
///
/// `multiplication` and `calculated_current` are derived and stay zero until
/// the device has passed through [`crate::domain::LoadCalculator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ElectroDevice {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    /// Nominal efficiency (eta)
    #[validate(range(exclusive_min = 0.0, max = 1.0, message = "must be greater than 0 and at most 1"))]
    pub efficiency: f64,
    /// cos(phi)
    #[validate(range(exclusive_min = 0.0, max = 1.0, message = "must be greater than 0 and at most 1"))]
    pub power_factor: f64,
    #[validate(range(exclusive_min = 0.0, message = "must be greater than 0"))]
    pub voltage: f64,
    /// Kv
    #[validate(range(min = 0.0, max = 1.0, message = "must be between 0 and 1"))]
    pub utilization_factor: f64,
    /// tg(phi)
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub reactive_power_factor: f64,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub devices_count: u32,
    /// Rated power of a single unit
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub power: u32,
    #[serde(default)]
    pub multiplication: u64,
    #[serde(default)]
    pub calculated_current: f64,
}

impl ElectroDevice {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        efficiency: f64,
        power_factor: f64,
        voltage: f64,
        devices_count: u32,
        power: u32,
        utilization_factor: f64,
        reactive_power_factor: f64,
    ) -> Self {
        Self {
            name: name.into(),
            efficiency,
            power_factor,
            voltage,
            utilization_factor,
            reactive_power_factor,
            devices_count,
            power,
            multiplication: 0,
            calculated_current: 0.0,
        }
    }

    /// Installed power of the whole group: n * Pn
    pub fn installed_power(&self) -> u64 {
        u64::from(self.power) * u64::from(self.devices_count)
    }

    /// Rated current: n * Pn / (sqrt(3) * U * cos(phi) * eta)
    ///
    /// Zero voltage, power factor or efficiency yields an infinite or NaN current.
    pub fn rated_current(&self) -> f64 {
        self.installed_power() as f64
            / (3.0_f64.sqrt() * self.voltage * self.power_factor * self.efficiency)
    }

    /// Returns the device with `multiplication` and `calculated_current` filled in.
    pub fn with_derived(mut self) -> Self {
        self.multiplication = self.installed_power();
        self.calculated_current = self.rated_current();
        self
    }

    /// Checks every field against its physical range, reporting all offenders.
    pub fn validated(self) -> Result<Self, FieldErrors> {
        match self.validate() {
            Ok(()) => Ok(self),
            Err(errors) => Err(errors.into()),
        }
    }
}

/// Input fields of a device, named as they appear on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, Serialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum DeviceField {
    Name,
    Efficiency,
    PowerFactor,
    Voltage,
    DevicesCount,
    Power,
    UtilizationFactor,
    ReactivePowerFactor,
}

impl DeviceField {
    /// Human readable label used on the form
    pub fn label(&self) -> &'static str {
        match self {
            DeviceField::Name => "Name",
            DeviceField::Efficiency => "Efficiency (η)",
            DeviceField::PowerFactor => "Power factor (cos φ)",
            DeviceField::Voltage => "Voltage (U)",
            DeviceField::DevicesCount => "Number of devices (n)",
            DeviceField::Power => "Rated power (Pn)",
            DeviceField::UtilizationFactor => "Utilization factor (Kv)",
            DeviceField::ReactivePowerFactor => "Reactive power factor (tg φ)",
        }
    }

    /// Maps a struct attribute name (as reported by `validator`) back to the field.
    fn from_attr(attr: &str) -> Option<Self> {
        Some(match attr {
            "name" => DeviceField::Name,
            "efficiency" => DeviceField::Efficiency,
            "power_factor" => DeviceField::PowerFactor,
            "voltage" => DeviceField::Voltage,
            "devices_count" => DeviceField::DevicesCount,
            "power" => DeviceField::Power,
            "utilization_factor" => DeviceField::UtilizationFactor,
            "reactive_power_factor" => DeviceField::ReactivePowerFactor,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldErrorKind {
    #[error("is required")]
    Missing,

    #[error("`{value}` is not a valid number")]
    InvalidNumber { value: String },

    #[error("{0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} {kind}")]
pub struct FieldError {
    pub field: DeviceField,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn new(field: DeviceField, kind: FieldErrorKind) -> Self {
        Self { field, kind }
    }
}

/// Every problem found in one submission, ordered by field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn contains(&self, field: DeviceField) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .filter_map(|(attr, errs)| {
                let field = DeviceField::from_attr(&attr)?;
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is out of range".to_string());
                Some(FieldError::new(field, FieldErrorKind::OutOfRange(message)))
            })
            .collect();
        out.sort_by_key(|e| e.field);
        FieldErrors(out)
    }
}
