use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::{
    api::{page::Page, session},
    controller::AppState,
    domain::{DeviceField, ElectroDevice, FieldError, FieldErrorKind, FieldErrors},
};

/// Raw fields of the device form. Everything arrives as text and is checked
/// in [`DeviceForm::parse_device`].
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceForm {
    pub name: Option<String>,
    pub efficiency: Option<String>,
    pub power_factor: Option<String>,
    pub voltage: Option<String>,
    pub devices_count: Option<String>,
    pub power: Option<String>,
    pub utilization_factor: Option<String>,
    pub reactive_power_factor: Option<String>,
    pub calculate: Option<String>,
}

impl DeviceForm {
    /// Any non-empty `calculate` value asks for a calculation.
    pub fn calculate_requested(&self) -> bool {
        self.calculate.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub fn value(&self, field: DeviceField) -> Option<&str> {
        match field {
            DeviceField::Name => self.name.as_deref(),
            DeviceField::Efficiency => self.efficiency.as_deref(),
            DeviceField::PowerFactor => self.power_factor.as_deref(),
            DeviceField::Voltage => self.voltage.as_deref(),
            DeviceField::DevicesCount => self.devices_count.as_deref(),
            DeviceField::Power => self.power.as_deref(),
            DeviceField::UtilizationFactor => self.utilization_factor.as_deref(),
            DeviceField::ReactivePowerFactor => self.reactive_power_factor.as_deref(),
        }
    }

    /// Parse and range-check every field, collecting all failures.
    pub fn parse_device(&self) -> Result<ElectroDevice, FieldErrors> {
        let mut errors = Vec::new();

        let name: Option<String> = self.parse(DeviceField::Name, &mut errors);
        let efficiency = self.parse_real(DeviceField::Efficiency, &mut errors);
        let power_factor = self.parse_real(DeviceField::PowerFactor, &mut errors);
        let voltage = self.parse_real(DeviceField::Voltage, &mut errors);
        let devices_count: Option<u32> = self.parse(DeviceField::DevicesCount, &mut errors);
        let power: Option<u32> = self.parse(DeviceField::Power, &mut errors);
        let utilization_factor = self.parse_real(DeviceField::UtilizationFactor, &mut errors);
        let reactive_power_factor = self.parse_real(DeviceField::ReactivePowerFactor, &mut errors);

        match (
            name,
            efficiency,
            power_factor,
            voltage,
            devices_count,
            power,
            utilization_factor,
            reactive_power_factor,
        ) {
            (Some(name), Some(eta), Some(cos), Some(u), Some(n), Some(pn), Some(kv), Some(tg))
                if errors.is_empty() =>
            {
                ElectroDevice::new(name, eta, cos, u, n, pn, kv, tg).validated()
            }
            _ => Err(FieldErrors(errors)),
        }
    }

    fn parse<T: FromStr>(&self, field: DeviceField, errors: &mut Vec<FieldError>) -> Option<T> {
        let Some(raw) = self.value(field).map(str::trim).filter(|v| !v.is_empty()) else {
            errors.push(FieldError::new(field, FieldErrorKind::Missing));
            return None;
        };
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                errors.push(FieldError::new(
                    field,
                    FieldErrorKind::InvalidNumber {
                        value: raw.to_string(),
                    },
                ));
                None
            }
        }
    }

    /// Like `parse`, but `NaN` and infinities count as invalid numbers.
    fn parse_real(&self, field: DeviceField, errors: &mut Vec<FieldError>) -> Option<f64> {
        let value: f64 = self.parse(field, errors)?;
        if value.is_finite() {
            return Some(value);
        }
        errors.push(FieldError::new(
            field,
            FieldErrorKind::InvalidNumber {
                value: value.to_string(),
            },
        ));
        None
    }
}

/// GET / - the bare device form
pub async fn index() -> Html<String> {
    Html(Page::default().to_string())
}

/// POST / - store the submitted device and optionally calculate the session's load
pub async fn submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<DeviceForm>,
) -> Response {
    let device = match form.parse_device() {
        Ok(device) => device,
        Err(errors) => {
            debug!(%errors, "device submission rejected");
            let page = Page {
                form: Some(&form),
                errors: Some(&errors),
                ..Default::default()
            };
            return (StatusCode::UNPROCESSABLE_ENTITY, Html(page.to_string())).into_response();
        }
    };

    let (session, jar) = session::resolve(jar, &state.registry);
    let name = device.name.clone();

    let stored = match state.registry.append(session, device) {
        Ok(stored) => stored,
        Err(e) => {
            let page = Page {
                form: Some(&form),
                notice: Some(e.to_string()),
                stored: Some(state.registry.len(session)),
                ..Default::default()
            };
            return (StatusCode::CONFLICT, jar, Html(page.to_string())).into_response();
        }
    };
    info!(%session, device = %name, stored, "device stored");

    if !form.calculate_requested() {
        let page = Page {
            stored: Some(stored),
            ..Default::default()
        };
        return (jar, Html(page.to_string())).into_response();
    }

    let devices = state.registry.snapshot(session);
    match state.calculator.calculate(&devices) {
        Ok(result) => {
            info!(
                %session,
                devices = result.devices.len(),
                active_load = result.group.active_load,
                full_power = result.group.full_power,
                "load calculated"
            );
            let page = Page {
                stored: Some(stored),
                result: Some(&result),
                ..Default::default()
            };
            (jar, Html(page.to_string())).into_response()
        }
        Err(e) => {
            warn!(%session, error = %e, "load calculation failed");
            let page = Page {
                notice: Some(e.to_string()),
                stored: Some(stored),
                ..Default::default()
            };
            (StatusCode::UNPROCESSABLE_ENTITY, jar, Html(page.to_string())).into_response()
        }
    }
}
