use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::{
    api::{error::ApiError, response::ApiResponse, session},
    controller::AppState,
    domain::{CalculationResult, ElectroDevice},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/devices", get(list_devices))
        .route("/calculate", post(calculate))
}

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    devices: Vec<ElectroDevice>,
    total: usize,
}

/// GET /api/v1/devices - devices stored in the caller's session
pub async fn list_devices(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResponse<DeviceListResponse> {
    let devices = session::current(&jar)
        .map(|s| state.registry.snapshot(s))
        .unwrap_or_default();
    let total = devices.len();

    ApiResponse::success(DeviceListResponse { devices, total }).with_count(total)
}

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub devices: Vec<ElectroDevice>,
}

/// POST /api/v1/calculate - calculate an ad-hoc device group without storing it
pub async fn calculate(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<CalculateRequest>, ApiError>,
) -> Result<ApiResponse<CalculationResult>, ApiError> {
    let start = Instant::now();

    let devices = request
        .devices
        .into_iter()
        .enumerate()
        .map(|(i, device)| {
            device
                .validated()
                .map_err(|e| ApiError::ValidationError(format!("devices[{}]: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let result = state.calculator.calculate(&devices)?;
    let count = result.devices.len();

    Ok(ApiResponse::success(result)
        .with_count(count)
        .with_duration(start.elapsed().as_millis() as u64))
}
