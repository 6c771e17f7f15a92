use crate::{error::AppError, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use core_types::{Battery, BatteryUpdate, Device, DeviceUpdate, NewBattery, NewDevice};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// A device together with its derived battery list. The list is computed
/// per request by querying `batteries.device_id`; nothing is cached.
#[derive(Debug, Serialize)]
pub struct DeviceResponse {
    #[serde(flatten)]
    pub device: Device,
    pub batteries: Vec<Battery>,
}

// ==============================================================================
// Devices
// ==============================================================================

/// # GET /devices
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeviceResponse>>, AppError> {
    let devices = state.repo.list_devices().await?;
    let batteries = state.repo.list_batteries().await?;

    let mut by_device: HashMap<i64, Vec<Battery>> = HashMap::new();
    for battery in batteries {
        if let Some(device_id) = battery.device_id {
            by_device.entry(device_id).or_default().push(battery);
        }
    }

    let response = devices
        .into_iter()
        .map(|device| {
            let batteries = by_device.remove(&device.id).unwrap_or_default();
            DeviceResponse { device, batteries }
        })
        .collect();
    Ok(Json(response))
}

/// # POST /devices
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewDevice>,
) -> Result<(StatusCode, Json<DeviceResponse>), AppError> {
    payload.validate()?;
    let device = state.repo.create_device(&payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(DeviceResponse {
            device,
            batteries: Vec::new(),
        }),
    ))
}

/// # GET /devices/:device_id
pub async fn get_device(
    Path(device_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DeviceResponse>, AppError> {
    let device = state
        .repo
        .get_device(device_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Device not found".to_string()))?;
    let batteries = state.repo.batteries_for_device(device_id).await?;
    Ok(Json(DeviceResponse { device, batteries }))
}

/// # PUT /devices/:device_id
pub async fn update_device(
    Path(device_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DeviceUpdate>,
) -> Result<Json<DeviceResponse>, AppError> {
    payload.validate()?;
    let device = state
        .repo
        .update_device(device_id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Device not found".to_string()))?;
    let batteries = state.repo.batteries_for_device(device_id).await?;
    Ok(Json(DeviceResponse { device, batteries }))
}

/// # DELETE /devices/:device_id
///
/// Installed batteries survive the delete, unattached.
pub async fn delete_device(
    Path(device_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    if !state.repo.delete_device(device_id).await? {
        return Err(AppError::NotFound("Device not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// Batteries
// ==============================================================================

/// # GET /batteries
pub async fn list_batteries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Battery>>, AppError> {
    let batteries = state.repo.list_batteries().await?;
    Ok(Json(batteries))
}

/// # POST /batteries
pub async fn create_battery(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewBattery>,
) -> Result<(StatusCode, Json<Battery>), AppError> {
    payload.validate()?;
    let battery = state.repo.create_battery(&payload).await?;
    Ok((StatusCode::CREATED, Json(battery)))
}

/// # GET /batteries/:battery_id
pub async fn get_battery(
    Path(battery_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Battery>, AppError> {
    let battery = state
        .repo
        .get_battery(battery_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Battery not found".to_string()))?;
    Ok(Json(battery))
}

/// # PUT /batteries/:battery_id
pub async fn update_battery(
    Path(battery_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BatteryUpdate>,
) -> Result<Json<Battery>, AppError> {
    payload.validate()?;
    let battery = state
        .repo
        .update_battery(battery_id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Battery not found".to_string()))?;
    Ok(Json(battery))
}

/// # DELETE /batteries/:battery_id
pub async fn delete_battery(
    Path(battery_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, AppError> {
    if !state.repo.delete_battery(battery_id).await? {
        return Err(AppError::NotFound("Battery not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// Attachment
// ==============================================================================

/// # POST /devices/:device_id/attach/:battery_id
pub async fn attach_battery(
    Path((device_id, battery_id)): Path<(i64, i64)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Battery>, AppError> {
    let battery = state.attachments.attach(device_id, battery_id).await?;
    Ok(Json(battery))
}

/// # POST /devices/:device_id/detach/:battery_id
pub async fn detach_battery(
    Path((device_id, battery_id)): Path<(i64, i64)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Battery>, AppError> {
    let battery = state.attachments.detach(device_id, battery_id).await?;
    Ok(Json(battery))
}
