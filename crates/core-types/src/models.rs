use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The maximum number of batteries that may be installed in a single device
/// at any instant. Enforced transactionally by the attachment layer and by
/// the repository for direct battery writes that carry a `device_id`.
pub const DEVICE_BATTERY_CAPACITY: i64 = 5;

/// A physical device capable of holding up to [`DEVICE_BATTERY_CAPACITY`]
/// batteries. The set of installed batteries is never stored on the device
/// row; it is always derived by querying `batteries.device_id`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    /// Unique across all devices.
    pub name: String,
    pub firmware_version: String,
    pub is_on: bool,
}

/// A battery, optionally installed in exactly one device. `device_id` is the
/// single source of truth for attachment.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Battery {
    pub id: i64,
    pub name: String,
    pub nominal_voltage: f64,
    pub remaining_capacity: f64,
    pub service_life: i64,
    pub device_id: Option<i64>,
}

/// Fields for creating a new device. `is_on` defaults to true when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    pub name: String,
    pub firmware_version: String,
    #[serde(default = "default_is_on")]
    pub is_on: bool,
}

fn default_is_on() -> bool {
    true
}

impl NewDevice {
    /// Validates field-level constraints before the record reaches the store.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "name".to_string(),
                "must not be empty".to_string(),
            ));
        }
        if self.firmware_version.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "firmware_version".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial update for a device. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceUpdate {
    pub firmware_version: Option<String>,
    pub is_on: Option<bool>,
}

impl DeviceUpdate {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(fw) = &self.firmware_version {
            if fw.trim().is_empty() {
                return Err(CoreError::InvalidInput(
                    "firmware_version".to_string(),
                    "must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Fields for creating a new battery. A non-null `device_id` installs the
/// battery immediately; the store enforces both the foreign key and the
/// device capacity cap for that path.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBattery {
    pub name: String,
    pub nominal_voltage: f64,
    pub remaining_capacity: f64,
    pub service_life: i64,
    #[serde(default)]
    pub device_id: Option<i64>,
}

impl NewBattery {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "name".to_string(),
                "must not be empty".to_string(),
            ));
        }
        validate_battery_numbers(
            Some(self.nominal_voltage),
            Some(self.remaining_capacity),
            Some(self.service_life),
        )
    }
}

/// Partial update for a battery. `None` fields are left unchanged; in
/// particular `device_id: None` does *not* detach the battery — detaching is
/// the attachment layer's explicit operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatteryUpdate {
    pub name: Option<String>,
    pub nominal_voltage: Option<f64>,
    pub remaining_capacity: Option<f64>,
    pub service_life: Option<i64>,
    pub device_id: Option<i64>,
}

impl BatteryUpdate {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(CoreError::InvalidInput(
                    "name".to_string(),
                    "must not be empty".to_string(),
                ));
            }
        }
        validate_battery_numbers(
            self.nominal_voltage,
            self.remaining_capacity,
            self.service_life,
        )
    }
}

fn validate_battery_numbers(
    nominal_voltage: Option<f64>,
    remaining_capacity: Option<f64>,
    service_life: Option<i64>,
) -> Result<(), CoreError> {
    if let Some(v) = nominal_voltage {
        if !(v > 0.0) {
            return Err(CoreError::InvalidInput(
                "nominal_voltage".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
    }
    if let Some(c) = remaining_capacity {
        if !(c >= 0.0) {
            return Err(CoreError::InvalidInput(
                "remaining_capacity".to_string(),
                "must not be negative".to_string(),
            ));
        }
    }
    if let Some(l) = service_life {
        if l < 0 {
            return Err(CoreError::InvalidInput(
                "service_life".to_string(),
                "must not be negative".to_string(),
            ));
        }
    }
    Ok(())
}
