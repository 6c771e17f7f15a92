use database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttachError {
    #[error("Device {0} not found")]
    DeviceNotFound(i64),

    #[error("Battery {0} not found")]
    BatteryNotFound(i64),

    /// The battery is already attached to a device (possibly this one).
    #[error("Battery {battery_id} is already attached to device {device_id}")]
    AlreadyAttached { battery_id: i64, device_id: i64 },

    /// The device is full: attaching one more battery would exceed the cap.
    #[error("Device {device_id} is full: it already holds {capacity} batteries")]
    DeviceFull { device_id: i64, capacity: i64 },

    /// Detach was asked for a pairing that does not exist.
    #[error("Battery {battery_id} is not attached to device {device_id}")]
    NotAttached { battery_id: i64, device_id: i64 },

    #[error(transparent)]
    Db(#[from] DbError),
}

impl AttachError {
    /// Business-rule rejections, as opposed to missing records or store
    /// failures. The outer request layer maps these to a client error.
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            AttachError::AlreadyAttached { .. }
                | AttachError::DeviceFull { .. }
                | AttachError::NotAttached { .. }
        )
    }
}
