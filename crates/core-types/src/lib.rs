pub mod error;
pub mod models;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use models::{
    Battery, BatteryUpdate, Device, DeviceUpdate, NewBattery, NewDevice, DEVICE_BATTERY_CAPACITY,
};
