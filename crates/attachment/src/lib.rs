//! # Battmon Attachment Crate
//!
//! The business rules governing which battery may live in which device:
//!
//! - a battery is installed in at most one device at a time,
//! - a device holds at most [`core_types::DEVICE_BATTERY_CAPACITY`]
//!   batteries at any instant,
//! - both rules hold under concurrent requests.
//!
//! Each `attach`/`detach` call is self-contained: all shared mutable state
//! lives in the record store, and every check-then-set runs inside a single
//! write transaction so two racing callers can never both slip past the
//! capacity or exclusivity checks.

pub mod error;
pub mod manager;

pub use error::AttachError;
pub use manager::AttachmentManager;
