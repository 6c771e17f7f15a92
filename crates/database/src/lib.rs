//! # Battmon Database Crate
//!
//! This crate is the record store: a high-level, application-specific
//! interface to the SQLite database holding `devices` and `batteries`.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** Encapsulates all SQL and driver details behind a clean API.
//!   Callers never see `sqlx` errors, only the [`DbError`] taxonomy.
//! - **No ambient globals:** The connection pool is constructed explicitly
//!   from [`PoolSettings`] and injected wherever it is needed.
//! - **Asynchronous & Pooled:** All operations are asynchronous and run over
//!   a bounded connection pool with bounded acquire and busy timeouts, so no
//!   store operation can hang indefinitely.
//! - **No business rules:** Attachment policy (capacity, exclusivity) lives
//!   in the `attachment` crate; this crate only supplies atomic CRUD and the
//!   transaction primitives that policy is built on.
//!
//! ## Public API
//!
//! - `connect`: builds the connection pool.
//! - `run_migrations`: applies the embedded schema migrations.
//! - `DbRepository`: all data access methods.
//! - `DbError`: the error taxonomy returned by this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations, PoolSettings};
pub use error::DbError;
pub use repository::DbRepository;
