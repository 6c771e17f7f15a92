use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{DatabaseSettings, ServerSettings, Settings};

/// Loads the application configuration.
///
/// This function is the primary entry point for this crate. It reads the
/// optional `config.toml` file, layers `BATTMON_*` environment variables on
/// top (e.g. `BATTMON_SERVER__PORT=9000`), and deserializes the result into
/// our strongly-typed `Settings` struct. Every field has a sensible default,
/// so a missing file is not an error.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config.toml").required(false))
        .add_source(
            config::Environment::with_prefix("BATTMON")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;

    if settings.database.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "database.max_connections must be at least 1".to_string(),
        ));
    }

    tracing::debug!(
        path = %settings.database.path.display(),
        port = settings.server.port,
        "configuration loaded"
    );
    Ok(settings)
}
