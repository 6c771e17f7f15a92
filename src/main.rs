use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// The main entry point for the battmon registry service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Local overrides (e.g. BATTMON_DATABASE__PATH) may live in a .env file.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let settings = configuration::load_config()?;

    match cli.command {
        Commands::Serve(args) => {
            let mut addr = settings.server.socket_addr();
            if let Some(port) = args.port {
                addr.set_port(port);
            }
            web_server::run_server(addr, &settings.database).await
        }
        Commands::Migrate => {
            let pool = database::connect(&settings.database.pool_settings()).await?;
            database::run_migrations(&pool).await?;
            tracing::info!(path = %settings.database.path.display(), "database is up to date");
            Ok(())
        }
    }
}

/// A small registry backend tracking devices and the batteries installed in them.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server.
    Serve(ServeArgs),
    /// Create or update the database schema, then exit.
    Migrate,
}

#[derive(Parser)]
struct ServeArgs {
    /// Override the configured listen port.
    #[arg(long)]
    port: Option<u16>,
}
