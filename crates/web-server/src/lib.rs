use attachment::AttachmentManager;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use configuration::DatabaseSettings;
use database::DbRepository;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer, ExposeHeaders},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub repo: DbRepository,
    pub attachments: AttachmentManager,
}

/// Builds the application router over an already-constructed state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/devices", get(handlers::list_devices))
        .route("/devices", post(handlers::create_device))
        .route("/devices/:device_id", get(handlers::get_device))
        .route("/devices/:device_id", put(handlers::update_device))
        .route("/devices/:device_id", delete(handlers::delete_device))
        .route("/batteries", get(handlers::list_batteries))
        .route("/batteries", post(handlers::create_battery))
        .route("/batteries/:battery_id", get(handlers::get_battery))
        .route("/batteries/:battery_id", put(handlers::update_battery))
        .route("/batteries/:battery_id", delete(handlers::delete_battery))
        .route(
            "/devices/:device_id/attach/:battery_id",
            post(handlers::attach_battery),
        )
        .route(
            "/devices/:device_id/detach/:battery_id",
            post(handlers::detach_battery),
        )
        .with_state(state)
}

/// The main function to configure and run the web server.
///
/// Builds the pool from the injected settings, applies migrations, wires up
/// the repository and attachment manager, and serves until shutdown.
pub async fn run_server(addr: SocketAddr, db_settings: &DatabaseSettings) -> anyhow::Result<()> {
    let pool = database::connect(&db_settings.pool_settings()).await?;
    database::run_migrations(&pool).await?;
    let repo = DbRepository::new(pool);
    let attachments = AttachmentManager::new(repo.clone());

    let app_state = Arc::new(AppState { repo, attachments });
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any())
        .expose_headers(ExposeHeaders::any());

    let app = router(app_state)
        .layer(cors)
        // This middleware logs information about every incoming request.
        .layer(TraceLayer::new_for_http());

    tracing::info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
