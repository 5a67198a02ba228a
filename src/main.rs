use hiring_pipeline::{
    config::{get_config, init_config},
    database::{
        pool::{create_pool, run_migrations},
        PgStore,
    },
    routes,
    services::notification_service::{LogDispatcher, NotificationDispatcher, WebhookDispatcher},
    utils::time::SystemClock,
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hiring_pipeline=info,tower_http=info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    init_config()?;
    let config = get_config()?;

    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    info!("Database migrations applied");

    let dispatcher: Arc<dyn NotificationDispatcher> = match &config.notification_webhook_url {
        Some(url) => {
            info!("Delivering pipeline events to {}", url);
            Arc::new(WebhookDispatcher::new(url.clone(), config.webhook_secret.clone())?)
        }
        None => {
            info!("No NOTIFICATION_WEBHOOK_URL set, pipeline events are only logged");
            Arc::new(LogDispatcher)
        }
    };

    let app_state = AppState::new(
        Arc::new(PgStore::new(pool)),
        dispatcher,
        config.pipeline.clone(),
        Arc::new(SystemClock),
        &config.jwt_secret,
    );

    let app = routes::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
