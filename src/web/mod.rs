use axum::{
    Router,
    response::Json,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::ServerConfig;
use crate::messaging::MessageBus;
use crate::notifier::NotificationEvent;
use crate::popup::Popup;
use crate::storage::KeyValueStore;

pub mod handlers;
pub mod responses;

pub use handlers::{
    check_now, get_product, get_state, notification_button_clicked, notification_clicked,
    set_interval, set_target,
};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub popup: Arc<Popup>,
    pub bus: MessageBus,
    pub store: Arc<dyn KeyValueStore>,
    pub events: mpsc::Sender<NotificationEvent>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Popup equivalents
        .route("/product", get(get_product))
        .route("/check", post(check_now))
        .route("/state", get(get_state))
        .route("/target", put(set_target))
        .route("/interval", put(set_interval))
        // Notification click-through
        .route("/notifications/:id/click", post(notification_clicked))
        .route(
            "/notifications/:id/buttons/:index",
            post(notification_button_clicked),
        )
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "price-watcher"
    }))
}

pub async fn serve<F>(config: &ServerConfig, state: AppState, shutdown: F) -> crate::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server starting on {}:{}", config.host, config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
