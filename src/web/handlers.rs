use axum::{
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiResponse, AppState, WebError};
use crate::messaging::{Request, Response};
use crate::models::PersistedState;
use crate::notifier::NotificationEvent;
use crate::popup::PopupView;
use crate::storage::load_state;

/// `Path` whose rejections use the API error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(WebError))]
pub struct ApiPath<T>(pub T);

/// `Json` whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(WebError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Serialize, Deserialize)]
pub struct TargetRequest {
    pub price: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IntervalRequest {
    pub minutes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: String,
}

impl StatusBody {
    fn new(status: impl Into<String>) -> Json<ApiResponse<Self>> {
        Json(ApiResponse::success(Self {
            status: status.into(),
        }))
    }
}

pub async fn get_product(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PopupView>>, WebError> {
    match state.popup.refresh().await {
        Ok(view) => Ok(Json(ApiResponse::success(view))),
        Err(e) => {
            tracing::error!("Failed to refresh product view: {}", e);
            Err(WebError::internal("Failed to fetch product data."))
        }
    }
}

pub async fn check_now(State(state): State<AppState>) -> Json<ApiResponse<StatusBody>> {
    StatusBody::new(state.popup.check_now().await)
}

pub async fn get_state(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PersistedState>>, WebError> {
    match load_state(state.store.as_ref()).await {
        Ok(persisted) => Ok(Json(ApiResponse::success(persisted))),
        Err(e) => {
            tracing::error!("Failed to load state: {}", e);
            Err(WebError::internal("Failed to load stored state"))
        }
    }
}

pub async fn set_target(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TargetRequest>,
) -> Result<Json<ApiResponse<StatusBody>>, WebError> {
    match state.popup.save_target(&request.price).await {
        Ok(Some(status)) => Ok(StatusBody::new(status)),
        Ok(None) => Err(WebError::bad_request("Target price is required")),
        Err(e) => {
            tracing::error!("Failed to save target price: {}", e);
            Err(WebError::internal("Failed to save target price"))
        }
    }
}

pub async fn set_interval(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IntervalRequest>,
) -> Result<Json<ApiResponse<StatusBody>>, WebError> {
    let reply = state
        .bus
        .send(Request::SetCheckInterval {
            minutes: request.minutes,
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to reach watcher service: {}", e);
            WebError::unavailable("Watcher service is not running")
        })?;

    match reply {
        Response::Status(status) => Ok(StatusBody::new(status)),
        Response::Error(message) => Err(WebError::bad_request(message)),
        other => {
            tracing::error!("Unexpected response to interval change: {:?}", other);
            Err(WebError::internal("Unexpected response from watcher service"))
        }
    }
}

pub async fn notification_clicked(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, WebError> {
    forward_event(&state, NotificationEvent::Clicked { id }).await
}

pub async fn notification_button_clicked(
    State(state): State<AppState>,
    ApiPath((id, button_index)): ApiPath<(Uuid, usize)>,
) -> Result<StatusCode, WebError> {
    forward_event(&state, NotificationEvent::ButtonClicked { id, button_index }).await
}

async fn forward_event(state: &AppState, event: NotificationEvent) -> Result<StatusCode, WebError> {
    state.events.send(event).await.map_err(|e| {
        tracing::error!("Notification event dropped: {:?}", e.0);
        WebError::unavailable("Watcher service is not running")
    })?;
    Ok(StatusCode::ACCEPTED)
}
