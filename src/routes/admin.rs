use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, put},
};
use futures_core::Stream;
use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::Notification,
    notify::{StreamEvent, StreamMessage},
    response::ApiResponse,
    routes::params::Pagination,
    services::notification_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(list_notifications).put(mark_all_notifications_read),
        )
        .route("/notifications/stream", get(notification_stream))
        .route(
            "/notifications/{id}",
            put(mark_notification_read).delete(delete_notification),
        )
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub items: Vec<Notification>,
    pub unread_count: i64,
}

#[utoipa::path(
    get,
    path = "/api/admin/notifications",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Recent notifications with unread count", body = ApiResponse<NotificationList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<NotificationList>>> {
    let resp = notification_service::list(&state, &user, pagination).await?;
    Ok(Json(resp))
}

/// Long-lived server-push stream for the admin notification feed.
///
/// The subscription is registered before the snapshot query so that a
/// notification published in between is not lost; it may then arrive twice
/// (snapshot and live), which the at-least-once contract allows.
#[utoipa::path(
    get,
    path = "/api/admin/notifications/stream",
    responses(
        (status = 200, description = "SSE stream of init/notification/unreadCount envelopes"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn notification_stream(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    ensure_admin(&user)?;

    let mut rx = state.notifier.subscribe();
    let (notifications, unread_count) = notification_service::snapshot(&state.orm).await?;

    let stream = async_stream::stream! {
        let init = StreamMessage::Init {
            notifications,
            unread_count,
        };
        yield Ok(init.to_sse_event());

        loop {
            match rx.recv().await {
                Ok(event) => {
                    yield Ok(StreamMessage::from(event).to_sse_event());
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // The dropped pushes still exist as rows; the client
                    // recovers them from its next snapshot.
                    tracing::debug!(missed, "stream subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[utoipa::path(
    put,
    path = "/api/admin/notifications/{id}",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked as read (idempotent)", body = ApiResponse<Notification>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let resp = notification_service::mark_read(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/notifications",
    responses(
        (status = 200, description = "All notifications marked as read", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = notification_service::mark_all_read(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/notifications/{id}",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = notification_service::delete(&state, &user, id).await?;
    Ok(Json(resp))
}
