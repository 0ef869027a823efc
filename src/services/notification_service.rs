use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    entity::notifications::{
        ActiveModel as NotificationActive, Column as NotificationCol, Entity as Notifications,
        Model as NotificationModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Notification,
    notify::StreamEvent,
    response::{ApiResponse, Meta},
    routes::admin::NotificationList,
    routes::params::Pagination,
    state::AppState,
};

/// How many recent notifications a new stream subscriber receives.
pub const SNAPSHOT_SIZE: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    NewOrder,
    PaymentProofUploaded,
    OrderStatusChanged,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "NEW_ORDER",
            NotificationKind::PaymentProofUploaded => "PAYMENT_PROOF_UPLOADED",
            NotificationKind::OrderStatusChanged => "ORDER_STATUS_CHANGED",
        }
    }
}

pub async fn unread_count<C: ConnectionTrait>(conn: &C) -> AppResult<i64> {
    let count = Notifications::find()
        .filter(NotificationCol::IsRead.eq(false))
        .count(conn)
        .await?;
    Ok(count as i64)
}

/// Point-in-time view handed to a stream subscriber before live events.
pub async fn snapshot<C: ConnectionTrait>(conn: &C) -> AppResult<(Vec<Notification>, i64)> {
    let items = Notifications::find()
        .order_by_desc(NotificationCol::CreatedAt)
        .limit(SNAPSHOT_SIZE)
        .all(conn)
        .await?
        .into_iter()
        .map(notification_from_entity)
        .collect();
    let unread = unread_count(conn).await?;
    Ok((items, unread))
}

/// Persist a notification and fan it out to live subscribers. The row is
/// committed before anything is published; the stream is a delivery
/// accelerant, not the source of truth.
pub async fn create_and_publish(
    state: &AppState,
    kind: NotificationKind,
    title: &str,
    message: &str,
    order_id: Option<Uuid>,
) -> AppResult<Notification> {
    let row = NotificationActive {
        id: Set(Uuid::new_v4()),
        kind: Set(kind.as_str().to_string()),
        title: Set(title.to_string()),
        message: Set(message.to_string()),
        order_id: Set(order_id),
        is_read: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let notification = notification_from_entity(row);
    let unread = unread_count(&state.orm).await?;
    state
        .notifier
        .publish(StreamEvent::Notification(notification.clone()));
    state.notifier.publish(StreamEvent::UnreadCount(unread));
    Ok(notification)
}

pub async fn list(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<NotificationList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Notifications::find().order_by_desc(NotificationCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(notification_from_entity)
        .collect();
    let unread = unread_count(&state.orm).await?;

    let meta = Meta::paged(page, limit, total);
    Ok(ApiResponse::success(
        "Notifications",
        NotificationList {
            items,
            unread_count: unread,
        },
        Some(meta),
    ))
}

/// Mark one notification read. `is_read` is monotonic: marking an
/// already-read notification again is a no-op, not an error.
pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    ensure_admin(user)?;
    let existing = Notifications::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(n) => n,
        None => return Err(AppError::NotFound),
    };

    let updated = if existing.is_read {
        existing
    } else {
        let mut active: NotificationActive = existing.into();
        active.is_read = Set(true);
        active.update(&state.orm).await?
    };

    publish_unread_count(state).await?;
    Ok(ApiResponse::success(
        "Notification marked as read",
        notification_from_entity(updated),
        Some(Meta::empty()),
    ))
}

pub async fn mark_all_read(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Notifications::update_many()
        .col_expr(NotificationCol::IsRead, Expr::value(true))
        .filter(NotificationCol::IsRead.eq(false))
        .exec(&state.orm)
        .await?;

    state.notifier.publish(StreamEvent::UnreadCount(0));
    Ok(ApiResponse::success(
        "All notifications marked as read",
        serde_json::json!({ "updated": result.rows_affected }),
        Some(Meta::empty()),
    ))
}

pub async fn delete(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Notifications::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    publish_unread_count(state).await?;
    Ok(ApiResponse::success(
        "Notification deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

async fn publish_unread_count(state: &AppState) -> AppResult<()> {
    let unread = unread_count(&state.orm).await?;
    state.notifier.publish(StreamEvent::UnreadCount(unread));
    Ok(())
}

pub(crate) fn notification_from_entity(model: NotificationModel) -> Notification {
    Notification {
        id: model.id,
        kind: model.kind,
        title: model.title,
        message: model.message,
        order_id: model.order_id,
        is_read: model.is_read,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
