use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Multipart, Path, State},
    routing::{patch, post},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, PaymentProof},
    response::ApiResponse,
    services::order_service::{self, ProofUpload},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{order_code}/payment-proof", post(upload_payment_proof))
        .route("/{id}/status", patch(update_order_status))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[utoipa::path(
    post,
    path = "/api/orders/{order_code}/payment-proof",
    params(
        ("order_code" = String, Path, description = "Human-facing order code")
    ),
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Proof stored, order awaiting verification", body = ApiResponse<PaymentProof>),
        (status = 400, description = "Bad file type, size or missing fields"),
        (status = 403, description = "Email does not match the order"),
        (status = 404, description = "Unknown order code"),
        (status = 422, description = "Order no longer accepts proofs"),
        (status = 429, description = "Too many upload attempts"),
    ),
    tag = "Orders"
)]
pub async fn upload_payment_proof(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(order_code): Path<String>,
    multipart: Multipart,
) -> AppResult<(axum::http::StatusCode, Json<ApiResponse<PaymentProof>>)> {
    // Limiter runs before any store access.
    if let Err(retry_after_secs) = state.upload_limiter.check(addr.ip()) {
        return Err(AppError::TooManyRequests { retry_after_secs });
    }

    let (email, upload) = read_proof_multipart(multipart).await?;
    let resp = order_service::submit_proof(&state, &order_code, &email, upload).await?;
    Ok((axum::http::StatusCode::CREATED, Json(resp)))
}

async fn read_proof_multipart(mut multipart: Multipart) -> AppResult<(String, ProofUpload)> {
    let mut email: Option<String> = None;
    let mut upload: Option<ProofUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("email") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable email field: {e}")))?;
                email = Some(value.trim().to_string());
            }
            Some("file") => {
                let content_type = field
                    .content_type()
                    .map(|ct| ct.to_string())
                    .ok_or_else(|| {
                        AppError::BadRequest("file field is missing a content type".into())
                    })?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable file field: {e}")))?;
                upload = Some(ProofUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            _ => {}
        }
    }

    let email = email.ok_or_else(|| AppError::BadRequest("email field is required".into()))?;
    let upload = upload.ok_or_else(|| AppError::BadRequest("file field is required".into()))?;
    Ok((email, upload))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status value"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed from the current status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
