use axum::{
    Json, Router,
    extract::{Path, State},
    routing::patch,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, PaymentProof},
    response::ApiResponse,
    services::proof_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", patch(review_payment_proof))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewProofRequest {
    /// APPROVED or REJECTED; review is one-way.
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProofReview {
    pub proof: PaymentProof,
    pub order: Order,
}

#[utoipa::path(
    patch,
    path = "/api/payment-proofs/{id}",
    params(
        ("id" = Uuid, Path, description = "Payment proof ID")
    ),
    request_body = ReviewProofRequest,
    responses(
        (status = 200, description = "Proof reviewed; order moved accordingly", body = ApiResponse<ProofReview>),
        (status = 400, description = "Status is not APPROVED or REJECTED"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Proof was already reviewed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payment Proofs"
)]
pub async fn review_payment_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewProofRequest>,
) -> AppResult<Json<ApiResponse<ProofReview>>> {
    let resp = proof_service::review_proof(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
