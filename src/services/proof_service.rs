use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::{AuditAction, log_audit},
    dispatch::{OrderEvent, OrderFacts},
    domain::{OrderStatus, ProofStatus, ReviewDecision},
    entity::orders::{ActiveModel as OrderActive, Entity as Orders},
    entity::payment_proofs::{
        ActiveModel as ProofActive, Entity as PaymentProofs, Model as ProofModel,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::PaymentProof,
    response::{ApiResponse, Meta},
    routes::proofs::{ProofReview, ReviewProofRequest},
    services::order_service::{order_from_entity, parse_stored_status},
    state::AppState,
};

/// Admin accepts or rejects a pending payment proof.
///
/// The PENDING precondition check, the proof verdict and the order status
/// move commit in one transaction: two racing reviews cannot both succeed,
/// and a reader never sees an APPROVED proof against an unpaid order.
pub async fn review_proof(
    state: &AppState,
    user: &AuthUser,
    proof_id: Uuid,
    payload: ReviewProofRequest,
) -> AppResult<ApiResponse<ProofReview>> {
    ensure_admin(user)?;
    let decision: ReviewDecision = payload.status.parse()?;

    let txn = state.orm.begin().await?;

    let proof = PaymentProofs::find_by_id(proof_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let proof = match proof {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    // Review is one-way. The second of two concurrent reviews observes the
    // already-updated status here and surfaces instead of corrupting state.
    let current: ProofStatus = proof
        .status
        .parse()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("proof {proof_id} has bad status")))?;
    if current != ProofStatus::Pending {
        return Err(AppError::AlreadyReviewed);
    }

    let order = Orders::find_by_id(proof.order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("proof {proof_id} has no order")))?;

    // The order may have moved on (cancelled, or paid through another path)
    // while this proof sat in the queue. A verdict must not drag a settled
    // order back through the payment states.
    let order_status = parse_stored_status(&order)?;
    if !order_status.accepts_payment_proof() {
        return Err(AppError::InvalidState(format!(
            "order {} is {} and its payment proofs can no longer be reviewed",
            order.order_code, order.status
        )));
    }

    let mut proof_active: ProofActive = proof.into();
    proof_active.status = Set(decision.proof_status().as_str().to_string());
    proof_active.notes = Set(payload.notes.clone());
    proof_active.reviewed_at = Set(Some(Utc::now().into()));
    let proof = proof_active.update(&txn).await?;

    // Approval always finalizes payment, whether the order was still at
    // PENDING_PAYMENT or already AWAITING_VERIFICATION; rejection reverts so
    // the customer can re-upload.
    let new_status = match decision {
        ReviewDecision::Approve => OrderStatus::Paid,
        ReviewDecision::Reject => OrderStatus::PendingPayment,
    };

    let facts = OrderFacts::from_order(&order);
    let mut order_active: OrderActive = order.into();
    order_active.status = Set(new_status.as_str().to_string());
    order_active.updated_at = Set(Utc::now().into());
    let order = order_active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::PaymentProofReview,
        Some(serde_json::json!({
            "proof_id": proof.id,
            "order_id": order.id,
            "decision": proof.status,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    // Fire-and-forget: a provider failure here never unwinds the review.
    let event = match decision {
        ReviewDecision::Approve => OrderEvent::ProofApproved,
        ReviewDecision::Reject => OrderEvent::ProofRejected {
            notes: payload.notes,
        },
    };
    state.dispatcher.notify_customer(event, facts);

    Ok(ApiResponse::success(
        "Payment proof reviewed",
        ProofReview {
            proof: proof_from_entity(proof),
            order: order_from_entity(order),
        },
        Some(Meta::empty()),
    ))
}

pub(crate) fn proof_from_entity(model: ProofModel) -> PaymentProof {
    PaymentProof {
        id: model.id,
        order_id: model.order_id,
        image_url: model.image_url,
        status: model.status,
        notes: model.notes,
        reviewed_at: model.reviewed_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
    }
}
