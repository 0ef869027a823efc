use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::{AuditAction, log_audit},
    dispatch::{OrderEvent, OrderFacts},
    domain::{self, CustomerNotice, Effect, OrderStatus, ProofStatus},
    entity::orders::{
        ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
    },
    entity::payment_proofs::{ActiveModel as ProofActive, Model as ProofModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, PaymentProof},
    response::{ApiResponse, Meta},
    routes::orders::UpdateOrderStatusRequest,
    services::notification_service::{self, NotificationKind},
    services::proof_service::proof_from_entity,
    state::AppState,
    storage::StoredImage,
};

pub const MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;
const ALLOWED_PROOF_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
const PROOF_CATEGORY: &str = "payment-proofs";

/// A multipart proof upload, already pulled off the wire.
#[derive(Debug)]
pub struct ProofUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Customer uploads a bank-transfer proof for an order.
///
/// Validation happens before any store access, and the image is written
/// before the transaction begins so no row lock is held across file I/O.
/// The proof insert and the order's move to AWAITING_VERIFICATION commit
/// in one transaction; a failed commit removes the stored image again.
pub async fn submit_proof(
    state: &AppState,
    order_code: &str,
    email: &str,
    upload: ProofUpload,
) -> AppResult<ApiResponse<PaymentProof>> {
    if !ALLOWED_PROOF_TYPES.contains(&upload.content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "payment proof must be a JPEG, PNG or WebP image, got {}",
            upload.content_type
        )));
    }
    if upload.bytes.len() > MAX_PROOF_BYTES {
        return Err(AppError::BadRequest(
            "payment proof must be 5 MiB or smaller".into(),
        ));
    }
    if upload.bytes.is_empty() {
        return Err(AppError::BadRequest("payment proof file is empty".into()));
    }

    // Unlocked precheck so a rejected request never writes a file; the same
    // checks run again under the row lock.
    let order = Orders::find()
        .filter(OrderCol::OrderCode.eq(order_code))
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    ensure_uploadable(&order, email)?;

    let stored = state
        .images
        .upload(&upload.bytes, PROOF_CATEGORY, &upload.content_type)
        .await?;

    let (proof, facts, order_id) = match persist_proof(state, order_code, email, &stored).await {
        Ok(committed) => committed,
        Err(err) => {
            if let Err(remove_err) = state.images.remove(&stored.key).await {
                tracing::warn!(
                    error = %remove_err,
                    key = %stored.key,
                    "failed to remove orphaned proof image"
                );
            }
            return Err(err);
        }
    };

    // Post-commit fan-out: durable admin-feed record first, then the
    // fire-and-forget external channels.
    if let Err(err) = notification_service::create_and_publish(
        state,
        NotificationKind::PaymentProofUploaded,
        "Payment proof uploaded",
        &format!(
            "{} uploaded a payment proof for order {}",
            facts.customer_name, facts.order_code
        ),
        Some(order_id),
    )
    .await
    {
        tracing::warn!(error = %err, "failed to record proof-upload notification");
    }
    state.dispatcher.alert_admin_proof_uploaded(facts.clone());
    state
        .dispatcher
        .email_customer(OrderEvent::ProofUploaded, facts);

    Ok(ApiResponse::success(
        "Payment proof uploaded",
        proof_from_entity(proof),
        Some(Meta::empty()),
    ))
}

fn ensure_uploadable(order: &OrderModel, email: &str) -> AppResult<()> {
    let current = parse_stored_status(order)?;
    if !current.accepts_payment_proof() {
        return Err(AppError::InvalidState(format!(
            "order {} is {} and no longer accepts payment proofs",
            order.order_code, order.status
        )));
    }
    // Ownership check, not authentication: the uploader must know the email
    // the order was placed with.
    if !order.customer_email.eq_ignore_ascii_case(email) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Insert the PENDING proof and move the order to AWAITING_VERIFICATION,
/// both under the same row lock.
async fn persist_proof(
    state: &AppState,
    order_code: &str,
    email: &str,
    stored: &StoredImage,
) -> AppResult<(ProofModel, OrderFacts, Uuid)> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(OrderCol::OrderCode.eq(order_code))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };
    ensure_uploadable(&order, email)?;

    let proof = ProofActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        image_url: Set(stored.url.clone()),
        image_key: Set(stored.key.clone()),
        status: Set(ProofStatus::Pending.as_str().to_string()),
        notes: Set(None),
        reviewed_at: Set(None),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let facts = OrderFacts::from_order(&order);
    let order_id = order.id;
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::AwaitingVerification.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok((proof, facts, order_id))
}

/// Admin moves an order along its lifecycle. The state machine validates the
/// hop inside the same transaction that writes it; declared effects run only
/// after the commit.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let requested: OrderStatus = payload.status.parse()?;

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let current = parse_stored_status(&order)?;
    let transition = domain::transition(current, requested)?;

    let mut active: OrderActive = order.into();
    active.status = Set(transition.next.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderStatusUpdate,
        Some(serde_json::json!({
            "order_id": order.id,
            "from": current.as_str(),
            "to": order.status,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    run_transition_effects(state, &order, current, &transition.effects).await;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// Execute the effects a committed transition declared. Failures here are
/// logged and swallowed; the status change has already committed.
async fn run_transition_effects(
    state: &AppState,
    order: &OrderModel,
    previous: OrderStatus,
    effects: &[Effect],
) {
    for effect in effects {
        match effect {
            Effect::NotifyAdmin => {
                if let Err(err) = notification_service::create_and_publish(
                    state,
                    NotificationKind::OrderStatusChanged,
                    "Order status changed",
                    &format!(
                        "Order {} moved from {} to {}",
                        order.order_code,
                        previous.as_str(),
                        order.status
                    ),
                    Some(order.id),
                )
                .await
                {
                    tracing::warn!(error = %err, "failed to record status-change notification");
                }
            }
            Effect::NotifyCustomer(notice) => {
                let event = customer_event(*notice, order);
                state
                    .dispatcher
                    .notify_customer(event, OrderFacts::from_order(order));
            }
        }
    }
}

fn customer_event(notice: CustomerNotice, order: &OrderModel) -> OrderEvent {
    match notice {
        CustomerNotice::PaymentConfirmed => OrderEvent::ProofApproved,
        CustomerNotice::Shipped => OrderEvent::Shipped {
            courier: order.courier.clone(),
            tracking_number: order.tracking_number.clone(),
        },
        CustomerNotice::Completed => OrderEvent::Completed,
        CustomerNotice::Cancelled => OrderEvent::Cancelled,
    }
}

/// A stored status that fails to parse is data corruption, not client error.
pub(crate) fn parse_stored_status(order: &OrderModel) -> AppResult<OrderStatus> {
    order.status.parse().map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has unrecognized stored status {:?}",
            order.order_code,
            order.status
        ))
    })
}

pub(crate) fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        order_code: model.order_code,
        customer_name: model.customer_name,
        customer_email: model.customer_email,
        customer_phone: model.customer_phone,
        shipping_address: model.shipping_address,
        total: model.total,
        shipping_cost: model.shipping_cost,
        discount: model.discount,
        coupon_code: model.coupon_code,
        status: model.status,
        courier: model.courier,
        tracking_number: model.tracking_number,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
