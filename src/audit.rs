//! Audit trail for admin actions, written through the raw sqlx pool.

use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// The admin actions that leave an audit row. Each action knows the
/// resource it touches, so call sites cannot mislabel one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    OrderStatusUpdate,
    PaymentProofReview,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OrderStatusUpdate => "order_status_update",
            AuditAction::PaymentProofReview => "payment_proof_review",
        }
    }

    fn resource(&self) -> &'static str {
        match self {
            AuditAction::OrderStatusUpdate => "orders",
            AuditAction::PaymentProofReview => "payment_proofs",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_their_resource() {
        assert_eq!(AuditAction::OrderStatusUpdate.as_str(), "order_status_update");
        assert_eq!(AuditAction::OrderStatusUpdate.resource(), "orders");
        assert_eq!(AuditAction::PaymentProofReview.as_str(), "payment_proof_review");
        assert_eq!(AuditAction::PaymentProofReview.resource(), "payment_proofs");
    }
}
