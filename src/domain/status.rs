//! Order status state machine.
//!
//! Status transitions:
//! ```text
//! PendingPayment ──► AwaitingVerification ──► Paid ──► Processing ──► Shipped ──► Completed
//!        │▲                   │                ▲
//!        │└───────────────────┘ (rejected)     │
//!        └─────────────────────────────────────┘ (proof approved)
//!
//! every non-terminal state ──► Cancelled
//! ```
//!
//! Every hop must be explicit; the machine never infers skip-ahead
//! transitions, so a single badly-formed admin request cannot jump an
//! order past a state it never held.

use crate::error::AppError;

/// Lifecycle state of an order. The wire string ("PENDING_PAYMENT", ...)
/// exists only at the boundary; inside the machine illegal states are
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    PendingPayment,
    AwaitingVerification,
    Paid,
    Processing,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::PendingPayment,
        OrderStatus::AwaitingVerification,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "PENDING_PAYMENT",
            OrderStatus::AwaitingVerification => "AWAITING_VERIFICATION",
            OrderStatus::Paid => "PAID",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Terminal states admit no further transitions, not even cancellation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// A payment proof may only be attached while payment is still open.
    pub fn accepts_payment_proof(&self) -> bool {
        matches!(
            self,
            OrderStatus::PendingPayment | OrderStatus::AwaitingVerification
        )
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_PAYMENT" => Ok(OrderStatus::PendingPayment),
            "AWAITING_VERIFICATION" => Ok(OrderStatus::AwaitingVerification),
            "PAID" => Ok(OrderStatus::Paid),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::BadRequest(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer-facing follow-up owed after a committed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerNotice {
    PaymentConfirmed,
    Shipped,
    Completed,
    Cancelled,
}

/// Side effect a committed transition asks its caller to schedule.
/// The machine only declares effects; the caller executes them after the
/// store commit succeeds, never before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Send the customer a status update over the enabled dispatch channels.
    NotifyCustomer(CustomerNotice),
    /// Record an admin-feed notification for the change.
    NotifyAdmin,
}

/// Outcome of a legal transition: the new status plus the effects to
/// schedule once the store commit has gone through.
#[derive(Debug, Clone)]
pub struct Transition {
    pub next: OrderStatus,
    pub effects: Vec<Effect>,
}

/// Validate a requested status change against the explicit edge set.
pub fn transition(current: OrderStatus, requested: OrderStatus) -> Result<Transition, AppError> {
    use OrderStatus::*;

    let legal = match (current, requested) {
        (PendingPayment, AwaitingVerification) => true,
        // Proof approval finalizes payment from either pre-payment state, so
        // a direct admin request takes the same edge.
        (PendingPayment, Paid) => true,
        (AwaitingVerification, Paid) => true,
        // Rejected proof reverts the order so the customer can re-upload.
        (AwaitingVerification, PendingPayment) => true,
        (Paid, Processing) => true,
        (Processing, Shipped) => true,
        (Shipped, Completed) => true,
        (from, Cancelled) if !from.is_terminal() => true,
        _ => false,
    };

    if !legal {
        return Err(AppError::InvalidTransition {
            from: current.as_str(),
            to: requested.as_str(),
        });
    }

    let mut effects = vec![Effect::NotifyAdmin];
    match requested {
        Paid => effects.push(Effect::NotifyCustomer(CustomerNotice::PaymentConfirmed)),
        Shipped => effects.push(Effect::NotifyCustomer(CustomerNotice::Shipped)),
        Completed => effects.push(Effect::NotifyCustomer(CustomerNotice::Completed)),
        Cancelled => effects.push(Effect::NotifyCustomer(CustomerNotice::Cancelled)),
        _ => {}
    }

    Ok(Transition {
        next: requested,
        effects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    fn assert_legal(from: OrderStatus, to: OrderStatus) {
        let t = transition(from, to).unwrap_or_else(|_| panic!("{from} -> {to} should be legal"));
        assert_eq!(t.next, to);
    }

    fn assert_illegal(from: OrderStatus, to: OrderStatus) {
        match transition(from, to) {
            Err(crate::error::AppError::InvalidTransition { .. }) => {}
            other => panic!("{from} -> {to} should be InvalidTransition, got {other:?}"),
        }
    }

    #[test]
    fn forward_edges_are_legal() {
        assert_legal(PendingPayment, AwaitingVerification);
        assert_legal(PendingPayment, Paid);
        assert_legal(AwaitingVerification, Paid);
        assert_legal(AwaitingVerification, PendingPayment);
        assert_legal(Paid, Processing);
        assert_legal(Processing, Shipped);
        assert_legal(Shipped, Completed);
    }

    #[test]
    fn cancellation_reachable_from_every_non_terminal_state() {
        for from in OrderStatus::ALL {
            if from.is_terminal() {
                assert_illegal(from, Cancelled);
            } else {
                assert_legal(from, Cancelled);
            }
        }
    }

    #[test]
    fn skip_ahead_is_rejected() {
        assert_illegal(PendingPayment, Shipped);
        assert_illegal(PendingPayment, Processing);
        assert_illegal(AwaitingVerification, Shipped);
        assert_illegal(Paid, Shipped);
        assert_illegal(Paid, Completed);
        assert_illegal(Processing, Completed);
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for to in OrderStatus::ALL {
            assert_illegal(Completed, to);
            assert_illegal(Cancelled, to);
        }
    }

    #[test]
    fn backwards_and_self_edges_are_rejected() {
        assert_illegal(Paid, PendingPayment);
        assert_illegal(Shipped, Processing);
        assert_illegal(PendingPayment, PendingPayment);
        assert_illegal(Processing, Processing);
    }

    #[test]
    fn shipped_transition_schedules_customer_notice() {
        let t = transition(Processing, Shipped).unwrap();
        assert!(t.effects.contains(&Effect::NotifyAdmin));
        assert!(
            t.effects
                .contains(&Effect::NotifyCustomer(CustomerNotice::Shipped))
        );
    }

    #[test]
    fn verification_step_is_admin_only_noise() {
        let t = transition(PendingPayment, AwaitingVerification).unwrap();
        assert_eq!(t.effects, vec![Effect::NotifyAdmin]);
    }

    #[test]
    fn wire_strings_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
        assert!("".parse::<OrderStatus>().is_err());
    }
}
