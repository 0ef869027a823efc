//! Payment proof review states.

use crate::error::AppError;

/// Review state of a payment proof. Once a proof leaves `Pending` it is
/// immutable; review is a one-way action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProofStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofStatus::Pending => "PENDING",
            ProofStatus::Approved => "APPROVED",
            ProofStatus::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for ProofStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ProofStatus::Pending),
            "APPROVED" => Ok(ProofStatus::Approved),
            "REJECTED" => Ok(ProofStatus::Rejected),
            other => Err(AppError::BadRequest(format!(
                "unknown proof status: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An admin's verdict on a pending proof. Parsed from the review request;
/// `PENDING` is not a verdict and fails parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn proof_status(&self) -> ProofStatus {
        match self {
            ReviewDecision::Approve => ProofStatus::Approved,
            ReviewDecision::Reject => ProofStatus::Rejected,
        }
    }
}

impl std::str::FromStr for ReviewDecision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "APPROVED" => Ok(ReviewDecision::Approve),
            "REJECTED" => Ok(ReviewDecision::Reject),
            other => Err(AppError::BadRequest(format!(
                "review status must be APPROVED or REJECTED, got: {other}"
            ))),
        }
    }
}
