pub mod proof;
pub mod status;

pub use proof::{ProofStatus, ReviewDecision};
pub use status::{CustomerNotice, Effect, OrderStatus, Transition, transition};
