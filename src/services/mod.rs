pub mod notification_service;
pub mod order_service;
pub mod proof_service;
