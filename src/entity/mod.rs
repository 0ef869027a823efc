pub mod audit_logs;
pub mod notifications;
pub mod orders;
pub mod payment_proofs;
pub mod settings;

pub use audit_logs::Entity as AuditLogs;
pub use notifications::Entity as Notifications;
pub use orders::Entity as Orders;
pub use payment_proofs::Entity as PaymentProofs;
pub use settings::Entity as Settings;
