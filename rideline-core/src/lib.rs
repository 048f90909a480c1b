pub mod collaborators;
pub mod identity;
pub mod payment;

pub use identity::{require_role, AuthIdentity, Role};
pub use payment::{CheckoutSession, PaymentGateway};
