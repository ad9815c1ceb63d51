pub mod processor;
pub mod reconciliation;
pub mod signature;
pub mod stripe;

pub use processor::{PaymentProcessor, ProcessorError};
pub use reconciliation::PaymentReconciliationService;
pub use stripe::StripeClient;
