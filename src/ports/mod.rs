pub mod order_notifier_port;
pub mod payment_repository_port;

pub use order_notifier_port::OrderNotifierPort;
pub use payment_repository_port::PaymentRepositoryPort;
