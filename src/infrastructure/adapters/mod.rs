pub mod http_order_notifier;
pub mod in_memory_payment_repository;
pub mod mysql_payment_repository;

pub use http_order_notifier::HttpOrderNotifier;
pub use in_memory_payment_repository::InMemoryPaymentRepository;
pub use mysql_payment_repository::MySqlPaymentRepository;
