pub mod adapters;
pub mod config;

pub use adapters::{HttpOrderNotifier, InMemoryPaymentRepository, MySqlPaymentRepository};
pub use config::AppConfig;
