pub mod circuit_breaker;
pub mod confirmation_service;
pub mod dto;
pub mod payment_service;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use confirmation_service::ConfirmationService;
pub use dto::{CreatePaymentRequest, ErrorResponse, UpdatePaymentRequest};
pub use payment_service::PaymentService;
