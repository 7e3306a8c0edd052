use thiserror::Error;

/// 领域层错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 支付记录未找到
    #[error("Payment not found: {0}")]
    PaymentNotFound(i64),

    /// 支付状态错误
    #[error("Invalid payment state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// 金额无效
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// 订单服务返回错误
    #[error("Order service error: {0}")]
    OrderServiceError(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// 数据库查询超时
    #[error("Database query timed out after {0:?}")]
    DatabaseTimeout(std::time::Duration),

    /// HTTP请求错误
    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// 领域结果类型
pub type DomainResult<T> = Result<T, DomainError>;
