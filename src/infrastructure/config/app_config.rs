use crate::application::CircuitBreakerConfig;
use crate::domain::errors::{DomainError, DomainResult};
use std::str::FromStr;
use std::time::Duration;

/// 服务监听配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 数据库配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// 获取连接的超时时间
    pub acquire_timeout: Duration,
    /// 单条语句的超时时间
    pub query_timeout: Duration,
}

/// 订单服务配置
#[derive(Debug, Clone)]
pub struct OrderServiceConfig {
    /// API基础URL
    pub base_url: String,

    /// 订单已支付接口路径，`{order_id}` 会被替换为订单ID
    pub paid_path: String,

    /// HTTP请求超时
    pub timeout: Duration,
}

/// 应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,

    /// 未配置时使用内存存储
    pub database: Option<DatabaseConfig>,

    pub order_service: OrderServiceConfig,

    pub circuit_breaker: CircuitBreakerConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let server = ServerConfig {
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "SERVER_PORT", 3000)?,
        };

        let database = match lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
                acquire_timeout: millis_or(&lookup, "DATABASE_ACQUIRE_TIMEOUT_MS", 3000)?,
                query_timeout: millis_or(&lookup, "DATABASE_QUERY_TIMEOUT_MS", 5000)?,
            }),
            None => None,
        };

        let order_service = OrderServiceConfig {
            base_url: lookup("ORDER_SERVICE_URL")
                .unwrap_or_else(|| "http://localhost:8082".to_string()),
            paid_path: lookup("ORDER_SERVICE_PAID_PATH")
                .unwrap_or_else(|| "/pedidos/{order_id}/pago".to_string()),
            timeout: millis_or(&lookup, "ORDER_SERVICE_TIMEOUT_MS", 2000)?,
        };

        let defaults = CircuitBreakerConfig::default();
        let circuit_breaker = CircuitBreakerConfig {
            name: defaults.name,
            sliding_window_size: parse_or(
                &lookup,
                "CIRCUIT_BREAKER_WINDOW_SIZE",
                defaults.sliding_window_size,
            )?,
            minimum_number_of_calls: parse_or(
                &lookup,
                "CIRCUIT_BREAKER_MINIMUM_CALLS",
                defaults.minimum_number_of_calls,
            )?,
            failure_rate_threshold: parse_or(
                &lookup,
                "CIRCUIT_BREAKER_FAILURE_RATE",
                defaults.failure_rate_threshold,
            )?,
            wait_duration_in_open: millis_or(
                &lookup,
                "CIRCUIT_BREAKER_WAIT_OPEN_MS",
                defaults.wait_duration_in_open.as_millis() as u64,
            )?,
            permitted_calls_in_half_open: parse_or(
                &lookup,
                "CIRCUIT_BREAKER_HALF_OPEN_CALLS",
                defaults.permitted_calls_in_half_open,
            )?,
            // 熔断器超时与HTTP客户端超时一致
            call_timeout: order_service.timeout,
        };
        circuit_breaker.validate()?;

        Ok(Self {
            server,
            database,
            order_service,
            circuit_breaker,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> DomainResult<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DomainError::ConfigurationError(format!("Invalid {}: {}", key, raw))),
        None => Ok(default),
    }
}

fn millis_or(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> DomainResult<Duration> {
    parse_or(lookup, key, default).map(Duration::from_millis)
}
