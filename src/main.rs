mod api;
mod application;
mod domain;
mod infrastructure;
mod ports;

use api::AppState;
use application::{CircuitBreaker, ConfirmationService, PaymentService};
use infrastructure::config::ServerConfig;
use infrastructure::{AppConfig, HttpOrderNotifier, InMemoryPaymentRepository, MySqlPaymentRepository};
use ports::{OrderNotifierPort, PaymentRepositoryPort};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Starting Payment Service...");

    let config = AppConfig::from_env()?;

    // 订单服务通知适配器
    let order_notifier = Arc::new(HttpOrderNotifier::new(config.order_service.clone())?);
    info!("Order service configured at {}", config.order_service.base_url);

    // 订单服务熔断器，进程内共享
    let circuit_breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));

    match &config.database {
        Some(database) => {
            info!("Connecting to database...");
            let pool = MySqlPoolOptions::new()
                .max_connections(database.max_connections)
                .acquire_timeout(database.acquire_timeout)
                .connect(&database.url)
                .await?;
            info!("Database connected successfully");

            let repository = Arc::new(MySqlPaymentRepository::new(
                Arc::new(pool),
                database.query_timeout,
            ));
            serve(&config.server, order_notifier, repository, circuit_breaker).await
        }
        None => {
            warn!("DATABASE_URL not set, payments are kept in memory only");
            let repository = Arc::new(InMemoryPaymentRepository::new());
            serve(&config.server, order_notifier, repository, circuit_breaker).await
        }
    }
}

async fn serve<N, R>(
    server: &ServerConfig,
    order_notifier: Arc<N>,
    repository: Arc<R>,
    circuit_breaker: Arc<CircuitBreaker>,
) -> anyhow::Result<()>
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    let app_state = AppState {
        payment_service: Arc::new(PaymentService::new(repository.clone())),
        confirmation_service: Arc::new(ConfirmationService::new(
            order_notifier,
            repository,
            circuit_breaker,
        )),
    };

    let app = api::create_router(app_state);

    let addr = server.addr();
    info!("Server listening on {}", addr);
    info!("Available endpoints:");
    info!("  GET    /health - Health check");
    info!("  GET    /api/payments - List payments");
    info!("  POST   /api/payments - Create payment");
    info!("  GET    /api/payments/:id - Query payment");
    info!("  PUT    /api/payments/:id - Update payment");
    info!("  DELETE /api/payments/:id - Delete payment");
    info!("  PATCH  /api/payments/:id/confirm - Confirm payment");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
