use crate::application::{
    ConfirmationService, CreatePaymentRequest, ErrorResponse, PaymentService, UpdatePaymentRequest,
};
use crate::domain::errors::DomainError;
use crate::domain::PageRequest;
use crate::ports::{OrderNotifierPort, PaymentRepositoryPort};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 应用状态
pub struct AppState<N: OrderNotifierPort, R: PaymentRepositoryPort> {
    pub payment_service: Arc<PaymentService<R>>,
    pub confirmation_service: Arc<ConfirmationService<N, R>>,
}

impl<N: OrderNotifierPort, R: PaymentRepositoryPort> Clone for AppState<N, R> {
    fn clone(&self) -> Self {
        Self {
            payment_service: self.payment_service.clone(),
            confirmation_service: self.confirmation_service.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// 将领域错误映射为HTTP响应
fn api_error(code: &str, e: DomainError) -> ApiError {
    let status = match e {
        DomainError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::ValidationError(_) | DomainError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        DomainError::InvalidState { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("{} error: {}", code, e);
    } else {
        warn!("{} error: {}", code, e);
    }

    (status, Json(ErrorResponse::new(code.to_string(), e.to_string())))
}

/// 分页查询支付记录
pub async fn list_payments<N, R>(
    State(state): State<AppState<N, R>>,
    Query(page): Query<PageRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    state
        .payment_service
        .list_payments(page)
        .await
        .map(Json)
        .map_err(|e| api_error("QUERY_ERROR", e))
}

/// 查询支付记录
pub async fn get_payment<N, R>(
    State(state): State<AppState<N, R>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError>
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    state
        .payment_service
        .get_payment(id)
        .await
        .map(Json)
        .map_err(|e| api_error("QUERY_ERROR", e))
}

/// 创建支付记录
pub async fn create_payment<N, R>(
    State(state): State<AppState<N, R>>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    info!("Received payment creation request for order: {}", request.order_id);

    let response = state
        .payment_service
        .create_payment(request)
        .await
        .map_err(|e| api_error("PAYMENT_ERROR", e))?;

    let location = format!("/api/payments/{}", response.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(response),
    ))
}

/// 更新支付记录
pub async fn update_payment<N, R>(
    State(state): State<AppState<N, R>>,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    state
        .payment_service
        .update_payment(id, request)
        .await
        .map(Json)
        .map_err(|e| api_error("PAYMENT_ERROR", e))
}

/// 删除支付记录
pub async fn delete_payment<N, R>(
    State(state): State<AppState<N, R>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError>
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    state
        .payment_service
        .delete_payment(id)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|e| api_error("PAYMENT_ERROR", e))
}

/// 确认支付
///
/// 订单服务不可用时同样返回 200，状态可通过查询接口获得。
pub async fn confirm_payment<N, R>(
    State(state): State<AppState<N, R>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError>
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    info!("Received payment confirmation request: {}", id);

    state
        .confirmation_service
        .confirm_payment(id)
        .await
        .map(|_| StatusCode::OK)
        .map_err(|e| api_error("CONFIRMATION_ERROR", e))
}

/// 健康检查
pub async fn health_check<N, R>(State(state): State<AppState<N, R>>) -> impl IntoResponse
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    let breaker = state.confirmation_service.circuit_breaker().metrics();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "circuit_breakers": [breaker],
        })),
    )
}
