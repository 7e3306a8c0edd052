use super::handlers::*;
use crate::ports::{OrderNotifierPort, PaymentRepositoryPort};
use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router<N, R>(state: AppState<N, R>) -> Router
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    Router::new()
        .route("/health", get(health_check::<N, R>))
        .route(
            "/api/payments",
            get(list_payments::<N, R>).post(create_payment::<N, R>),
        )
        .route(
            "/api/payments/:id",
            get(get_payment::<N, R>)
                .put(update_payment::<N, R>)
                .delete(delete_payment::<N, R>),
        )
        .route("/api/payments/:id/confirm", patch(confirm_payment::<N, R>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
