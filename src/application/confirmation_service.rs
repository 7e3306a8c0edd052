use crate::application::circuit_breaker::{CircuitBreaker, GuardedCallError};
use crate::domain::errors::{DomainError, DomainResult};
use crate::ports::{OrderNotifierPort, PaymentRepositoryPort};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 支付确认服务
///
/// 先在本地写入 CONFIRMED，再通过熔断器通知订单服务；
/// 通知失败或熔断器打开时写入 CONFIRMED_NO_INTEGRATION，调用方不会看到远程错误。
pub struct ConfirmationService<N: OrderNotifierPort, R: PaymentRepositoryPort> {
    order_notifier: Arc<N>,
    repository: Arc<R>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl<N: OrderNotifierPort, R: PaymentRepositoryPort> Clone for ConfirmationService<N, R> {
    fn clone(&self) -> Self {
        Self {
            order_notifier: self.order_notifier.clone(),
            repository: self.repository.clone(),
            circuit_breaker: self.circuit_breaker.clone(),
        }
    }
}

impl<N, R> ConfirmationService<N, R>
where
    N: OrderNotifierPort + 'static,
    R: PaymentRepositoryPort + 'static,
{
    pub fn new(
        order_notifier: Arc<N>,
        repository: Arc<R>,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Self {
            order_notifier,
            repository,
            circuit_breaker,
        }
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.circuit_breaker
    }

    /// 确认支付
    ///
    /// 只会返回 `PaymentNotFound` 或存储层错误，订单服务的失败会被吸收为
    /// CONFIRMED_NO_INTEGRATION 状态。
    pub async fn confirm_payment(&self, id: i64) -> DomainResult<()> {
        info!("Confirming payment: {}", id);

        // 1. 读取支付记录
        let mut payment = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::PaymentNotFound(id))?;

        // 2. 本地先写入 CONFIRMED
        payment.mark_as_confirmed();
        self.repository.update(&payment).await?;
        debug!("Payment {} marked as confirmed", id);

        // 3. 通知订单服务，失败时回退
        // 在独立任务中运行，请求被取消时回退写入仍会完成
        let service = self.clone();
        let order_id = payment.order_id;
        tokio::spawn(async move { service.notify_or_fall_back(id, order_id).await })
            .await
            .map_err(|e| DomainError::InternalError(format!("Confirmation task failed: {}", e)))?
    }

    async fn notify_or_fall_back(&self, id: i64, order_id: i64) -> DomainResult<()> {
        let notifier = self.order_notifier.clone();
        let result = self
            .circuit_breaker
            .call(|| async move { notifier.notify_payment_confirmed(order_id).await })
            .await;

        match result {
            Ok(()) => {
                info!("Payment {} confirmed and order {} notified", id, order_id);
                Ok(())
            }
            Err(e) => {
                match &e {
                    GuardedCallError::CircuitOpen(_) => {
                        warn!("Order notification for payment {} short-circuited: {}", id, e)
                    }
                    GuardedCallError::Timeout(_) | GuardedCallError::Remote(_) => {
                        warn!("Order notification for payment {} failed: {}", id, e)
                    }
                }
                self.confirm_without_integration(id).await
            }
        }
    }

    /// 回退：重新读取记录并标记为 CONFIRMED_NO_INTEGRATION
    async fn confirm_without_integration(&self, id: i64) -> DomainResult<()> {
        let mut payment = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::PaymentNotFound(id))?;

        payment.mark_as_confirmed_without_integration()?;
        self.repository.update(&payment).await?;

        warn!("Payment {} confirmed without order integration", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    use crate::domain::entities::tests::sample_details;
    use crate::domain::{Page, PageRequest, Payment, PaymentStatus};
    use crate::infrastructure::adapters::InMemoryPaymentRepository;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// 可切换成功/失败的订单通知桩
    #[derive(Default)]
    struct StubNotifier {
        failing: AtomicBool,
        hang: AtomicBool,
        calls: Mutex<Vec<i64>>,
    }

    impl StubNotifier {
        fn failing() -> Self {
            let notifier = Self::default();
            notifier.failing.store(true, Ordering::SeqCst);
            notifier
        }

        fn hanging() -> Self {
            let notifier = Self::default();
            notifier.hang.store(true, Ordering::SeqCst);
            notifier
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OrderNotifierPort for StubNotifier {
        async fn notify_payment_confirmed(&self, order_id: i64) -> DomainResult<()> {
            self.calls.lock().unwrap().push(order_id);
            if self.hang.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(DomainError::OrderServiceError("order service down".to_string()));
            }
            Ok(())
        }
    }

    /// 统计写操作次数的仓储包装
    #[derive(Default)]
    struct CountingRepository {
        inner: InMemoryPaymentRepository,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl PaymentRepositoryPort for CountingRepository {
        async fn save(&self, payment: &Payment) -> DomainResult<Payment> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.save(payment).await
        }

        async fn find_by_id(&self, id: i64) -> DomainResult<Option<Payment>> {
            self.inner.find_by_id(id).await
        }

        async fn update(&self, payment: &Payment) -> DomainResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.update(payment).await
        }

        async fn delete(&self, id: i64) -> DomainResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(id).await
        }

        async fn find_page(&self, request: PageRequest) -> DomainResult<Page<Payment>> {
            self.inner.find_page(request).await
        }
    }

    fn breaker_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            name: "order-notifier".to_string(),
            sliding_window_size: 3,
            minimum_number_of_calls: 3,
            failure_rate_threshold: 100.0,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
            call_timeout: Duration::from_secs(2),
        }
    }

    async fn seed(repository: &InMemoryPaymentRepository, id: i64, order_id: i64) {
        let mut payment = Payment::new(order_id, sample_details()).unwrap();
        payment.id = id;
        repository.insert(payment).await;
    }

    fn service(
        notifier: Arc<StubNotifier>,
        repository: Arc<InMemoryPaymentRepository>,
    ) -> ConfirmationService<StubNotifier, InMemoryPaymentRepository> {
        ConfirmationService::new(
            notifier,
            repository,
            Arc::new(CircuitBreaker::new(breaker_config())),
        )
    }

    async fn status_of(repository: &InMemoryPaymentRepository, id: i64) -> PaymentStatus {
        repository.find_by_id(id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_confirm_with_successful_notification() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        seed(&repository, 42, 7).await;
        let notifier = Arc::new(StubNotifier::default());
        let service = service(notifier.clone(), repository.clone());

        service.confirm_payment(42).await.unwrap();

        assert_eq!(status_of(&repository, 42).await, PaymentStatus::Confirmed);
        assert_eq!(*notifier.calls.lock().unwrap(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_falls_back_on_timeout() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        seed(&repository, 43, 9).await;
        let notifier = Arc::new(StubNotifier::hanging());
        let service = service(notifier.clone(), repository.clone());

        service.confirm_payment(43).await.unwrap();

        assert_eq!(
            status_of(&repository, 43).await,
            PaymentStatus::ConfirmedNoIntegration
        );
        assert_eq!(notifier.call_count(), 1);
    }

    #[tokio::test]
    async fn test_confirm_falls_back_on_remote_error() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        seed(&repository, 1, 100).await;
        let service = service(Arc::new(StubNotifier::failing()), repository.clone());

        service.confirm_payment(1).await.unwrap();

        assert_eq!(
            status_of(&repository, 1).await,
            PaymentStatus::ConfirmedNoIntegration
        );
    }

    #[tokio::test]
    async fn test_confirm_missing_payment_does_not_write() {
        let repository = Arc::new(CountingRepository::default());
        let notifier = Arc::new(StubNotifier::default());
        let service = ConfirmationService::new(
            notifier.clone(),
            repository.clone(),
            Arc::new(CircuitBreaker::new(breaker_config())),
        );

        let result = service.confirm_payment(999).await;

        assert!(matches!(result, Err(DomainError::PaymentNotFound(999))));
        assert_eq!(repository.writes.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.call_count(), 0);
    }

    #[tokio::test]
    async fn test_open_circuit_skips_notifier_and_still_falls_back() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        for id in 1..=4 {
            seed(&repository, id, id * 10).await;
        }
        let notifier = Arc::new(StubNotifier::failing());
        let service = service(notifier.clone(), repository.clone());

        for id in 1..=3 {
            service.confirm_payment(id).await.unwrap();
        }
        assert_eq!(service.circuit_breaker().state(), CircuitState::Open);
        assert_eq!(notifier.call_count(), 3);

        service.confirm_payment(4).await.unwrap();

        assert_eq!(notifier.call_count(), 3);
        assert_eq!(
            status_of(&repository, 4).await,
            PaymentStatus::ConfirmedNoIntegration
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_cool_down() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        for id in 1..=5 {
            seed(&repository, id, id * 10).await;
        }
        let notifier = Arc::new(StubNotifier::failing());
        let service = service(notifier.clone(), repository.clone());

        for id in 1..=3 {
            service.confirm_payment(id).await.unwrap();
        }
        assert_eq!(service.circuit_breaker().state(), CircuitState::Open);

        notifier.set_failing(false);
        tokio::time::advance(Duration::from_secs(30)).await;

        service.confirm_payment(4).await.unwrap();
        assert_eq!(status_of(&repository, 4).await, PaymentStatus::Confirmed);
        assert_eq!(service.circuit_breaker().state(), CircuitState::Closed);

        service.confirm_payment(5).await.unwrap();
        assert_eq!(status_of(&repository, 5).await, PaymentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_reconfirm_retries_integration() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        seed(&repository, 8, 80).await;
        let notifier = Arc::new(StubNotifier::failing());
        let service = service(notifier.clone(), repository.clone());

        service.confirm_payment(8).await.unwrap();
        assert_eq!(
            status_of(&repository, 8).await,
            PaymentStatus::ConfirmedNoIntegration
        );

        notifier.set_failing(false);
        service.confirm_payment(8).await.unwrap();

        assert_eq!(status_of(&repository, 8).await, PaymentStatus::Confirmed);
        assert_eq!(notifier.call_count(), 2);
    }

    #[tokio::test]
    async fn test_payment_deleted_before_fallback() {
        /// 通知时删除支付记录，模拟回退前的不一致
        struct DeletingNotifier(Arc<InMemoryPaymentRepository>);

        #[async_trait]
        impl OrderNotifierPort for DeletingNotifier {
            async fn notify_payment_confirmed(&self, _order_id: i64) -> DomainResult<()> {
                self.0.delete(5).await?;
                Err(DomainError::OrderServiceError("unavailable".to_string()))
            }
        }

        let repository = Arc::new(InMemoryPaymentRepository::new());
        seed(&repository, 5, 50).await;
        let service = ConfirmationService::new(
            Arc::new(DeletingNotifier(repository.clone())),
            repository.clone(),
            Arc::new(CircuitBreaker::new(breaker_config())),
        );

        let result = service.confirm_payment(5).await;

        assert!(matches!(result, Err(DomainError::PaymentNotFound(5))));
    }

    #[tokio::test]
    async fn test_concurrent_confirmations_share_breaker() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        for id in 1..=20 {
            seed(&repository, id, id).await;
        }
        let notifier = Arc::new(StubNotifier::failing());
        let service = service(notifier.clone(), repository.clone());

        let mut handles = Vec::new();
        for id in 1..=20 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.confirm_payment(id).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for id in 1..=20 {
            assert_eq!(
                status_of(&repository, id).await,
                PaymentStatus::ConfirmedNoIntegration
            );
        }
        assert_eq!(service.circuit_breaker().state(), CircuitState::Open);
        assert!(notifier.call_count() < 20);
    }
}
