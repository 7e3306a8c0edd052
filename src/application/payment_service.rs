use crate::application::dto::{CreatePaymentRequest, PaymentResponse, UpdatePaymentRequest};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Page, PageRequest, Payment};
use crate::ports::PaymentRepositoryPort;
use std::sync::Arc;
use tracing::{debug, info};

/// 支付记录服务（增删改查）
pub struct PaymentService<R: PaymentRepositoryPort> {
    repository: Arc<R>,
}

impl<R: PaymentRepositoryPort> PaymentService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// 创建支付记录
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> DomainResult<PaymentResponse> {
        info!("Creating payment for order: {}", request.order_id);

        let (order_id, details) = request.into_parts();
        let payment = Payment::new(order_id, details)?;
        let saved = self.repository.save(&payment).await?;

        info!("Payment created successfully: {}", saved.id);
        Ok(saved.into())
    }

    /// 查询单个支付记录
    pub async fn get_payment(&self, id: i64) -> DomainResult<PaymentResponse> {
        debug!("Querying payment: {}", id);

        self.repository
            .find_by_id(id)
            .await?
            .map(PaymentResponse::from)
            .ok_or(DomainError::PaymentNotFound(id))
    }

    /// 分页查询
    pub async fn list_payments(&self, request: PageRequest) -> DomainResult<Page<PaymentResponse>> {
        let request = request.normalized();
        debug!("Listing payments: page={}, size={}", request.page, request.size);

        let page = self.repository.find_page(request).await?;
        Ok(page.map(PaymentResponse::from))
    }

    /// 更新支付记录的描述性字段
    pub async fn update_payment(
        &self,
        id: i64,
        request: UpdatePaymentRequest,
    ) -> DomainResult<PaymentResponse> {
        info!("Updating payment: {}", id);

        let mut payment = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::PaymentNotFound(id))?;

        payment.update_details(request.into())?;
        self.repository.update(&payment).await?;

        Ok(payment.into())
    }

    /// 删除支付记录
    pub async fn delete_payment(&self, id: i64) -> DomainResult<()> {
        info!("Deleting payment: {}", id);
        self.repository.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Money, PaymentStatus};
    use crate::infrastructure::adapters::InMemoryPaymentRepository;

    fn create_request(order_id: i64, amount: i64) -> CreatePaymentRequest {
        CreatePaymentRequest {
            order_id,
            amount: Money::from_cents(amount),
            name: "Maria Silva".to_string(),
            number: "4111111111111111".to_string(),
            expiration: "12/29".to_string(),
            security_code: "123".to_string(),
            payment_method_id: 2,
        }
    }

    fn service() -> PaymentService<InMemoryPaymentRepository> {
        PaymentService::new(Arc::new(InMemoryPaymentRepository::new()))
    }

    #[tokio::test]
    async fn test_create_and_get_payment() {
        let service = service();

        let created = service.create_payment(create_request(7, 1500)).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.status, PaymentStatus::Created);

        let fetched = service.get_payment(created.id).await.unwrap();
        assert_eq!(fetched.order_id, 7);
        assert_eq!(fetched.amount, 1500);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_amount() {
        let service = service();

        let result = service.create_payment(create_request(7, -1)).await;
        assert!(matches!(result, Err(DomainError::InvalidAmount(_))));
    }

    #[tokio::test]
    async fn test_get_missing_payment() {
        let result = service().get_payment(404).await;
        assert!(matches!(result, Err(DomainError::PaymentNotFound(404))));
    }

    #[tokio::test]
    async fn test_update_keeps_status() {
        let repository = Arc::new(InMemoryPaymentRepository::new());
        let service = PaymentService::new(repository.clone());
        let created = service.create_payment(create_request(7, 1500)).await.unwrap();

        let mut stored = repository.find_by_id(created.id).await.unwrap().unwrap();
        stored.mark_as_confirmed();
        repository.update(&stored).await.unwrap();

        let updated = service
            .update_payment(
                created.id,
                UpdatePaymentRequest {
                    amount: Money::from_cents(3000),
                    name: "João Souza".to_string(),
                    number: "5555444433331111".to_string(),
                    expiration: "01/30".to_string(),
                    security_code: "999".to_string(),
                    payment_method_id: 3,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.amount, 3000);
        assert_eq!(updated.name, "João Souza");
        assert_eq!(updated.status, PaymentStatus::Confirmed);
        assert_eq!(updated.order_id, 7);
    }

    #[tokio::test]
    async fn test_delete_payment() {
        let service = service();
        let created = service.create_payment(create_request(7, 1500)).await.unwrap();

        service.delete_payment(created.id).await.unwrap();

        assert!(matches!(
            service.get_payment(created.id).await,
            Err(DomainError::PaymentNotFound(_))
        ));
        assert!(matches!(
            service.delete_payment(created.id).await,
            Err(DomainError::PaymentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_payments_pages() {
        let service = service();
        for order_id in 1..=12 {
            service.create_payment(create_request(order_id, 100)).await.unwrap();
        }

        let first = service.list_payments(PageRequest::default()).await.unwrap();
        assert_eq!(first.content.len(), 10);
        assert_eq!(first.total_elements, 12);
        assert_eq!(first.total_pages, 2);

        let second = service.list_payments(PageRequest::new(1, 10)).await.unwrap();
        assert_eq!(second.content.len(), 2);
        assert_eq!(second.content[0].order_id, 11);
    }
}
