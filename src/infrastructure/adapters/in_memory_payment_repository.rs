use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Page, PageRequest, Payment};
use crate::ports::payment_repository_port::PaymentRepositoryPort;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Store {
    payments: BTreeMap<i64, Payment>,
    last_id: i64,
}

/// 内存支付记录仓储
///
/// 未配置数据库时使用，也用于测试。ID 自增分配，按 ID 升序分页。
#[derive(Default, Clone)]
pub struct InMemoryPaymentRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按原ID写入一条记录，后续分配的ID不会与之冲突
    #[cfg(test)]
    pub async fn insert(&self, payment: Payment) {
        let mut store = self.store.write().await;
        store.last_id = store.last_id.max(payment.id);
        store.payments.insert(payment.id, payment);
    }
}

#[async_trait]
impl PaymentRepositoryPort for InMemoryPaymentRepository {
    async fn save(&self, payment: &Payment) -> DomainResult<Payment> {
        let mut store = self.store.write().await;
        store.last_id += 1;

        let mut saved = payment.clone();
        saved.id = store.last_id;
        store.payments.insert(saved.id, saved.clone());

        debug!("Payment saved in memory: {}", saved.id);
        Ok(saved)
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Payment>> {
        let store = self.store.read().await;
        Ok(store.payments.get(&id).cloned())
    }

    async fn update(&self, payment: &Payment) -> DomainResult<()> {
        let mut store = self.store.write().await;
        match store.payments.get_mut(&payment.id) {
            Some(existing) => {
                *existing = payment.clone();
                Ok(())
            }
            None => Err(DomainError::PaymentNotFound(payment.id)),
        }
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        let mut store = self.store.write().await;
        store
            .payments
            .remove(&id)
            .map(|_| ())
            .ok_or(DomainError::PaymentNotFound(id))
    }

    async fn find_page(&self, request: PageRequest) -> DomainResult<Page<Payment>> {
        let store = self.store.read().await;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let content = store
            .payments
            .values()
            .skip(offset)
            .take(request.size as usize)
            .cloned()
            .collect();

        Ok(Page::new(content, request, store.payments.len() as u64))
    }
}
