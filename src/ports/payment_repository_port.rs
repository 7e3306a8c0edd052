use crate::domain::errors::DomainResult;
use crate::domain::{Page, PageRequest, Payment};
use async_trait::async_trait;

/// 支付记录仓储端口接口
#[async_trait]
pub trait PaymentRepositoryPort: Send + Sync {
    /// 新增支付记录，返回分配了ID的记录
    async fn save(&self, payment: &Payment) -> DomainResult<Payment>;

    /// 根据ID查找支付记录
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Payment>>;

    /// 更新支付记录
    async fn update(&self, payment: &Payment) -> DomainResult<()>;

    /// 删除支付记录
    async fn delete(&self, id: i64) -> DomainResult<()>;

    /// 分页查询
    async fn find_page(&self, request: PageRequest) -> DomainResult<Page<Payment>>;
}
