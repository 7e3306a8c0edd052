use crate::domain::errors::DomainResult;
use async_trait::async_trait;

/// 订单服务通知端口接口
#[async_trait]
pub trait OrderNotifierPort: Send + Sync {
    /// 通知订单服务该订单已支付
    async fn notify_payment_confirmed(&self, order_id: i64) -> DomainResult<()>;
}
