use crate::domain::errors::{DomainError, DomainResult};
use crate::infrastructure::config::OrderServiceConfig;
use crate::ports::order_notifier_port::OrderNotifierPort;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

/// 订单服务HTTP通知适配器
#[derive(Clone)]
pub struct HttpOrderNotifier {
    config: OrderServiceConfig,
    client: Client,
}

impl HttpOrderNotifier {
    pub fn new(config: OrderServiceConfig) -> DomainResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// 生成订单已支付接口地址
    fn order_paid_url(&self, order_id: i64) -> String {
        let path = self
            .config
            .paid_path
            .replace("{order_id}", &order_id.to_string());
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl OrderNotifierPort for HttpOrderNotifier {
    /// 通知订单已支付
    async fn notify_payment_confirmed(&self, order_id: i64) -> DomainResult<()> {
        let url = self.order_paid_url(order_id);
        debug!("Notifying order service: PUT {}", url);

        let response = self.client.put(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Order service error: {} - {}", status, error_text);
            return Err(DomainError::OrderServiceError(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }

        debug!("Order {} marked as paid", order_id);
        Ok(())
    }
}
