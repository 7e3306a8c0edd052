use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::{Money, Page, PageRequest, Payment, PaymentStatus};
use crate::ports::payment_repository_port::PaymentRepositoryPort;
use async_trait::async_trait;
use sqlx::{MySql, Pool};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// MySQL支付记录仓储实现
///
/// 每条语句都受 `query_timeout` 限制，数据库卡住时返回错误而不是一直挂起。
#[derive(Clone)]
pub struct MySqlPaymentRepository {
    pool: Arc<Pool<MySql>>,
    query_timeout: Duration,
}

impl MySqlPaymentRepository {
    pub fn new(pool: Arc<Pool<MySql>>, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }
}

/// 在限定时间内执行一次数据库操作
async fn bounded<T, F>(limit: Duration, query: F) -> DomainResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, query).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            error!("Database query timed out after {:?}", limit);
            Err(DomainError::DatabaseTimeout(limit))
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, order_id, amount_cents, name, number, expiration,
           security_code, payment_method_id, status, created_at, updated_at
    FROM payments
"#;

#[async_trait]
impl PaymentRepositoryPort for MySqlPaymentRepository {
    /// 新增支付记录
    async fn save(&self, payment: &Payment) -> DomainResult<Payment> {
        let query = r#"
            INSERT INTO payments (
                order_id, amount_cents, name, number, expiration,
                security_code, payment_method_id, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let insert = sqlx::query(query)
            .bind(payment.order_id)
            .bind(payment.amount.to_cents())
            .bind(&payment.name)
            .bind(&payment.number)
            .bind(&payment.expiration)
            .bind(&payment.security_code)
            .bind(payment.payment_method_id)
            .bind(payment.status.as_str())
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .execute(self.pool.as_ref());
        let result = bounded(self.query_timeout, insert).await?;

        let id = i64::try_from(result.last_insert_id()).map_err(|_| {
            DomainError::InternalError("Generated payment id out of range".to_string())
        })?;

        let mut saved = payment.clone();
        saved.id = id;

        debug!("Payment saved: {}", saved.id);
        Ok(saved)
    }

    /// 根据ID查找支付记录
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Payment>> {
        let query = format!("{} WHERE id = ?", SELECT_COLUMNS);

        let select = sqlx::query_as::<_, PaymentRow>(&query)
            .bind(id)
            .fetch_optional(self.pool.as_ref());
        let result = bounded(self.query_timeout, select).await?;

        result.map(Payment::try_from).transpose()
    }

    /// 更新支付记录
    async fn update(&self, payment: &Payment) -> DomainResult<()> {
        let query = r#"
            UPDATE payments
            SET amount_cents = ?, name = ?, number = ?, expiration = ?,
                security_code = ?, payment_method_id = ?, status = ?, updated_at = ?
            WHERE id = ?
        "#;

        let update = sqlx::query(query)
            .bind(payment.amount.to_cents())
            .bind(&payment.name)
            .bind(&payment.number)
            .bind(&payment.expiration)
            .bind(&payment.security_code)
            .bind(payment.payment_method_id)
            .bind(payment.status.as_str())
            .bind(payment.updated_at)
            .bind(payment.id)
            .execute(self.pool.as_ref());
        let rows_affected = bounded(self.query_timeout, update)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            error!("No payment found to update: {}", payment.id);
            return Err(DomainError::PaymentNotFound(payment.id));
        }

        debug!("Payment updated: {} ({})", payment.id, payment.status);
        Ok(())
    }

    /// 删除支付记录
    async fn delete(&self, id: i64) -> DomainResult<()> {
        let query = "DELETE FROM payments WHERE id = ?";

        let delete = sqlx::query(query).bind(id).execute(self.pool.as_ref());
        let rows_affected = bounded(self.query_timeout, delete)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(DomainError::PaymentNotFound(id));
        }

        debug!("Payment deleted: {}", id);
        Ok(())
    }

    /// 分页查询（按ID升序）
    async fn find_page(&self, request: PageRequest) -> DomainResult<Page<Payment>> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(self.pool.as_ref());
        let total: i64 = bounded(self.query_timeout, count).await?;

        let query = format!("{} ORDER BY id LIMIT ? OFFSET ?", SELECT_COLUMNS);
        let select = sqlx::query_as::<_, PaymentRow>(&query)
            .bind(u64::from(request.size))
            .bind(request.offset())
            .fetch_all(self.pool.as_ref());
        let rows = bounded(self.query_timeout, select).await?;

        let content = rows
            .into_iter()
            .map(Payment::try_from)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(Page::new(content, request, total.max(0) as u64))
    }
}

/// 数据库行结构体
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    order_id: i64,
    amount_cents: i64,
    name: String,
    number: String,
    expiration: String,
    security_code: String,
    payment_method_id: i64,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row.status.parse()?;

        Ok(Payment {
            id: row.id,
            order_id: row.order_id,
            amount: Money::from_cents(row.amount_cents),
            name: row.name,
            number: row.number,
            expiration: row.expiration,
            security_code: row.security_code,
            payment_method_id: row.payment_method_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
