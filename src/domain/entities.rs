use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::value_objects::{Money, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 持卡人姓名最大长度
const MAX_NAME_LEN: usize = 100;

/// 支付记录实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// 支付ID（由存储分配，0 表示尚未持久化）
    pub id: i64,

    /// 关联的订单ID，创建后不可修改
    pub order_id: i64,

    /// 支付金额
    pub amount: Money,

    /// 持卡人姓名
    pub name: String,

    /// 卡号
    pub number: String,

    /// 有效期
    pub expiration: String,

    /// 安全码
    pub security_code: String,

    /// 支付方式ID
    pub payment_method_id: i64,

    /// 支付状态
    pub status: PaymentStatus,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 可修改的描述性字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    pub amount: Money,
    pub name: String,
    pub number: String,
    pub expiration: String,
    pub security_code: String,
    pub payment_method_id: i64,
}

impl PaymentDetails {
    fn validate(&self) -> DomainResult<()> {
        if !self.amount.is_positive() {
            return Err(DomainError::InvalidAmount(
                "Amount must be greater than 0".to_string(),
            ));
        }

        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::ValidationError(format!(
                "Name must be 1-{} characters",
                MAX_NAME_LEN
            )));
        }

        Ok(())
    }
}

impl Payment {
    /// 创建新的支付记录，初始状态为 CREATED
    pub fn new(order_id: i64, details: PaymentDetails) -> DomainResult<Self> {
        details.validate()?;

        let now = Utc::now();

        Ok(Self {
            id: 0,
            order_id,
            amount: details.amount,
            name: details.name,
            number: details.number,
            expiration: details.expiration,
            security_code: details.security_code,
            payment_method_id: details.payment_method_id,
            status: PaymentStatus::Created,
            created_at: now,
            updated_at: now,
        })
    }

    /// 标记为已确认
    ///
    /// 任何状态都可以进入 CONFIRMED；对 CONFIRMED_NO_INTEGRATION 再次确认即为重试。
    pub fn mark_as_confirmed(&mut self) {
        self.status = PaymentStatus::Confirmed;
        self.updated_at = Utc::now();
    }

    /// 标记为已确认但未完成订单集成
    pub fn mark_as_confirmed_without_integration(&mut self) -> DomainResult<()> {
        if self.status == PaymentStatus::Created {
            return Err(DomainError::InvalidState {
                expected: "CONFIRMED".to_string(),
                actual: self.status.to_string(),
            });
        }

        self.status = PaymentStatus::ConfirmedNoIntegration;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 更新描述性字段，状态与订单ID保持不变
    pub fn update_details(&mut self, details: PaymentDetails) -> DomainResult<()> {
        details.validate()?;

        self.amount = details.amount;
        self.name = details.name;
        self.number = details.number;
        self.expiration = details.expiration;
        self.security_code = details.security_code;
        self.payment_method_id = details.payment_method_id;
        self.updated_at = Utc::now();
        Ok(())
    }
}
