use crate::domain::{Money, Payment, PaymentDetails, PaymentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 创建支付请求
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// 订单ID
    pub order_id: i64,

    /// 支付金额（分）
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
}

impl CreatePaymentRequest {
    pub fn into_parts(self) -> (i64, PaymentDetails) {
        (
            self.order_id,
            PaymentDetails {
                amount: self.amount,
                name: self.name,
                number: self.number,
                expiration: self.expiration,
                security_code: self.security_code,
                payment_method_id: self.payment_method_id,
            },
        )
    }
}

/// 更新支付请求（状态和订单ID不可修改）
#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub amount: Money,
    pub name: String,
    pub number: String,
    pub expiration: String,
    pub security_code: String,
    pub payment_method_id: i64,
}

impl From<UpdatePaymentRequest> for PaymentDetails {
    fn from(request: UpdatePaymentRequest) -> Self {
        Self {
            amount: request.amount,
            name: request.name,
            number: request.number,
            expiration: request.expiration,
            security_code: request.security_code,
            payment_method_id: request.payment_method_id,
        }
    }
}

/// 支付响应（不返回安全码）
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: i64,
    pub order_id: i64,
    pub amount: i64,
    pub name: String,
    pub number: String,
    pub expiration: String,
    pub payment_method_id: i64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            order_id: payment.order_id,
            amount: payment.amount.to_cents(),
            name: payment.name,
            number: payment.number,
            expiration: payment.expiration,
            payment_method_id: payment.payment_method_id,
            status: payment.status,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

/// 错误响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: String, message: String) -> Self {
        Self { error, message }
    }
}
