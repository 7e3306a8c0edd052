use crate::domain::errors::{DomainError, DomainResult};
use serde::Serialize;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// 熔断器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// 正常放行
    Closed,
    /// 直接短路，不发起调用
    Open,
    /// 放行有限的试探调用
    HalfOpen,
}

/// 熔断器配置
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// 依赖名称
    pub name: String,

    /// 滑动窗口大小（按调用次数）
    pub sliding_window_size: usize,

    /// 计算失败率前至少需要的调用次数
    pub minimum_number_of_calls: usize,

    /// 失败率阈值（百分比）
    pub failure_rate_threshold: f64,

    /// 打开状态持续时间
    pub wait_duration_in_open: Duration,

    /// 半开状态允许的试探调用次数
    pub permitted_calls_in_half_open: usize,

    /// 单次调用超时
    pub call_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "order-notifier".to_string(),
            sliding_window_size: 10,
            minimum_number_of_calls: 5,
            failure_rate_threshold: 50.0,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 3,
            call_timeout: Duration::from_secs(2),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> DomainResult<()> {
        if self.sliding_window_size == 0 {
            return Err(DomainError::ConfigurationError(
                "sliding window size must be greater than 0".to_string(),
            ));
        }
        if self.minimum_number_of_calls == 0
            || self.minimum_number_of_calls > self.sliding_window_size
        {
            return Err(DomainError::ConfigurationError(format!(
                "minimum number of calls must be 1-{}",
                self.sliding_window_size
            )));
        }
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 100.0) {
            return Err(DomainError::ConfigurationError(
                "failure rate threshold must be in (0, 100]".to_string(),
            ));
        }
        if self.permitted_calls_in_half_open == 0 {
            return Err(DomainError::ConfigurationError(
                "permitted calls in half-open must be greater than 0".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(DomainError::ConfigurationError(
                "call timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 受保护调用的失败原因
#[derive(Error, Debug)]
pub enum GuardedCallError {
    /// 熔断器打开，调用未发起
    #[error("Circuit breaker '{0}' is open")]
    CircuitOpen(String),

    /// 调用超时
    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    /// 远程调用失败
    #[error("Remote call failed: {0}")]
    Remote(#[source] DomainError),
}

/// 熔断器指标快照
#[derive(Debug, Clone, Serialize)]
pub struct CircuitMetrics {
    pub name: String,
    pub state: CircuitState,
    pub buffered_calls: usize,
    pub failed_calls: usize,
    pub failure_rate: f64,
}

struct Inner {
    state: CircuitState,
    /// 每次状态切换递增，用于丢弃旧状态下发起的调用结果
    generation: u64,
    /// true 表示失败
    outcomes: VecDeque<bool>,
    opened_at: Instant,
    half_open_in_flight: usize,
    half_open_successes: usize,
}

impl Inner {
    fn failed_calls(&self) -> usize {
        self.outcomes.iter().filter(|failed| **failed).count()
    }

    fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.failed_calls() as f64 * 100.0 / self.outcomes.len() as f64
    }
}

/// 熔断器
///
/// 同一依赖的所有调用共享一个实例，内部状态由互斥锁保护，锁不会跨越 await。
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

/// 调用许可，未结算即被丢弃时释放半开试探名额
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, failed: bool) {
        self.settled = true;
        self.breaker.on_outcome(self.generation, failed);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned(self.generation);
        }
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                outcomes: VecDeque::new(),
                opened_at: Instant::now(),
                half_open_in_flight: 0,
                half_open_successes: 0,
            }),
        }
    }

    /// 当前状态（打开状态超过等待时间后在下一次调用时才转为半开）
    #[cfg(test)]
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn metrics(&self) -> CircuitMetrics {
        let inner = self.lock();
        CircuitMetrics {
            name: self.config.name.clone(),
            state: inner.state,
            buffered_calls: inner.outcomes.len(),
            failed_calls: inner.failed_calls(),
            failure_rate: inner.failure_rate(),
        }
    }

    /// 执行受保护的调用
    ///
    /// 熔断器打开时不会调用 `operation`，直接返回 `CircuitOpen`。
    /// 远程错误与超时都会计入失败。
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T, GuardedCallError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DomainResult<T>>,
    {
        let permit = self.try_acquire()?;

        match tokio::time::timeout(self.config.call_timeout, operation()).await {
            Ok(Ok(value)) => {
                permit.settle(false);
                Ok(value)
            }
            Ok(Err(e)) => {
                permit.settle(true);
                Err(GuardedCallError::Remote(e))
            }
            Err(_) => {
                permit.settle(true);
                Err(GuardedCallError::Timeout(self.config.call_timeout))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_acquire(&self) -> Result<Permit<'_>, GuardedCallError> {
        let mut inner = self.lock();

        if inner.state == CircuitState::Open
            && inner.opened_at.elapsed() >= self.config.wait_duration_in_open
        {
            self.transition(&mut inner, CircuitState::HalfOpen);
        }

        let state = inner.state;
        match state {
            CircuitState::Closed => {}
            CircuitState::HalfOpen
                if inner.half_open_in_flight + inner.half_open_successes
                    < self.config.permitted_calls_in_half_open =>
            {
                inner.half_open_in_flight += 1;
            }
            _ => {
                debug!("Circuit breaker '{}' rejected call", self.config.name);
                return Err(GuardedCallError::CircuitOpen(self.config.name.clone()));
            }
        }

        Ok(Permit {
            breaker: self,
            generation: inner.generation,
            settled: false,
        })
    }

    fn on_outcome(&self, generation: u64, failed: bool) {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(
                "Circuit breaker '{}' discarded outcome from a previous state",
                self.config.name
            );
            return;
        }

        let state = inner.state;
        match state {
            CircuitState::Closed => {
                inner.outcomes.push_back(failed);
                while inner.outcomes.len() > self.config.sliding_window_size {
                    inner.outcomes.pop_front();
                }

                if inner.outcomes.len() >= self.config.minimum_number_of_calls
                    && inner.failure_rate() >= self.config.failure_rate_threshold
                {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
                if failed {
                    self.transition(&mut inner, CircuitState::Open);
                } else {
                    inner.half_open_successes += 1;
                    if inner.half_open_successes >= self.config.permitted_calls_in_half_open {
                        self.transition(&mut inner, CircuitState::Closed);
                    }
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_abandoned(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        let failure_rate = inner.failure_rate();

        inner.state = to;
        inner.generation += 1;
        inner.outcomes.clear();
        inner.half_open_in_flight = 0;
        inner.half_open_successes = 0;
        if to == CircuitState::Open {
            inner.opened_at = Instant::now();
        }

        match to {
            CircuitState::Open => warn!(
                "Circuit breaker '{}' opened ({:?} -> {:?}, failure rate {:.1}%)",
                self.config.name, from, to, failure_rate
            ),
            _ => info!(
                "Circuit breaker '{}' transitioned {:?} -> {:?}",
                self.config.name, from, to
            ),
        }
    }
}
