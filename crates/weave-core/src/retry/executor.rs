use std::{error::Error, fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    config::RetrySettings,
    error::ConfigError,
    observability::{Logger, default_logger},
    retry::{
        filter::ErrorFilter,
        pause::{Pause, ThreadSleep},
    },
};

/// 不匹配过滤器的错误如何处理。
///
/// - `Propagate`（默认）：立即把错误交还调用方，不消耗重试次数，也不写日志；
/// - `Swallow`：吞掉错误并以 [`RetryOutcome::Abandoned`] 结束，同样不写日志。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedErrorPolicy {
    #[default]
    Propagate,
    Swallow,
}

/// 重试策略。
///
/// # 教案式说明
/// - **契约（What）**：
///   - `max_retries` 为总尝试次数上限，至少为 1，构造时校验；
///   - `delay` 在第二次及之后的尝试前等待，零表示不等待；
///   - `raise_after_retries` 为 `true`（默认）时耗尽后返回最后一次的原始错误，否则吞掉错误；
///   - `message` 作为耗尽日志的前缀。
pub struct RetryPolicy<E> {
    max_retries: u32,
    delay: Duration,
    filter: ErrorFilter<E>,
    raise_after_retries: bool,
    message: Option<String>,
    unmatched: UnmatchedErrorPolicy,
}

impl<E> RetryPolicy<E> {
    pub fn new(max_retries: u32) -> Result<Self, ConfigError> {
        if max_retries == 0 {
            return Err(ConfigError::InvalidRetryCount(max_retries));
        }
        Ok(Self {
            max_retries,
            delay: Duration::ZERO,
            filter: ErrorFilter::Any,
            raise_after_retries: true,
            message: None,
            unmatched: UnmatchedErrorPolicy::default(),
        })
    }

    /// 由配置构造，过滤器保持 [`ErrorFilter::Any`]，需要时再以 [`Self::with_filter`] 收窄。
    pub fn from_settings(settings: &RetrySettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let policy = Self::new(settings.max_retries)?
            .with_delay(Duration::from_millis(settings.delay_ms))
            .raise_after_retries(settings.raise_after_retries)
            .with_unmatched(settings.unmatched);
        Ok(match &settings.message {
            Some(message) => policy.with_message(message.clone()),
            None => policy,
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_filter(mut self, filter: ErrorFilter<E>) -> Self {
        self.filter = filter;
        self
    }

    pub fn raise_after_retries(mut self, raise: bool) -> Self {
        self.raise_after_retries = raise;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_unmatched(mut self, unmatched: UnmatchedErrorPolicy) -> Self {
        self.unmatched = unmatched;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn filter(&self) -> &ErrorFilter<E> {
        &self.filter
    }

    pub fn raises_after_retries(&self) -> bool {
        self.raise_after_retries
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn unmatched(&self) -> UnmatchedErrorPolicy {
        self.unmatched
    }
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_retries: self.max_retries,
            delay: self.delay,
            filter: self.filter.clone(),
            raise_after_retries: self.raise_after_retries,
            message: self.message.clone(),
            unmatched: self.unmatched,
        }
    }
}

impl<E> fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .field("filter", &self.filter)
            .field("raise_after_retries", &self.raise_after_retries)
            .field("message", &self.message)
            .field("unmatched", &self.unmatched)
            .finish()
    }
}

/// 单次执行的尝试状态。
///
/// 状态只前进不回退：`Attempting` 在失败时累加，达到上限后进入 `Exhausted`，成功时进入 `Succeeded`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    Attempting { failures: u32 },
    Succeeded { failures: u32 },
    Exhausted { failures: u32 },
}

impl RetryState {
    pub fn start() -> Self {
        RetryState::Attempting { failures: 0 }
    }

    pub fn failures(self) -> u32 {
        match self {
            RetryState::Attempting { failures }
            | RetryState::Succeeded { failures }
            | RetryState::Exhausted { failures } => failures,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RetryState::Attempting { .. })
    }

    /// 记录一次匹配过滤器的失败。
    pub fn record_failure(self, max_retries: u32) -> Self {
        match self {
            RetryState::Attempting { failures } => {
                let failures = failures.saturating_add(1);
                if failures >= max_retries {
                    RetryState::Exhausted { failures }
                } else {
                    RetryState::Attempting { failures }
                }
            }
            terminal => terminal,
        }
    }

    pub fn succeed(self) -> Self {
        match self {
            RetryState::Attempting { failures } => RetryState::Succeeded { failures },
            terminal => terminal,
        }
    }
}

/// 执行结果；`attempts` 为实际调用被包装操作的次数。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    /// 全部尝试失败且策略选择吞掉错误。
    Exhausted { attempts: u32 },
    /// 遇到不匹配过滤器的错误且策略选择吞掉错误。
    Abandoned { attempts: u32 },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. }
            | RetryOutcome::Exhausted { attempts }
            | RetryOutcome::Abandoned { attempts } => *attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// 有界重试执行器。
///
/// # 教案式说明
/// - **意图（Why）**：把“调用、判定、等待、记录、再调用”的循环从业务代码中剥离，
///   并让失败策略（过滤、耗尽后抛出或吞掉、不匹配错误的处理）可配置；
/// - **结构（How）**：以 [`RetryState`] 驱动循环；等待通过 [`Pause`] 注入，日志通过 [`Logger`] 注入；
/// - **契约（What）**：
///   - 第一次尝试前从不等待；
///   - 匹配的失败未达上限时以 `info` 记录错误并继续；达到上限时以 `error` 记录，随后按策略返回原始错误或
///     [`RetryOutcome::Exhausted`]；
///   - 不匹配的失败按 [`UnmatchedErrorPolicy`] 处理，不写日志，不计入尝试次数；
///   - 只约束尝试次数，不约束总耗时。
pub struct RetryExecutor<E> {
    policy: RetryPolicy<E>,
    logger: Arc<dyn Logger>,
    pause: Arc<dyn Pause>,
    operation: Option<String>,
}

impl<E> RetryExecutor<E>
where
    E: Error + 'static,
{
    pub fn new(policy: RetryPolicy<E>) -> Self {
        Self {
            policy,
            logger: default_logger(),
            pause: Arc::new(ThreadSleep),
            operation: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    /// 替换策略，保留 Logger、暂停器与操作名称。
    pub fn with_policy(mut self, policy: RetryPolicy<E>) -> Self {
        self.policy = policy;
        self
    }

    /// 为日志消息附上被重试操作的名称，例如 `Orders.place`。
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn execute<T, F>(&self, operation: F) -> Result<RetryOutcome<T>, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.execute_with(&*self.logger, operation)
    }

    /// 与 [`Self::execute`] 相同，但本次执行的日志写入 `logger`。
    ///
    /// 拦截器按调用所有者查找 Logger 时使用，执行器本身保持不变，可在多次调用之间共享。
    pub fn execute_with<T, F>(
        &self,
        logger: &dyn Logger,
        mut operation: F,
    ) -> Result<RetryOutcome<T>, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        let max_retries = self.policy.max_retries;
        let mut state = RetryState::start();
        loop {
            let failures = state.failures();
            if failures > 0 && !self.policy.delay.is_zero() {
                self.pause.pause(self.policy.delay);
            }

            let error = match operation() {
                Ok(value) => {
                    state = state.succeed();
                    return Ok(RetryOutcome::Succeeded {
                        value,
                        attempts: state.failures() + 1,
                    });
                }
                Err(error) => error,
            };

            if !self.policy.filter.matches(&error) {
                return match self.policy.unmatched {
                    UnmatchedErrorPolicy::Propagate => Err(error),
                    UnmatchedErrorPolicy::Swallow => Ok(RetryOutcome::Abandoned {
                        attempts: failures + 1,
                    }),
                };
            }

            state = state.record_failure(max_retries);
            if let RetryState::Exhausted { failures } = state {
                logger.error(&self.exhausted_message(failures), Some(&error));
                return if self.policy.raise_after_retries {
                    Err(error)
                } else {
                    Ok(RetryOutcome::Exhausted { attempts: failures })
                };
            }
            logger.info(
                &self.retry_message(state.failures(), max_retries),
                Some(&error),
            );
        }
    }

    fn retry_message(&self, failures: u32, max_retries: u32) -> String {
        match &self.operation {
            Some(operation) => {
                format!("{operation}: attempt {failures} of {max_retries} failed, retrying")
            }
            None => format!("attempt {failures} of {max_retries} failed, retrying"),
        }
    }

    fn exhausted_message(&self, failures: u32) -> String {
        let mut message = String::new();
        if let Some(prefix) = &self.policy.message {
            message.push_str(prefix);
            message.push(' ');
        }
        if let Some(operation) = &self.operation {
            message.push_str(operation);
            message.push_str(": ");
        }
        message.push_str(&format!("giving up after {failures} attempts"));
        message
    }
}

impl<E> fmt::Debug for RetryExecutor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .field("operation", &self.operation)
            .finish()
    }
}
