use std::{error::Error, fmt, sync::Arc};

use weave_core::{
    CallContext, CallSite, ConfigError, ErrorFilter, Interceptor, Logger, Pause, RetryExecutor,
    RetryOutcome, RetryPolicy, RetrySettings, default_logger,
};

use crate::collaborator::LoggerLookup;

/// 重试拦截器：以 [`RetryExecutor`] 包装链中位于其内侧的全部调用。
///
/// # 教案式说明
/// - **意图（Why）**：把重试从业务代码中移出，并让诊断写进所有者声明的 Logger；
/// - **结构（How）**：装配时构造一次执行器与 [`LoggerLookup`]；每次调用解析 Logger 后交给
///   [`RetryExecutor::execute_with`]，执行器在多次调用之间共享；
/// - **契约（What）**：
///   - 成功时返回被拦截调用的值；
///   - 耗尽且策略选择吞掉错误，或遇到按策略吞掉的不匹配错误时，返回 `T::default()`，调用方看到无错误的完成；
///   - 其余情况原样返回错误。
pub struct RetryInterceptor<E> {
    executor: RetryExecutor<E>,
    loggers: LoggerLookup,
}

impl<E> RetryInterceptor<E>
where
    E: Error + 'static,
{
    pub fn new(site: &CallSite, policy: RetryPolicy<E>) -> Self {
        let operation = site.to_string();
        Self {
            executor: RetryExecutor::new(policy).with_operation(operation),
            loggers: LoggerLookup::for_site(site, default_logger()),
        }
    }

    /// 由配置构造；过滤器默认匹配全部错误。
    pub fn from_settings(site: &CallSite, settings: &RetrySettings) -> Result<Self, ConfigError> {
        Ok(Self::new(site, RetryPolicy::from_settings(settings)?))
    }

    pub fn with_filter(mut self, filter: ErrorFilter<E>) -> Self {
        let policy = self.executor.policy().clone().with_filter(filter);
        self.executor = self.executor.with_policy(policy);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.loggers = LoggerLookup::explicit(logger);
        self
    }

    pub fn with_loggers(mut self, loggers: LoggerLookup) -> Self {
        self.loggers = loggers;
        self
    }

    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.executor = self.executor.with_pause(pause);
        self
    }

    pub fn executor(&self) -> &RetryExecutor<E> {
        &self.executor
    }
}

impl<T, E> Interceptor<T, E> for RetryInterceptor<E>
where
    T: Default,
    E: Error + 'static,
{
    fn intercept(
        &self,
        call: &CallContext<'_>,
        next: &mut dyn FnMut() -> Result<T, E>,
    ) -> Result<T, E> {
        let logger = self.loggers.resolve(call);
        match self.executor.execute_with(&*logger, &mut *next)? {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Exhausted { .. } | RetryOutcome::Abandoned { .. } => Ok(T::default()),
        }
    }
}

impl<E> fmt::Debug for RetryInterceptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryInterceptor")
            .field("executor", &self.executor)
            .field("loggers", &self.loggers)
            .finish()
    }
}
