//! 按调用点配置装配拦截链。
//!
//! # 教案式概览
//! - **意图（Why）**：宿主通常以配置文件声明“哪个方法挂哪些行为”，装配代码应只有一处；
//! - **结构（How）**：[`SiteAssembler`] 读取 [`SiteSettings`]，按固定顺序（由外到内）构造行为：
//!   类型同步 → 调用日志 → 耗时剖析 → 异常处理 → 参数检查 → 计数 → 结果缓存 → 重试；
//! - **契约（What）**：
//!   - 任一配置非法时整条链装配失败，返回 [`ConfigError`]，不会得到部分挂载的链；
//!   - 类型同步位于最外层，等待或跳过发生在任何日志与计数之前；
//!   - 重试位于最内层，只重复执行被拦截的调用本身，外层行为对一次调用只触发一次；
//!   - 缓存位于重试外侧，命中时不会进入重试；
//!   - 参数检查位于计数外侧，被拒绝的调用不计数。

use std::{error::Error, sync::Arc};

use weave_core::{
    ArgumentError, CallSite, Clock, ConfigError, InterceptorChain, Logger, MetricRegistry, Pause,
    SiteSettings, SystemClock,
};

use crate::{
    ArgumentCheckAdvice, CachingAdvice, CounterAdvice, HandleExceptionAdvice, LogCallsAdvice,
    RetryInterceptor, TimeProfileAdvice, TypeLocks, TypeSyncInterceptor,
};

/// 调用点装配器。
pub struct SiteAssembler {
    registry: Arc<MetricRegistry>,
    clock: Arc<dyn Clock>,
    logger: Option<Arc<dyn Logger>>,
    pause: Option<Arc<dyn Pause>>,
    locks: Arc<TypeLocks>,
}

impl SiteAssembler {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self {
            registry,
            clock: Arc::new(SystemClock),
            logger: None,
            pause: None,
            locks: TypeLocks::global(),
        }
    }

    /// 使用进程级指标注册表。
    pub fn global() -> Self {
        Self::new(MetricRegistry::global())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 让所有写日志的行为都使用给定 Logger，跳过字段查找。
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = Some(pause);
        self
    }

    /// 使用给定锁表代替进程级锁表。
    pub fn with_type_locks(mut self, locks: Arc<TypeLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn assemble<T, E>(
        &self,
        site: &CallSite,
        settings: &SiteSettings,
    ) -> Result<InterceptorChain<T, E>, ConfigError>
    where
        T: Clone + Default + Send + Sync + 'static,
        E: Error + From<ArgumentError> + Send + Sync + 'static,
    {
        settings.validate(&site.to_string())?;
        let mut chain = InterceptorChain::new();

        if let Some(type_sync) = &settings.type_sync {
            chain = chain.with(TypeSyncInterceptor::new(site, type_sync, &self.locks));
        }
        if let Some(log_calls) = &settings.log_calls {
            let mut advice = LogCallsAdvice::new(site, log_calls);
            if let Some(logger) = &self.logger {
                advice = advice.with_logger(Arc::clone(logger));
            }
            chain = chain.with_advice(advice);
        }
        if let Some(profile) = &settings.profile {
            let mut advice =
                TimeProfileAdvice::new(site, profile).with_clock(Arc::clone(&self.clock));
            if let Some(logger) = &self.logger {
                advice = advice.with_logger(Arc::clone(logger));
            }
            chain = chain.with_advice(advice);
        }
        if let Some(handle_exception) = &settings.handle_exception {
            let mut advice = HandleExceptionAdvice::<E>::new(site, handle_exception);
            if let Some(logger) = &self.logger {
                advice = advice.with_logger(Arc::clone(logger));
            }
            chain = chain.with_advice(advice);
        }
        for check in &settings.argument_checks {
            chain = chain.with_advice(ArgumentCheckAdvice::new(site, check)?);
        }
        for counter in &settings.counters {
            chain = chain.with_advice(CounterAdvice::new(counter, Arc::clone(&self.registry))?);
        }
        if let Some(caching) = &settings.caching {
            let advice =
                CachingAdvice::<T>::new(site, caching)?.with_clock(Arc::clone(&self.clock));
            chain = chain.with_advice(advice);
        }
        if let Some(retry) = &settings.retry {
            let mut interceptor = RetryInterceptor::<E>::from_settings(site, retry)?;
            if let Some(logger) = &self.logger {
                interceptor = interceptor.with_logger(Arc::clone(logger));
            }
            if let Some(pause) = &self.pause {
                interceptor = interceptor.with_pause(Arc::clone(pause));
            }
            chain = chain.with(interceptor);
        }

        tracing::debug!(
            target: "weave",
            site = %site,
            behaviors = chain.len(),
            "interceptor chain assembled"
        );
        Ok(chain)
    }
}

impl std::fmt::Debug for SiteAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteAssembler")
            .field("logger", &self.logger.is_some())
            .field("pause", &self.pause.is_some())
            .finish()
    }
}
