//! 计数协议：把一次被拦截的调用翻译为对命名计数器的修改。
//!
//! # 教案式概览
//! - **意图（Why）**：累计调用量、在途调用数与按阶段计的速率是最常见的三种调用级指标，
//!   它们的差别只在“哪个钩子修改计数器、修改方向如何”；
//! - **结构（How）**：[`CounterAdvice`] 实现 [`Advice`]，按 [`CounterMode`] 在进入、异常与退出钩子上修改
//!   [`MetricHandle`]。句柄在首次调用时通过 [`MetricRegistry`] 解析并缓存在 `OnceLock` 中；
//! - **契约（What）**：
//!   - 计数器不可用（解析返回 `None`）时所有钩子都是空操作，被拦截的调用照常执行；
//!   - 行为从不改变调用结果，也从不返回错误；
//! - **风险提示（Trade-offs）**：解析结果（包括 `None`）在行为生命周期内固定，
//!   与注册表“失败键永久禁用”的语义一致。

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use weave_core::{
    Advice, CallContext, CallOutcome, ConfigError, CounterDirections, CounterKind,
    CounterSettings, EntryFlow, ExceptionFlow, MetricHandle, MetricKind, MetricRegistry,
};

/// 计数语义。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterMode {
    /// 进入时递增 `step`，之后不再变化。
    Cumulative { step: i64 },
    /// 进入时递增 `step`，退出时（无论成功与否）递减同样的 `step`。
    InFlight { step: i64 },
    /// 在掩码声明的阶段递增 1：进入、完成（成功与失败都算）、出错。
    Rate { directions: CounterDirections },
}

impl CounterMode {
    fn from_settings(settings: &CounterSettings) -> Self {
        match settings.kind {
            CounterKind::Cumulative => CounterMode::Cumulative {
                step: settings.step,
            },
            CounterKind::InFlight => CounterMode::InFlight {
                step: settings.step,
            },
            CounterKind::Rate => CounterMode::Rate {
                directions: settings.directions,
            },
        }
    }

    fn fires_on(self, direction: CounterDirections) -> bool {
        matches!(self, CounterMode::Rate { directions } if directions.contains(direction))
    }
}

/// 计数行为。
pub struct CounterAdvice {
    category: String,
    counter: String,
    kind: MetricKind,
    mode: CounterMode,
    registry: Arc<MetricRegistry>,
    handle: OnceLock<Option<Arc<MetricHandle>>>,
}

impl CounterAdvice {
    /// 校验配置并绑定到给定注册表；计数器在首次调用时才解析。
    pub fn new(
        settings: &CounterSettings,
        registry: Arc<MetricRegistry>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            category: settings.category.clone(),
            counter: settings.counter.clone(),
            kind: settings.metric_kind(),
            mode: CounterMode::from_settings(settings),
            registry,
            handle: OnceLock::new(),
        })
    }

    /// 绑定到进程级注册表。
    pub fn global(settings: &CounterSettings) -> Result<Self, ConfigError> {
        Self::new(settings, MetricRegistry::global())
    }

    pub fn mode(&self) -> CounterMode {
        self.mode
    }

    /// 已解析的计数器句柄；计数器不可用时为 `None`。
    pub fn handle(&self) -> Option<&Arc<MetricHandle>> {
        self.handle
            .get_or_init(|| {
                let handle = self.registry.resolve(&self.category, &self.counter, self.kind);
                if handle.is_none() {
                    tracing::debug!(
                        target: "weave::metrics",
                        category = %self.category,
                        counter = %self.counter,
                        "counter unavailable; advice is a no-op"
                    );
                }
                handle
            })
            .as_ref()
    }

    fn bump(&self, step: i64) {
        if let Some(handle) = self.handle() {
            handle.increment_by(step);
        }
    }
}

impl<T, E> Advice<T, E> for CounterAdvice {
    fn on_entry(&self, _call: &CallContext<'_>) -> Result<EntryFlow<T>, E> {
        match self.mode {
            CounterMode::Cumulative { step } | CounterMode::InFlight { step } => self.bump(step),
            mode if mode.fires_on(CounterDirections::BEFORE_INVOKE) => self.bump(1),
            CounterMode::Rate { .. } => {}
        }
        Ok(EntryFlow::Proceed)
    }

    fn on_exception(&self, _call: &CallContext<'_>, _error: &E) -> ExceptionFlow<T, E> {
        if self.mode.fires_on(CounterDirections::ON_EXCEPTION) {
            self.bump(1);
        }
        ExceptionFlow::Rethrow
    }

    fn on_exit(&self, _call: &CallContext<'_>, _outcome: CallOutcome<'_, T, E>) {
        match self.mode {
            CounterMode::InFlight { step } => self.bump(step.wrapping_neg()),
            mode if mode.fires_on(CounterDirections::AFTER_INVOKE) => self.bump(1),
            _ => {}
        }
    }
}

impl fmt::Debug for CounterAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterAdvice")
            .field("category", &self.category)
            .field("counter", &self.counter)
            .field("mode", &self.mode)
            .field("resolved", &self.handle.get().map(Option::is_some))
            .finish()
    }
}
