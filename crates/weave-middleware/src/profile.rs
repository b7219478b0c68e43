//! 耗时剖析：测量一次调用的墙钟耗时并按统一格式记录。
//!
//! # 教案式概览
//! - **意图（Why）**：统一格式的耗时记录便于直接从日志中筛选与统计；开启层级后，
//!   嵌套调用的记录会带上外层作用域链，能看出耗时发生在哪条调用路径上；
//! - **结构（How）**：每个线程一个作用域栈，进入时压入 `(类型名, 消息, 起始时间, 是否参与层级)`，
//!   退出时弹出并计算耗时；时间来源为可注入的 [`Clock`]；
//! - **契约（What）**：
//!   - 记录格式 `<Type> <message> <Elapsed Nms>`；
//!   - 层级开启且外层仍有参与层级的作用域时，追加 ` <depth::Type:message.Type:message>`，
//!     `depth` 为外层参与层级的作用域数量，链按由外到内排列；
//!   - 默认级别 `info`，默认 Logger 名称 `Profiler`。
//! - **风险提示（Trade-offs）**：作用域栈依赖钩子在同一线程上成对触发；拦截宿主保证进入与退出在调用方线程上执行。

use std::{cell::RefCell, fmt, sync::Arc, time::Instant};

use weave_core::{
    Advice, CallContext, CallOutcome, CallSite, Clock, EntryFlow, LogLevel, Logger,
    ProfileSettings, SystemClock, format_template, observability::named_logger,
};

struct Scope {
    category: &'static str,
    name: String,
    started: Instant,
    nested: bool,
}

thread_local! {
    static SCOPES: RefCell<Vec<Scope>> = const { RefCell::new(Vec::new()) };
}

/// 耗时剖析行为。
pub struct TimeProfileAdvice {
    category: &'static str,
    template: String,
    level: LogLevel,
    hierarchy: bool,
    logger: Arc<dyn Logger>,
    clock: Arc<dyn Clock>,
}

impl TimeProfileAdvice {
    pub fn new(site: &CallSite, settings: &ProfileSettings) -> Self {
        Self {
            category: site.type_name(),
            template: settings.message.clone(),
            level: settings.level,
            hierarchy: settings.hierarchy,
            logger: named_logger("Profiler"),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

fn render(scope: &Scope, elapsed_ms: u128, outer: &[Scope]) -> String {
    let mut message = format!(
        "<{}> <{}> <Elapsed {elapsed_ms}ms>",
        scope.category, scope.name
    );
    let chain: Vec<String> = outer
        .iter()
        .filter(|outer| outer.nested)
        .map(|outer| format!("{}:{}", outer.category, outer.name))
        .collect();
    if scope.nested && !chain.is_empty() {
        message.push_str(&format!(" <{}::{}>", chain.len(), chain.join(".")));
    }
    message
}

impl<T, E> Advice<T, E> for TimeProfileAdvice {
    fn on_entry(&self, call: &CallContext<'_>) -> Result<EntryFlow<T>, E> {
        let scope = Scope {
            category: self.category,
            name: format_template(&self.template, call.arguments()),
            started: self.clock.now(),
            nested: self.hierarchy,
        };
        SCOPES.with(|scopes| scopes.borrow_mut().push(scope));
        Ok(EntryFlow::Proceed)
    }

    fn on_exit(&self, _call: &CallContext<'_>, _outcome: CallOutcome<'_, T, E>) {
        let finished = self.clock.now();
        let message = SCOPES.with(|scopes| {
            let mut scopes = scopes.borrow_mut();
            let scope = scopes.pop()?;
            let elapsed = finished.saturating_duration_since(scope.started);
            Some(render(&scope, elapsed.as_millis(), &scopes))
        });
        match message {
            Some(message) if self.logger.is_enabled(self.level) => {
                self.logger.log(self.level, &message, None);
            }
            Some(_) => {}
            None => tracing::warn!(
                target: "weave",
                category = self.category,
                "profile scope missing on exit"
            ),
        }
    }
}

impl fmt::Debug for TimeProfileAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeProfileAdvice")
            .field("category", &self.category)
            .field("template", &self.template)
            .field("level", &self.level)
            .field("hierarchy", &self.hierarchy)
            .finish()
    }
}
