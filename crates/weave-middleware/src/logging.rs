use std::{error::Error, fmt, sync::Arc};

use weave_core::{
    Advice, CallContext, CallOutcome, CallSite, EntryFlow, ExceptionFlow, LogCallsSettings,
    LogLevel, Logger, TracingLogger, format_template,
};

use crate::collaborator::LoggerLookup;

/// 调用日志行为：记录进入、离开以及失败时的实参。
///
/// # 教案式说明
/// - **意图（Why）**：排查问题时最常需要的是“调用了什么、以什么参数、以何种方式结束”，
///   逐个方法手写这些日志既冗长又容易格式不一；
/// - **结构（How）**：
///   - 进入与离开的固定文本在装配时拼好，调用时只追加实参模板与错误文本；
///   - Logger 来源见 [`LoggerLookup`]，回退 Logger 名称取自配置（默认 `Calls`）；
/// - **契约（What）**：
///   - 进入：`Entering T.m`，配置了模板时换行后追加格式化后的实参；
///   - 失败：先以 `error` 记录 `Error executing T.m` 与错误，再以 `debug` 逐个记录实参；
///   - 离开：`Leaving T.m` 或 `Leaving T.m with error: <错误文本>`；
///   - 进入与离开使用配置的级别，级别未启用时不做任何格式化。
pub struct LogCallsAdvice {
    entering: String,
    leaving: String,
    failed: String,
    template: Option<String>,
    level: LogLevel,
    loggers: LoggerLookup,
}

impl LogCallsAdvice {
    pub fn new(site: &CallSite, settings: &LogCallsSettings) -> Self {
        let fallback: Arc<dyn Logger> = Arc::new(TracingLogger::new(settings.logger_name.clone()));
        Self {
            entering: format!("Entering {site}"),
            leaving: format!("Leaving {site}"),
            failed: format!("Error executing {site}"),
            template: settings.message.clone().filter(|message| !message.is_empty()),
            level: settings.level,
            loggers: LoggerLookup::for_site(site, fallback),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.loggers = LoggerLookup::explicit(logger);
        self
    }

    pub fn with_loggers(mut self, loggers: LoggerLookup) -> Self {
        self.loggers = loggers;
        self
    }
}

impl<T, E> Advice<T, E> for LogCallsAdvice
where
    E: Error + 'static,
{
    fn on_entry(&self, call: &CallContext<'_>) -> Result<EntryFlow<T>, E> {
        let logger = self.loggers.resolve(call);
        if logger.is_enabled(self.level) {
            match &self.template {
                Some(template) => {
                    let arguments = format_template(template, call.arguments());
                    logger.log(self.level, &format!("{}\n{arguments}", self.entering), None);
                }
                None => logger.log(self.level, &self.entering, None),
            }
        }
        Ok(EntryFlow::Proceed)
    }

    fn on_exception(&self, call: &CallContext<'_>, error: &E) -> ExceptionFlow<T, E> {
        let logger = self.loggers.resolve(call);
        logger.error(&self.failed, Some(error));
        if logger.is_enabled(LogLevel::Debug) {
            for argument in call.arguments() {
                logger.debug(&format!("{} = {}", argument.name, argument.value), None);
            }
        }
        ExceptionFlow::Rethrow
    }

    fn on_exit(&self, call: &CallContext<'_>, outcome: CallOutcome<'_, T, E>) {
        let logger = self.loggers.resolve(call);
        if !logger.is_enabled(self.level) {
            return;
        }
        match outcome {
            CallOutcome::Returned(_) => logger.log(self.level, &self.leaving, None),
            CallOutcome::Failed(error) => logger.log(
                self.level,
                &format!("{} with error: {error}", self.leaving),
                None,
            ),
        }
    }
}

impl fmt::Debug for LogCallsAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCallsAdvice")
            .field("entering", &self.entering)
            .field("template", &self.template)
            .field("level", &self.level)
            .finish()
    }
}
