use std::{error::Error, fmt, fmt::Write as _, sync::Arc};

use weave_core::{
    Advice, ArgumentValue, CallContext, CallSite, ErrorFilter, ExceptionFlow,
    HandleExceptionSettings, Logger, observability::named_logger,
};

use crate::collaborator::LoggerLookup;

type Wrapper<E> = Arc<dyn Fn(&E) -> E + Send + Sync>;

/// 匹配到错误后的处置方式。
pub enum Disposition<E> {
    /// 记录后原样传播。
    Rethrow,
    /// 记录后吞掉错误，调用以 `T::default()` 完成。
    Suppress,
    /// 记录后以包装后的错误替换原错误，原错误应作为新错误的 `source()` 保留。
    Wrap(Wrapper<E>),
}

impl<E> Clone for Disposition<E> {
    fn clone(&self) -> Self {
        match self {
            Disposition::Rethrow => Disposition::Rethrow,
            Disposition::Suppress => Disposition::Suppress,
            Disposition::Wrap(wrapper) => Disposition::Wrap(Arc::clone(wrapper)),
        }
    }
}

impl<E> fmt::Debug for Disposition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Rethrow => f.write_str("Rethrow"),
            Disposition::Suppress => f.write_str("Suppress"),
            Disposition::Wrap(_) => f.write_str("Wrap(..)"),
        }
    }
}

/// 异常处理行为：记录匹配的错误，并按配置传播、吞掉或包装。
///
/// # 教案式说明
/// - **意图（Why）**：服务边界上的方法常需要“记下错误与现场参数，然后决定是否让错误继续上抛”；
/// - **结构（How）**：
///   - [`ErrorFilter`] 决定哪些错误由本行为处理，未匹配的错误不记录、原样传播；
///   - Logger 来源见 [`LoggerLookup`]，回退 Logger 名称为 `Exceptions`；
/// - **契约（What）**：
///   - 匹配时先以 `error` 级别记录配置的消息与错误；
///   - 开启实参追踪时，再以一条 `error` 记录列出全部实参，每行形如 `0. - value`，缺省值写作 `<NULL>`；
///   - 之后按 [`Disposition`] 处置。
pub struct HandleExceptionAdvice<E> {
    message: String,
    trace_arguments: bool,
    filter: ErrorFilter<E>,
    disposition: Disposition<E>,
    loggers: LoggerLookup,
}

impl<E> HandleExceptionAdvice<E> {
    pub fn new(site: &CallSite, settings: &HandleExceptionSettings) -> Self {
        let message = if settings.message.is_empty() {
            format!("Unhandled error in {site}")
        } else {
            settings.message.clone()
        };
        Self {
            message,
            trace_arguments: settings.trace_arguments,
            filter: ErrorFilter::Any,
            disposition: if settings.suppress {
                Disposition::Suppress
            } else {
                Disposition::Rethrow
            },
            loggers: LoggerLookup::for_site(site, named_logger("Exceptions")),
        }
    }

    pub fn with_filter(mut self, filter: ErrorFilter<E>) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_disposition(mut self, disposition: Disposition<E>) -> Self {
        self.disposition = disposition;
        self
    }

    /// 以 `wrap` 构造的错误替换匹配的错误。
    pub fn wrap_with(self, wrap: impl Fn(&E) -> E + Send + Sync + 'static) -> Self {
        self.with_disposition(Disposition::Wrap(Arc::new(wrap)))
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.loggers = LoggerLookup::explicit(logger);
        self
    }

    pub fn with_loggers(mut self, loggers: LoggerLookup) -> Self {
        self.loggers = loggers;
        self
    }

    pub fn disposition(&self) -> &Disposition<E> {
        &self.disposition
    }
}

fn trace_lines(call: &CallContext<'_>) -> String {
    let mut lines = String::new();
    for (index, argument) in call.arguments().iter().enumerate() {
        if index > 0 {
            lines.push('\n');
        }
        match argument.value {
            ArgumentValue::Null => {
                let _ = write!(lines, "{index}. - <NULL>");
            }
            value => {
                let _ = write!(lines, "{index}. - {value}");
            }
        }
    }
    lines
}

impl<T, E> Advice<T, E> for HandleExceptionAdvice<E>
where
    T: Default,
    E: Error + 'static,
{
    fn on_exception(&self, call: &CallContext<'_>, error: &E) -> ExceptionFlow<T, E> {
        if !self.filter.matches(error) {
            return ExceptionFlow::Rethrow;
        }
        let logger = self.loggers.resolve(call);
        logger.error(&self.message, Some(error));
        if self.trace_arguments && !call.arguments().is_empty() {
            logger.error(&trace_lines(call), None);
        }
        match &self.disposition {
            Disposition::Rethrow => ExceptionFlow::Rethrow,
            Disposition::Suppress => ExceptionFlow::Suppress(T::default()),
            Disposition::Wrap(wrap) => ExceptionFlow::Replace(wrap(error)),
        }
    }
}

impl<E> fmt::Debug for HandleExceptionAdvice<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleExceptionAdvice")
            .field("message", &self.message)
            .field("trace_arguments", &self.trace_arguments)
            .field("filter", &self.filter)
            .field("disposition", &self.disposition)
            .finish()
    }
}
