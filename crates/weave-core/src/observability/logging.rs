use std::{
    borrow::Cow,
    error::Error,
    fmt,
    sync::{Arc, OnceLock},
};

use serde::{Deserialize, Serialize};

/// 日志级别，与 `Logger` 的分级方法一一对应。
///
/// `Fatal` 在 `tracing` 中没有对应级别，[`TracingLogger`] 会以 `ERROR` 输出并附带 `fatal = true` 字段。
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分级日志契约。
///
/// # 教案式说明
/// - **意图（Why）**：行为（重试、调用日志、异常处理）只关心“把一条消息和可能的错误交给某个 Logger”，
///   不关心日志后端；该 trait 把后端隔离在实现之后，便于测试注入记录型实现。
/// - **契约（What）**：
///   - `log` 是唯一必须实现的方法，其余分级方法均转发到 `log`；
///   - `error` 参数为可选的底层错误，实现方可读取 `source()` 链；
///   - 实现必须 `Send + Sync`，行为会跨线程共享同一个 Logger。
/// - **风险提示（Trade-offs）**：`is_enabled` 默认返回 `true`，若实现方的过滤代价较高，应覆盖该方法，
///   让调用方在格式化参数之前就能短路。
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, error: Option<&(dyn Error + 'static)>);

    fn is_enabled(&self, level: LogLevel) -> bool {
        let _ = level;
        true
    }

    fn debug(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        self.log(LogLevel::Debug, message, error);
    }

    fn info(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        self.log(LogLevel::Info, message, error);
    }

    fn warn(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        self.log(LogLevel::Warn, message, error);
    }

    fn error(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        self.log(LogLevel::Error, message, error);
    }

    fn fatal(&self, message: &str, error: Option<&(dyn Error + 'static)>) {
        self.log(LogLevel::Fatal, message, error);
    }
}

/// 把 [`Logger`] 记录转发到 `tracing` 的默认实现。
///
/// # 教案式说明
/// - **意图（Why）**：所有者类型未声明 Logger 字段时，需要一个始终可用的回退；
///   宿主只需安装任意 `tracing` Subscriber 即可看到输出。
/// - **结构（How）**：`tracing` 的 target 必须是编译期常量，因此 Logger 名称以 `logger` 字段输出，
///   target 固定为 `weave`；错误以 `Display` 形式写入 `error` 字段。
#[derive(Clone, Debug)]
pub struct TracingLogger {
    name: Cow<'static, str>,
}

impl TracingLogger {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("weave")
    }
}

macro_rules! forward {
    ($macro:ident, $name:expr, $message:expr, $error:expr $(, $extra:ident = $value:expr)?) => {
        match $error {
            Some(err) => tracing::$macro!(
                target: "weave",
                logger = $name,
                error = %err,
                $($extra = $value,)?
                "{}",
                $message
            ),
            None => tracing::$macro!(
                target: "weave",
                logger = $name,
                $($extra = $value,)?
                "{}",
                $message
            ),
        }
    };
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, error: Option<&(dyn Error + 'static)>) {
        let name = self.name.as_ref();
        match level {
            LogLevel::Trace => forward!(trace, name, message, error),
            LogLevel::Debug => forward!(debug, name, message, error),
            LogLevel::Info => forward!(info, name, message, error),
            LogLevel::Warn => forward!(warn, name, message, error),
            LogLevel::Error => forward!(error, name, message, error),
            LogLevel::Fatal => forward!(error, name, message, error, fatal = true),
        }
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Trace => tracing::enabled!(target: "weave", tracing::Level::TRACE),
            LogLevel::Debug => tracing::enabled!(target: "weave", tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(target: "weave", tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(target: "weave", tracing::Level::WARN),
            LogLevel::Error | LogLevel::Fatal => {
                tracing::enabled!(target: "weave", tracing::Level::ERROR)
            }
        }
    }
}

/// 进程级默认 Logger。
///
/// 首次调用时惰性构造，之后所有调用共享同一个 `Arc`。
pub fn default_logger() -> Arc<dyn Logger> {
    static DEFAULT: OnceLock<Arc<dyn Logger>> = OnceLock::new();
    Arc::clone(DEFAULT.get_or_init(|| Arc::new(TracingLogger::default())))
}

/// 按名称构造回退 Logger，例如调用日志行为使用的 `Calls`。
pub fn named_logger(name: &'static str) -> Arc<dyn Logger> {
    Arc::new(TracingLogger::new(name))
}
