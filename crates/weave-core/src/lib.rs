#![deny(unsafe_code)]
#![doc = "weave-core: 调用拦截行为（计数、重试、日志、缓存、校验）背后的核心契约与运行时服务。"]
#![doc = ""]
#![doc = "== 组成 =="]
#![doc = "1. [`metrics`]：进程级指标注册表，惰性创建、缓存并安全修改命名计数器；创建失败的键永久禁用。"]
#![doc = "2. [`inject`]：按所有者身份缓存协作者（如 Logger）的字段查找缓存，实例级条目仅以 `Weak` 引用所有者。"]
#![doc = "3. [`retry`]：有界、可延迟、按错误过滤的重试执行器。"]
#![doc = "4. [`intercept`]：拦截宿主契约（进入/成功/异常/退出钩子）与最小驱动链。"]
#![doc = ""]
#![doc = "三项运行时服务彼此独立，跨服务边界时从不同时持有多把锁，因此无需全局锁顺序。"]

pub mod config;
pub mod error;
pub mod inject;
pub mod intercept;
pub mod metrics;
pub mod observability;
pub mod prelude;
pub mod retry;
mod sync;
/// 测试桩命名空间，集中暴露记录型 Logger、记录型暂停器等实现，供两个 crate 的集成测试复用。
///
/// # 设计背景（Why）
/// - 重试、日志与异常处理的断言都依赖“记录了哪些日志”，若各测试文件各自定义记录器，接口调整时容易漏改；
/// - 桩对象不做 I/O，也不依赖全局 Subscriber，可在并行测试中安全使用。
pub mod test_stubs;
pub mod time;

pub use config::{
    ArgumentCheckSettings, CachingSettings, CounterDirection, CounterDirections, CounterKind,
    CounterSettings, HandleExceptionSettings, LogCallsSettings, ProfileSettings, RetrySettings,
    SiteSettings, TypeSyncSettings, WeaveSettings,
};
pub use error::{ArgumentError, ConfigError, SubsystemError};
pub use inject::{FieldCatalog, FieldLookupKey, InstanceFieldCache};
pub use intercept::{
    Advice, Argument, ArgumentValue, Boundary, CallContext, CallOutcome, CallSite, EntryFlow,
    ExceptionFlow, Interceptor, InterceptorChain, encode_arguments, format_arguments,
    format_template,
};
pub use metrics::{
    InMemorySubsystem, MetricDefinition, MetricHandle, MetricKey, MetricKind, MetricRegistry,
    MetricSubsystem, OVERALL_LABEL, RawCounter, RegistryOptions,
};
pub use observability::{LogLevel, Logger, TracingLogger, default_logger};
pub use retry::{
    ErrorFilter, Pause, RetryExecutor, RetryOutcome, RetryPolicy, RetryState, ThreadSleep,
    UnmatchedErrorPolicy,
};
pub use time::{Clock, SystemClock};
