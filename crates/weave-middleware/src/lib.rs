#![deny(unsafe_code)]
#![doc = "weave-middleware: 基于 weave-core 契约的可复用调用拦截行为。"]
#![doc = ""]
#![doc = "== 行为一览 =="]
#![doc = "1. [`CounterAdvice`]：累计、在途与按阶段计的速率计数。"]
#![doc = "2. [`RetryInterceptor`]：以重试执行器包装链内侧的调用。"]
#![doc = "3. [`LogCallsAdvice`] 与 [`TimeProfileAdvice`]：调用日志与耗时剖析。"]
#![doc = "4. [`HandleExceptionAdvice`]：记录匹配的错误并传播、吞掉或包装。"]
#![doc = "5. [`CachingAdvice`]：按调用点、所有者实例与实参缓存成功结果。"]
#![doc = "6. [`ArgumentCheckAdvice`]：调用前拒绝缺省或空的实参。"]
#![doc = "7. [`TypeSyncInterceptor`]：按所有者类型串行化调用，可设获取超时。"]
#![doc = ""]
#![doc = "[`SiteAssembler`] 按调用点配置以固定顺序装配上述行为；写日志的行为通过 [`LoggerLookup`]"]
#![doc = "优先使用所有者类型声明的 Logger 字段。"]

pub mod assembly;
pub mod caching;
pub mod collaborator;
pub mod counters;
pub mod exception;
pub mod logging;
pub mod profile;
pub mod retry;
pub mod type_sync;
pub mod validation;

pub use assembly::SiteAssembler;
pub use caching::{CachingAdvice, Expiry};
pub use collaborator::LoggerLookup;
pub use counters::{CounterAdvice, CounterMode};
pub use exception::{Disposition, HandleExceptionAdvice};
pub use logging::LogCallsAdvice;
pub use profile::TimeProfileAdvice;
pub use retry::RetryInterceptor;
pub use type_sync::{TypeLocks, TypeSyncInterceptor};
pub use validation::ArgumentCheckAdvice;
