//! 可观测性契约：行为对外输出诊断信息所依赖的 Logger 抽象。
//!
//! # 设计缘起（Why）
//! - 重试、调用日志、异常处理都需要一个“所有者自己的 Logger”，查不到时回退到进程默认 Logger；
//! - crate 内部诊断直接使用 `tracing` 宏，对外协作者则通过 [`Logger`] trait 注入，二者互不替代。
//!
//! # 总体结构（How）
//! - [`Logger`]：分级日志契约，每个级别都接受消息与可选错误；
//! - [`TracingLogger`]：默认实现，把记录转发到 `tracing`；
//! - [`default_logger`]：进程级默认 Logger 的共享句柄。

pub mod logging;

pub use logging::{LogLevel, Logger, TracingLogger, default_logger, named_logger};
