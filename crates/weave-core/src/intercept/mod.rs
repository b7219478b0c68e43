//! 拦截宿主契约。
//!
//! # 教案式概览
//! - **意图（Why）**：行为只依赖“调用前、成功、异常、退出”四个事件；织入机制由宿主负责，
//!   本模块定义事件的形状与一个最小驱动链，使行为可以独立组合与测试；
//! - **结构（How）**：
//!   - [`call`]：调用点与调用上下文（所有者、实参）；
//!   - [`advice`]：边界型 [`Advice`] 与环绕型 [`Interceptor`] 两种行为契约，以及二者之间的适配器 [`Boundary`]；
//!   - [`chain`]：按声明顺序嵌套的 [`InterceptorChain`]；
//!   - [`format`]：消息模板与实参格式化。

pub mod advice;
pub mod call;
pub mod chain;
pub mod format;

pub use advice::{Advice, Boundary, CallOutcome, EntryFlow, ExceptionFlow, Interceptor};
pub use call::{Argument, ArgumentValue, CallContext, CallSite};
pub use chain::InterceptorChain;
pub use format::{encode_arguments, format_arguments, format_template};
