//! 进程级命名计数器：定义、外部子系统契约、句柄与注册表。
//!
//! # 教案式概览
//! - **意图（Why）**：计数行为在每次调用时都要找到“同一个”计数器；创建计数器需要与外部子系统
//!   交互且可能失败，因此解析结果必须缓存，失败的键必须永久禁用，避免在热路径上反复尝试。
//! - **结构（How）**：
//!   - [`kind`]：计数器种类、定义与键；
//!   - [`subsystem`]：外部指标子系统契约；[`memory`] 提供进程内实现；
//!   - [`handle`]：解析后的计数器句柄，实例视图与汇总视图各持一个物理计数器；
//!   - [`registry`]：惰性创建、合并已存在分类、禁用失败键的注册表。
//! - **契约（What）**：稳态解析只取共享读锁；创建路径在可升级读锁下串行执行，每个键至多创建一次。

pub mod handle;
pub mod kind;
pub mod memory;
pub mod registry;
pub mod subsystem;

pub use handle::MetricHandle;
pub use kind::{MetricDefinition, MetricKey, MetricKind};
pub use memory::InMemorySubsystem;
pub use registry::{MetricRegistry, OVERALL_LABEL, RegistryOptions};
pub use subsystem::{MetricSubsystem, RawCounter};
