//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义三类错误域：装配期的配置错误、外部指标子系统的失败、以及参数校验失败；
//! - 运行期的“资源缺失”（字段未找到、计数器被禁用）不属于错误，统一以 `Option::None` 表达。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 [`thiserror::Error`]，可直接交给 `anyhow` 等上层框架；
//! - 配置错误只在装配阶段出现，行为对象不会以非法配置构造出来；
//! - 子系统错误只在注册表内部被捕获并记录，永远不会传播到业务调用。

use thiserror::Error;

/// 装配期配置错误。
///
/// # 教案式说明
/// - **意图 (Why)**：计数器名称缺失、重试次数小于 1 等问题必须在挂载行为之前暴露，
///   否则会在高频调用路径上反复触发；
/// - **契约 (What)**：由各 `*Settings::validate` 与行为构造函数返回，调用方据此拒绝挂载；
/// - **风险 (Trade-offs)**：使用 `String` 携带上下文，装配期的少量分配可以接受。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    /// 计数器分类名为空。
    #[error("counter category name must not be empty")]
    MissingCategory,

    /// 计数器名为空。
    #[error("counter name must not be empty (category `{category}`)")]
    MissingCounter { category: String },

    /// 计数器步长为 0，调用前后不会产生任何变化。
    #[error("counter `{category}/{counter}` must use a non-zero step")]
    ZeroStep { category: String, counter: String },

    /// 计数器步长为 `i64::MIN`，在途计数的回退步长无法取负。
    #[error("counter `{category}/{counter}` step must be greater than i64::MIN")]
    StepOutOfRange { category: String, counter: String },

    /// 速率计数器未声明任何触发阶段。
    #[error("rate counter `{category}/{counter}` has an empty direction mask")]
    EmptyDirections { category: String, counter: String },

    /// 重试次数必须至少为 1。
    #[error("retry count must be at least 1, got {0}")]
    InvalidRetryCount(u32),

    /// 参数校验既未指定名称也未指定下标，或二者同时指定。
    #[error("argument check on `{site}` needs exactly one of parameter name or index")]
    AmbiguousArgumentTarget { site: String },

    /// 参数校验的目标在调用点上不存在。
    #[error("call site `{site}` has no parameter {target}")]
    UnknownArgument { site: String, target: String },

    /// 缓存的绝对过期与滑动过期互斥。
    #[error("caching on `{site}`: absolute and sliding expiry are mutually exclusive")]
    ConflictingExpiry { site: String },

    /// 配置文本解析失败。
    #[error("failed to parse weave settings: {0}")]
    Parse(String),
}

/// 外部指标子系统返回的失败。
///
/// - **意图 (Why)**：区分权限、可用性与形状冲突，便于日志中给出准确的禁用原因；
/// - **契约 (What)**：注册表捕获后把对应键加入禁用集合，不做补救也不重试。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SubsystemError {
    #[error("permission denied while {operation} category `{category}`")]
    PermissionDenied {
        category: String,
        operation: &'static str,
    },

    #[error("metric subsystem unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("category `{category}` already exists with an incompatible shape: {detail}")]
    ShapeConflict { category: String, detail: String },

    #[error("counter `{counter}` is not defined in category `{category}`")]
    UnknownCounter { category: String, counter: String },

    #[error("category `{category}` does not exist")]
    UnknownCategory { category: String },
}

/// 参数校验失败，由 `weave-middleware` 的参数检查行为在调用前抛出。
///
/// 业务错误类型需实现 `From<ArgumentError>`，以便行为把校验失败转换为调用自身的错误。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ArgumentError {
    #[error("argument `{name}` of `{site}` must not be null")]
    Null { site: String, name: String },

    #[error("argument `{name}` of `{site}` must not be empty")]
    Empty { site: String, name: String },
}
