//! 外部指标子系统契约。
//!
//! # 设计缘起（Why）
//! - 真实的指标后端（操作系统性能计数器、共享内存段等）由多个进程共享，分类可能已被其他进程创建；
//! - 注册表只依赖本 trait 描述的五个操作，具体后端由宿主注入，测试使用 [`super::InMemorySubsystem`]。
//!
//! # 契约约束（What）
//! - `create_category` 对已存在的分类表示“以给定定义集重建”，实现方不得静默丢弃定义集中的计数器；
//! - `open_counter` 以 `(分类, 计数器, 标签)` 定位一个物理计数器，同一三元组应返回同一底层存储；
//! - 所有方法都可能失败，失败由注册表吸收并记录，不会传播到业务调用。

use std::sync::Arc;

use crate::{error::SubsystemError, metrics::kind::MetricDefinition};

/// 单个物理计数器的原始操作。
pub trait RawCounter: Send + Sync {
    /// 以给定步长修改计数器，负数表示递减。
    fn increment_by(&self, step: i64);

    /// 读取当前原始值。
    fn value(&self) -> i64;
}

/// 外部指标子系统。
pub trait MetricSubsystem: Send + Sync {
    fn category_exists(&self, category: &str) -> Result<bool, SubsystemError>;

    fn create_category(
        &self,
        category: &str,
        definitions: &[MetricDefinition],
    ) -> Result<(), SubsystemError>;

    /// 枚举分类中已定义的计数器。
    fn counters(&self, category: &str) -> Result<Vec<MetricDefinition>, SubsystemError>;

    fn open_counter(
        &self,
        category: &str,
        counter: &str,
        label: &str,
    ) -> Result<Arc<dyn RawCounter>, SubsystemError>;
}
