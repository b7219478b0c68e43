use std::{fmt, sync::Arc};

use arc_swap::ArcSwap;

use crate::{
    error::SubsystemError,
    metrics::{
        kind::{MetricKey, MetricKind},
        subsystem::{MetricSubsystem, RawCounter},
    },
};

/// 带标签的物理计数器。
struct LabeledCounter {
    label: Arc<str>,
    raw: Arc<dyn RawCounter>,
}

/// 已解析的命名计数器句柄。
///
/// # 教案式说明
/// - **意图（Why）**：同一次修改需要同时落到“当前进程实例”与“全部实例汇总”两个视图。
///   若两个视图共用一个物理计数器并通过临时切换标签寻址，并发调用者会交错切换，导致修改写错视图；
/// - **结构（How）**：
///   - 实例视图与汇总视图各持一个独立的 [`RawCounter`]，修改时依次写入，彼此之间无共享可变状态；
///   - 实例视图放在 [`ArcSwap`] 中，[`MetricHandle::relabel`] 以原子指针替换实现改名，
///     正在进行的修改要么写入旧计数器，要么写入新计数器，不会写到二者之外；
///   - 汇总视图在构造后固定不变。
/// - **契约（What）**：
///   - 句柄由 [`super::MetricRegistry`] 构造并以 `Arc` 共享，所有方法均可并发调用；
///   - `decrement_by` 等价于以负步长调用 `increment_by`。
/// - **风险提示（Trade-offs）**：两个视图的写入不是一个原子事务，读者可能短暂观察到实例视图已更新而汇总视图尚未更新。
pub struct MetricHandle {
    key: MetricKey,
    kind: MetricKind,
    instance: ArcSwap<LabeledCounter>,
    overall: LabeledCounter,
    subsystem: Arc<dyn MetricSubsystem>,
}

impl MetricHandle {
    pub(crate) fn open(
        subsystem: Arc<dyn MetricSubsystem>,
        key: MetricKey,
        kind: MetricKind,
        instance_label: &str,
        overall_label: &str,
    ) -> Result<Self, SubsystemError> {
        let instance = subsystem.open_counter(key.category(), key.counter(), instance_label)?;
        let overall = subsystem.open_counter(key.category(), key.counter(), overall_label)?;
        Ok(Self {
            key,
            kind,
            instance: ArcSwap::from_pointee(LabeledCounter {
                label: Arc::from(instance_label),
                raw: instance,
            }),
            overall: LabeledCounter {
                label: Arc::from(overall_label),
                raw: overall,
            },
            subsystem,
        })
    }

    pub fn key(&self) -> &MetricKey {
        &self.key
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// 以给定步长同时修改实例视图与汇总视图。
    pub fn increment_by(&self, step: i64) {
        self.instance.load().raw.increment_by(step);
        self.overall.raw.increment_by(step);
    }

    pub fn increment(&self) {
        self.increment_by(1);
    }

    pub fn decrement_by(&self, step: i64) {
        self.increment_by(step.wrapping_neg());
    }

    pub fn instance_value(&self) -> i64 {
        self.instance.load().raw.value()
    }

    pub fn overall_value(&self) -> i64 {
        self.overall.raw.value()
    }

    pub fn instance_label(&self) -> Arc<str> {
        Arc::clone(&self.instance.load().label)
    }

    pub fn overall_label(&self) -> &str {
        &self.overall.label
    }

    /// 把实例视图切换到新标签对应的物理计数器，汇总视图不受影响。
    ///
    /// 打开新计数器失败时保持原标签不变并返回错误。
    pub fn relabel(&self, label: &str) -> Result<(), SubsystemError> {
        let raw = self
            .subsystem
            .open_counter(self.key.category(), self.key.counter(), label)?;
        self.instance.store(Arc::new(LabeledCounter {
            label: Arc::from(label),
            raw,
        }));
        Ok(())
    }
}

impl fmt::Debug for MetricHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricHandle")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("instance_label", &self.instance_label())
            .field("overall_label", &self.overall_label())
            .finish()
    }
}
