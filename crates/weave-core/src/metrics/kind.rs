use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// 计数器种类。
///
/// # 教案式说明
/// - **意图（Why）**：外部子系统按种类解释原始数值（累计值、每秒速率、平均耗时），
///   注册表需要据此决定是否补充配对的基准计数器；
/// - **契约（What）**：[`MetricKind::AverageTimer`] 必须与名为 `"{counter}Base"`、种类为
///   [`MetricKind::AverageBase`] 的计数器同时创建，其余种类独立存在。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// 条目数量，既可作累计值也可作在途量。
    NumberOfItems,
    /// 每秒发生次数。
    RateOfCountsPerSecond,
    /// 平均耗时，需要配对的基准计数器。
    AverageTimer,
    /// 平均类计数器的分母。
    AverageBase,
    /// 自某一时刻起经过的时间。
    ElapsedTime,
}

impl MetricKind {
    /// 该种类是否需要隐式的基准计数器。
    pub fn requires_base(self) -> bool {
        matches!(self, MetricKind::AverageTimer)
    }

    /// 基准计数器的命名约定。
    pub fn base_name(counter: &str) -> String {
        format!("{counter}Base")
    }
}

/// 单个计数器的定义：名称与种类。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MetricDefinition {
    name: Arc<str>,
    kind: MetricKind,
}

impl MetricDefinition {
    pub fn new(name: impl Into<Arc<str>>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// 请求某个计数器时需要出现在分类中的全部定义（必要时附带基准计数器）。
    pub fn requested(counter: &str, kind: MetricKind) -> Vec<MetricDefinition> {
        let mut definitions = vec![MetricDefinition::new(counter, kind)];
        if kind.requires_base() {
            definitions.push(MetricDefinition::new(
                MetricKind::base_name(counter),
                MetricKind::AverageBase,
            ));
        }
        definitions
    }
}

/// `(分类, 计数器)` 组合键，禁用集合的元素类型。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    category: Arc<str>,
    counter: Arc<str>,
}

impl MetricKey {
    pub fn new(category: impl Into<Arc<str>>, counter: impl Into<Arc<str>>) -> Self {
        Self {
            category: category.into(),
            counter: counter.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn counter(&self) -> &str {
        &self.counter
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.counter)
    }
}
