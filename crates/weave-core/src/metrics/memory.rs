use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    },
};

use parking_lot::RwLock;

use crate::{
    error::SubsystemError,
    metrics::{
        kind::MetricDefinition,
        subsystem::{MetricSubsystem, RawCounter},
    },
};

/// 进程内指标子系统。
///
/// # 教案式说明
/// - **意图（Why）**：注册表需要一个可以离线运行的子系统实现：宿主未接入外部后端时作为默认实现，
///   测试中则用于统计 `create_category` 调用次数、模拟其他进程预先创建的分类，以及注入权限与可用性故障；
/// - **结构（How）**：
///   - 分类表由 `parking_lot::RwLock<HashMap>` 保护，每个分类保存定义列表与 `(计数器, 标签)` 到原子值的映射；
///   - 同一 `(分类, 计数器, 标签)` 三元组始终返回同一个 `Arc<AtomicCell>`，因此不同句柄对同一物理计数器的修改互相可见；
///   - 重建分类时保留已有原子值，只补充新增定义。
/// - **契约（What）**：
///   - `create_category` 拒绝改变既有计数器种类（返回 [`SubsystemError::ShapeConflict`]）；
///   - `create_attempts` 统计全部创建调用，`create_calls` 只统计成功的调用，`seed_category` 均不计入。
#[derive(Default)]
pub struct InMemorySubsystem {
    categories: RwLock<HashMap<String, MemoryCategory>>,
    denied: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
    create_attempts: AtomicUsize,
    create_calls: AtomicUsize,
}

#[derive(Default)]
struct MemoryCategory {
    definitions: Vec<MetricDefinition>,
    cells: HashMap<(String, String), Arc<AtomicCell>>,
}

#[derive(Default)]
struct AtomicCell(AtomicI64);

impl RawCounter for AtomicCell {
    fn increment_by(&self, step: i64) {
        self.0.fetch_add(step, Ordering::AcqRel);
    }

    fn value(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }
}

impl InMemorySubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟另一个进程预先创建的分类，不计入 [`Self::create_calls`]。
    pub fn seed_category(&self, category: &str, definitions: Vec<MetricDefinition>) {
        let mut categories = self.categories.write();
        let entry = categories.entry(category.to_owned()).or_default();
        for definition in definitions {
            if !entry
                .definitions
                .iter()
                .any(|existing| existing.name() == definition.name())
            {
                entry.definitions.push(definition);
            }
        }
    }

    /// 之后对该分类的创建请求一律返回权限错误。
    pub fn deny_creation(&self, category: &str) {
        self.denied.write().insert(category.to_owned());
    }

    /// 切换整个子系统的可用性，不可用时所有操作返回 [`SubsystemError::Unavailable`]。
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    /// `create_category` 被调用的总次数，包括失败的调用。
    pub fn create_attempts(&self) -> usize {
        self.create_attempts.load(Ordering::Acquire)
    }

    /// 成功执行的 `create_category` 次数。
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Acquire)
    }

    /// 读取某个物理计数器的值；不存在时视为 0。
    pub fn value(&self, category: &str, counter: &str, label: &str) -> i64 {
        self.categories
            .read()
            .get(category)
            .and_then(|entry| entry.cells.get(&(counter.to_owned(), label.to_owned())))
            .map_or(0, |cell| cell.value())
    }

    /// 分类当前的定义集，按创建顺序排列。
    pub fn definitions(&self, category: &str) -> Option<Vec<MetricDefinition>> {
        self.categories
            .read()
            .get(category)
            .map(|entry| entry.definitions.clone())
    }

    fn ensure_available(&self) -> Result<(), SubsystemError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(SubsystemError::Unavailable {
                reason: "in-memory subsystem switched off".into(),
            });
        }
        Ok(())
    }
}

impl MetricSubsystem for InMemorySubsystem {
    fn category_exists(&self, category: &str) -> Result<bool, SubsystemError> {
        self.ensure_available()?;
        Ok(self.categories.read().contains_key(category))
    }

    fn create_category(
        &self,
        category: &str,
        definitions: &[MetricDefinition],
    ) -> Result<(), SubsystemError> {
        self.create_attempts.fetch_add(1, Ordering::AcqRel);
        self.ensure_available()?;
        if self.denied.read().contains(category) {
            return Err(SubsystemError::PermissionDenied {
                category: category.to_owned(),
                operation: "creating",
            });
        }

        let mut categories = self.categories.write();
        let entry = categories.entry(category.to_owned()).or_default();
        for definition in definitions {
            if let Some(existing) = entry
                .definitions
                .iter()
                .find(|existing| existing.name() == definition.name())
                && existing.kind() != definition.kind()
            {
                return Err(SubsystemError::ShapeConflict {
                    category: category.to_owned(),
                    detail: format!(
                        "counter `{}` is {:?}, requested {:?}",
                        definition.name(),
                        existing.kind(),
                        definition.kind()
                    ),
                });
            }
        }
        for definition in definitions {
            if !entry
                .definitions
                .iter()
                .any(|existing| existing.name() == definition.name())
            {
                entry.definitions.push(definition.clone());
            }
        }
        self.create_calls.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn counters(&self, category: &str) -> Result<Vec<MetricDefinition>, SubsystemError> {
        self.ensure_available()?;
        self.categories
            .read()
            .get(category)
            .map(|entry| entry.definitions.clone())
            .ok_or_else(|| SubsystemError::UnknownCategory {
                category: category.to_owned(),
            })
    }

    fn open_counter(
        &self,
        category: &str,
        counter: &str,
        label: &str,
    ) -> Result<Arc<dyn RawCounter>, SubsystemError> {
        self.ensure_available()?;
        let mut categories = self.categories.write();
        let entry = categories
            .get_mut(category)
            .ok_or_else(|| SubsystemError::UnknownCategory {
                category: category.to_owned(),
            })?;
        if !entry
            .definitions
            .iter()
            .any(|definition| definition.name() == counter)
        {
            return Err(SubsystemError::UnknownCounter {
                category: category.to_owned(),
                counter: counter.to_owned(),
            });
        }
        let cell = entry
            .cells
            .entry((counter.to_owned(), label.to_owned()))
            .or_default();
        Ok(Arc::clone(cell) as Arc<dyn RawCounter>)
    }
}
