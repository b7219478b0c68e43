//! 指标注册表：把 `(分类, 计数器, 种类)` 解析为共享的 [`MetricHandle`]。
//!
//! # 设计缘起（Why）
//! - 计数行为挂在高频调用上，解析必须在稳态下只付出一次共享读锁的代价；
//! - 分类可能已由其他进程在外部子系统中创建，本进程只能“加宽”而不能“收窄”既有定义集；
//! - 创建失败（权限、形状冲突、子系统不可用）不得影响业务调用，也不应在每次调用时重试，
//!   因此失败键进入进程级禁用集合，之后直接返回 `None`。
//!
//! # 并发纪律（How）
//! - 快路径：`read()` 共享锁下查缓存句柄与禁用集合；
//! - 慢路径：`creation` 互斥锁串行化所有创建者，同时不阻塞普通读者；复查后在不持有状态锁的情况下与子系统交互，
//!   只有在写入缓存或禁用集合时才短暂获取写锁，读者仅在这段极短的时间内等待；
//! - 锁顺序固定为 `creation` → `state`。
//!
//! # 契约说明（What）
//! - 分类一旦在进程内建立即视为定形：在已知分类下请求未知计数器视为失败并禁用该键；
//! - 每个键至多触发一次外部创建流程，无论成功还是失败。

use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::Path,
    sync::{Arc, OnceLock},
};

use serde::Deserialize;

use crate::{
    error::SubsystemError,
    metrics::{
        handle::MetricHandle,
        kind::{MetricDefinition, MetricKey, MetricKind},
        memory::InMemorySubsystem,
        subsystem::MetricSubsystem,
    },
    sync::{Mutex, RwLock},
};

/// 汇总视图的默认标签。
pub const OVERALL_LABEL: &str = "_Overall";

const FALLBACK_INSTANCE_LABEL: &str = "weave";

/// 注册表选项。
///
/// - `instance_label`：实例视图标签，默认取当前可执行文件名（不含扩展名），无法获取时为 `weave`；
/// - `overall_label`：汇总视图标签，默认 [`OVERALL_LABEL`]。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
    pub instance_label: String,
    pub overall_label: String,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        let instance_label = std::env::current_exe()
            .ok()
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| FALLBACK_INSTANCE_LABEL.to_owned());
        Self {
            instance_label,
            overall_label: OVERALL_LABEL.to_owned(),
        }
    }
}

impl RegistryOptions {
    pub fn with_instance_label(mut self, label: impl Into<String>) -> Self {
        self.instance_label = label.into();
        self
    }

    pub fn with_overall_label(mut self, label: impl Into<String>) -> Self {
        self.overall_label = label.into();
        self
    }
}

struct CategoryEntry {
    definitions: Vec<MetricDefinition>,
    handles: HashMap<Arc<str>, Arc<MetricHandle>>,
}

#[derive(Default)]
struct RegistryState {
    categories: HashMap<Arc<str>, CategoryEntry>,
    disabled: HashMap<Arc<str>, HashSet<Arc<str>>>,
}

enum Lookup {
    Hit(Arc<MetricHandle>),
    Disabled,
    KnownCategory,
    Unknown,
}

impl RegistryState {
    fn lookup(&self, category: &str, counter: &str) -> Lookup {
        if self
            .disabled
            .get(category)
            .is_some_and(|counters| counters.contains(counter))
        {
            return Lookup::Disabled;
        }
        match self.categories.get(category) {
            Some(entry) => entry
                .handles
                .get(counter)
                .map_or(Lookup::KnownCategory, |handle| Lookup::Hit(Arc::clone(handle))),
            None => Lookup::Unknown,
        }
    }

    fn disable(&mut self, category: &str, counter: &str, reason: &dyn fmt::Display) {
        let newly_disabled = self
            .disabled
            .entry(Arc::from(category))
            .or_default()
            .insert(Arc::from(counter));
        if newly_disabled {
            tracing::warn!(
                target: "weave::metrics",
                category,
                counter,
                reason = %reason,
                "metric unavailable; key disabled for the rest of the process"
            );
        }
    }
}

/// 进程级指标注册表。
///
/// # 教案式说明
/// - **意图（Why）**：为计数行为提供“解析一次、之后零分配”的计数器句柄；
/// - **结构（How）**：见模块文档的并发纪律；外部交互通过注入的 [`MetricSubsystem`] 完成；
/// - **契约（What）**：
///   - 名称为空返回 `None`，不触碰任何状态；
///   - 已禁用的键返回 `None`，不调用子系统；
///   - 返回的句柄在进程内唯一：同一键的所有调用者共享同一个 `Arc<MetricHandle>`。
/// - **风险提示（Trade-offs）**：缓存命中不校验请求的种类，种类以首次创建为准。
pub struct MetricRegistry {
    subsystem: Arc<dyn MetricSubsystem>,
    options: RegistryOptions,
    state: RwLock<RegistryState>,
    creation: Mutex<()>,
}

static GLOBAL: OnceLock<Arc<MetricRegistry>> = OnceLock::new();

impl MetricRegistry {
    pub fn new(subsystem: Arc<dyn MetricSubsystem>, options: RegistryOptions) -> Self {
        Self {
            subsystem,
            options,
            state: RwLock::new(RegistryState::default()),
            creation: Mutex::new(()),
        }
    }

    /// 使用 [`InMemorySubsystem`] 与默认选项构造注册表。
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySubsystem::new()), RegistryOptions::default())
    }

    /// 进程级实例；未显式安装时惰性创建一个进程内子系统支撑的注册表。
    pub fn global() -> Arc<MetricRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(MetricRegistry::in_memory())))
    }

    /// 安装进程级实例，只能在首次调用 [`Self::global`] 之前成功一次。
    ///
    /// 已安装时原样返回传入的注册表。
    pub fn install_global(registry: Arc<MetricRegistry>) -> Result<(), Arc<MetricRegistry>> {
        GLOBAL.set(registry)
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn subsystem(&self) -> &Arc<dyn MetricSubsystem> {
        &self.subsystem
    }

    /// 解析计数器句柄。
    pub fn resolve(
        &self,
        category: &str,
        counter: &str,
        kind: MetricKind,
    ) -> Option<Arc<MetricHandle>> {
        if category.is_empty() || counter.is_empty() {
            return None;
        }

        match self.state.read().lookup(category, counter) {
            Lookup::Hit(handle) => return Some(handle),
            Lookup::Disabled => {
                tracing::trace!(target: "weave::metrics", category, counter, "metric key disabled");
                return None;
            }
            Lookup::KnownCategory | Lookup::Unknown => {}
        }

        let _creation = self.creation.lock();
        let lookup = self.state.read().lookup(category, counter);
        match lookup {
            Lookup::Hit(handle) => Some(handle),
            Lookup::Disabled => None,
            Lookup::KnownCategory => {
                self.state.write().disable(
                    category,
                    counter,
                    &"counter is not defined in the established category",
                );
                None
            }
            Lookup::Unknown => match self.materialize(category, counter, kind) {
                Ok(entry) => {
                    let handle = entry.handles.get(counter).cloned();
                    let mut state = self.state.write();
                    match handle {
                        Some(handle) => {
                            tracing::debug!(
                                target: "weave::metrics",
                                category,
                                counter,
                                counters = entry.definitions.len(),
                                "metric category materialized"
                            );
                            state.categories.insert(Arc::from(category), entry);
                            Some(handle)
                        }
                        None => {
                            state.disable(
                                category,
                                counter,
                                &"requested counter missing after materialization",
                            );
                            None
                        }
                    }
                }
                Err(err) => {
                    self.state.write().disable(category, counter, &err);
                    None
                }
            },
        }
    }

    fn materialize(
        &self,
        category: &str,
        counter: &str,
        kind: MetricKind,
    ) -> Result<CategoryEntry, SubsystemError> {
        let exists = self.subsystem.category_exists(category)?;
        let external = if exists {
            self.subsystem.counters(category)?
        } else {
            Vec::new()
        };

        let mut definitions = external.clone();
        for definition in MetricDefinition::requested(counter, kind) {
            if !definitions
                .iter()
                .any(|existing| existing.name() == definition.name())
            {
                definitions.push(definition);
            }
        }

        if !exists || definitions.len() > external.len() {
            self.subsystem.create_category(category, &definitions)?;
        }

        let mut handles = HashMap::with_capacity(definitions.len());
        for definition in &definitions {
            let handle = MetricHandle::open(
                Arc::clone(&self.subsystem),
                MetricKey::new(category, definition.name_arc()),
                definition.kind(),
                &self.options.instance_label,
                &self.options.overall_label,
            )?;
            handles.insert(definition.name_arc(), Arc::new(handle));
        }

        Ok(CategoryEntry {
            definitions,
            handles,
        })
    }

    pub fn is_disabled(&self, category: &str, counter: &str) -> bool {
        matches!(
            self.state.read().lookup(category, counter),
            Lookup::Disabled
        )
    }

    /// 当前全部禁用键，按字典序排列。
    pub fn disabled_keys(&self) -> Vec<MetricKey> {
        let state = self.state.read();
        let mut keys: Vec<MetricKey> = state
            .disabled
            .iter()
            .flat_map(|(category, counters)| {
                counters
                    .iter()
                    .map(|counter| MetricKey::new(Arc::clone(category), Arc::clone(counter)))
            })
            .collect();
        keys.sort();
        keys
    }

    /// 已在进程内建立的分类名，按字典序排列。
    pub fn categories(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .read()
            .categories
            .keys()
            .map(|name| name.to_string())
            .collect();
        names.sort();
        names
    }

    pub fn definitions(&self, category: &str) -> Option<Vec<MetricDefinition>> {
        self.state
            .read()
            .categories
            .get(category)
            .map(|entry| entry.definitions.clone())
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("options", &self.options)
            .field("categories", &self.categories())
            .finish()
    }
}
