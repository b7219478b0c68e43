use std::{
    any::{Any, TypeId},
    fmt,
    sync::{
        Arc, OnceLock, Weak,
        atomic::{AtomicUsize, Ordering},
    },
};

use dashmap::DashMap;

use crate::{
    inject::catalog::{Erased, FieldAccess, FieldCatalog, FieldValue, ResolvedField},
    sync::Mutex,
};

/// `(所有者类型, 能力类型)` 组合键。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldLookupKey {
    owner: TypeId,
    capability: TypeId,
}

impl FieldLookupKey {
    pub fn new(owner: TypeId, capability: TypeId) -> Self {
        Self { owner, capability }
    }

    pub fn of<O: Any, C: Any>() -> Self {
        Self::new(TypeId::of::<O>(), TypeId::of::<C>())
    }

    pub fn owner(&self) -> TypeId {
        self.owner
    }

    pub fn capability(&self) -> TypeId {
        self.capability
    }
}

struct InstanceEntry {
    owner: Weak<Erased>,
    value: FieldValue,
}

impl InstanceEntry {
    fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    fn belongs_to(&self, owner: *const ()) -> bool {
        self.owner.as_ptr() as *const () == owner
    }
}

type InstanceTable = Arc<Mutex<Vec<InstanceEntry>>>;

/// 按所有者身份缓存协作者的字段查找缓存。
///
/// # 教案式说明
/// - **意图（Why）**：重试、调用日志等行为需要在运行期找到所有者类型上声明的 Logger 一类协作者。
///   字段扫描只应发生一次；实例字段的值要按所有者分别缓存，且缓存绝不能延长所有者的生命周期；
/// - **结构（How）**：
///   1. 字段标识缓存：`DashMap` 无锁读取，未命中时在粗粒度 `scan_lock` 下复查并扫描，结果（包括“无此字段”）永久缓存；
///   2. 静态字段：首次解析成功后以查找键为索引永久缓存；
///   3. 实例字段：每个查找键一张 `Mutex<Vec<InstanceEntry>>` 表，条目只以 `Weak` 引用所有者；
///      每次访问先清除所有者已回收的条目，再按所有者地址匹配，未命中则解析并插入新条目。
/// - **契约（What）**：
///   - 实例字段在没有所有者时返回 `None`；
///   - 已回收所有者的缓存值永远不会被返回；
///   - 同一 `(所有者类型, 能力类型)` 在缓存生命周期内至多扫描一次。
/// - **风险提示（Trade-offs）**：
///   - 所有者地址作为身份：条目持有 `Weak`，其分配在条目存在期间不会被释放，因此地址不会被新对象复用；
///   - 静态字段解析为 `None` 时不缓存，下次调用会再次读取，静态字段稍后被赋值的场景因此可以生效。
pub struct InstanceFieldCache {
    catalog: Arc<FieldCatalog>,
    fields: DashMap<FieldLookupKey, Option<Arc<ResolvedField>>>,
    scan_lock: Mutex<()>,
    scans: AtomicUsize,
    statics: DashMap<FieldLookupKey, FieldValue>,
    instances: DashMap<FieldLookupKey, InstanceTable>,
}

impl InstanceFieldCache {
    pub fn new(catalog: Arc<FieldCatalog>) -> Self {
        Self {
            catalog,
            fields: DashMap::new(),
            scan_lock: Mutex::new(()),
            scans: AtomicUsize::new(0),
            statics: DashMap::new(),
            instances: DashMap::new(),
        }
    }

    /// 进程级缓存，配套一个进程级字段目录。
    pub fn global() -> &'static InstanceFieldCache {
        static GLOBAL: OnceLock<InstanceFieldCache> = OnceLock::new();
        GLOBAL.get_or_init(|| InstanceFieldCache::new(Arc::new(FieldCatalog::new())))
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// 以具体所有者类型解析能力 `C`。
    pub fn resolve<O, C>(&self, owner: Option<&Arc<O>>) -> Option<C>
    where
        O: Any + Send + Sync,
        C: Any + Clone,
    {
        let owner = owner.map(|owner| Arc::clone(owner) as Arc<Erased>);
        self.resolve_erased::<C>(TypeId::of::<O>(), owner.as_ref())
    }

    /// 以擦除后的所有者解析能力 `C`，供只持有 `TypeId` 与 `Arc<dyn Any>` 的拦截上下文使用。
    pub fn resolve_erased<C>(
        &self,
        owner_type: TypeId,
        owner: Option<&Arc<dyn Any + Send + Sync>>,
    ) -> Option<C>
    where
        C: Any + Clone,
    {
        let key = FieldLookupKey::new(owner_type, TypeId::of::<C>());
        let field = self.field(key)?;
        let value = match &field.access {
            FieldAccess::Static(getter) => self.static_value(key, || getter())?,
            FieldAccess::Instance(getter) => {
                let owner = owner?;
                self.instance_value(key, owner, || getter(&**owner))?
            }
        };
        value.downcast_ref::<C>().cloned()
    }

    /// 查找键对应字段的名称；没有匹配字段时返回 `None`。
    pub fn field_name<O: Any, C: Any>(&self) -> Option<&'static str> {
        self.field(FieldLookupKey::of::<O, C>()).map(|field| field.name)
    }

    fn field(&self, key: FieldLookupKey) -> Option<Arc<ResolvedField>> {
        if let Some(cached) = self.fields.get(&key) {
            return cached.value().clone();
        }

        let _scan = self.scan_lock.lock();
        if let Some(cached) = self.fields.get(&key) {
            return cached.value().clone();
        }

        self.scans.fetch_add(1, Ordering::AcqRel);
        let resolved = self.catalog.scan(key.owner, key.capability).map(Arc::new);
        match &resolved {
            Some(field) => tracing::debug!(
                target: "weave::inject",
                field = field.name,
                declared_on = field.declared_on,
                is_static = field.is_static(),
                "capability field resolved"
            ),
            None => tracing::debug!(
                target: "weave::inject",
                owner = ?key.owner,
                capability = ?key.capability,
                "no capability field; miss cached"
            ),
        }
        self.fields.insert(key, resolved.clone());
        resolved
    }

    fn static_value(
        &self,
        key: FieldLookupKey,
        read: impl FnOnce() -> Option<FieldValue>,
    ) -> Option<FieldValue> {
        if let Some(cached) = self.statics.get(&key) {
            return Some(Arc::clone(cached.value()));
        }
        let value = read()?;
        Some(Arc::clone(self.statics.entry(key).or_insert(value).value()))
    }

    fn instance_value(
        &self,
        key: FieldLookupKey,
        owner: &Arc<Erased>,
        read: impl FnOnce() -> Option<FieldValue>,
    ) -> Option<FieldValue> {
        let table = Arc::clone(self.instances.entry(key).or_default().value());
        let mut entries = table.lock();
        entries.retain(InstanceEntry::is_alive);

        let identity = Arc::as_ptr(owner) as *const ();
        if let Some(entry) = entries.iter().find(|entry| entry.belongs_to(identity)) {
            return Some(Arc::clone(&entry.value));
        }

        let value = read()?;
        entries.push(InstanceEntry {
            owner: Arc::downgrade(owner),
            value: Arc::clone(&value),
        });
        Some(value)
    }

    /// 字段扫描累计次数。
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Acquire)
    }

    /// 查找键下所有者仍然存活的实例条目数。
    pub fn live_entries<O: Any, C: Any>(&self) -> usize {
        self.table(FieldLookupKey::of::<O, C>())
            .map_or(0, |table| table.lock().iter().filter(|entry| entry.is_alive()).count())
    }

    /// 查找键下当前保存的实例条目数（包括尚未清除的失效条目）。
    pub fn tracked_entries<O: Any, C: Any>(&self) -> usize {
        self.table(FieldLookupKey::of::<O, C>())
            .map_or(0, |table| table.lock().len())
    }

    /// 清除所有者已回收的实例条目，返回清除的条目数。
    ///
    /// 失效条目平时只在同一查找键再次被访问时清除；长期不再访问的键可由宿主定期调用本方法回收。
    /// 变空且没有其他线程正在使用的表一并移除。
    pub fn purge(&self) -> usize {
        let mut removed = 0;
        self.instances.retain(|_, table| {
            let remaining = {
                let mut entries = table.lock();
                let before = entries.len();
                entries.retain(InstanceEntry::is_alive);
                removed += before - entries.len();
                entries.len()
            };
            remaining > 0 || Arc::strong_count(table) > 1
        });
        if removed > 0 {
            tracing::debug!(target: "weave::inject", removed, "released owners purged");
        }
        removed
    }

    fn table(&self, key: FieldLookupKey) -> Option<InstanceTable> {
        self.instances.get(&key).map(|table| Arc::clone(table.value()))
    }

    /// 清空全部缓存与计数，字段目录保持不变。
    pub fn reset(&self) {
        let _scan = self.scan_lock.lock();
        self.fields.clear();
        self.statics.clear();
        self.instances.clear();
        self.scans.store(0, Ordering::Release);
    }
}

impl fmt::Debug for InstanceFieldCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceFieldCache")
            .field("catalog", &self.catalog)
            .field("fields", &self.fields.len())
            .field("statics", &self.statics.len())
            .field("scans", &self.scan_count())
            .finish()
    }
}
