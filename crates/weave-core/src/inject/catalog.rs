use std::{
    any::{Any, TypeId, type_name},
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use dashmap::DashMap;

/// 擦除后的字段值。
pub type FieldValue = Arc<dyn Any + Send + Sync>;

pub(crate) type Erased = dyn Any + Send + Sync;

type StaticGetter = Arc<dyn Fn() -> Option<FieldValue> + Send + Sync>;
type InstanceGetter = Arc<dyn Fn(&Erased) -> Option<FieldValue> + Send + Sync>;
type Upcast = Arc<dyn for<'a> Fn(&'a Erased) -> Option<&'a Erased> + Send + Sync>;

/// 为闭包补上高阶生命周期约束，使返回的引用与入参绑定。
fn constrain<F>(upcast: F) -> F
where
    F: for<'a> Fn(&'a Erased) -> Option<&'a Erased>,
{
    upcast
}

#[derive(Clone)]
pub(crate) enum FieldAccess {
    Static(StaticGetter),
    Instance(InstanceGetter),
}

struct FieldSpec {
    name: &'static str,
    capability: TypeId,
    access: FieldAccess,
}

struct BaseLink {
    base: TypeId,
    upcast: Upcast,
}

struct TypeLayout {
    type_name: &'static str,
    fields: Vec<FieldSpec>,
    bases: Vec<BaseLink>,
}

/// 一次扫描选中的字段。
#[derive(Clone)]
pub(crate) struct ResolvedField {
    pub(crate) name: &'static str,
    pub(crate) declared_on: &'static str,
    pub(crate) access: FieldAccess,
}

impl ResolvedField {
    /// 把基类型上的实例字段提升为派生类型上的访问器。
    fn through(self, upcast: Upcast) -> Self {
        let access = match self.access {
            FieldAccess::Static(getter) => FieldAccess::Static(getter),
            FieldAccess::Instance(getter) => {
                let composed: InstanceGetter =
                    Arc::new(move |owner: &Erased| upcast(owner).and_then(|base| getter(base)));
                FieldAccess::Instance(composed)
            }
        };
        Self {
            name: self.name,
            declared_on: self.declared_on,
            access,
        }
    }

    pub(crate) fn is_static(&self) -> bool {
        matches!(self.access, FieldAccess::Static(_))
    }
}

impl fmt::Debug for ResolvedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedField")
            .field("name", &self.name)
            .field("declared_on", &self.declared_on)
            .field("static", &self.is_static())
            .finish()
    }
}

/// 所有者类型的字段目录。
///
/// # 教案式说明
/// - **意图（Why）**：Rust 没有运行时字段反射；所有者类型在装配期把“哪些字段可以作为协作者”一次性声明在目录中，
///   [`super::InstanceFieldCache`] 再按声明顺序扫描，得到与反射扫描相同的“首个匹配字段”语义；
/// - **结构（How）**：
///   - 每个类型一份布局：自身字段按声明顺序排列，随后是通过 [`TypeRegistration::inherits`] 声明的基类型；
///   - 字段值统一擦除为 [`FieldValue`]，能力类型以 `TypeId` 精确匹配；
///   - 基类型通过升格函数 `fn(&Owner) -> &Base` 接入，实例字段访问器在扫描时与升格函数组合。
/// - **契约（What）**：
///   - 注册应在首次解析之前完成，缓存不会因为之后追加的注册而失效；
///   - 重复注册同一类型会整体替换其布局。
#[derive(Default)]
pub struct FieldCatalog {
    layouts: DashMap<TypeId, Arc<TypeLayout>>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始声明所有者类型 `O` 的字段。
    pub fn register<O>(&self) -> TypeRegistration<'_, O>
    where
        O: Any + Send + Sync,
    {
        TypeRegistration {
            catalog: self,
            layout: TypeLayout {
                type_name: type_name::<O>(),
                fields: Vec::new(),
                bases: Vec::new(),
            },
            _owner: PhantomData,
        }
    }

    pub fn is_registered(&self, owner: TypeId) -> bool {
        self.layouts.contains_key(&owner)
    }

    /// 按“自身字段优先、基类型依次展开”的顺序查找首个能力类型匹配的字段。
    pub(crate) fn scan(&self, owner: TypeId, capability: TypeId) -> Option<ResolvedField> {
        let mut visited = Vec::new();
        self.scan_from(owner, capability, &mut visited)
    }

    fn scan_from(
        &self,
        owner: TypeId,
        capability: TypeId,
        visited: &mut Vec<TypeId>,
    ) -> Option<ResolvedField> {
        if visited.contains(&owner) {
            return None;
        }
        visited.push(owner);

        let layout = self.layouts.get(&owner).map(|entry| Arc::clone(entry.value()))?;
        if let Some(field) = layout
            .fields
            .iter()
            .find(|field| field.capability == capability)
        {
            return Some(ResolvedField {
                name: field.name,
                declared_on: layout.type_name,
                access: field.access.clone(),
            });
        }
        layout.bases.iter().find_map(|link| {
            self.scan_from(link.base, capability, visited)
                .map(|found| found.through(Arc::clone(&link.upcast)))
        })
    }
}

impl fmt::Debug for FieldCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&'static str> = self
            .layouts
            .iter()
            .map(|entry| entry.value().type_name)
            .collect();
        types.sort_unstable();
        f.debug_struct("FieldCatalog").field("types", &types).finish()
    }
}

/// 单个所有者类型的字段声明构建器，调用 [`TypeRegistration::finish`] 后写入目录。
#[must_use = "call `finish` to store the layout in the catalog"]
pub struct TypeRegistration<'c, O> {
    catalog: &'c FieldCatalog,
    layout: TypeLayout,
    _owner: PhantomData<fn(&O)>,
}

impl<O> TypeRegistration<'_, O>
where
    O: Any + Send + Sync,
{
    /// 声明实例字段；`getter` 返回 `None` 表示该字段当前没有值。
    pub fn instance_field<C>(
        mut self,
        name: &'static str,
        getter: impl Fn(&O) -> Option<C> + Send + Sync + 'static,
    ) -> Self
    where
        C: Any + Send + Sync,
    {
        let access: InstanceGetter = Arc::new(move |owner: &Erased| {
            owner
                .downcast_ref::<O>()
                .and_then(|owner| getter(owner))
                .map(|value| Arc::new(value) as FieldValue)
        });
        self.layout.fields.push(FieldSpec {
            name,
            capability: TypeId::of::<C>(),
            access: FieldAccess::Instance(access),
        });
        self
    }

    /// 声明静态字段；值在首次解析成功后被永久缓存。
    pub fn static_field<C>(
        mut self,
        name: &'static str,
        getter: impl Fn() -> Option<C> + Send + Sync + 'static,
    ) -> Self
    where
        C: Any + Send + Sync,
    {
        let access: StaticGetter =
            Arc::new(move || getter().map(|value| Arc::new(value) as FieldValue));
        self.layout.fields.push(FieldSpec {
            name,
            capability: TypeId::of::<C>(),
            access: FieldAccess::Static(access),
        });
        self
    }

    /// 声明基类型；基类型的字段排在 `O` 自身字段之后参与扫描。
    pub fn inherits<B>(mut self, upcast: fn(&O) -> &B) -> Self
    where
        B: Any + Send + Sync,
    {
        let link: Upcast = Arc::new(constrain(move |owner: &Erased| {
            owner
                .downcast_ref::<O>()
                .map(|owner| upcast(owner) as &Erased)
        }));
        self.layout.bases.push(BaseLink {
            base: TypeId::of::<B>(),
            upcast: link,
        });
        self
    }

    pub fn finish(self) {
        tracing::trace!(
            target: "weave::inject",
            owner = self.layout.type_name,
            fields = self.layout.fields.len(),
            bases = self.layout.bases.len(),
            "field layout registered"
        );
        self.catalog
            .layouts
            .insert(TypeId::of::<O>(), Arc::new(self.layout));
    }
}
