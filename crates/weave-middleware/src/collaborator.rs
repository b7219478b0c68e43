use std::{any::TypeId, fmt, sync::Arc};

use weave_core::{CallContext, CallSite, InstanceFieldCache, Logger};

/// 行为使用的 Logger 来源。
///
/// # 教案式说明
/// - **意图（Why）**：重试、调用日志与异常处理都希望把诊断写进“所有者自己的 Logger”。
///   所有者类型可以在字段目录中声明一个 `Arc<dyn Logger>` 字段，静态或实例均可；
///   都没有时退回到行为各自的默认 Logger；
/// - **结构（How）**：
///   1. 显式注入的 Logger 优先；
///   2. 装配时以“无所有者”解析一次，命中静态字段则固定下来；
///   3. 否则每次调用按调用上下文中的所有者实例解析，实例值由 [`InstanceFieldCache`] 按所有者身份缓存；
///   4. 仍未找到时使用回退 Logger。
/// - **契约（What）**：`resolve` 从不失败；调用点没有所有者类型时直接使用回退 Logger。
#[derive(Clone)]
pub struct LoggerLookup {
    cache: &'static InstanceFieldCache,
    owner_type: Option<TypeId>,
    fixed: Option<Arc<dyn Logger>>,
    fallback: Arc<dyn Logger>,
}

impl LoggerLookup {
    /// 使用进程级字段缓存。
    pub fn for_site(site: &CallSite, fallback: Arc<dyn Logger>) -> Self {
        Self::with_cache(InstanceFieldCache::global(), site, fallback)
    }

    pub fn with_cache(
        cache: &'static InstanceFieldCache,
        site: &CallSite,
        fallback: Arc<dyn Logger>,
    ) -> Self {
        let owner_type = site.owner_type();
        let fixed = owner_type
            .and_then(|owner_type| cache.resolve_erased::<Arc<dyn Logger>>(owner_type, None));
        Self {
            cache,
            owner_type,
            fixed,
            fallback,
        }
    }

    /// 始终使用给定 Logger，不做任何查找。
    pub fn explicit(logger: Arc<dyn Logger>) -> Self {
        Self {
            cache: InstanceFieldCache::global(),
            owner_type: None,
            fixed: Some(Arc::clone(&logger)),
            fallback: logger,
        }
    }

    pub fn resolve(&self, call: &CallContext<'_>) -> Arc<dyn Logger> {
        if let Some(logger) = &self.fixed {
            return Arc::clone(logger);
        }
        self.owner_type
            .and_then(|owner_type| {
                self.cache
                    .resolve_erased::<Arc<dyn Logger>>(owner_type, call.owner())
            })
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }
}

impl fmt::Debug for LoggerLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerLookup")
            .field("owner_type", &self.owner_type)
            .field("fixed", &self.fixed.is_some())
            .finish()
    }
}
