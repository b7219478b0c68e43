//! 结果缓存：以“调用点 + 所有者实例 + 实参编码”为键缓存成功的返回值。
//!
//! # 教案式概览
//! - **意图（Why）**：对输入相同、结果稳定且代价高的调用，第二次起直接返回已计算的值；
//! - **结构（How）**：[`CachingAdvice`] 在进入钩子查询、在成功钩子写入；条目保存在 `DashMap` 中，
//!   时间来源为可注入的 [`Clock`]；实参以 [`encode_arguments`] 编码，不复用日志格式；
//! - **契约（What）**：
//!   - 只缓存成功结果，失败的调用每次都会真正执行；
//!   - 同一键并发计算时以先写入者为准，之后命中的调用都看到同一个值；
//!   - 绝对过期自写入起计时；滑动过期自最近一次命中起计时；两者都未设置时永不过期；
//!   - 缓存键包含所有者实例：不同实例的条目相互隔离，没有所有者的调用共享一组条目；
//!   - 条目只以 `Weak` 引用所有者，所有者回收后其条目不再命中。
//! - **风险提示（Trade-offs）**：
//!   - 所有者地址作为身份：条目持有的 `Weak` 使分配在条目存在期间不被释放，地址因此不会被新对象复用；
//!   - 过期条目与所有者已回收的条目只在下次访问同一键时清理，需要时调用 [`CachingAdvice::purge_expired`]。

use std::{
    any::Any,
    fmt,
    sync::{Arc, Weak},
    time::{Duration, Instant},
};

use dashmap::{DashMap, mapref::entry::Entry};
use weave_core::{
    Advice, CachingSettings, CallContext, CallSite, Clock, ConfigError, EntryFlow, SystemClock,
    encode_arguments,
};

type Owner = dyn Any + Send + Sync;

/// 条目过期方式。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiry {
    Never,
    Absolute(Duration),
    Sliding(Duration),
}

impl Expiry {
    fn from_settings(settings: &CachingSettings) -> Self {
        match (settings.absolute_expiry_ms, settings.sliding_expiry_ms) {
            (Some(ms), _) => Expiry::Absolute(Duration::from_millis(ms)),
            (None, Some(ms)) => Expiry::Sliding(Duration::from_millis(ms)),
            (None, None) => Expiry::Never,
        }
    }

    fn is_expired<T>(self, entry: &CachedValue<T>, now: Instant) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::Absolute(ttl) => now.saturating_duration_since(entry.stored_at) >= ttl,
            Expiry::Sliding(ttl) => now.saturating_duration_since(entry.last_access) >= ttl,
        }
    }
}

/// 缓存键；`owner` 为所有者分配地址，没有所有者时为 0。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    owner: usize,
    arguments: String,
}

struct CachedValue<T> {
    value: T,
    owner: Option<Weak<Owner>>,
    stored_at: Instant,
    last_access: Instant,
}

impl<T> CachedValue<T> {
    fn owner_alive(&self) -> bool {
        self.owner.as_ref().is_none_or(|owner| owner.strong_count() > 0)
    }
}

fn owner_address(owner: Option<&Arc<Owner>>) -> usize {
    owner.map_or(0, |owner| Arc::as_ptr(owner) as *const () as usize)
}

/// 结果缓存行为。
pub struct CachingAdvice<T> {
    site: String,
    expiry: Expiry,
    entries: DashMap<CacheKey, CachedValue<T>>,
    clock: Arc<dyn Clock>,
}

impl<T> CachingAdvice<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(site: &CallSite, settings: &CachingSettings) -> Result<Self, ConfigError> {
        let site = site.to_string();
        settings.validate(&site)?;
        Ok(Self {
            site,
            expiry: Expiry::from_settings(settings),
            entries: DashMap::new(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 清空全部条目。
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// 移除已过期或所有者已回收的条目，返回剩余条目数。
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.entries.retain(|_, entry| !self.is_stale(entry, now));
        self.entries.len()
    }

    fn is_stale(&self, entry: &CachedValue<T>, now: Instant) -> bool {
        !entry.owner_alive() || self.expiry.is_expired(entry, now)
    }

    fn key(&self, call: &CallContext<'_>) -> CacheKey {
        CacheKey {
            owner: owner_address(call.owner()),
            arguments: encode_arguments(call.arguments()),
        }
    }
}

impl<T, E> Advice<T, E> for CachingAdvice<T>
where
    T: Clone + Send + Sync,
{
    fn on_entry(&self, call: &CallContext<'_>) -> Result<EntryFlow<T>, E> {
        let key = self.key(call);
        let now = self.clock.now();
        if let Some(mut entry) = self.entries.get_mut(&key)
            && !self.is_stale(&entry, now)
        {
            entry.last_access = now;
            tracing::trace!(target: "weave", site = %self.site, key = ?key, "cache hit");
            return Ok(EntryFlow::Return(entry.value.clone()));
        }
        self.entries
            .remove_if(&key, |_, entry| self.is_stale(entry, now));
        Ok(EntryFlow::Proceed)
    }

    fn on_success(&self, call: &CallContext<'_>, value: &T) {
        let key = self.key(call);
        let now = self.clock.now();
        let fresh = CachedValue {
            value: value.clone(),
            owner: call.owner().map(Arc::downgrade),
            stored_at: now,
            last_access: now,
        };
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if self.is_stale(occupied.get(), now) {
                    occupied.insert(fresh);
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
            }
        }
    }
}

impl<T> fmt::Debug for CachingAdvice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingAdvice")
            .field("site", &self.site)
            .field("expiry", &self.expiry)
            .field("entries", &self.entries.len())
            .finish()
    }
}
