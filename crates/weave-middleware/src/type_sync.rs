//! 类型级串行化：同一所有者类型上挂载本行为的调用在任一时刻只有一个线程在执行。
//!
//! # 教案式概览
//! - **意图（Why）**：非线程安全的类型（共享的静态状态、外部句柄）需要“整类型一把锁”，
//!   而不是每个实例一把；
//! - **结构（How）**：
//!   - [`TypeLocks`] 以所有者类型为键分配可重入锁，同一类型的所有调用点共享一把；
//!   - [`TypeSyncInterceptor`] 在装配时取得本类型的锁，调用时以可选的超时获取；
//! - **契约（What）**：
//!   - 锁可重入：持锁线程在调用内部再次进入同类型的同步调用不会自锁；
//!   - 在超时内未取得锁时跳过调用，返回 `T::default()` 并记录一条 `warn`；
//!   - 未设置超时时一直等待；
//!   - 调用点没有所有者类型时按类型名分配锁。
//! - **风险提示（Trade-offs）**：锁表只增不减，条目数量等于挂载过本行为的类型数。

use std::{
    any::TypeId,
    fmt,
    sync::{Arc, OnceLock},
    time::Duration,
};

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use weave_core::{CallContext, CallSite, Interceptor, TypeSyncSettings};

type TypeLock = Arc<ReentrantMutex<()>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum LockKey {
    Type(TypeId),
    Name(&'static str),
}

impl LockKey {
    fn of(site: &CallSite) -> Self {
        site.owner_type().map_or(LockKey::Name(site.type_name()), LockKey::Type)
    }
}

/// 按所有者类型分配的锁表。
#[derive(Default)]
pub struct TypeLocks {
    locks: DashMap<LockKey, TypeLock>,
}

impl TypeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级锁表。
    pub fn global() -> Arc<TypeLocks> {
        static GLOBAL: OnceLock<Arc<TypeLocks>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(TypeLocks::new())))
    }

    fn lock_for(&self, site: &CallSite) -> TypeLock {
        let key = LockKey::of(site);
        let lock = self.locks.entry(key).or_insert_with(|| {
            tracing::debug!(target: "weave", owner = site.type_name(), "type lock initialized");
            Arc::new(ReentrantMutex::new(()))
        });
        Arc::clone(lock.value())
    }

    /// 已分配的锁数量。
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl fmt::Debug for TypeLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeLocks")
            .field("locks", &self.locks.len())
            .finish()
    }
}

/// 类型级串行化拦截器。
pub struct TypeSyncInterceptor {
    site: String,
    lock: TypeLock,
    timeout: Option<Duration>,
}

impl TypeSyncInterceptor {
    pub fn new(site: &CallSite, settings: &TypeSyncSettings, locks: &TypeLocks) -> Self {
        Self {
            site: site.to_string(),
            lock: locks.lock_for(site),
            timeout: settings.acquire_timeout_ms.map(Duration::from_millis),
        }
    }

    /// 使用进程级锁表。
    pub fn global(site: &CallSite, settings: &TypeSyncSettings) -> Self {
        Self::new(site, settings, &TypeLocks::global())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl<T, E> Interceptor<T, E> for TypeSyncInterceptor
where
    T: Default,
{
    fn intercept(
        &self,
        _call: &CallContext<'_>,
        next: &mut dyn FnMut() -> Result<T, E>,
    ) -> Result<T, E> {
        let guard = match self.timeout {
            Some(timeout) => self.lock.try_lock_for(timeout),
            None => Some(self.lock.lock()),
        };
        let Some(_guard) = guard else {
            tracing::warn!(
                target: "weave",
                site = %self.site,
                timeout_ms = self.timeout.map_or(0, |timeout| timeout.as_millis() as u64),
                "type lock not acquired in time; call skipped"
            );
            return Ok(T::default());
        };
        next()
    }
}

impl fmt::Debug for TypeSyncInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSyncInterceptor")
            .field("site", &self.site)
            .field("timeout", &self.timeout)
            .finish()
    }
}
