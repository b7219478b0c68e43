//! 运行时服务使用的锁原语。
//!
//! 常规构建直接使用 `parking_lot`；以 `--cfg loom` 且开启 `loom-model` 特性构建时换成 loom 的模型锁，
//! 注册表与字段缓存的锁协议因此可以在 loom 下穷举线程交错。两套实现暴露相同的无中毒接口。

#[cfg(not(all(loom, feature = "loom-model")))]
pub(crate) use parking_lot::{Mutex, RwLock};

#[cfg(all(loom, feature = "loom-model"))]
pub(crate) use model::{Mutex, RwLock};

#[cfg(all(loom, feature = "loom-model"))]
mod model {
    use std::sync::PoisonError;

    use loom::sync::{MutexGuard, RwLockReadGuard, RwLockWriteGuard};

    pub(crate) struct Mutex<T>(loom::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub(crate) fn new(value: T) -> Self {
            Self(loom::sync::Mutex::new(value))
        }

        pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    impl<T: Default> Default for Mutex<T> {
        fn default() -> Self {
            Self::new(T::default())
        }
    }

    pub(crate) struct RwLock<T>(loom::sync::RwLock<T>);

    impl<T> RwLock<T> {
        pub(crate) fn new(value: T) -> Self {
            Self(loom::sync::RwLock::new(value))
        }

        pub(crate) fn read(&self) -> RwLockReadGuard<'_, T> {
            self.0.read().unwrap_or_else(PoisonError::into_inner)
        }

        pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
            self.0.write().unwrap_or_else(PoisonError::into_inner)
        }
    }
}
