//! 可注入的单调时钟。
//!
//! - **意图 (Why)**：缓存过期与耗时剖析都依赖“当前时间”；把时间来源抽象为 trait 后，
//!   测试可以用手动推进的时钟得到确定的过期判定与耗时数值；
//! - **契约 (What)**：`now` 返回单调时间点，实现必须可跨线程共享；
//! - **注意 (Trade-offs)**：只提供读取，不提供等待；阻塞等待由重试模块的 [`crate::retry::Pause`] 负责。

use std::time::Instant;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// 以 [`Instant::now`] 为时间来源。
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
