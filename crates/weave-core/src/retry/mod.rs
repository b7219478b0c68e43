//! 有界重试：策略、过滤器、等待与执行器。
//!
//! - [`executor`]：[`RetryPolicy`]、[`RetryState`] 状态机与 [`RetryExecutor`] 循环；
//! - [`filter`]：按错误类型或谓词筛选可重试错误；
//! - [`pause`]：两次尝试之间的阻塞等待，可替换为记录型实现。

pub mod executor;
pub mod filter;
pub mod pause;

pub use executor::{RetryExecutor, RetryOutcome, RetryPolicy, RetryState, UnmatchedErrorPolicy};
pub use filter::ErrorFilter;
pub use pause::{Pause, ThreadSleep};
