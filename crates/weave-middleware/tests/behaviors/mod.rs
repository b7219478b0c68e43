//! 行为集成测试：调用日志、耗时剖析、异常处理、结果缓存、参数检查、重试拦截、类型同步与整链装配。

mod assembly;
mod logging;
mod type_sync;
mod validation;

use thiserror::Error;
use weave_core::ArgumentError;

/// 被拦截调用的错误类型，参数检查失败经 `From` 转换进来。
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum StoreError {
    #[error("out of stock")]
    OutOfStock,
    #[error("warehouse timed out")]
    Timeout,
    #[error("checkout failed: {0}")]
    Checkout(String),
    #[error(transparent)]
    Invalid(#[from] ArgumentError),
}
