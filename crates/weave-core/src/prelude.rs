//! # weave-core Prelude
//!
//! 行为实现与宿主装配代码最常用的类型一站式导入：`use weave_core::prelude::*;`。
//! 只收录跨模块高频使用的契约；诊断与桩类型仍需通过完整路径引入。

pub use crate::{
    config::{CounterDirections, CounterKind, CounterSettings},
    error::{ArgumentError, ConfigError},
    inject::InstanceFieldCache,
    intercept::{
        Advice, Argument, ArgumentValue, CallContext, CallOutcome, CallSite, EntryFlow,
        ExceptionFlow, Interceptor, InterceptorChain,
    },
    metrics::{MetricHandle, MetricKind, MetricRegistry},
    observability::{LogLevel, Logger},
    retry::{ErrorFilter, RetryExecutor, RetryOutcome, RetryPolicy},
    time::Clock,
};
