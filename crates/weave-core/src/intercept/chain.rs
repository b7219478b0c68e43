use std::{fmt, sync::Arc};

use crate::intercept::{
    advice::{Advice, Boundary, Interceptor},
    call::CallContext,
};

/// 最小拦截驱动链。
///
/// # 教案式说明
/// - **意图（Why）**：宿主的织入机制不在本库范围内，但行为需要在测试与手工装配场景下被组合与驱动；
/// - **结构（How）**：按声明顺序递归嵌套，第一个拦截器位于最外层，最后一个紧贴被拦截的调用；
/// - **契约（What）**：链本身不捕获、不记录任何错误，结果完全由各拦截器与被拦截调用决定。
pub struct InterceptorChain<T, E> {
    interceptors: Vec<Arc<dyn Interceptor<T, E>>>,
}

impl<T: 'static, E: 'static> InterceptorChain<T, E> {
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    pub fn with(mut self, interceptor: impl Interceptor<T, E> + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn with_shared(mut self, interceptor: Arc<dyn Interceptor<T, E>>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn with_advice(self, advice: impl Advice<T, E> + 'static) -> Self {
        self.with(Boundary::new(advice))
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// 在链中执行 `operation`。
    pub fn invoke<F>(&self, call: &CallContext<'_>, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        dispatch(&self.interceptors, call, &mut operation)
    }
}

fn dispatch<T, E>(
    chain: &[Arc<dyn Interceptor<T, E>>],
    call: &CallContext<'_>,
    operation: &mut dyn FnMut() -> Result<T, E>,
) -> Result<T, E> {
    match chain.split_first() {
        None => operation(),
        Some((outer, rest)) => outer.intercept(call, &mut || dispatch(rest, call, &mut *operation)),
    }
}

impl<T: 'static, E: 'static> Default for InterceptorChain<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for InterceptorChain<T, E> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}

impl<T, E> fmt::Debug for InterceptorChain<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}
