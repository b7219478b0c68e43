use crate::intercept::call::CallContext;

/// 进入钩子的流程决策。
#[derive(Debug, PartialEq, Eq)]
pub enum EntryFlow<T> {
    /// 继续执行被拦截的调用。
    Proceed,
    /// 跳过调用，直接以给定值返回。
    Return(T),
}

/// 异常钩子的流程决策。
#[derive(Debug, PartialEq, Eq)]
pub enum ExceptionFlow<T, E> {
    /// 原样传播错误。
    Rethrow,
    /// 以新的错误替换原错误。
    Replace(E),
    /// 吞掉错误，以给定值作为调用结果。
    Suppress(T),
}

/// 调用结束时的结果视图，交给退出钩子。
#[derive(Debug)]
pub enum CallOutcome<'r, T, E> {
    Returned(&'r T),
    Failed(&'r E),
}

impl<T, E> CallOutcome<'_, T, E> {
    pub fn is_failure(&self) -> bool {
        matches!(self, CallOutcome::Failed(_))
    }
}

impl<T, E> Clone for CallOutcome<'_, T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for CallOutcome<'_, T, E> {}

/// 边界型行为：在调用前、成功后、出错时与退出时接收通知。
///
/// # 教案式说明
/// - **意图（Why）**：计数、日志、缓存、参数校验只需要在调用边界上观察或改变流程，
///   不需要亲自驱动调用；四个钩子足以表达它们；
/// - **契约（What）**：
///   - 一次调用的钩子顺序固定为 `on_entry` → 被拦截调用 → `on_success` 或 `on_exception` → `on_exit`；
///   - `on_entry` 返回 `Err` 时调用不会执行，其余钩子也不会触发；返回 [`EntryFlow::Return`] 时同样跳过其余钩子；
///   - `on_exit` 在成功与失败两条路径上都会触发，位于流程决策生效之前；
///   - 所有钩子都有空实现，行为只覆盖关心的阶段。
pub trait Advice<T, E>: Send + Sync {
    fn on_entry(&self, call: &CallContext<'_>) -> Result<EntryFlow<T>, E> {
        let _ = call;
        Ok(EntryFlow::Proceed)
    }

    fn on_success(&self, call: &CallContext<'_>, value: &T) {
        let _ = (call, value);
    }

    fn on_exception(&self, call: &CallContext<'_>, error: &E) -> ExceptionFlow<T, E> {
        let _ = (call, error);
        ExceptionFlow::Rethrow
    }

    fn on_exit(&self, call: &CallContext<'_>, outcome: CallOutcome<'_, T, E>) {
        let _ = (call, outcome);
    }
}

/// 环绕型行为：亲自决定是否、何时以及调用几次 `next`。
pub trait Interceptor<T, E>: Send + Sync {
    fn intercept(
        &self,
        call: &CallContext<'_>,
        next: &mut dyn FnMut() -> Result<T, E>,
    ) -> Result<T, E>;
}

/// 把 [`Advice`] 适配为 [`Interceptor`]，按固定顺序派发四个钩子。
#[derive(Debug, Default)]
pub struct Boundary<A> {
    advice: A,
}

impl<A> Boundary<A> {
    pub fn new(advice: A) -> Self {
        Self { advice }
    }

    pub fn advice(&self) -> &A {
        &self.advice
    }
}

impl<T, E, A> Interceptor<T, E> for Boundary<A>
where
    A: Advice<T, E>,
{
    fn intercept(
        &self,
        call: &CallContext<'_>,
        next: &mut dyn FnMut() -> Result<T, E>,
    ) -> Result<T, E> {
        if let EntryFlow::Return(value) = self.advice.on_entry(call)? {
            return Ok(value);
        }

        match next() {
            Ok(value) => {
                self.advice.on_success(call, &value);
                self.advice.on_exit(call, CallOutcome::Returned(&value));
                Ok(value)
            }
            Err(error) => {
                let flow = self.advice.on_exception(call, &error);
                self.advice.on_exit(call, CallOutcome::Failed(&error));
                match flow {
                    ExceptionFlow::Rethrow => Err(error),
                    ExceptionFlow::Replace(replacement) => Err(replacement),
                    ExceptionFlow::Suppress(value) => Ok(value),
                }
            }
        }
    }
}
