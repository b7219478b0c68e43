use std::{any::type_name, borrow::Cow, error::Error, fmt, sync::Arc};

type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// 决定哪些错误值得重试。
///
/// # 教案式说明
/// - **意图（Why）**：只有可恢复的故障（超时、连接重置）才应消耗重试次数，逻辑错误应尽快暴露；
/// - **契约（What）**：
///   - [`ErrorFilter::Any`] 匹配所有错误；
///   - [`ErrorFilter::of`] 匹配错误本身或其 `source()` 链上任一环节为指定类型的情况，
///     对应“异常类型可赋值给过滤类型”的判定；
///   - [`ErrorFilter::when`] 接受任意谓词，`name` 仅用于诊断输出。
pub enum ErrorFilter<E> {
    Any,
    Matching {
        name: Cow<'static, str>,
        predicate: Predicate<E>,
    },
}

impl<E> ErrorFilter<E> {
    pub fn when(
        name: impl Into<Cow<'static, str>>,
        predicate: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        ErrorFilter::Matching {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn matches(&self, error: &E) -> bool {
        match self {
            ErrorFilter::Any => true,
            ErrorFilter::Matching { predicate, .. } => predicate(error),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ErrorFilter::Any => "any",
            ErrorFilter::Matching { name, .. } => name,
        }
    }
}

impl<E> ErrorFilter<E>
where
    E: Error + 'static,
{
    /// 匹配错误链中任一环节为 `X` 的错误。
    pub fn of<X>() -> Self
    where
        X: Error + 'static,
    {
        ErrorFilter::Matching {
            name: Cow::Borrowed(type_name::<X>()),
            predicate: Arc::new(|error: &E| chain_contains::<X>(error)),
        }
    }
}

fn chain_contains<X>(error: &(dyn Error + 'static)) -> bool
where
    X: Error + 'static,
{
    let mut current = Some(error);
    while let Some(link) = current {
        if link.is::<X>() {
            return true;
        }
        current = link.source();
    }
    false
}

impl<E> Default for ErrorFilter<E> {
    fn default() -> Self {
        ErrorFilter::Any
    }
}

impl<E> Clone for ErrorFilter<E> {
    fn clone(&self) -> Self {
        match self {
            ErrorFilter::Any => ErrorFilter::Any,
            ErrorFilter::Matching { name, predicate } => ErrorFilter::Matching {
                name: name.clone(),
                predicate: Arc::clone(predicate),
            },
        }
    }
}

impl<E> fmt::Debug for ErrorFilter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorFilter").field(&self.name()).finish()
    }
}
