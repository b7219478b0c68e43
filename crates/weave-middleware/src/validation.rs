use std::fmt;

use weave_core::{
    Advice, ArgumentCheckSettings, ArgumentError, ArgumentValue, CallContext, CallSite,
    ConfigError, EntryFlow,
};

/// 参数检查行为：在调用前拒绝缺省（以及可选地拒绝空串）的实参。
///
/// # 教案式说明
/// - **意图（Why）**：把“参数不得为空”的前置条件集中声明，失败时调用根本不会执行；
/// - **结构（How）**：装配时按名称或下标在调用点的参数表上定位目标，定位失败即返回 [`ConfigError`]；
///   调用时只按下标取实参，不再做名称比较；
/// - **契约（What）**：
///   - 实参缺失或为 [`ArgumentValue::Null`] 时返回 [`ArgumentError::Null`]；
///   - 开启 `reject_empty` 且实参为空文本时返回 [`ArgumentError::Empty`]；
///   - 错误经 `From<ArgumentError>` 转换为调用自身的错误类型。
#[derive(Clone)]
pub struct ArgumentCheckAdvice {
    site: String,
    name: &'static str,
    index: usize,
    reject_empty: bool,
}

impl ArgumentCheckAdvice {
    pub fn new(site: &CallSite, settings: &ArgumentCheckSettings) -> Result<Self, ConfigError> {
        let index = settings.resolve_index(site)?;
        let name = site.parameters()[index];
        Ok(Self {
            site: site.to_string(),
            name,
            index,
            reject_empty: settings.reject_empty,
        })
    }

    pub fn parameter(&self) -> &'static str {
        self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn check(&self, call: &CallContext<'_>) -> Result<(), ArgumentError> {
        let value = call
            .argument_at(self.index)
            .map_or(ArgumentValue::Null, |argument| argument.value);
        match value {
            ArgumentValue::Null => Err(ArgumentError::Null {
                site: self.site.clone(),
                name: self.name.to_owned(),
            }),
            ArgumentValue::Text(text) if self.reject_empty && text.is_empty() => {
                Err(ArgumentError::Empty {
                    site: self.site.clone(),
                    name: self.name.to_owned(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl<T, E> Advice<T, E> for ArgumentCheckAdvice
where
    E: From<ArgumentError>,
{
    fn on_entry(&self, call: &CallContext<'_>) -> Result<EntryFlow<T>, E> {
        self.check(call)?;
        Ok(EntryFlow::Proceed)
    }
}

impl fmt::Debug for ArgumentCheckAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentCheckAdvice")
            .field("site", &self.site)
            .field("parameter", &self.name)
            .field("reject_empty", &self.reject_empty)
            .finish()
    }
}
