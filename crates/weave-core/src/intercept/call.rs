use std::{
    any::{Any, TypeId, type_name},
    fmt,
    sync::Arc,
};

/// 被拦截方法的静态描述。
///
/// 在装配期构造一次并由行为持有；`owner_type` 用于按所有者类型查找协作者字段。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSite {
    type_name: &'static str,
    method: &'static str,
    parameters: Vec<&'static str>,
    owner_type: Option<TypeId>,
}

impl CallSite {
    pub fn new(type_name: &'static str, method: &'static str) -> Self {
        Self {
            type_name,
            method,
            parameters: Vec::new(),
            owner_type: None,
        }
    }

    /// 以所有者类型 `T` 构造调用点，类型名取去掉模块路径后的短名。
    pub fn of<T: Any>(method: &'static str) -> Self {
        Self {
            type_name: short_type_name(type_name::<T>()),
            method,
            parameters: Vec::new(),
            owner_type: Some(TypeId::of::<T>()),
        }
    }

    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = &'static str>) -> Self {
        self.parameters = parameters.into_iter().collect();
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn parameters(&self) -> &[&'static str] {
        &self.parameters
    }

    pub fn owner_type(&self) -> Option<TypeId> {
        self.owner_type
    }

    /// 按名称（不区分大小写）查找参数下标。
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|parameter| parameter.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.method)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head)
}

/// 单个实参的借用视图。
#[derive(Clone, Copy)]
pub enum ArgumentValue<'a> {
    /// 缺省值（`None`）。
    Null,
    Text(&'a str),
    Value(&'a dyn fmt::Debug),
}

impl ArgumentValue<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, ArgumentValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgumentValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for ArgumentValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Null => f.write_str("null"),
            ArgumentValue::Text(text) => f.write_str(text),
            ArgumentValue::Value(value) => write!(f, "{value:?}"),
        }
    }
}

impl fmt::Debug for ArgumentValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Null => f.write_str("Null"),
            ArgumentValue::Text(text) => write!(f, "Text({text:?})"),
            ArgumentValue::Value(value) => write!(f, "Value({value:?})"),
        }
    }
}

/// 具名实参。
#[derive(Clone, Copy, Debug)]
pub struct Argument<'a> {
    pub name: &'static str,
    pub value: ArgumentValue<'a>,
}

impl<'a> Argument<'a> {
    pub fn text(name: &'static str, value: &'a str) -> Self {
        Self {
            name,
            value: ArgumentValue::Text(value),
        }
    }

    pub fn debug(name: &'static str, value: &'a dyn fmt::Debug) -> Self {
        Self {
            name,
            value: ArgumentValue::Value(value),
        }
    }

    pub fn null(name: &'static str) -> Self {
        Self {
            name,
            value: ArgumentValue::Null,
        }
    }

    pub fn optional<V: fmt::Debug>(name: &'static str, value: Option<&'a V>) -> Self {
        match value {
            Some(value) => Self::debug(name, value),
            None => Self::null(name),
        }
    }

    pub fn optional_text(name: &'static str, value: Option<&'a str>) -> Self {
        match value {
            Some(value) => Self::text(name, value),
            None => Self::null(name),
        }
    }
}

/// 一次调用的上下文：调用点、可选的所有者实例与实参列表。
pub struct CallContext<'a> {
    site: &'a CallSite,
    owner: Option<Arc<dyn Any + Send + Sync>>,
    arguments: Vec<Argument<'a>>,
}

impl<'a> CallContext<'a> {
    pub fn new(site: &'a CallSite) -> Self {
        Self {
            site,
            owner: None,
            arguments: Vec::new(),
        }
    }

    pub fn with_owner<O: Any + Send + Sync>(mut self, owner: &Arc<O>) -> Self {
        self.owner = Some(Arc::clone(owner) as Arc<dyn Any + Send + Sync>);
        self
    }

    pub fn with_argument(mut self, argument: Argument<'a>) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = Argument<'a>>) -> Self {
        self.arguments.extend(arguments);
        self
    }

    pub fn site(&self) -> &CallSite {
        self.site
    }

    pub fn owner(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.owner.as_ref()
    }

    pub fn arguments(&self) -> &[Argument<'a>] {
        &self.arguments
    }

    pub fn argument_at(&self, index: usize) -> Option<&Argument<'a>> {
        self.arguments.get(index)
    }

    /// 按名称（不区分大小写）查找实参。
    pub fn argument(&self, name: &str) -> Option<&Argument<'a>> {
        self.arguments
            .iter()
            .find(|argument| argument.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("site", &format_args!("{}", self.site))
            .field("has_owner", &self.owner.is_some())
            .field("arguments", &self.arguments)
            .finish()
    }
}
