//! # config 模块说明
//!
//! ## 角色定位（Why）
//! - 每个被拦截的调用点在装配期声明其行为配置：计数器名称与种类、重试次数与延迟、日志级别等；
//! - 配置既可在代码中构造，也可从 TOML 文本整体加载（`toml_settings` 特性），
//!   二者经过同一套 `validate` 校验，非法配置在挂载行为之前即被拒绝。
//!
//! ## 结构（How）
//! - 各行为一份 `*Settings` 结构，均派生 `serde::Deserialize` 并为可选字段提供默认值；
//! - [`SiteSettings`] 汇总一个调用点上的全部行为，[`WeaveSettings`] 以调用点名称（如 `Orders.place`）为键汇总全部调用点。
//!
//! ## 注意事项（Trade-offs）
//! - 参数校验的目标是否存在依赖调用点的参数列表，只能在拿到 [`CallSite`] 后由
//!   [`ArgumentCheckSettings::resolve_index`] 完成，`validate` 只检查“名称与下标二选一”。

use std::{collections::BTreeMap, fmt, ops::BitOr};

use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    intercept::CallSite,
    metrics::{MetricKind, RegistryOptions},
    observability::LogLevel,
    retry::UnmatchedErrorPolicy,
};

/// 计数协议的三种语义。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    /// 累计总数：调用前递增，从不递减。
    #[default]
    Cumulative,
    /// 在途量：调用前递增，调用结束（无论成功与否）递减。
    InFlight,
    /// 方向速率：在方向掩码声明的阶段递增。
    Rate,
}

/// 速率计数器的单个触发阶段。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterDirection {
    BeforeInvoke,
    AfterInvoke,
    OnException,
}

/// 触发阶段位掩码。
///
/// 序列化为阶段列表，例如 `["before_invoke", "on_exception"]`。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<CounterDirection>", into = "Vec<CounterDirection>")]
pub struct CounterDirections(u8);

impl CounterDirections {
    pub const NONE: Self = Self(0);
    pub const BEFORE_INVOKE: Self = Self(0b001);
    pub const AFTER_INVOKE: Self = Self(0b010);
    pub const BOTH: Self = Self(0b011);
    pub const ON_EXCEPTION: Self = Self(0b100);

    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn directions(self) -> impl Iterator<Item = CounterDirection> {
        [
            CounterDirection::BeforeInvoke,
            CounterDirection::AfterInvoke,
            CounterDirection::OnException,
        ]
        .into_iter()
        .filter(move |direction| self.contains(Self::from(*direction)))
    }
}

impl Default for CounterDirections {
    fn default() -> Self {
        Self::BEFORE_INVOKE
    }
}

impl BitOr for CounterDirections {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<CounterDirection> for CounterDirections {
    fn from(direction: CounterDirection) -> Self {
        match direction {
            CounterDirection::BeforeInvoke => Self::BEFORE_INVOKE,
            CounterDirection::AfterInvoke => Self::AFTER_INVOKE,
            CounterDirection::OnException => Self::ON_EXCEPTION,
        }
    }
}

impl From<Vec<CounterDirection>> for CounterDirections {
    fn from(directions: Vec<CounterDirection>) -> Self {
        directions
            .into_iter()
            .fold(Self::NONE, |mask, direction| mask | Self::from(direction))
    }
}

impl From<CounterDirections> for Vec<CounterDirection> {
    fn from(mask: CounterDirections) -> Self {
        mask.directions().collect()
    }
}

impl fmt::Debug for CounterDirections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.directions()).finish()
    }
}

fn default_step() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_calls_logger() -> String {
    "Calls".to_owned()
}

/// 单个计数行为的配置。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSettings {
    pub category: String,
    pub counter: String,
    #[serde(default)]
    pub kind: CounterKind,
    #[serde(default = "default_step")]
    pub step: i64,
    #[serde(default)]
    pub directions: CounterDirections,
}

impl CounterSettings {
    pub fn new(
        category: impl Into<String>,
        counter: impl Into<String>,
        kind: CounterKind,
    ) -> Self {
        Self {
            category: category.into(),
            counter: counter.into(),
            kind,
            step: default_step(),
            directions: CounterDirections::default(),
        }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    pub fn with_directions(mut self, directions: CounterDirections) -> Self {
        self.directions = directions;
        self
    }

    /// 协议语义对应的外部计数器种类。
    pub fn metric_kind(&self) -> MetricKind {
        match self.kind {
            CounterKind::Cumulative | CounterKind::InFlight => MetricKind::NumberOfItems,
            CounterKind::Rate => MetricKind::RateOfCountsPerSecond,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.category.trim().is_empty() {
            return Err(ConfigError::MissingCategory);
        }
        if self.counter.trim().is_empty() {
            return Err(ConfigError::MissingCounter {
                category: self.category.clone(),
            });
        }
        if self.step == 0 {
            return Err(ConfigError::ZeroStep {
                category: self.category.clone(),
                counter: self.counter.clone(),
            });
        }
        if self.step == i64::MIN {
            return Err(ConfigError::StepOutOfRange {
                category: self.category.clone(),
                counter: self.counter.clone(),
            });
        }
        if self.kind == CounterKind::Rate && self.directions.is_empty() {
            return Err(ConfigError::EmptyDirections {
                category: self.category.clone(),
                counter: self.counter.clone(),
            });
        }
        Ok(())
    }
}

/// 重试行为的配置。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default = "default_true")]
    pub raise_after_retries: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub unmatched: UnmatchedErrorPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: 0,
            raise_after_retries: true,
            message: None,
            unmatched: UnmatchedErrorPolicy::default(),
        }
    }
}

impl RetrySettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidRetryCount(self.max_retries));
        }
        Ok(())
    }
}

/// 调用日志行为的配置；`message` 为可选的实参模板。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCallsSettings {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default = "default_calls_logger")]
    pub logger_name: String,
}

impl Default for LogCallsSettings {
    fn default() -> Self {
        Self {
            message: None,
            level: LogLevel::Info,
            logger_name: default_calls_logger(),
        }
    }
}

/// 耗时剖析行为的配置。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub message: String,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub hierarchy: bool,
}

/// 结果缓存行为的配置；两种过期方式互斥，均未设置时永不过期。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachingSettings {
    #[serde(default)]
    pub absolute_expiry_ms: Option<u64>,
    #[serde(default)]
    pub sliding_expiry_ms: Option<u64>,
}

impl CachingSettings {
    pub fn validate(&self, site: &str) -> Result<(), ConfigError> {
        if self.absolute_expiry_ms.is_some() && self.sliding_expiry_ms.is_some() {
            return Err(ConfigError::ConflictingExpiry {
                site: site.to_owned(),
            });
        }
        Ok(())
    }
}

/// 异常处理行为的配置。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleExceptionSettings {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub suppress: bool,
    #[serde(default)]
    pub trace_arguments: bool,
}

/// 参数校验行为的配置：以名称（不区分大小写）或下标指定参数，二者必须恰好其一。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentCheckSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
    /// 为 `true` 时文本参数为空串同样视为校验失败。
    #[serde(default)]
    pub reject_empty: bool,
}

impl ArgumentCheckSettings {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn by_index(index: usize) -> Self {
        Self {
            index: Some(index),
            ..Self::default()
        }
    }

    pub fn reject_empty(mut self, reject: bool) -> Self {
        self.reject_empty = reject;
        self
    }

    pub fn validate(&self, site: &str) -> Result<(), ConfigError> {
        match (&self.name, self.index) {
            (Some(name), None) if !name.trim().is_empty() => Ok(()),
            (None, Some(_)) => Ok(()),
            _ => Err(ConfigError::AmbiguousArgumentTarget {
                site: site.to_owned(),
            }),
        }
    }

    /// 在调用点的参数列表上定位目标参数，返回其下标。
    pub fn resolve_index(&self, site: &CallSite) -> Result<usize, ConfigError> {
        self.validate(&site.to_string())?;
        let resolved = match (&self.name, self.index) {
            (Some(name), _) => site.parameter_index(name),
            (None, Some(index)) => (index < site.parameters().len()).then_some(index),
            (None, None) => None,
        };
        resolved.ok_or_else(|| ConfigError::UnknownArgument {
            site: site.to_string(),
            target: match (&self.name, self.index) {
                (Some(name), _) => format!("`{name}`"),
                (None, Some(index)) => format!("#{index}"),
                (None, None) => "<unspecified>".to_owned(),
            },
        })
    }
}

/// 按所有者类型串行化调用的配置。
///
/// `acquire_timeout_ms` 为等待类型锁的上限，超时则跳过调用；未设置时一直等待。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSyncSettings {
    #[serde(default)]
    pub acquire_timeout_ms: Option<u64>,
}

/// 单个调用点上的全部行为配置。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default)]
    pub counters: Vec<CounterSettings>,
    #[serde(default)]
    pub retry: Option<RetrySettings>,
    #[serde(default)]
    pub log_calls: Option<LogCallsSettings>,
    #[serde(default)]
    pub profile: Option<ProfileSettings>,
    #[serde(default)]
    pub caching: Option<CachingSettings>,
    #[serde(default)]
    pub handle_exception: Option<HandleExceptionSettings>,
    #[serde(default)]
    pub argument_checks: Vec<ArgumentCheckSettings>,
    #[serde(default)]
    pub type_sync: Option<TypeSyncSettings>,
}

impl SiteSettings {
    pub fn validate(&self, site: &str) -> Result<(), ConfigError> {
        for counter in &self.counters {
            counter.validate()?;
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        if let Some(caching) = &self.caching {
            caching.validate(site)?;
        }
        for check in &self.argument_checks {
            check.validate(site)?;
        }
        Ok(())
    }
}

/// 全部调用点配置与注册表选项。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct WeaveSettings {
    #[serde(default)]
    pub registry: RegistryOptions,
    #[serde(default)]
    pub sites: BTreeMap<String, SiteSettings>,
}

impl WeaveSettings {
    /// 解析并校验 TOML 文本。
    #[cfg(feature = "toml_settings")]
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: WeaveSettings =
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (site, settings) in &self.sites {
            settings.validate(site)?;
        }
        Ok(())
    }

    pub fn site(&self, name: &str) -> Option<&SiteSettings> {
        self.sites.get(name)
    }
}
