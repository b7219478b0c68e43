//! 协作者注入：按 `(所有者类型, 能力类型)` 定位字段并缓存其值。
//!
//! - [`catalog`]：所有者类型在装配期声明字段布局（实例字段、静态字段、基类型）；
//! - [`cache`]：首个匹配字段的一次性扫描、静态值的永久缓存与以 `Weak` 为键的实例值缓存。
//!
//! 行为对象的推荐做法仍是在构造时显式传入协作者；本模块服务于行为挂载到无法修改构造过程的既有类型上的场景。

pub mod cache;
pub mod catalog;

pub use cache::{FieldLookupKey, InstanceFieldCache};
pub use catalog::{FieldCatalog, FieldValue, TypeRegistration};
