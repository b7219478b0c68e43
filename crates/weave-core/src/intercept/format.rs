//! 消息模板与实参格式化。
//!
//! 模板使用按位置引用实参的占位符 `{0}`、`{1}`……；`{{` 与 `}}` 输出字面量花括号，
//! 越界或无法解析的占位符原样保留，格式化永远不会失败。

use std::fmt::Write as _;

use crate::intercept::call::{Argument, ArgumentValue};

/// 以实参填充模板占位符。
pub fn format_template(template: &str, arguments: &[Argument<'_>]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(position) = rest.find(['{', '}']) {
        output.push_str(&rest[..position]);
        let tail = &rest[position..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            output.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('{')
            && let Some(end) = tail.find('}')
        {
            let placeholder = &tail[1..end];
            match placeholder.parse::<usize>().ok().and_then(|i| arguments.get(i)) {
                Some(argument) => {
                    let _ = write!(output, "{}", argument.value);
                }
                None => output.push_str(&tail[..=end]),
            }
            rest = &tail[end + 1..];
            continue;
        }
        output.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    output.push_str(rest);
    output
}

/// 以 `name=value` 形式串联实参，用于日志。
///
/// 输出面向阅读：缺省值与文本 `"null"` 显示相同，分隔符也不转义，不能作为缓存键。
pub fn format_arguments(arguments: &[Argument<'_>]) -> String {
    let mut output = String::new();
    for (index, argument) in arguments.iter().enumerate() {
        if index > 0 {
            output.push_str(", ");
        }
        let _ = write!(output, "{}={}", argument.name, argument.value);
    }
    output
}

/// 以无歧义的编码串联实参，用于缓存键。
///
/// 每个实参写作 `<名称长度>:<名称>=` 加一个值记号并以 `;` 结束：缺省值为 `N`，
/// 文本为 `T<长度>:<文本>`，其余值为 `V<长度>:<Debug 输出>`。长度前缀使编码可以唯一地切分回实参，
/// 缺省值与文本 `"null"`、含分隔符的单个文本与多个实参因此都得到不同的键。
pub fn encode_arguments(arguments: &[Argument<'_>]) -> String {
    let mut output = String::new();
    for argument in arguments {
        let _ = write!(output, "{}:{}=", argument.name.len(), argument.name);
        match argument.value {
            ArgumentValue::Null => output.push('N'),
            ArgumentValue::Text(text) => {
                let _ = write!(output, "T{}:{text}", text.len());
            }
            ArgumentValue::Value(value) => {
                let rendered = format!("{value:?}");
                let _ = write!(output, "V{}:{rendered}", rendered.len());
            }
        }
        output.push(';');
    }
    output
}
