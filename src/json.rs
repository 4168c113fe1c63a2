//! Formatting of single `"key": value` members.
//!
//! The exporter lays the document out by hand, so this module only has to
//! turn one attribute at a time into valid JSON text. Strings are escaped per
//! RFC 8259 and numbers use the shortest representation that reads back to
//! the same `f32`, which keeps repeated exports byte-identical.

use glam::Vec3;
use log::warn;

/// Attribute value as read off a light or camera.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f32),
    Text(String),
    Numbers(Vec<f32>),
    /// No built-in light or camera member uses this; it is there for hosts
    /// that add string tuple attributes through [`JsonRecord`](crate::JsonRecord).
    Texts(Vec<String>),
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<Vec3> for PropertyValue {
    fn from(value: Vec3) -> Self {
        PropertyValue::Numbers(value.to_array().to_vec())
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::Texts(value)
    }
}

/// Named attribute, emitted as one member of an exported object.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: &'static str,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(key: &'static str, value: impl Into<PropertyValue>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn to_json(&self) -> String {
        write_property(self.key, &self.value)
    }
}

/// Renders `"key": value`. Tuples become `[ a, b, c ]`.
pub fn write_property(key: &str, value: &PropertyValue) -> String {
    let mut output = String::new();
    push_string(&mut output, key);
    output.push_str(": ");
    match value {
        PropertyValue::Number(number) => output.push_str(&format_number(*number)),
        PropertyValue::Text(text) => push_string(&mut output, text),
        PropertyValue::Numbers(numbers) => push_array(&mut output, numbers, |out, number| {
            out.push_str(&format_number(*number))
        }),
        PropertyValue::Texts(texts) => push_array(&mut output, texts, |out, text| {
            push_string(out, text)
        }),
    }
    output
}

/// Quotes and escapes `value` as a JSON string literal.
pub fn quote(value: &str) -> String {
    let mut output = String::with_capacity(value.len() + 2);
    push_string(&mut output, value);
    output
}

/// Shortest round-trip form of `value`, always with a fraction or exponent.
/// NaN and infinities have no JSON spelling and become `null`.
pub fn format_number(value: f32) -> String {
    if value.is_finite() {
        format!("{value:?}")
    } else {
        warn!("non-finite value {value} exported as null");
        "null".to_string()
    }
}

fn push_array<T>(output: &mut String, items: &[T], mut push_item: impl FnMut(&mut String, &T)) {
    if items.is_empty() {
        output.push_str("[]");
        return;
    }
    output.push_str("[ ");
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            output.push_str(", ");
        }
        push_item(output, item);
    }
    output.push_str(" ]");
}

fn push_string(output: &mut String, value: &str) {
    output.push('"');
    for ch in value.chars() {
        match ch {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            '\u{08}' => output.push_str("\\b"),
            '\u{0c}' => output.push_str("\\f"),
            ch if u32::from(ch) < 0x20 => {
                output.push_str(&format!("\\u{:04x}", u32::from(ch)));
            }
            ch => output.push(ch),
        }
    }
    output.push('"');
}
