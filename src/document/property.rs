//! Typed node properties.
//!
//! A property is a `(key, value)` pair whose value carries one of the layout
//! format's type codes:
//!
//! | Code | Variant   | Payload            |
//! |------|-----------|--------------------|
//! | `b`  | `Boolean` | `0` / `1`          |
//! | `s`  | `String`  | text               |
//! | `i`  | `Integer` | signed integer     |
//! | `f`  | `Float`   | float              |
//! | `c`  | `Color`   | r, g, b, a         |
//! | `r`  | `Frame`   | x, y, w, h         |

use serde::Serialize;

/// Key of the property the injector writes.
pub const SCRIPT_KEY: &str = "script";
/// Key matched by `Selector::ByName`.
pub const NAME_KEY: &str = "name";
/// Key matched by `Selector::ByTag`.
pub const TAG_KEY: &str = "tag";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub key: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(key: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// A string-typed `script` property.
    pub fn script(text: impl Into<String>) -> Self {
        Self::new(SCRIPT_KEY, PropertyValue::String(text.into()))
    }

    /// String payload, if this is a string property.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    Boolean(bool),
    String(String),
    Integer(i64),
    Float(f64),
    Color(Color),
    Frame(Frame),
    /// Type code this crate does not interpret, kept verbatim.
    Other { code: String, raw: String },
}

impl PropertyValue {
    /// Type code written in the `type` attribute.
    pub fn code(&self) -> &str {
        match self {
            Self::Boolean(_) => "b",
            Self::String(_) => "s",
            Self::Integer(_) => "i",
            Self::Float(_) => "f",
            Self::Color(_) => "c",
            Self::Frame(_) => "r",
            Self::Other { code, .. } => code,
        }
    }
}
