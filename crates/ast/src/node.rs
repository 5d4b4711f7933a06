//! A borrowed view over Pandoc's JSON syntax tree.
//!
//! Every node is `{"t": tag, "c": payload}`. Payload shapes differ per tag, so
//! nodes stay as `serde_json::Value` and are picked apart where they are used.

use crate::error::ParseError;
use serde_json::Value;

/// The top-level document returned by the extraction tool.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub api_version: Option<Vec<u64>>,
    pub meta: Value,
    pub blocks: Vec<Value>,
}

impl SyntaxTree {
    pub fn from_json_str(text: &str) -> Result<Self, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self, ParseError> {
        let object = value
            .as_object_mut()
            .ok_or_else(|| ParseError::InvalidTree("root must be an object".to_string()))?;
        let blocks = match object.remove("blocks") {
            Some(Value::Array(blocks)) => blocks,
            Some(_) => return Err(ParseError::InvalidTree("'blocks' must be an array".to_string())),
            None => return Err(ParseError::InvalidTree("missing 'blocks' key".to_string())),
        };
        let api_version = object.get("pandoc-api-version").and_then(|v| {
            v.as_array()
                .map(|parts| parts.iter().filter_map(Value::as_u64).collect())
        });
        let meta = object.remove("meta").unwrap_or(Value::Null);
        Ok(Self {
            api_version,
            meta,
            blocks,
        })
    }

    pub fn from_blocks(blocks: Vec<Value>) -> Self {
        Self {
            api_version: None,
            meta: Value::Null,
            blocks,
        }
    }
}

/// One `{"t", "c"}` node.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    pub tag: &'a str,
    pub content: &'a Value,
}

static NULL: Value = Value::Null;

impl<'a> Node<'a> {
    /// `None` if `value` is not an object with a string `t`.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        let tag = value.get("t")?.as_str()?;
        Some(Self {
            tag,
            content: value.get("c").unwrap_or(&NULL),
        })
    }

    /// The `i`-th element of an array payload.
    pub fn arg(&self, i: usize) -> Option<&'a Value> {
        self.content.as_array()?.get(i)
    }

    pub fn items(&self) -> &'a [Value] {
        self.content.as_array().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Pandoc `Attr`: `[id, [classes], [[key, value]]]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attr {
    pub id: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

impl Attr {
    pub fn from_value(value: &Value) -> Self {
        let parts = value.as_array().map(Vec::as_slice).unwrap_or(&[]);
        let id = parts.first().and_then(Value::as_str).unwrap_or("").to_string();
        let classes = parts
            .get(1)
            .and_then(Value::as_array)
            .map(|cs| cs.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let attributes = parts
            .get(2)
            .and_then(Value::as_array)
            .map(|kvs| {
                kvs.iter()
                    .filter_map(|kv| {
                        let pair = kv.as_array()?;
                        Some((
                            pair.first()?.as_str()?.to_string(),
                            pair.get(1)?.as_str()?.to_string(),
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            id,
            classes,
            attributes,
        }
    }
}

pub(crate) fn as_slice(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
