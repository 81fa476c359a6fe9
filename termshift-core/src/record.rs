use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SweepError};

/// Bookkeeping keys the scanner never walks.
pub const SYSTEM_FIELDS: &[&str] = &[
    "uid",
    "_version",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
];

/// Node types treated as hyperlinks inside rich-text trees.
pub const LINK_NODE_TYPES: &[&str] = &["a", "link"];

/// Attribute keys that hold a link target.
pub const LINK_TARGET_KEYS: &[&str] = &["href", "url"];

pub fn is_system_field(key: &str) -> bool {
    SYSTEM_FIELDS.contains(&key)
}

/// A content record as fetched from storage.
///
/// `data` is the full entry object in the order the backend sent it,
/// system fields included. It is never mutated by a scan; proposed
/// updates are built on a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub uid: String,
    pub content_type_uid: String,
    pub data: Map<String, Value>,
}

impl Record {
    /// Build a record from a raw entry object. The entry must carry a string `uid`.
    pub fn from_entry(content_type_uid: &str, entry: Value) -> Result<Self> {
        let data = match entry {
            Value::Object(map) => map,
            other => {
                return Err(SweepError::MalformedField {
                    field: content_type_uid.to_string(),
                    reason: format!("entry is not an object: {}", other),
                })
            }
        };

        let uid = data
            .get("uid")
            .and_then(Value::as_str)
            .ok_or_else(|| SweepError::MalformedField {
                field: "uid".to_string(),
                reason: format!("entry in '{}' has no string uid", content_type_uid),
            })?
            .to_string();

        Ok(Self {
            uid,
            content_type_uid: content_type_uid.to_string(),
            data,
        })
    }

    /// Display title, falling back to "Untitled".
    pub fn title(&self) -> &str {
        self.data
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled")
    }

    /// Fields the scanner may walk, in insertion order.
    pub fn content_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data
            .iter()
            .filter(|(key, value)| !is_system_field(key) && !value.is_null())
    }
}

/// A typed view over one field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    PlainText(String),
    RichNode(RichNode),
    List(Vec<FieldValue>),
    /// Nested object of named fields (groups, modular blocks).
    Group(Vec<(String, FieldValue)>),
    Null,
    /// Anything the engine cannot rewrite: numbers, booleans, malformed trees.
    Opaque(Value),
}

impl FieldValue {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::String(text) => FieldValue::PlainText(text.clone()),
            Value::Array(items) => FieldValue::List(items.iter().map(FieldValue::from_value).collect()),
            Value::Object(map) if RichNode::is_rich_root(map) => match RichNode::from_map(map) {
                Ok(node) => FieldValue::RichNode(node),
                Err(e) => {
                    tracing::debug!("Treating rich-text value as opaque: {}", e);
                    FieldValue::Opaque(value.clone())
                }
            },
            Value::Object(map) => FieldValue::Group(
                map.iter()
                    .map(|(key, value)| (key.clone(), FieldValue::from_value(value)))
                    .collect(),
            ),
            other => FieldValue::Opaque(other.clone()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            FieldValue::PlainText(text) => Value::String(text.clone()),
            FieldValue::RichNode(node) => node.to_value(),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_value).collect()),
            FieldValue::Group(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_value()))
                    .collect(),
            ),
            FieldValue::Null => Value::Null,
            FieldValue::Opaque(value) => value.clone(),
        }
    }
}

/// One node of a rich-text document tree.
///
/// The node keeps its original object as a template so that every key the
/// engine does not understand (marks, uids, styling) round-trips untouched
/// and in its original position. `children` occupies a placeholder slot in
/// the template and is re-serialized from the typed children.
#[derive(Debug, Clone, PartialEq)]
pub struct RichNode {
    template: Map<String, Value>,
    pub node_type: Option<String>,
    pub text: Option<String>,
    pub attrs: Option<Map<String, Value>>,
    pub children: Option<Vec<RichNode>>,
}

impl RichNode {
    /// A top-level field holds a document when it is a `doc` node or has a child list.
    pub fn is_rich_root(map: &Map<String, Value>) -> bool {
        map.get("type").and_then(Value::as_str) == Some("doc")
            || map.get("children").map(Value::is_array).unwrap_or(false)
    }

    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut template = map.clone();

        let children = match map.get("children") {
            None => None,
            Some(Value::Array(items)) => {
                let mut nodes = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(child) => nodes.push(RichNode::from_map(child)?),
                        other => {
                            return Err(SweepError::MalformedField {
                                field: format!("children[{}]", index),
                                reason: format!("expected a node object, found {}", other),
                            })
                        }
                    }
                }
                template.insert("children".to_string(), Value::Null);
                Some(nodes)
            }
            Some(other) => {
                return Err(SweepError::MalformedField {
                    field: "children".to_string(),
                    reason: format!("expected an array, found {}", other),
                })
            }
        };

        Ok(Self {
            node_type: map.get("type").and_then(Value::as_str).map(str::to_string),
            text: map.get("text").and_then(Value::as_str).map(str::to_string),
            attrs: map.get("attrs").and_then(Value::as_object).cloned(),
            children,
            template,
        })
    }

    pub fn is_link(&self) -> bool {
        self.node_type
            .as_deref()
            .map(|t| LINK_NODE_TYPES.contains(&t))
            .unwrap_or(false)
    }

    /// Copy this node, overriding only the rewritable parts.
    pub fn rebuild(
        &self,
        text: Option<String>,
        attrs: Option<Map<String, Value>>,
        children: Option<Vec<RichNode>>,
    ) -> Self {
        Self {
            template: self.template.clone(),
            node_type: self.node_type.clone(),
            text,
            attrs,
            children,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut map = self.template.clone();
        if let Some(text) = &self.text {
            map.insert("text".to_string(), Value::String(text.clone()));
        }
        if let Some(attrs) = &self.attrs {
            map.insert("attrs".to_string(), Value::Object(attrs.clone()));
        }
        if let Some(children) = &self.children {
            map.insert(
                "children".to_string(),
                Value::Array(children.iter().map(RichNode::to_value).collect()),
            );
        }
        Value::Object(map)
    }
}
