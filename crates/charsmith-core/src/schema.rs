//! Structural schema for character documents.
//!
//! The schema is plain `const` data: an ordered list of [`Field`]s, each
//! with a [`Shape`]. Validation walks the fields in declared order
//! (depth-first into records) and stops at the first violation, so the
//! same invalid document always yields the same diagnostic.

use serde_json::{json, Map, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

/// Expected shape of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Anything, including null.
    Any,
    /// A JSON string.
    Text,
    /// A JSON string with at least one non-whitespace character.
    NonEmptyText,
    /// A JSON array. When an item shape is given every element must match it.
    List(Option<&'static Shape>),
    /// A JSON object with its own ordered field list.
    Record(&'static [Field]),
}

impl Shape {
    fn expected(&self) -> &'static str {
        match self {
            Shape::Any => "any value",
            Shape::Text => "a string",
            Shape::NonEmptyText => "a non-empty string",
            Shape::List(_) => "an array",
            Shape::Record(_) => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub shape: Shape,
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str, shape: Shape) -> Self {
        Field {
            name,
            shape,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, shape: Shape) -> Self {
        Field {
            name,
            shape,
            required: false,
        }
    }
}

/// Immutable, ordered description of a document's required keys and shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDescriptor {
    fields: &'static [Field],
}

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    Missing,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    Empty,
}

/// The first constraint a candidate document breaks.
///
/// `path` is dotted for object keys and indexed for array elements
/// (`settings.voice.model`, `bio[2]`). A non-object root is reported at `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub kind: ViolationKind,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Missing => write!(f, "missing required key '{}'", self.path),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "'{}' must be {expected}, found {found}", self.path)
            }
            ViolationKind::Empty => write!(f, "'{}' must not be empty", self.path),
        }
    }
}

impl std::error::Error for SchemaViolation {}

// ---------------------------------------------------------------------------
// Character schema
// ---------------------------------------------------------------------------

const TEXT_LIST: Shape = Shape::List(Some(&Shape::Text));

const VOICE_FIELDS: &[Field] = &[Field::required("model", Shape::Text)];

const SETTINGS_FIELDS: &[Field] = &[Field::required("voice", Shape::Record(VOICE_FIELDS))];

const STYLE_FIELDS: &[Field] = &[
    Field::required("all", TEXT_LIST),
    Field::required("chat", TEXT_LIST),
    Field::required("post", TEXT_LIST),
];

const CHARACTER_FIELDS: &[Field] = &[
    Field::required("name", Shape::NonEmptyText),
    Field::required("clients", TEXT_LIST),
    Field::required("modelProvider", Shape::Text),
    Field::required("imageModelProvider", Shape::Text),
    Field::required("settings", Shape::Record(SETTINGS_FIELDS)),
    Field::required("plugins", Shape::List(None)),
    Field::required("bio", TEXT_LIST),
    Field::required("lore", TEXT_LIST),
    Field::required("knowledge", TEXT_LIST),
    Field::required("messageExamples", Shape::List(Some(&Shape::List(None)))),
    Field::required("postExamples", TEXT_LIST),
    Field::required("topics", TEXT_LIST),
    Field::required("style", Shape::Record(STYLE_FIELDS)),
    Field::required("adjectives", TEXT_LIST),
];

static CHARACTER_SCHEMA: SchemaDescriptor = SchemaDescriptor::new(CHARACTER_FIELDS);

/// The schema every generated character document must satisfy.
pub fn character_schema() -> &'static SchemaDescriptor {
    &CHARACTER_SCHEMA
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl SchemaDescriptor {
    pub const fn new(fields: &'static [Field]) -> Self {
        SchemaDescriptor { fields }
    }

    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// Top-level required keys, in declared order.
    pub fn required_keys(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// Check `doc` against the descriptor, returning the first violation.
    pub fn validate(&self, doc: &Value) -> Result<(), SchemaViolation> {
        let Some(obj) = doc.as_object() else {
            return Err(SchemaViolation {
                path: "$".to_string(),
                kind: ViolationKind::WrongType {
                    expected: "an object",
                    found: json_type(doc),
                },
            });
        };
        check_fields(self.fields, obj, "")
    }

    pub fn is_valid(&self, doc: &Value) -> bool {
        self.validate(doc).is_ok()
    }

    /// Render the descriptor as a JSON-Schema document.
    pub fn to_json_schema(&self) -> Value {
        record_schema(self.fields)
    }
}

fn check_fields(fields: &[Field], obj: &Map<String, Value>, prefix: &str) -> Result<(), SchemaViolation> {
    for field in fields {
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match obj.get(field.name) {
            Some(value) => check_shape(&field.shape, value, &path)?,
            None if field.required => {
                return Err(SchemaViolation {
                    path,
                    kind: ViolationKind::Missing,
                })
            }
            None => {}
        }
    }
    Ok(())
}

fn check_shape(shape: &Shape, value: &Value, path: &str) -> Result<(), SchemaViolation> {
    let wrong_type = || SchemaViolation {
        path: path.to_string(),
        kind: ViolationKind::WrongType {
            expected: shape.expected(),
            found: json_type(value),
        },
    };

    match shape {
        Shape::Any => Ok(()),
        Shape::Text => value.as_str().map(|_| ()).ok_or_else(wrong_type),
        Shape::NonEmptyText => {
            let s = value.as_str().ok_or_else(wrong_type)?;
            if s.trim().is_empty() {
                return Err(SchemaViolation {
                    path: path.to_string(),
                    kind: ViolationKind::Empty,
                });
            }
            Ok(())
        }
        Shape::List(item) => {
            let items = value.as_array().ok_or_else(wrong_type)?;
            if let Some(item) = item {
                for (i, element) in items.iter().enumerate() {
                    check_shape(item, element, &format!("{path}[{i}]"))?;
                }
            }
            Ok(())
        }
        Shape::Record(fields) => {
            let obj = value.as_object().ok_or_else(wrong_type)?;
            check_fields(fields, obj, path)
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// JSON-Schema rendering
// ---------------------------------------------------------------------------

fn shape_schema(shape: &Shape) -> Value {
    match shape {
        Shape::Any => json!({}),
        Shape::Text => json!({ "type": "string" }),
        Shape::NonEmptyText => json!({ "type": "string", "minLength": 1 }),
        Shape::List(None) => json!({ "type": "array" }),
        Shape::List(Some(item)) => json!({ "type": "array", "items": shape_schema(item) }),
        Shape::Record(fields) => record_schema(fields),
    }
}

fn record_schema(fields: &[Field]) -> Value {
    let properties: Map<String, Value> = fields
        .iter()
        .map(|f| (f.name.to_string(), shape_schema(&f.shape)))
        .collect();
    let required: Vec<&str> = fields.iter().filter(|f| f.required).map(|f| f.name).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
