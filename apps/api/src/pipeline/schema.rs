//! Schema Validator — declared field shapes and the validation pass over untyped input.
//!
//! Schemas are `'static` and const-constructible so each feature can declare its
//! input and output shapes once, next to its prompts. Every declared field is required.
//! Undeclared keys are dropped from the validated value.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

/// The declared shape of a JSON object.
#[derive(Debug)]
pub struct Schema {
    pub fields: &'static [Field],
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    /// Forwarded to the provider as the field description.
    pub description: &'static str,
    pub kind: FieldKind,
    pub rules: &'static [Rule],
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    String,
    Number,
    Object(&'static Schema),
    /// An array whose items are objects of the given shape.
    Array(&'static Schema),
}

/// Per-field constraints. Rules that do not apply to a field's kind are ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Min(f64),
    // No current feature caps a number
    #[allow(dead_code)]
    Max(f64),
    /// Minimum length for strings, counted in UTF-16 code units as browsers count it.
    /// Minimum item count for arrays.
    MinLength(usize),
    NonEmpty,
}

impl Field {
    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::String,
            rules: &[],
        }
    }

    pub const fn number(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Number,
            rules: &[],
        }
    }

    pub const fn object(
        name: &'static str,
        description: &'static str,
        schema: &'static Schema,
    ) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Object(schema),
            rules: &[],
        }
    }

    pub const fn array(
        name: &'static str,
        description: &'static str,
        items: &'static Schema,
    ) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Array(items),
            rules: &[],
        }
    }

    pub const fn with_rules(self, rules: &'static [Rule]) -> Self {
        Self { rules, ..self }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation results
// ────────────────────────────────────────────────────────────────────────────

/// Why a single field was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    Missing,
    WrongType { expected: &'static str },
    BelowMinimum(f64),
    AboveMaximum(f64),
    TooShort(usize),
    Empty,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Missing => write!(f, "is required"),
            Reason::WrongType { expected } => write!(f, "must be a {expected}"),
            Reason::BelowMinimum(min) => write!(f, "must be at least {min}"),
            Reason::AboveMaximum(max) => write!(f, "must be at most {max}"),
            Reason::TooShort(min) => write!(f, "must have a length of at least {min}"),
            Reason::Empty => write!(f, "must not be empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Dotted path to the field, e.g. `modelSuggestions[0].name`. Empty for the root.
    pub path: String,
    pub reason: Reason,
}

/// Every violated field of one validation pass, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details = self
            .violations
            .iter()
            .map(|v| {
                if v.path.is_empty() {
                    format!("value {}", v.reason)
                } else {
                    format!("{} {}", v.path, v.reason)
                }
            })
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "validation failed: {details}")
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
impl ValidationError {
    /// True if `path` is among the violated fields.
    pub fn has_violation(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

/// An object that satisfied every rule of its schema, restricted to the declared fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated(Map<String, Value>);

impl Validated {
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Converts the checked fields into the feature's typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(Value::Object(self.0.clone()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validation pass
// ────────────────────────────────────────────────────────────────────────────

/// Validates `raw` against `schema`, collecting every violation rather than stopping at the first.
pub fn validate(raw: &Value, schema: &Schema) -> Result<Validated, ValidationError> {
    let mut violations = Vec::new();
    let cleaned = check_object(raw, schema, "", &mut violations);

    match cleaned {
        Some(fields) if violations.is_empty() => Ok(Validated(fields)),
        _ => Err(ValidationError { violations }),
    }
}

fn check_object(
    raw: &Value,
    schema: &Schema,
    prefix: &str,
    violations: &mut Vec<Violation>,
) -> Option<Map<String, Value>> {
    let Some(object) = raw.as_object() else {
        violations.push(Violation {
            path: prefix.to_string(),
            reason: Reason::WrongType { expected: "object" },
        });
        return None;
    };

    let mut cleaned = Map::new();
    for field in schema.fields {
        let path = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };

        match object.get(field.name) {
            None | Some(Value::Null) => violations.push(Violation {
                path,
                reason: Reason::Missing,
            }),
            Some(value) => {
                if let Some(checked) = check_field(value, field, &path, violations) {
                    cleaned.insert(field.name.to_string(), checked);
                }
            }
        }
    }

    Some(cleaned)
}

fn check_field(
    value: &Value,
    field: &Field,
    path: &str,
    violations: &mut Vec<Violation>,
) -> Option<Value> {
    let mut reject = |reason: Reason| {
        violations.push(Violation {
            path: path.to_string(),
            reason,
        })
    };

    match field.kind {
        FieldKind::String => {
            let Some(text) = value.as_str() else {
                reject(Reason::WrongType { expected: "string" });
                return None;
            };
            for rule in field.rules {
                match *rule {
                    Rule::MinLength(min) if text.encode_utf16().count() < min => {
                        reject(Reason::TooShort(min))
                    }
                    Rule::NonEmpty if text.trim().is_empty() => reject(Reason::Empty),
                    _ => {}
                }
            }
            Some(value.clone())
        }
        FieldKind::Number => {
            let Some(number) = value.as_f64() else {
                reject(Reason::WrongType { expected: "number" });
                return None;
            };
            for rule in field.rules {
                match *rule {
                    Rule::Min(min) if number < min => reject(Reason::BelowMinimum(min)),
                    Rule::Max(max) if number > max => reject(Reason::AboveMaximum(max)),
                    _ => {}
                }
            }
            Some(value.clone())
        }
        FieldKind::Object(schema) => check_object(value, schema, path, violations).map(Value::Object),
        FieldKind::Array(items_schema) => {
            let Some(items) = value.as_array() else {
                reject(Reason::WrongType { expected: "array" });
                return None;
            };
            for rule in field.rules {
                match *rule {
                    Rule::MinLength(min) if items.len() < min => reject(Reason::TooShort(min)),
                    Rule::NonEmpty if items.is_empty() => reject(Reason::Empty),
                    _ => {}
                }
            }
            let cleaned = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    check_object(item, items_schema, &format!("{path}[{i}]"), violations)
                        .map(Value::Object)
                })
                .collect();
            Some(Value::Array(cleaned))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Provider-facing schema
// ────────────────────────────────────────────────────────────────────────────

impl Schema {
    /// Renders this schema in the OpenAPI subset the provider accepts as `responseSchema`.
    pub fn to_response_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.to_string(), field_response_schema(field)))
            .collect();
        let required: Vec<&str> = self.fields.iter().map(|field| field.name).collect();

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        })
    }
}

fn field_response_schema(field: &Field) -> Value {
    let mut schema = match field.kind {
        FieldKind::String => json!({ "type": "STRING" }),
        FieldKind::Number => json!({ "type": "NUMBER" }),
        FieldKind::Object(inner) => inner.to_response_schema(),
        FieldKind::Array(items) => json!({
            "type": "ARRAY",
            "items": items.to_response_schema(),
        }),
    };
    if !field.description.is_empty() {
        schema["description"] = json!(field.description);
    }
    schema
}
