//! Statically declared tool argument schemas and the validator that checks
//! raw call arguments against them.

use finmcp_core::ValidationError;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// A string restricted to the listed values.
    Enum(Vec<&'static str>),
    Array,
    Object,
}

impl FieldType {
    /// JSON Schema `type` keyword for this field.
    pub fn json_type(&self) -> &'static str {
        match self {
            FieldType::String | FieldType::Enum(_) => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    fn matches_type(&self, value: &Value) -> bool {
        match self {
            FieldType::String | FieldType::Enum(_) => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl FieldSpec {
    pub fn required(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: true,
            default: None,
            description,
        }
    }

    pub fn optional(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
            description,
        }
    }

    /// Attach a default. A defaulted field is never required.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    fn check(&self, value: &Value) -> Result<(), ValidationError> {
        if !self.ty.matches_type(value) {
            return Err(ValidationError::TypeMismatch {
                field: self.name.to_string(),
                expected: self.ty.json_type().to_string(),
                actual: value.clone(),
            });
        }
        if let FieldType::Enum(allowed) = &self.ty {
            let s = value.as_str().unwrap_or_default();
            if !allowed.contains(&s) {
                return Err(ValidationError::NotAllowed {
                    field: self.name.to_string(),
                    allowed: allowed.iter().map(|a| a.to_string()).collect(),
                    actual: value.clone(),
                });
            }
        }
        Ok(())
    }

    fn property(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.ty.json_type()));
        prop.insert("description".into(), json!(self.description));
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        if let FieldType::Enum(allowed) = &self.ty {
            prop.insert("enum".into(), json!(allowed));
        }
        Value::Object(prop)
    }
}

/// Name, description and ordered argument fields of one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    fields: Vec<FieldSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            fields: Vec::new(),
        }
    }

    /// Append a field. A field with the same name replaces the earlier one,
    /// so names stay unique.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        match self.fields.iter_mut().find(|f| f.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.fields.push(spec),
        }
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> Vec<&'static str> {
        self.fields.iter().filter(|f| f.required).map(|f| f.name).collect()
    }

    /// JSON Schema object advertised as `inputSchema`.
    pub fn input_schema(&self) -> Value {
        let mut props = Map::new();
        for field in &self.fields {
            props.insert(field.name.to_string(), field.property());
        }
        json!({
            "type": "object",
            "properties": Value::Object(props),
            "required": self.required_fields(),
        })
    }

    pub fn to_mcp_tool(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }

    pub fn validate(&self, raw: &Value) -> Result<NormalizedArguments, ValidationError> {
        validate(self, raw)
    }
}

/// Check `raw` against `descriptor`, applying defaults.
///
/// Absent (or `null`) arguments count as an empty object. Fields the
/// descriptor does not declare are dropped rather than rejected, and an
/// explicit `null` for a field is treated as if the field were absent.
pub fn validate(descriptor: &ToolDescriptor, raw: &Value) -> Result<NormalizedArguments, ValidationError> {
    let empty = Map::new();
    let input = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => return Err(ValidationError::NotAnObject(json_kind(other).to_string())),
    };

    let mut out = Map::new();
    for field in descriptor.fields() {
        match input.get(field.name).filter(|v| !v.is_null()) {
            Some(value) => {
                field.check(value)?;
                out.insert(field.name.to_string(), value.clone());
            }
            None if field.required => {
                return Err(ValidationError::Missing {
                    field: field.name.to_string(),
                });
            }
            None => {
                if let Some(default) = &field.default {
                    out.insert(field.name.to_string(), default.clone());
                }
            }
        }
    }
    Ok(NormalizedArguments(out))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Arguments that passed validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedArguments(Map<String, Value>);

impl NormalizedArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_str())
    }

    /// Non-empty string value.
    pub fn non_empty_str(&self, name: &str) -> Option<&str> {
        self.str(name).map(str::trim).filter(|s| !s.is_empty())
    }

    /// Numeric value as a count; negatives clamp to zero, fractions truncate.
    pub fn count(&self, name: &str) -> Option<usize> {
        let value = self.0.get(name)?;
        if let Some(n) = value.as_u64() {
            return Some(n as usize);
        }
        value.as_f64().map(|n| if n.is_sign_negative() { 0 } else { n as usize })
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for NormalizedArguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
