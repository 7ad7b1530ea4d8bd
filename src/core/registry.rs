//! Operation registry.
//!
//! A registry is built once at startup, then handed to the dispatcher by
//! reference and never mutated again. Each entry pairs a handler with the
//! descriptor callers see through `list_tools`, so adding an operation is one
//! `register` call and nothing else.

use crate::core::error::RosterError;
use crate::core::store::UserStore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
        }
    }

    /// Whether `value` has this JSON type. `null` never matches.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
        }
    }
}

/// How a form renderer should present a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", content = "options", rename_all = "snake_case")]
pub enum Control {
    Text,
    Stepper,
    Toggle,
    Choice(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    fn of(kind: FieldType, description: &str) -> Self {
        Self {
            kind,
            allowed: None,
            description: Some(description.to_string()),
        }
    }

    pub fn string(description: &str) -> Self {
        Self::of(FieldType::String, description)
    }

    pub fn number(description: &str) -> Self {
        Self::of(FieldType::Number, description)
    }

    pub fn integer(description: &str) -> Self {
        Self::of(FieldType::Integer, description)
    }

    pub fn boolean(description: &str) -> Self {
        Self::of(FieldType::Boolean, description)
    }

    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn control(&self) -> Control {
        if let Some(values) = &self.allowed {
            return Control::Choice(values.clone());
        }
        match self.kind {
            FieldType::String => Control::Text,
            FieldType::Number | FieldType::Integer => Control::Stepper,
            FieldType::Boolean => Control::Toggle,
        }
    }
}

/// Catalog entry for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub params_schema: BTreeMap<String, FieldSpec>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: vec![],
            params_schema: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &str, spec: FieldSpec) -> Self {
        self.params_schema.insert(name.to_string(), spec);
        self
    }

    pub fn required(mut self, names: &[&str]) -> Self {
        self.required = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Every required name must be declared in `params_schema`.
    pub fn check(&self) -> Result<(), RosterError> {
        if self.name.trim().is_empty() {
            return Err(RosterError::ConfigError(
                "operation name must not be empty".to_string(),
            ));
        }
        let undeclared: Vec<&str> = self
            .required
            .iter()
            .filter(|r| !self.params_schema.contains_key(r.as_str()))
            .map(String::as_str)
            .collect();
        if !undeclared.is_empty() {
            return Err(RosterError::ConfigError(format!(
                "operation '{}' requires undeclared fields: {}",
                self.name,
                undeclared.join(", ")
            )));
        }
        Ok(())
    }
}

/// Everything a handler may touch.
pub struct ToolContext<'a> {
    pub store: &'a UserStore,
    pub registry: &'a Registry,
}

pub type Handler = fn(&ToolContext<'_>, &Map<String, Value>) -> Result<Value, RosterError>;

#[derive(Clone)]
pub struct Tool {
    pub descriptor: ToolDescriptor,
    pub handler: Handler,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    tools: Vec<Tool>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: ToolDescriptor, handler: Handler) -> Result<(), RosterError> {
        descriptor.check()?;
        if self.resolve(&descriptor.name).is_some() {
            return Err(RosterError::ConfigError(format!(
                "operation '{}' registered twice",
                descriptor.name
            )));
        }
        self.tools.push(Tool {
            descriptor,
            handler,
        });
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor)
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors().map(|d| d.name.as_str()).collect()
    }

    /// The `list_tools` result shape: `{"tools": [descriptor, ...]}`.
    pub fn catalog(&self) -> Value {
        serde_json::json!({ "tools": self.descriptors().collect::<Vec<_>>() })
    }
}
