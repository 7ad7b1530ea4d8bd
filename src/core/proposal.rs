//! Recovery of router-proposed calls.
//!
//! An external text-completion service is shown the catalog and asked to
//! answer with `{"tool": <name>, "params": {...}}`. Its output is untrusted:
//! it may be wrapped in prose, truncated, or name an operation that does not
//! exist. [`recover`] never fails; anything it cannot use becomes
//! [`Proposal::Unrecognized`], and only [`Proposal::Recognized`] carries an
//! operation name that a caller could act on.

use crate::core::registry::{Registry, ToolDescriptor};
use crate::core::validate;
use serde::Serialize;
use serde_json::{Map, Value};

/// Tool name the router uses when nothing fits.
pub const UNKNOWN_TOOL: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Recognized {
        operation: String,
        arguments: Map<String, Value>,
    },
    Unrecognized,
}

/// Anything that can answer "is this operation in the catalog".
pub trait Catalog {
    fn lookup(&self, name: &str) -> Option<&ToolDescriptor>;
}

impl Catalog for Registry {
    fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.resolve(name).map(|t| &t.descriptor)
    }
}

impl Catalog for [ToolDescriptor] {
    fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.iter().find(|d| d.name == name)
    }
}

impl Catalog for Vec<ToolDescriptor> {
    fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.as_slice().lookup(name)
    }
}

/// Turn raw router output into a proposal.
///
/// 1. Parse the whole (trimmed) text as JSON.
/// 2. Failing that, parse the span from the first `{` to the last `}`.
/// 3. Failing that, or when the object has no usable `tool`, give up.
pub fn recover(text: &str) -> Proposal {
    let trimmed = text.trim();
    let parsed = serde_json::from_str::<Value>(trimmed)
        .ok()
        .or_else(|| embedded_object(trimmed));

    match parsed {
        Some(Value::Object(obj)) => from_object(obj),
        _ => Proposal::Unrecognized,
    }
}

fn embedded_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn from_object(mut obj: Map<String, Value>) -> Proposal {
    let operation = match obj.remove("tool") {
        Some(Value::String(name)) => name.trim().to_string(),
        _ => return Proposal::Unrecognized,
    };
    if operation.is_empty() || operation == UNKNOWN_TOOL {
        return Proposal::Unrecognized;
    }
    let arguments = match obj.remove("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(params)) => params,
        Some(_) => return Proposal::Unrecognized,
    };
    Proposal::Recognized {
        operation,
        arguments,
    }
}

impl Proposal {
    pub fn is_recognized(&self) -> bool {
        matches!(self, Proposal::Recognized { .. })
    }

    /// Demote to `Unrecognized` unless the operation is in `catalog`.
    pub fn against<C: Catalog + ?Sized>(self, catalog: &C) -> Proposal {
        match self {
            Proposal::Recognized { ref operation, .. } if catalog.lookup(operation).is_none() => {
                Proposal::Unrecognized
            }
            other => other,
        }
    }

    /// Required fields of the proposed operation still to be filled in.
    /// Empty for `Unrecognized` or operations missing from `catalog`.
    pub fn missing<C: Catalog + ?Sized>(&self, catalog: &C) -> Vec<String> {
        match self {
            Proposal::Recognized {
                operation,
                arguments,
            } => catalog
                .lookup(operation)
                .map(|d| validate::missing_required(&d.required, arguments))
                .unwrap_or_default(),
            Proposal::Unrecognized => vec![],
        }
    }

    /// Summary for a form renderer: the proposal, which required fields are
    /// still missing, and how each declared field should be presented.
    pub fn report<C: Catalog + ?Sized>(&self, catalog: &C) -> Value {
        let descriptor = match self {
            Proposal::Recognized { operation, .. } => catalog.lookup(operation),
            Proposal::Unrecognized => None,
        };
        let Some(descriptor) = descriptor else {
            return serde_json::json!({
                "status": "unrecognized",
                "tool": UNKNOWN_TOOL,
                "params": {},
                "message": "cannot map this request to a known operation",
            });
        };
        let fields: Map<String, Value> = descriptor
            .params_schema
            .iter()
            .map(|(name, spec)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "type": spec.kind,
                        "required": descriptor.required.contains(name),
                        "input": spec.control(),
                    }),
                )
            })
            .collect();
        let mut report = self.to_value();
        if let Some(obj) = report.as_object_mut() {
            obj.insert("status".to_string(), Value::from("recognized"));
            obj.insert("missing".to_string(), serde_json::json!(self.missing(catalog)));
            obj.insert("fields".to_string(), Value::Object(fields));
        }
        report
    }

    /// The router's own `{"tool", "params"}` shape, sentinel included.
    pub fn to_value(&self) -> Value {
        match self {
            Proposal::Recognized {
                operation,
                arguments,
            } => serde_json::json!({ "tool": operation, "params": arguments }),
            Proposal::Unrecognized => serde_json::json!({ "tool": UNKNOWN_TOOL, "params": {} }),
        }
    }
}

/// Messages handed to the external router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterPrompt {
    pub system: String,
    pub user: String,
}

pub fn router_prompt<'a, I>(tools: I, request: &str) -> Result<RouterPrompt, serde_json::Error>
where
    I: IntoIterator<Item = &'a ToolDescriptor>,
{
    let tools: Vec<&ToolDescriptor> = tools.into_iter().collect();
    let system = format!(
        "You are a router. You must choose exactly one tool from the provided list.\n\
         Return ONLY valid JSON with keys: tool (string) and params (object).\n\
         Do not invent tools. If nothing fits, set tool to '{UNKNOWN_TOOL}' and params to {{}}.\n\
         TOOLS:\n{}",
        serde_json::to_string(&tools)?
    );
    Ok(RouterPrompt {
        system,
        user: format!("User request:\n{request}"),
    })
}
