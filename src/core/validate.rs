//! Parameter validation shared by every caller.
//!
//! The form builder, the proposal path and the dispatcher all go through
//! [`missing_required`], so there is exactly one definition of "provided".

use crate::core::error::RosterError;
use crate::core::registry::ToolDescriptor;
use serde_json::{Map, Value};

/// A value counts as provided unless it is absent, `null`, or a string that
/// is empty after trimming. `0` and `false` are provided.
pub fn is_provided(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Required field names that are not provided, in `required` order.
pub fn missing_required<S: AsRef<str>>(required: &[S], provided: &Map<String, Value>) -> Vec<String> {
    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|key| !is_provided(provided.get(*key)))
        .map(str::to_string)
        .collect()
}

/// One reason a parameter map does not fit its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamIssue {
    Missing(String),
    WrongType { field: String, expected: &'static str },
    NotAllowed { field: String },
}

impl std::fmt::Display for ParamIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamIssue::Missing(field) => write!(f, "{field} is required"),
            ParamIssue::WrongType { field, expected } => {
                write!(f, "{field} must be of type {expected}")
            }
            ParamIssue::NotAllowed { field } => write!(f, "{field} is not one of the allowed values"),
        }
    }
}

/// Check `params` against `descriptor`: required fields first, then the
/// declared type and enum of every provided field. Undeclared keys are
/// ignored.
pub fn check_params(descriptor: &ToolDescriptor, params: &Map<String, Value>) -> Vec<ParamIssue> {
    let mut issues: Vec<ParamIssue> = missing_required(&descriptor.required, params)
        .into_iter()
        .map(ParamIssue::Missing)
        .collect();

    for (field, spec) in &descriptor.params_schema {
        let Some(value) = params.get(field).filter(|v| is_provided(Some(*v))) else {
            continue;
        };
        if !spec.kind.accepts(value) {
            issues.push(ParamIssue::WrongType {
                field: field.clone(),
                expected: spec.kind.as_str(),
            });
            continue;
        }
        if let Some(allowed) = &spec.allowed {
            if !allowed.contains(value) {
                issues.push(ParamIssue::NotAllowed {
                    field: field.clone(),
                });
            }
        }
    }
    issues
}

/// [`check_params`] folded into a single `ValidationError`.
pub fn ensure_params(descriptor: &ToolDescriptor, params: &Map<String, Value>) -> Result<(), RosterError> {
    let issues = check_params(descriptor, params);
    if issues.is_empty() {
        return Ok(());
    }
    let text = issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(RosterError::ValidationError(text))
}
