use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ResolutionError;

/// Shape classification of an attribute, as declared by the managed system's
/// schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Primitive,
    Object,
    Collection,
    Enum,
    Unknown,
}

/// How a participant's value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueState {
    /// Explicitly set in the model the participant was resolved from.
    Set,
    /// Taken from a schema default.
    Default,
    /// Explicitly nullable or absent.
    Nil,
    /// Resolution failed; the participant carries the resolution error.
    Failed,
}

/// Opaque technology descriptor for a participant's type.
///
/// `reference` is interpreted by the resolver that produced the participant,
/// e.g. a schema path for the schema-table resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    kind: AttributeKind,
    reference: String,
}

impl TypeDescriptor {
    pub fn new(kind: AttributeKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
        }
    }

    pub fn unknown() -> Self {
        Self {
            kind: AttributeKind::Unknown,
            reference: String::new(),
        }
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// One side (declared or live) of an attribute pairing. Immutable once
/// constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedParticipant {
    name: String,
    type_desc: TypeDescriptor,
    value: Value,
    state: ValueState,
    error: Option<ResolutionError>,
}

impl ResolvedParticipant {
    /// Participant whose value was explicitly set.
    pub fn set(name: impl Into<String>, type_desc: TypeDescriptor, value: Value) -> Self {
        Self {
            name: name.into(),
            type_desc,
            value,
            state: ValueState::Set,
            error: None,
        }
    }

    /// Participant whose value came from a schema default.
    pub fn default_value(name: impl Into<String>, type_desc: TypeDescriptor, value: Value) -> Self {
        Self {
            name: name.into(),
            type_desc,
            value,
            state: ValueState::Default,
            error: None,
        }
    }

    /// Participant whose value is explicitly nullable or absent.
    pub fn nil(name: impl Into<String>, type_desc: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            type_desc,
            value: Value::Null,
            state: ValueState::Nil,
            error: None,
        }
    }

    /// Participant whose resolution failed.
    pub fn failed(
        name: impl Into<String>,
        type_desc: TypeDescriptor,
        error: ResolutionError,
    ) -> Self {
        Self::failed_with_value(name, type_desc, Value::Null, error)
    }

    /// Failed participant that still carries the value it was derived from,
    /// e.g. a collection entry whose name attribute could not be resolved.
    pub fn failed_with_value(
        name: impl Into<String>,
        type_desc: TypeDescriptor,
        value: Value,
        error: ResolutionError,
    ) -> Self {
        Self {
            name: name.into(),
            type_desc,
            value,
            state: ValueState::Failed,
            error: Some(error),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_desc(&self) -> &TypeDescriptor {
        &self.type_desc
    }

    pub fn kind(&self) -> AttributeKind {
        self.type_desc.kind()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_state(&self) -> ValueState {
        self.state
    }

    pub fn resolution_error(&self) -> Option<&ResolutionError> {
        self.error.as_ref()
    }

    pub fn is_resolution_successful(&self) -> bool {
        self.error.is_none()
    }

    /// The value as a single line diagnostic string. Multi-line values are
    /// abbreviated at the first newline.
    pub fn value_as_single_line(&self) -> String {
        match &self.value {
            Value::Null => "null".to_string(),
            Value::String(s) => single_line(s),
            other => single_line(&other.to_string()),
        }
    }

    /// The resolution error as a single line diagnostic string; empty when
    /// resolution succeeded.
    pub fn resolution_error_as_single_line(&self) -> String {
        match &self.error {
            Some(err) => single_line(err.message()),
            None => String::new(),
        }
    }
}

/// Abbreviate at the first newline.
pub fn single_line(text: &str) -> String {
    match text.find('\n') {
        Some(idx) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn primitive_type() -> TypeDescriptor {
        TypeDescriptor::new(AttributeKind::Primitive, "root.port")
    }

    #[test]
    fn set_participant_has_no_error() {
        let p = ResolvedParticipant::set("port", primitive_type(), json!(7001));
        assert_eq!(p.value_state(), ValueState::Set);
        assert!(p.is_resolution_successful());
        assert_eq!(p.resolution_error_as_single_line(), "");
        assert_eq!(p.value_as_single_line(), "7001");
    }

    #[test]
    fn failed_participant_carries_error() {
        let p = ResolvedParticipant::failed(
            "port",
            primitive_type(),
            ResolutionError::new("no accessor for 'port'"),
        );
        assert_eq!(p.value_state(), ValueState::Failed);
        assert!(!p.is_resolution_successful());
        assert_eq!(p.resolution_error_as_single_line(), "no accessor for 'port'");
    }

    #[test]
    fn multi_line_value_is_abbreviated() {
        let p = ResolvedParticipant::set(
            "motd",
            primitive_type(),
            json!("first line\nsecond line"),
        );
        assert_eq!(p.value_as_single_line(), "first line...");
    }

    #[test]
    fn null_value_renders_as_null() {
        let p = ResolvedParticipant::nil("port", primitive_type());
        assert_eq!(p.value_as_single_line(), "null");
    }
}
