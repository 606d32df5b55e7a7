//! Field-level validation errors

use std::fmt;

/// Kind of validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// A value was required but missing
    Required,
    /// A value was present but not permitted
    Invalid,
}

/// A validation failure tied to a field path such as
/// `spec.containers[0].securityContext.runAsUser`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Failure kind
    pub kind: FieldErrorKind,
    /// Dotted field path
    pub field: String,
    /// Offending value, rendered
    pub value: Option<String>,
    /// Human readable detail
    pub message: String,
}

impl FieldError {
    /// A required value was missing
    pub fn required(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Required,
            field: field.into(),
            value: None,
            message: message.into(),
        }
    }

    /// A value was not permitted
    pub fn invalid(
        field: impl Into<String>,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: FieldErrorKind::Invalid,
            field: field.into(),
            value: Some(value.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.value) {
            (FieldErrorKind::Invalid, Some(value)) => {
                write!(f, "{}: Invalid value: {value:?}: {}", self.field, self.message)
            }
            (FieldErrorKind::Invalid, None) => {
                write!(f, "{}: Invalid value: {}", self.field, self.message)
            }
            (FieldErrorKind::Required, _) => {
                write!(f, "{}: Required value: {}", self.field, self.message)
            }
        }
    }
}

/// Append a child segment to a field path
#[must_use]
pub fn child(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

/// Append an index to a field path
#[must_use]
pub fn index(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

/// Render a list of errors on one line
#[must_use]
pub fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_paths() {
        let path = index(&child("spec", "containers"), 0);
        assert_eq!(child(&path, "securityContext"), "spec.containers[0].securityContext");
        assert_eq!(child("", "spec"), "spec");
    }

    #[test]
    fn test_display() {
        let err = FieldError::invalid("runAsUser", 0, "running with the root UID is forbidden");
        assert_eq!(
            err.to_string(),
            "runAsUser: Invalid value: \"0\": running with the root UID is forbidden"
        );

        let err = FieldError::required("fsGroup", "");
        assert_eq!(err.to_string(), "fsGroup: Required value: ");
    }
}
