/*!

Validation of desired documents happens locally and produces a [`ValidationReport`] listing every
problem found, rather than stopping at the first one. A document with a non-empty report is never
sent to the remote API.

!*/

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A single problem with a single field. `field` is a dotted path such as `container.0.port`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// The structured result of validating a document.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F, M>(&mut self, field: F, message: M)
    where
        F: Into<String>,
        M: Into<String>,
    {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        })
    }

    /// Record `message` against `field` when `condition` is false.
    pub fn check<F, M>(&mut self, condition: bool, field: F, message: M)
    where
        F: Into<String>,
        M: Into<String>,
    {
        if !condition {
            self.push(field, message)
        }
    }

    /// Record an error if `value` is empty or only whitespace.
    pub fn require_non_empty<F>(&mut self, field: F, value: &str)
    where
        F: Into<String>,
    {
        self.check(!value.trim().is_empty(), field, "must not be empty")
    }

    /// Fold the errors of a nested document into this report, prefixing each field with `prefix`.
    pub fn merge_nested<P>(&mut self, prefix: P, nested: ValidationReport)
    where
        P: AsRef<str>,
    {
        let prefix = prefix.as_ref();
        self.errors
            .extend(nested.errors.into_iter().map(|e| FieldError {
                field: format!("{}.{}", prefix, e.field),
                message: e.message,
            }))
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when there are no errors, otherwise the report itself.
    pub fn into_result(self) -> std::result::Result<(), ValidationReport> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationReport {}

#[cfg(test)]
mod tests {
    use super::ValidationReport;

    #[test]
    fn nested_errors_are_prefixed() {
        let mut volume = ValidationReport::new();
        volume.require_non_empty("share_name", " ");
        let mut report = ValidationReport::new();
        report.merge_nested("container.0.volume.1", volume);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field, "container.0.volume.1.share_name");
        assert!(report.into_result().is_err());
    }

    #[test]
    fn empty_report_is_valid() {
        let mut report = ValidationReport::new();
        report.check(true, "count", "unreachable");
        assert!(report.into_result().is_ok());
    }
}
