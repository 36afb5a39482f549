//! Pre-export validation gate
//!
//! A `Validator` inspects an export job against its sequences and reports
//! issues. Any issue of `Severity::Error` blocks the export; warnings are
//! only logged.

mod engine;

pub use engine::ValidationEngine;

use std::fmt;

use crate::model::{ExportSpec, SequenceSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        })
    }
}

/// One problem found in an export job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Stable machine-readable rule code, e.g. `MISSING_SEQUENCE`
    pub code: &'static str,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        ValidationIssue { severity: Severity::Error, code, message: message.into() }
    }

    pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
        ValidationIssue { severity: Severity::Warning, code, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

/// Checks an export job before it runs
pub trait Validator: Send + Sync {
    fn validate(&self, spec: &ExportSpec, sequences: &SequenceSet) -> Vec<ValidationIssue>;
}
