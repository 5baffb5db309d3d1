//! Validation System - Rule/Report Separation
//!
//! Rules produce structured violations. Nothing here aborts a run: errors are
//! collected per artefact and reported once rendering has finished.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::content::{section_key, ArtefactContent};
use crate::profiles::DocumentProfile;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViolationSeverity::Error => "ERROR",
            ViolationSeverity::Warning => "WARN",
            ViolationSeverity::Info => "INFO",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<String>,
}

impl ValidationViolation {
    pub fn error(rule: &str, message: impl Into<String>) -> Self {
        Self::new(rule, ViolationSeverity::Error, message)
    }

    pub fn warning(rule: &str, message: impl Into<String>) -> Self {
        Self::new(rule, ViolationSeverity::Warning, message)
    }

    fn new(rule: &str, severity: ViolationSeverity, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            message: message.into(),
            expected: None,
            actual: None,
            remediation: vec![],
        }
    }

    pub fn with_remediation(mut self, hint: impl Into<String>) -> Self {
        self.remediation.push(hint.into());
        self
    }

    pub fn with_values(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl fmt::Display for ValidationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Per-artefact diagnostic report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { valid: true, violations: vec![] }
    }

    /// Record a violation and trace it as it happens.
    pub fn push(&mut self, violation: ValidationViolation) {
        debug!("{}", violation);
        if violation.severity == ViolationSeverity::Error {
            self.valid = false;
        }
        self.violations.push(violation);
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = ValidationViolation>) {
        for v in violations {
            self.push(v);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn by_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a ValidationViolation> {
        self.violations.iter().filter(move |v| v.rule == rule)
    }

    /// Console form, one `[SEVERITY] message` line per violation.
    pub fn lines(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, content: &ArtefactContent, profile: &DocumentProfile) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct RequiredSectionsRule;

impl ValidationRule for RequiredSectionsRule {
    fn name(&self) -> &'static str { "missing_section" }

    fn validate(&self, content: &ArtefactContent, profile: &DocumentProfile) -> Vec<ValidationViolation> {
        profile
            .required()
            .filter(|name| content.section(name).is_none())
            .map(|name| {
                ValidationViolation::error(self.name(), format!("Missing required section: {}", name))
                    .with_remediation(format!(
                        "Add a non-empty \"{}\" (or \"{}\") entry under sections",
                        name,
                        section_key(name)
                    ))
            })
            .collect()
    }
}

pub struct UnprofiledSectionsRule;

impl ValidationRule for UnprofiledSectionsRule {
    fn name(&self) -> &'static str { "unprofiled_section" }

    fn validate(&self, content: &ArtefactContent, profile: &DocumentProfile) -> Vec<ValidationViolation> {
        content
            .unprofiled_sections(profile)
            .into_iter()
            .map(|key| {
                ValidationViolation::warning(
                    self.name(),
                    format!(
                        "Section present but not in profile for {}: {}",
                        profile.document_type, key
                    ),
                )
            })
            .collect()
    }
}

pub struct DateFormatRule;

impl DateFormatRule {
    fn check(&self, field: &str, value: &str, out: &mut Vec<ValidationViolation>) {
        let value = value.trim();
        if value.is_empty() || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
            return;
        }
        out.push(
            ValidationViolation::warning(self.name(), format!("{} is not an ISO date", field))
                .with_values("YYYY-MM-DD", value),
        );
    }
}

impl ValidationRule for DateFormatRule {
    fn name(&self) -> &'static str { "date_format" }

    fn validate(&self, content: &ArtefactContent, _profile: &DocumentProfile) -> Vec<ValidationViolation> {
        let mut out = vec![];
        let meta = &content.metadata;
        if let Some(d) = &meta.date_completed {
            self.check("metadata.date_completed", d, &mut out);
        }
        if let Some(d) = &meta.next_review_date {
            self.check("metadata.next_review_date", d, &mut out);
        }
        for (i, a) in content.approvals.iter().enumerate() {
            self.check(&format!("approvals[{}].date", i), &a.date, &mut out);
        }
        for (i, r) in content.revision_history.iter().enumerate() {
            self.check(&format!("revision_history[{}].date", i), &r.date, &mut out);
        }
        out
    }
}

/// Validator runs every content rule against one artefact
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(RequiredSectionsRule),
                Box::new(UnprofiledSectionsRule),
                Box::new(DateFormatRule),
            ],
        }
    }

    pub fn validate(&self, content: &ArtefactContent, profile: &DocumentProfile) -> Vec<ValidationViolation> {
        self.rules
            .iter()
            .flat_map(|rule| rule.validate(content, profile))
            .collect()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
