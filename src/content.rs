//! Artefact Content - JSON Input Model
//!
//! One artefact file becomes one [`ArtefactContent`]. Metadata presence is
//! checked on the raw JSON first so that a missing field is reported as an
//! invalid artefact rather than an opaque decode error.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::dynamic_tables::DynamicTableSpec;
use crate::error::PipelineError;
use crate::profiles::DocumentProfile;

/// Closed set of artefact kinds; selects profile and renderer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentType {
    Policy,
    Procedure,
    Record,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [DocumentType::Policy, DocumentType::Procedure, DocumentType::Record];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Policy => "Policy",
            DocumentType::Procedure => "Procedure",
            DocumentType::Record => "Record",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("must be one of 'Policy' | 'Procedure' | 'Record', got {:?}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    pub doc_id: String,
    pub title: String,
    pub version: String,
    pub document_type: DocumentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidentiality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<String>,
}

impl Metadata {
    /// Value of a metadata field by its JSON key.
    pub fn field(&self, key: &str) -> Option<&str> {
        match key {
            "doc_id" => Some(&self.doc_id),
            "title" => Some(&self.title),
            "version" => Some(&self.version),
            "document_type" => Some(self.document_type.as_str()),
            "owner" => self.owner.as_deref(),
            "approved_by" => self.approved_by.as_deref(),
            "confidentiality" => self.confidentiality.as_deref(),
            "status" => self.status.as_deref(),
            "date_completed" => self.date_completed.as_deref(),
            "next_review_date" => self.next_review_date.as_deref(),
            _ => None,
        }
    }
}

/// Body of one section as authored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SectionBody {
    Text(String),
    Items(Vec<SectionItem>),
    Fields(BTreeMap<String, Value>),
    Other(Value),
}

impl SectionBody {
    pub fn is_empty(&self) -> bool {
        match self {
            SectionBody::Text(s) => s.trim().is_empty(),
            SectionBody::Items(items) => items.is_empty(),
            SectionBody::Fields(map) => map.is_empty(),
            SectionBody::Other(v) => v.is_null(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SectionItem {
    Text(String),
    Record(BTreeMap<String, Value>),
    Other(Value),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Approval {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub role: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub signature: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    #[serde(default, deserialize_with = "lenient_text")]
    pub recipient: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub role_or_dept: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub method: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Revision {
    #[serde(default, deserialize_with = "lenient_text")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub author: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub changes: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub approved_by: String,
}

/// Scalar key/value front-matter table (classification, handling, retention).
pub type KeyValues = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtefactContent {
    pub metadata: Metadata,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionBody>,
    #[serde(default)]
    pub approvals: Vec<Approval>,
    #[serde(default)]
    pub distribution_list: Vec<Recipient>,
    #[serde(default)]
    pub document_classification: KeyValues,
    #[serde(default)]
    pub handling_requirements: KeyValues,
    #[serde(default)]
    pub retention_period: KeyValues,
    #[serde(default)]
    pub revision_history: Vec<Revision>,
    #[serde(default)]
    pub dynamic_tables: Vec<DynamicTableSpec>,
}

const REQUIRED_METADATA: [&str; 4] = ["doc_id", "title", "version", "document_type"];

impl ArtefactContent {
    /// Decode an artefact whose `use_block` references are already resolved.
    pub fn from_value(path: &Path, value: Value) -> Result<Self, PipelineError> {
        let problems = metadata_problems(&value);
        if !problems.is_empty() {
            return Err(PipelineError::InvalidArtefact {
                path: path.to_path_buf(),
                problems,
            });
        }
        serde_json::from_value(value).map_err(|e| PipelineError::parse(path, e))
    }

    /// Non-empty body for a profile section name: exact heading first, then
    /// its snake_case key.
    pub fn section(&self, heading: &str) -> Option<&SectionBody> {
        self.sections
            .get(heading)
            .or_else(|| self.sections.get(&section_key(heading)))
            .filter(|body| !body.is_empty())
    }

    /// Non-empty content keys that no profile section claims, in key order.
    pub fn unprofiled_sections(&self, profile: &DocumentProfile) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|(_, body)| !body.is_empty())
            .map(|(key, _)| key.as_str())
            .filter(|key| {
                !profile
                    .sections
                    .iter()
                    .any(|s| s.name == *key || section_key(&s.name) == *key)
            })
            .collect()
    }

    /// Deterministic output file stem, `<doc_id> <title> v<version>`.
    pub fn output_stem(&self) -> String {
        let m = &self.metadata;
        sanitize_file_name(&format!("{} {} v{}", m.doc_id, m.title, m.version))
    }
}

fn metadata_problems(value: &Value) -> Vec<String> {
    let Some(meta) = value.get("metadata") else {
        return vec!["metadata: required object".to_string()];
    };
    if !meta.is_object() {
        return vec!["metadata: must be an object".to_string()];
    }
    let mut problems = vec![];
    for key in REQUIRED_METADATA {
        let present = meta
            .get(key)
            .and_then(Value::as_str)
            .map_or(false, |s| !s.trim().is_empty());
        if !present {
            problems.push(format!("metadata.{}: required non-empty string", key));
        }
    }
    if let Some(t) = meta.get("document_type").and_then(Value::as_str) {
        if !t.trim().is_empty() {
            if let Err(e) = t.parse::<DocumentType>() {
                problems.push(format!("metadata.document_type: {}", e));
            }
        }
    }
    problems
}

/// `"Roles and Responsibilities"` → `"roles_and_responsibilities"`
pub fn section_key(heading: &str) -> String {
    let mut key = String::with_capacity(heading.len());
    for c in heading.trim().chars() {
        if c.is_alphanumeric() {
            key.extend(c.to_lowercase());
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_end_matches('_').to_string()
}

/// Heading text for a content key: keys that already read as headings are
/// kept, snake_case keys are title-cased.
pub fn heading_for_key(key: &str) -> String {
    if key.chars().any(|c| c.is_uppercase() || c == ' ') {
        return key.to_string();
    }
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of a scalar cell: strings verbatim, null empty, anything else as JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(cell_text(&value))
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> Value {
        json!({"doc_id": "POL-001", "title": "Access Control", "version": "2.1", "document_type": "Policy"})
    }

    #[test]
    fn test_section_key() {
        assert_eq!(section_key("Roles and Responsibilities"), "roles_and_responsibilities");
        assert_eq!(section_key(" Definitions / Acronyms "), "definitions_acronyms");
        assert_eq!(heading_for_key("json_input_structure"), "Json Input Structure");
        assert_eq!(heading_for_key("Record Content"), "Record Content");
    }

    #[test]
    fn test_missing_metadata_is_invalid() {
        let err = ArtefactContent::from_value(Path::new("a.json"), json!({"sections": {}})).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArtefact { .. }));
    }

    #[test]
    fn test_each_missing_metadata_field_reported() {
        let err = ArtefactContent::from_value(
            Path::new("a.json"),
            json!({"metadata": {"doc_id": "", "title": "T", "document_type": "Memo"}}),
        )
        .unwrap_err();
        let PipelineError::InvalidArtefact { problems, .. } = err else {
            panic!("expected invalid artefact");
        };
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().any(|p| p.starts_with("metadata.doc_id")));
        assert!(problems.iter().any(|p| p.starts_with("metadata.version")));
        assert!(problems.iter().any(|p| p.contains("Memo")));
    }

    #[test]
    fn test_malformed_shape_is_parse_error() {
        let err = ArtefactContent::from_value(
            Path::new("a.json"),
            json!({"metadata": meta(), "approvals": "not a list"}),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn test_section_lookup_by_heading_or_key() {
        let c = ArtefactContent::from_value(
            Path::new("a.json"),
            json!({
                "metadata": meta(),
                "sections": {
                    "Purpose": "Why",
                    "procedure_steps": ["one", "two"],
                    "scope": ""
                }
            }),
        )
        .unwrap();
        assert!(matches!(c.section("Purpose"), Some(SectionBody::Text(_))));
        assert!(matches!(c.section("Procedure Steps"), Some(SectionBody::Items(items)) if items.len() == 2));
        assert!(c.section("Scope").is_none());
    }

    #[test]
    fn test_front_matter_values_are_lenient() {
        let c = ArtefactContent::from_value(
            Path::new("a.json"),
            json!({
                "metadata": meta(),
                "approvals": [{"name": "A. Admin", "date": 20250101}],
                "retention_period": {"Minimum Retention": 7, "Legal Hold": null}
            }),
        )
        .unwrap();
        assert_eq!(c.approvals[0].date, "20250101");
        assert_eq!(c.approvals[0].role, "");
        assert_eq!(cell_text(&c.retention_period["Minimum Retention"]), "7");
        assert_eq!(cell_text(&c.retention_period["Legal Hold"]), "");
    }

    #[test]
    fn test_output_stem() {
        let c = ArtefactContent::from_value(
            Path::new("a.json"),
            json!({"metadata": {"doc_id": "REC-1", "title": "Audit/Log", "version": "1.0", "document_type": "Record"}}),
        )
        .unwrap();
        assert_eq!(c.output_stem(), "REC-1 Audit-Log v1.0");
    }
}
