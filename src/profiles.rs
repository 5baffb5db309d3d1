//! Document Profiles - Section Contracts per Document Type

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::content::DocumentType;
use crate::error::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionRule {
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

/// Ordered section contract for one document type. Order is render order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentProfile {
    pub document_type: DocumentType,
    pub sections: Vec<SectionRule>,
}

impl DocumentProfile {
    pub fn new(document_type: DocumentType, sections: Vec<SectionRule>) -> Result<Self, PipelineError> {
        let mut seen = HashSet::new();
        for rule in &sections {
            if !seen.insert(rule.name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "duplicate section {:?} in {} profile",
                    rule.name, document_type
                )));
            }
        }
        Ok(Self { document_type, sections })
    }

    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().filter(|s| s.required).map(|s| s.name.as_str())
    }
}

/// On-disk shape: either an explicit ordered `sections` list, or the
/// required/optional pair (required first).
#[derive(Debug, Default, Deserialize)]
struct ProfileEntry {
    #[serde(default)]
    sections: Vec<SectionRule>,
    #[serde(default)]
    required_sections: Vec<String>,
    #[serde(default)]
    optional_sections: Vec<String>,
}

impl ProfileEntry {
    fn into_rules(self) -> Vec<SectionRule> {
        if !self.sections.is_empty() {
            return self
                .sections
                .into_iter()
                .map(|s| SectionRule { name: s.name.trim().to_string(), required: s.required })
                .collect();
        }
        let required = self.required_sections.into_iter().map(|name| SectionRule {
            name: name.trim().to_string(),
            required: true,
        });
        let optional = self.optional_sections.into_iter().map(|name| SectionRule {
            name: name.trim().to_string(),
            required: false,
        });
        required.chain(optional).collect()
    }
}

/// Profile set - every document type the run knows how to validate
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    profiles: BTreeMap<DocumentType, DocumentProfile>,
}

impl ProfileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("cannot read profiles {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, PipelineError> {
        let raw: BTreeMap<String, ProfileEntry> = serde_yaml::from_str(yaml)?;
        let mut set = Self::new();
        for (name, entry) in raw {
            let Ok(document_type) = name.trim().parse::<DocumentType>() else {
                warn!("Ignoring profile for unknown document type {:?}", name);
                continue;
            };
            set.register(DocumentProfile::new(document_type, entry.into_rules())?);
        }
        debug!("Loaded {} document profiles", set.profiles.len());
        Ok(set)
    }

    pub fn register(&mut self, profile: DocumentProfile) {
        self.profiles.insert(profile.document_type, profile);
    }

    pub fn get(&self, document_type: DocumentType) -> Result<&DocumentProfile, PipelineError> {
        self.profiles.get(&document_type).ok_or_else(|| {
            PipelineError::Config(format!("no profile for document type {}", document_type))
        })
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_then_optional_order() {
        let yaml = r#"
Procedure:
  required_sections: [Purpose, " Scope ", Procedure Steps]
  optional_sections: [Related Documents]
"#;
        let set = ProfileSet::from_yaml(yaml).unwrap();
        let p = set.get(DocumentType::Procedure).unwrap();
        let names: Vec<_> = p.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Purpose", "Scope", "Procedure Steps", "Related Documents"]);
        assert_eq!(p.required().count(), 3);
    }

    #[test]
    fn test_explicit_section_list_keeps_interleaving() {
        let yaml = r#"
Policy:
  sections:
    - { name: Purpose, required: true }
    - { name: Related Documents }
    - { name: Policy Statements, required: true }
"#;
        let set = ProfileSet::from_yaml(yaml).unwrap();
        let p = set.get(DocumentType::Policy).unwrap();
        assert!(!p.sections[1].required);
        assert_eq!(p.sections[2].name, "Policy Statements");
    }

    #[test]
    fn test_duplicate_section_is_config_error() {
        let yaml = "Record:\n  required_sections: [Purpose, Purpose]\n";
        let err = ProfileSet::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_missing_profile_is_config_error() {
        let set = ProfileSet::from_yaml("Policy:\n  required_sections: [Purpose]\n").unwrap();
        let err = set.get(DocumentType::Record).unwrap_err();
        assert!(err.is_fatal_for_run());
    }

    #[test]
    fn test_unknown_type_is_ignored() {
        let set = ProfileSet::from_yaml("Memo:\n  required_sections: [Body]\n").unwrap();
        assert!(set.is_empty());
    }
}
