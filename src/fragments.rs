//! Boilerplate Fragments
//!
//! Reusable `.md`/`.txt` text keyed by file stem. Artefacts reference them
//! with `{"use_block": "<stem>"}` anywhere in their JSON.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::PipelineError;

#[derive(Debug, Clone, Default)]
pub struct Fragments {
    blocks: BTreeMap<String, String>,
}

impl Fragments {
    pub fn new() -> Self {
        Self::default()
    }

    /// A missing directory is an empty fragment set, not an error.
    pub fn load_from_dir(dir: &Path) -> Result<Self, PipelineError> {
        let mut fragments = Self::new();
        if !dir.exists() {
            debug!("No content blocks directory at {}", dir.display());
            return Ok(fragments);
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_text = path
                .extension()
                .map_or(false, |e| e == "md" || e == "txt");
            if !is_text {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(text) => fragments.insert(stem, text.trim()),
                Err(e) => warn!("Failed to read content block {}: {}", path.display(), e),
            }
        }
        debug!("Loaded {} content blocks", fragments.blocks.len());
        Ok(fragments)
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.blocks.insert(key.into(), text.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.blocks.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Replace every `{"use_block": key}` object with its fragment text.
    /// Returns the keys that had no fragment; those get a visible marker.
    pub fn resolve(&self, value: &mut Value) -> Vec<String> {
        let mut missing = vec![];
        self.resolve_into(value, &mut missing);
        missing
    }

    fn resolve_into(&self, value: &mut Value, missing: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                if let Some(key) = map.get("use_block").and_then(Value::as_str) {
                    let key = key.to_string();
                    let text = match self.get(&key) {
                        Some(text) => text.to_string(),
                        None => {
                            let marker = format!("[Missing content block: {}]", key);
                            missing.push(key);
                            marker
                        }
                    };
                    *value = Value::String(text);
                    return;
                }
                for v in map.values_mut() {
                    self.resolve_into(v, missing);
                }
            }
            Value::Array(items) => {
                for v in items {
                    self.resolve_into(v, missing);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_references_resolved() {
        let mut fragments = Fragments::new();
        fragments.insert("isms_purpose", "Protect information assets.");
        let mut data = json!({
            "sections": {
                "purpose": {"use_block": "isms_purpose"},
                "scope": ["Site A", {"use_block": "isms_purpose"}]
            }
        });
        let missing = fragments.resolve(&mut data);
        assert!(missing.is_empty());
        assert_eq!(data["sections"]["purpose"], "Protect information assets.");
        assert_eq!(data["sections"]["scope"][1], "Protect information assets.");
    }

    #[test]
    fn test_missing_reference_marked() {
        let fragments = Fragments::new();
        let mut data = json!({"purpose": {"use_block": "nope"}});
        let missing = fragments.resolve(&mut data);
        assert_eq!(missing, vec!["nope".to_string()]);
        assert_eq!(data["purpose"], "[Missing content block: nope]");
    }

    #[test]
    fn test_load_from_dir_reads_md_and_txt() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("intro.md"), "\n# Intro text\n").unwrap();
        fs::write(dir.path().join("footer.txt"), "Footer").unwrap();
        fs::write(dir.path().join("ignored.json"), "{}").unwrap();
        let fragments = Fragments::load_from_dir(dir.path()).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments.get("intro"), Some("# Intro text"));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let fragments = Fragments::load_from_dir(Path::new("/definitely/not/here")).unwrap();
        assert!(fragments.is_empty());
    }
}
