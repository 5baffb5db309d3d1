//! Manifest Fingerprints
//!
//! Every hash is SHA-256 over a canonical JSON rendering (object keys sorted
//! at every depth, compact separators). Generated documents carry no
//! timestamps, so a rerun over the same inputs records the same values.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::content::ArtefactContent;
use crate::templates::TemplateDocument;

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut value = serde_json::to_value(value)?;
    sort_keys(&mut value);
    serde_json::to_vec(&value)
}

fn sort_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, v) in entries.iter_mut() {
                sort_keys(v);
            }
            map.extend(entries);
        }
        Value::Array(items) => items.iter_mut().for_each(sort_keys),
        _ => {}
    }
}

pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(&canonical_bytes(value)?))
}

/// Hashes recorded in a generation manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHashes {
    pub template_hash: String,
    pub content_hash: String,
    pub output_hash: String,
    /// Template identity, artefact content and engine version together.
    pub job_hash: String,
}

impl DocumentHashes {
    pub fn compute(
        template: &TemplateDocument,
        content: &ArtefactContent,
        output: &[u8],
        engine_version: &str,
    ) -> Result<Self, serde_json::Error> {
        let template_hash = fingerprint(template)?;
        let content_hash = fingerprint(content)?;
        let job_hash = fingerprint(&json!({
            "template": template.name,
            "template_version": template.template_version,
            "template_hash": template_hash,
            "content_hash": content_hash,
            "engine_version": engine_version,
        }))?;
        Ok(Self {
            template_hash,
            content_hash,
            output_hash: sha256_hex(output),
            job_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::StyleSet;
    use std::path::Path;

    fn template(version: &str) -> TemplateDocument {
        TemplateDocument {
            name: "ISMS Master Base".into(),
            template_version: version.into(),
            engine_min_version: "1.0.0".into(),
            styles: StyleSet::default(),
            properties: Default::default(),
            blocks: vec![],
        }
    }

    fn content(doc_id: &str) -> ArtefactContent {
        ArtefactContent::from_value(
            Path::new("a.json"),
            json!({"metadata": {"doc_id": doc_id, "title": "T", "version": "1", "document_type": "Policy"}}),
        )
        .unwrap()
    }

    #[test]
    fn test_canonical_bytes_sorted_at_depth() {
        let obj = json!({"z": 1, "a": {"y": [{"d": 1, "c": 2}], "b": 3}});
        assert_eq!(
            canonical_bytes(&obj).unwrap(),
            br#"{"a":{"b":3,"y":[{"c":2,"d":1}]},"z":1}"#
        );
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_job_hash_tracks_template_content_and_engine() {
        let base = DocumentHashes::compute(&template("1.0.0"), &content("POL-1"), b"out", "1.0.0").unwrap();
        let again = DocumentHashes::compute(&template("1.0.0"), &content("POL-1"), b"out", "1.0.0").unwrap();
        assert_eq!(base, again);

        let bumped = DocumentHashes::compute(&template("1.1.0"), &content("POL-1"), b"out", "1.0.0").unwrap();
        assert_ne!(base.job_hash, bumped.job_hash);
        assert_ne!(base.template_hash, bumped.template_hash);
        assert_eq!(base.content_hash, bumped.content_hash);

        let other = DocumentHashes::compute(&template("1.0.0"), &content("POL-2"), b"out", "1.0.0").unwrap();
        assert_ne!(base.job_hash, other.job_hash);

        let engine = DocumentHashes::compute(&template("1.0.0"), &content("POL-1"), b"out", "1.1.0").unwrap();
        assert_ne!(base.job_hash, engine.job_hash);
        assert_eq!(base.output_hash, sha256_hex(b"out"));
    }
}
