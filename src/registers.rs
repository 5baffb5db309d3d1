//! Flat-File Registers
//!
//! After a document is written, its row in the Document Control Register is
//! upserted by `doc_id`, and the references listed under Related Documents
//! are synced into the Master Reference Register. Both are CSV files.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::content::{cell_text, ArtefactContent, SectionBody, SectionItem};
use crate::error::PipelineError;

pub const CONTROL_REGISTER_FILE: &str = "document_control_register.csv";
pub const REFERENCE_REGISTER_FILE: &str = "master_reference_register.csv";

const REF_PREFIX: &str = "REF-";
const REFERENCE_SECTION: &str = "Related Documents";

/// One row of the Document Control Register.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlEntry {
    pub doc_id: String,
    pub title: String,
    pub doc_type: String,
    pub version: String,
    pub status: String,
    pub owner: String,
    pub approver: String,
    pub confidentiality: String,
    pub date_completed: String,
    pub next_review_date: String,
    pub file_path: String,
    pub notes: String,
}

impl ControlEntry {
    pub fn from_content(content: &ArtefactContent, file_name: &str) -> Self {
        let meta = &content.metadata;
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            doc_id: meta.doc_id.clone(),
            title: meta.title.clone(),
            doc_type: meta.document_type.to_string(),
            version: meta.version.clone(),
            status: text(&meta.status),
            owner: text(&meta.owner),
            approver: text(&meta.approved_by),
            confidentiality: text(&meta.confidentiality),
            date_completed: text(&meta.date_completed),
            next_review_date: text(&meta.next_review_date),
            file_path: file_name.to_string(),
            notes: String::new(),
        }
    }
}

/// One row of the Master Reference Register.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceEntry {
    pub ref_id: String,
    pub source_doc_id: String,
    pub source_doc_title: String,
    pub source_section_key: String,
    pub ref_type: String,
    pub target_identifier: String,
    pub target_title: String,
    pub target_version: String,
    pub target_location: String,
    pub notes: String,
}

/// References an artefact declares under Related Documents, one per target.
pub fn references(content: &ArtefactContent) -> Vec<ReferenceEntry> {
    let Some(SectionBody::Items(items)) = content.section(REFERENCE_SECTION) else {
        return vec![];
    };
    let field = |fields: &BTreeMap<String, serde_json::Value>, key: &str| {
        fields.get(key).map(cell_text).unwrap_or_default().trim().to_string()
    };

    let mut out: Vec<ReferenceEntry> = vec![];
    for item in items {
        let (target, title) = match item {
            SectionItem::Text(s) => (s.trim().to_string(), String::new()),
            SectionItem::Record(fields) => (field(fields, "id"), field(fields, "title")),
            SectionItem::Other(v) => (cell_text(v).trim().to_string(), String::new()),
        };
        if target.is_empty() || out.iter().any(|e| e.target_identifier == target) {
            continue;
        }
        out.push(ReferenceEntry {
            source_doc_id: content.metadata.doc_id.clone(),
            source_doc_title: content.metadata.title.clone(),
            source_section_key: "related_documents".to_string(),
            ref_type: "InternalDocument".to_string(),
            target_identifier: target,
            target_title: title,
            ..Default::default()
        });
    }
    out
}

/// Register files kept in one directory
#[derive(Debug, Clone)]
pub struct Registers {
    dir: PathBuf,
}

impl Registers {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn control_path(&self) -> PathBuf {
        self.dir.join(CONTROL_REGISTER_FILE)
    }

    pub fn reference_path(&self) -> PathBuf {
        self.dir.join(REFERENCE_REGISTER_FILE)
    }

    /// Record one generated document in both registers.
    pub fn record(&self, content: &ArtefactContent, file_name: &str) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.dir)?;
        self.upsert_control(ControlEntry::from_content(content, file_name))?;
        self.sync_references(&content.metadata.doc_id, references(content))
    }

    fn upsert_control(&self, entry: ControlEntry) -> Result<(), PipelineError> {
        let path = self.control_path();
        let mut rows: Vec<ControlEntry> = read_rows(&path)?;
        match rows.iter_mut().find(|r| r.doc_id == entry.doc_id) {
            Some(row) => *row = entry,
            None => rows.push(entry),
        }
        write_rows(&path, &rows)
    }

    /// Replace this document's references. Targets seen before keep their
    /// `ref_id`; new targets get the next free one; dropped targets go.
    fn sync_references(&self, doc_id: &str, current: Vec<ReferenceEntry>) -> Result<(), PipelineError> {
        let path = self.reference_path();
        let existing: Vec<ReferenceEntry> = read_rows(&path)?;
        if existing.is_empty() && current.is_empty() {
            return Ok(());
        }

        let mut next = next_ref_number(&existing);
        let mut pending = current;
        let mut rows = Vec::with_capacity(existing.len() + pending.len());
        for row in existing {
            if row.source_doc_id != doc_id {
                rows.push(row);
            } else if let Some(pos) = pending.iter().position(|e| e.target_identifier == row.target_identifier) {
                let mut entry = pending.remove(pos);
                entry.ref_id = row.ref_id;
                rows.push(entry);
            }
        }
        for mut entry in pending {
            entry.ref_id = format!("{}{:06}", REF_PREFIX, next);
            next += 1;
            rows.push(entry);
        }
        debug!("{}: {} reference rows", path.display(), rows.len());
        write_rows(&path, &rows)
    }
}

fn next_ref_number(rows: &[ReferenceEntry]) -> u32 {
    rows.iter()
        .filter_map(|r| r.ref_id.strip_prefix(REF_PREFIX)?.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    if !path.is_file() {
        return Ok(vec![]);
    }
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
