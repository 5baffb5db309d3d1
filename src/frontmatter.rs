//! Front Matter - Administrative Tables
//!
//! Runs before body rendering. A missing anchor skips that one table with a
//! warning; it never stops the artefact.

use tracing::debug;

use crate::content::{cell_text, ArtefactContent, KeyValues, Metadata};
use crate::templates::{BlockIndex, TemplateDocument};
use crate::validation::{ValidationResult, ValidationViolation};

pub const DOCUMENT_CONTROL: &str = "Document Control";
pub const REVISION_HISTORY: &str = "Revision History";
pub const APPROVAL_SIGNATURES: &str = "Approval Signatures";
pub const DISTRIBUTION_LIST: &str = "Distribution List";
pub const DOCUMENT_CLASSIFICATION: &str = "Document Classification";
pub const HANDLING_REQUIREMENTS: &str = "Handling Requirements";
pub const RETENTION_PERIOD: &str = "Retention Period";

const APPROVAL_COLUMNS: [&str; 4] = ["Name", "Role", "Signature", "Date"];
const DISTRIBUTION_COLUMNS: [&str; 4] = ["Recipient", "Role/Dept", "Method", "Notes"];
const REVISION_COLUMNS: [&str; 5] = ["Version", "Date", "Author", "Changes Made", "Approved By"];

/// Document Control label → metadata key
const DOCUMENT_CONTROL_LABELS: [(&str, &str); 10] = [
    ("Document ID", "doc_id"),
    ("Title", "title"),
    ("Version", "version"),
    ("Owner", "owner"),
    ("Approved By", "approved_by"),
    ("Confidentiality", "confidentiality"),
    ("Status", "status"),
    ("Date Completed", "date_completed"),
    ("Next Review Date", "next_review_date"),
    ("Document Type", "document_type"),
];

/// Metadata copied into document properties for headers and footers.
const PROPERTY_KEYS: [&str; 7] = [
    "title",
    "doc_id",
    "version",
    "document_type",
    "owner",
    "status",
    "confidentiality",
];

/// Fill every front-matter table the template carries.
pub fn fill_front_matter(doc: &mut TemplateDocument, content: &ArtefactContent, report: &mut ValidationResult) {
    fill_document_control(doc, &content.metadata, report);

    let revisions = content
        .revision_history
        .iter()
        .map(|r| vec![r.version.clone(), r.date.clone(), r.author.clone(), r.changes.clone(), r.approved_by.clone()])
        .collect();
    fill_record_table(doc, REVISION_HISTORY, &REVISION_COLUMNS, revisions, report);

    let approvals = content
        .approvals
        .iter()
        .map(|a| vec![a.name.clone(), a.role.clone(), a.signature.clone(), a.date.clone()])
        .collect();
    fill_record_table(doc, APPROVAL_SIGNATURES, &APPROVAL_COLUMNS, approvals, report);

    let recipients = content
        .distribution_list
        .iter()
        .map(|r| vec![r.recipient.clone(), r.role_or_dept.clone(), r.method.clone(), r.notes.clone()])
        .collect();
    fill_record_table(doc, DISTRIBUTION_LIST, &DISTRIBUTION_COLUMNS, recipients, report);

    fill_key_values(doc, DOCUMENT_CLASSIFICATION, &content.document_classification, report);
    fill_key_values(doc, HANDLING_REQUIREMENTS, &content.handling_requirements, report);
    fill_key_values(doc, RETENTION_PERIOD, &content.retention_period, report);
}

/// Copy identifying metadata into the document's property map.
pub fn apply_properties(doc: &mut TemplateDocument, meta: &Metadata) {
    for key in PROPERTY_KEYS {
        if let Some(value) = meta.field(key).filter(|v| !v.trim().is_empty()) {
            doc.properties.insert(key.to_string(), value.to_string());
        }
    }
}

fn locate_table(doc: &TemplateDocument, heading: &str, report: &mut ValidationResult) -> Option<BlockIndex> {
    let Some(at) = doc.find_heading(heading) else {
        report.push(ValidationViolation::warning(
            "missing_anchor",
            format!("Front-matter heading not found, table skipped: {}", heading),
        ));
        return None;
    };
    let table = doc.find_table_after(at);
    if table.is_none() {
        report.push(ValidationViolation::warning(
            "missing_anchor",
            format!("No table follows front-matter heading, skipped: {}", heading),
        ));
    }
    table
}

/// Fixed-column table: header row (if absent) then one row per record.
pub fn fill_record_table(
    doc: &mut TemplateDocument,
    heading: &str,
    columns: &[&str],
    rows: Vec<Vec<String>>,
    report: &mut ValidationResult,
) -> bool {
    if rows.is_empty() {
        return false;
    }
    let Some(at) = locate_table(doc, heading, report) else {
        return false;
    };
    let Some(table) = doc.table_mut(at) else {
        return false;
    };

    let has_header = table
        .header_columns()
        .first()
        .map_or(false, |c| c.trim().eq_ignore_ascii_case(columns[0]));
    if !has_header {
        table.rows.insert(0, columns.iter().map(|c| c.to_string()).collect());
    }
    let count = rows.len();
    for mut row in rows {
        row.resize(columns.len().max(row.len()), String::new());
        table.append_row(row);
    }
    debug!("{}: {} rows", heading, count);
    true
}

/// Two-column key/value table: one row per key, updating a pre-labelled row
/// when the template already has one.
pub fn fill_key_values(
    doc: &mut TemplateDocument,
    heading: &str,
    values: &KeyValues,
    report: &mut ValidationResult,
) -> bool {
    if values.is_empty() {
        return false;
    }
    let Some(at) = locate_table(doc, heading, report) else {
        return false;
    };
    let Some(table) = doc.table_mut(at) else {
        return false;
    };
    for (key, value) in values {
        let row = match table.row_by_key(key) {
            Some(row) => row,
            None => {
                table.append_row(vec![key.clone(), String::new()]);
                table.rows.len() - 1
            }
        };
        table.set_cell(row, 0, key.clone());
        table.set_cell(row, 1, cell_text(value));
    }
    debug!("{}: {} keys", heading, values.len());
    true
}

/// Document Control: table after the heading, else any table mentioning it.
pub fn fill_document_control(doc: &mut TemplateDocument, meta: &Metadata, report: &mut ValidationResult) -> bool {
    let at = doc
        .find_heading(DOCUMENT_CONTROL)
        .and_then(|h| doc.find_table_after(h))
        .or_else(|| doc.find_table_containing(DOCUMENT_CONTROL));
    let Some(table) = at.and_then(|at| doc.table_mut(at)) else {
        report.push(ValidationViolation::warning(
            "missing_anchor",
            format!("{} table not found, skipped", DOCUMENT_CONTROL),
        ));
        return false;
    };
    for (label, key) in DOCUMENT_CONTROL_LABELS {
        let row = match table.row_by_key(label) {
            Some(row) => row,
            None => {
                table.append_row(vec![label.to_string(), String::new()]);
                table.rows.len() - 1
            }
        };
        table.set_cell(row, 1, meta.field(key).unwrap_or_default());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{Block, Heading, Paragraph, StyleSet, Table};
    use serde_json::json;
    use std::path::Path;

    fn heading(text: &str) -> Block {
        Block::Heading(Heading { level: 2, text: text.into(), style: None, body_style: None })
    }

    fn table(rows: &[&[&str]]) -> Block {
        Block::Table(Table {
            style: None,
            rows: rows.iter().map(|r| r.iter().map(|c| c.to_string()).collect()).collect(),
        })
    }

    fn template(blocks: Vec<Block>) -> TemplateDocument {
        TemplateDocument {
            name: "t".into(),
            template_version: "1.0.0".into(),
            engine_min_version: "1.0.0".into(),
            styles: StyleSet::default(),
            properties: Default::default(),
            blocks,
        }
    }

    fn content(extra: serde_json::Value) -> ArtefactContent {
        let mut value = json!({
            "metadata": {"doc_id": "POL-7", "title": "Backup", "version": "1.2", "document_type": "Policy", "owner": "CTO"}
        });
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        ArtefactContent::from_value(Path::new("t.json"), value).unwrap()
    }

    #[test]
    fn test_approvals_get_header_and_rows() {
        let mut doc = template(vec![heading(APPROVAL_SIGNATURES), table(&[])]);
        let c = content(json!({"approvals": [{"name": "Ann", "role": "CISO", "date": "2025-02-01"}]}));
        let mut report = ValidationResult::new();
        fill_front_matter(&mut doc, &c, &mut report);
        let t = doc.table(1).unwrap();
        assert_eq!(t.rows()[0], APPROVAL_COLUMNS.to_vec());
        assert_eq!(t.rows()[1], vec!["Ann", "CISO", "", "2025-02-01"]);
    }

    #[test]
    fn test_existing_header_kept() {
        let mut doc = template(vec![
            heading(DISTRIBUTION_LIST),
            Block::Paragraph(Paragraph { text: "Controlled copies".into(), ..Default::default() }),
            table(&[&["Recipient", "Role/Dept", "Method", "Notes"]]),
        ]);
        let c = content(json!({"distribution_list": [{"recipient": "Ops"}, {"recipient": "IT", "method": "Email"}]}));
        let mut report = ValidationResult::new();
        fill_front_matter(&mut doc, &c, &mut report);
        let t = doc.table(2).unwrap();
        assert_eq!(t.rows().len(), 3);
        assert_eq!(t.rows()[2], vec!["IT", "", "Email", ""]);
    }

    #[test]
    fn test_key_values_one_row_per_key() {
        let mut doc = template(vec![
            heading(RETENTION_PERIOD),
            table(&[&["System of Record", "[TBD]"]]),
        ]);
        let c = content(json!({"retention_period": {
            "Minimum Retention": "7 years",
            "System of Record": "SharePoint",
            "Disposition Owner": "Records Manager"
        }}));
        let mut report = ValidationResult::new();
        fill_front_matter(&mut doc, &c, &mut report);
        let t = doc.table(1).unwrap();
        assert_eq!(t.rows().len(), 3);
        let value_of = |k: &str| t.rows()[t.row_by_key(k).unwrap()][1].clone();
        assert_eq!(value_of("System of Record"), "SharePoint");
        assert_eq!(value_of("Minimum Retention"), "7 years");
        assert_eq!(value_of("Disposition Owner"), "Records Manager");
    }

    #[test]
    fn test_missing_heading_warns_and_continues() {
        let mut doc = template(vec![heading(HANDLING_REQUIREMENTS), table(&[])]);
        let c = content(json!({
            "document_classification": {"Classification": "Internal"},
            "handling_requirements": {"Storage": "Encrypted"}
        }));
        let mut report = ValidationResult::new();
        fill_front_matter(&mut doc, &c, &mut report);
        assert!(!report.has_errors());
        let anchors: Vec<_> = report.by_rule("missing_anchor").map(|v| v.message.clone()).collect();
        assert!(anchors.iter().any(|m| m.contains(DOCUMENT_CLASSIFICATION)));
        assert_eq!(doc.table(1).unwrap().rows()[0], vec!["Storage", "Encrypted"]);
    }

    #[test]
    fn test_document_control_fallback_and_properties() {
        let mut doc = template(vec![table(&[&["Document Control", ""], &["Title", ""]])]);
        let c = content(json!({}));
        let mut report = ValidationResult::new();
        assert!(fill_document_control(&mut doc, &c.metadata, &mut report));
        let t = doc.table(0).unwrap();
        assert_eq!(t.rows()[1], vec!["Title", "Backup"]);
        assert_eq!(t.rows().len(), 2 + DOCUMENT_CONTROL_LABELS.len() - 1);
        let owner = t.row_by_key("Owner").unwrap();
        assert_eq!(t.rows()[owner][1], "CTO");

        apply_properties(&mut doc, &c.metadata);
        assert_eq!(doc.properties.get("doc_id").map(String::as_str), Some("POL-7"));
        assert!(!doc.properties.contains_key("status"));
    }
}
