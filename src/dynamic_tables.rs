//! Dynamic Tables - JSON-Declared Tables
//!
//! Each spec names a target heading, a column list and rows. Rows arrive either
//! positionally or keyed by column name; both go through [`resolve_row`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::content::cell_text;
use crate::templates::{Block, BlockIndex, Table, TemplateDocument};
use crate::validation::{ValidationResult, ValidationViolation};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_heading: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DynamicTableSpec {
    #[serde(default)]
    pub target: TableTarget,
    #[serde(default)]
    pub create_if_missing: bool,
    /// Heading text used when the target has to be created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_style: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<RowValues>,
}

impl DynamicTableSpec {
    pub fn after_heading(&self) -> Option<&str> {
        self.target.after_heading.as_deref().filter(|h| !h.trim().is_empty())
    }

    fn label(&self) -> &str {
        self.after_heading()
            .or(self.heading.as_deref())
            .unwrap_or("<no target>")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RowValues {
    Positional(Vec<Value>),
    Named(BTreeMap<String, Value>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("row has {len} values but only {columns} columns are declared")]
    TooManyValues { len: usize, columns: usize },

    #[error("unknown column(s): {}", .0.join(", "))]
    UnknownColumns(Vec<String>),
}

/// Align one row to `columns`. Missing cells are empty; surplus positional
/// values and unknown named keys reject the row.
pub fn resolve_row(columns: &[String], row: &RowValues) -> Result<Vec<String>, RowError> {
    match row {
        RowValues::Positional(values) => {
            if values.len() > columns.len() {
                return Err(RowError::TooManyValues {
                    len: values.len(),
                    columns: columns.len(),
                });
            }
            Ok((0..columns.len())
                .map(|i| values.get(i).map(cell_text).unwrap_or_default())
                .collect())
        }
        RowValues::Named(map) => {
            let unknown: Vec<String> = map
                .keys()
                .filter(|k| !columns.contains(k))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(RowError::UnknownColumns(unknown));
            }
            Ok(columns
                .iter()
                .map(|c| map.get(c).map(cell_text).unwrap_or_default())
                .collect())
        }
    }
}

/// Insert one dynamic table. Returns whether a table was placed.
pub fn insert_dynamic_table(
    doc: &mut TemplateDocument,
    index: usize,
    spec: &DynamicTableSpec,
    report: &mut ValidationResult,
) -> bool {
    if spec.columns.is_empty() {
        report.push(ValidationViolation::error(
            "dynamic_table",
            format!("dynamic_tables[{}]: no columns declared", index),
        ));
        return false;
    }

    let Some(anchor) = resolve_target(doc, spec) else {
        report.push(
            ValidationViolation::error(
                "target_not_found",
                format!("dynamic_tables[{}]: target heading not found: {}", index, spec.label()),
            )
            .with_remediation("Set create_if_missing: true or fix target.after_heading"),
        );
        return false;
    };

    let style = spec.table_style.clone().unwrap_or_else(|| doc.styles.table.clone());
    let mut table = Table::with_header(style, &spec.columns);
    for (ri, row) in spec.rows.iter().enumerate() {
        match resolve_row(&spec.columns, row) {
            Ok(cells) => table.append_row(cells),
            Err(e) => report.push(ValidationViolation::error(
                "row_rejected",
                format!("dynamic_tables[{}].rows[{}]: {}", index, ri, e),
            )),
        }
    }

    let at = doc.body_end(anchor);
    debug!(
        "Dynamic table under {:?}: {} data rows at block {}",
        spec.label(),
        table.rows().len() - 1,
        at
    );
    doc.insert_blocks(at, vec![Block::Table(table)]);
    true
}

fn resolve_target(doc: &mut TemplateDocument, spec: &DynamicTableSpec) -> Option<BlockIndex> {
    if let Some(at) = spec.after_heading().and_then(|h| doc.find_heading(h)) {
        return Some(at);
    }
    if !spec.create_if_missing {
        return None;
    }
    let text = spec.heading.as_deref().or(spec.after_heading())?;
    let level = spec.heading_style.as_deref().map_or(1, level_from_style);
    Some(doc.append_heading(text, level, spec.heading_style.clone()))
}

/// `"ISMS Heading 2"` → 2; anything without a trailing level is 1.
fn level_from_style(style: &str) -> u8 {
    style
        .rsplit(' ')
        .next()
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=9).contains(n))
        .unwrap_or(1)
}
