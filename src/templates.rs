//! Template System - Visual Template Document
//!
//! The shared template is an ordered list of blocks. Every artefact gets its
//! own clone; the filler and renderers mutate that clone in place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::PipelineError;

/// Position of a block inside [`TemplateDocument::blocks`].
pub type BlockIndex = usize;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    pub name: String,
    pub template_version: String,
    #[serde(default = "default_engine_min_version")]
    pub engine_min_version: String,
    #[serde(default)]
    pub styles: StyleSet,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

fn default_engine_min_version() -> String { crate::MIN_ENGINE_VERSION.to_string() }

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StyleSet {
    #[serde(default = "default_body_style")]
    pub body: String,
    #[serde(default = "default_bullet_style")]
    pub list_bullet: String,
    #[serde(default = "default_number_style")]
    pub list_number: String,
    #[serde(default = "default_table_style")]
    pub table: String,
    #[serde(default = "default_heading_prefix")]
    pub heading_prefix: String,
}

fn default_body_style() -> String { "ISMS Body".to_string() }
fn default_bullet_style() -> String { "ISMS List Bullet".to_string() }
fn default_number_style() -> String { "ISMS List Number".to_string() }
fn default_table_style() -> String { "TracWater table".to_string() }
fn default_heading_prefix() -> String { "ISMS Heading".to_string() }

impl Default for StyleSet {
    fn default() -> Self {
        Self {
            body: default_body_style(),
            list_bullet: default_bullet_style(),
            list_number: default_number_style(),
            table: default_table_style(),
            heading_prefix: default_heading_prefix(),
        }
    }
}

impl StyleSet {
    pub fn heading(&self, level: u8) -> String {
        format!("{} {}", self.heading_prefix, level)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading(Heading),
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Heading {
    #[serde(default = "default_level")]
    pub level: u8,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Style for body paragraphs inserted under this heading when the
    /// template carries no placeholder to copy it from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_style: Option<String>,
}

fn default_level() -> u8 { 1 }

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub placeholder: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strong: bool,
}

fn is_false(v: &bool) -> bool { !*v }

impl Paragraph {
    pub fn styled(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: Some(style.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn with_header(style: impl Into<String>, columns: &[String]) -> Self {
        Self {
            style: Some(style.into()),
            rows: vec![columns.to_vec()],
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// First row, or nothing for an empty table.
    pub fn header_columns(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn append_row(&mut self, values: Vec<String>) {
        self.rows.push(values);
    }

    /// Index of the first row whose leading cell equals `key` (trimmed).
    pub fn row_by_key(&self, key: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.first().map_or(false, |c| c.trim() == key))
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cells) = self.rows.get_mut(row) {
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value.into();
        }
    }
}

impl TemplateDocument {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Template(format!("cannot read {}: {}", path.display(), e))
        })?;
        let template: TemplateDocument = serde_json::from_str(&content).map_err(|e| {
            PipelineError::Template(format!("cannot parse {}: {}", path.display(), e))
        })?;
        debug!(
            "Loaded template {} v{} ({} blocks)",
            template.name,
            template.template_version,
            template.blocks.len()
        );
        Ok(template)
    }

    /// First heading whose text equals `text` exactly, in document order.
    pub fn find_heading(&self, text: &str) -> Option<BlockIndex> {
        self.blocks
            .iter()
            .position(|b| matches!(b, Block::Heading(h) if h.text == text))
    }

    pub fn heading(&self, at: BlockIndex) -> Option<&Heading> {
        match self.blocks.get(at) {
            Some(Block::Heading(h)) => Some(h),
            _ => None,
        }
    }

    pub fn headings(&self) -> impl Iterator<Item = &Heading> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Heading(h) => Some(h),
            _ => None,
        })
    }

    /// First table after the heading at `heading`, skipping paragraphs and
    /// subheadings. Stops at the next heading of equal or higher level.
    pub fn find_table_after(&self, heading: BlockIndex) -> Option<BlockIndex> {
        let level = self.heading(heading)?.level;
        for (offset, block) in self.blocks[heading + 1..].iter().enumerate() {
            match block {
                Block::Table(_) => return Some(heading + 1 + offset),
                Block::Heading(h) if h.level <= level => return None,
                _ => {}
            }
        }
        None
    }

    /// First table with a cell containing `needle`, case-insensitive.
    pub fn find_table_containing(&self, needle: &str) -> Option<BlockIndex> {
        let needle = needle.trim().to_lowercase();
        self.blocks.iter().position(|b| match b {
            Block::Table(t) => t
                .rows
                .iter()
                .flatten()
                .any(|cell| cell.to_lowercase().contains(&needle)),
            _ => false,
        })
    }

    pub fn table(&self, at: BlockIndex) -> Option<&Table> {
        match self.blocks.get(at) {
            Some(Block::Table(t)) => Some(t),
            _ => None,
        }
    }

    pub fn table_mut(&mut self, at: BlockIndex) -> Option<&mut Table> {
        match self.blocks.get_mut(at) {
            Some(Block::Table(t)) => Some(t),
            _ => None,
        }
    }

    /// Index just past the heading's own body: the next heading of any level,
    /// or the end of the document.
    pub fn body_end(&self, heading: BlockIndex) -> BlockIndex {
        if heading >= self.blocks.len() {
            return self.blocks.len();
        }
        self.blocks[heading + 1..]
            .iter()
            .position(|b| matches!(b, Block::Heading(_)))
            .map_or(self.blocks.len(), |offset| heading + 1 + offset)
    }

    /// Index just past the whole section, subsections included: the next
    /// heading of equal or higher level, or the end of the document.
    pub fn section_end(&self, heading: BlockIndex) -> BlockIndex {
        let Some(level) = self.heading(heading).map(|h| h.level) else {
            return self.body_end(heading);
        };
        self.blocks[heading + 1..]
            .iter()
            .position(|b| matches!(b, Block::Heading(h) if h.level <= level))
            .map_or(self.blocks.len(), |offset| heading + 1 + offset)
    }

    /// Rearrange the named sections into the given order. Sections keep the
    /// slots they occupied, so surrounding blocks do not move. A named
    /// section nested under another is lifted out to the level of the
    /// shallowest named section. Missing names are ignored. Returns whether
    /// anything changed.
    pub fn reorder_sections(&mut self, names: &[&str]) -> bool {
        let mut starts: Vec<BlockIndex> = vec![];
        for name in names {
            if let Some(at) = self.find_heading(name) {
                if !starts.contains(&at) {
                    starts.push(at);
                }
            }
        }
        let Some(top) = starts.iter().filter_map(|&at| self.heading(at)).map(|h| h.level).min() else {
            return false;
        };

        let spans: Vec<(BlockIndex, BlockIndex)> = starts
            .iter()
            .map(|&at| (at, self.own_section_end(at, &starts)))
            .collect();
        let mut slots = spans.clone();
        slots.sort();
        let flat = starts
            .iter()
            .all(|&at| self.heading(at).map_or(true, |h| h.level == top));
        if slots == spans && flat {
            return false;
        }

        let mut blocks = Vec::with_capacity(self.blocks.len());
        let mut cursor = 0;
        for (slot, span) in slots.iter().zip(&spans) {
            blocks.extend_from_slice(&self.blocks[cursor..slot.0]);
            blocks.extend(self.lifted(*span, top));
            cursor = slot.1;
        }
        blocks.extend_from_slice(&self.blocks[cursor..]);
        self.blocks = blocks;
        true
    }

    /// Like `section_end`, but a section also ends at any of `boundaries`.
    fn own_section_end(&self, heading: BlockIndex, boundaries: &[BlockIndex]) -> BlockIndex {
        let level = self.heading(heading).map_or(1, |h| h.level);
        (heading + 1..self.blocks.len())
            .find(|i| {
                boundaries.contains(i)
                    || matches!(&self.blocks[*i], Block::Heading(h) if h.level <= level)
            })
            .unwrap_or(self.blocks.len())
    }

    /// Blocks of `span` with every heading shifted so the first sits at `top`.
    fn lifted(&self, span: (BlockIndex, BlockIndex), top: u8) -> Vec<Block> {
        let shift = self.heading(span.0).map_or(0, |h| h.level.saturating_sub(top));
        self.blocks[span.0..span.1]
            .iter()
            .cloned()
            .map(|mut block| {
                if let Block::Heading(h) = &mut block {
                    if shift > 0 {
                        let level = h.level.saturating_sub(shift).max(1);
                        if h.style.as_deref() == Some(self.styles.heading(h.level).as_str()) {
                            h.style = Some(self.styles.heading(level));
                        }
                        h.level = level;
                    }
                }
                block
            })
            .collect()
    }

    /// Style inherited by body text under `heading`: the first placeholder's
    /// style, then the heading's body style, then the template default.
    pub fn body_style_under(&self, heading: BlockIndex) -> String {
        let start = (heading + 1).min(self.blocks.len());
        let end = self.body_end(heading);
        let placeholder_style = self.blocks[start..end].iter().find_map(|b| match b {
            Block::Paragraph(p) if p.placeholder => p.style.clone(),
            _ => None,
        });
        placeholder_style
            .or_else(|| self.heading(heading).and_then(|h| h.body_style.clone()))
            .unwrap_or_else(|| self.styles.body.clone())
    }

    pub fn insert_blocks(&mut self, at: BlockIndex, blocks: Vec<Block>) {
        let at = at.min(self.blocks.len());
        self.blocks.splice(at..at, blocks);
    }

    /// Insert a heading at `at` (clamped to the end) and return its index.
    pub fn insert_heading(&mut self, at: BlockIndex, text: &str, level: u8, style: Option<String>) -> BlockIndex {
        let at = at.min(self.blocks.len());
        let style = style.unwrap_or_else(|| self.styles.heading(level));
        self.blocks.insert(
            at,
            Block::Heading(Heading {
                level,
                text: text.to_string(),
                style: Some(style),
                body_style: None,
            }),
        );
        at
    }

    /// Append a heading at the end of the document and return its index.
    pub fn append_heading(&mut self, text: &str, level: u8, style: Option<String>) -> BlockIndex {
        self.insert_heading(self.blocks.len(), text, level, style)
    }
}
