//! Section Renderers - Type-Specific Body Formatting
//!
//! One renderer per [`DocumentType`]. They share the insertion algorithm in
//! [`render_body`] and differ only in how a section's JSON becomes text.

use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::content::{cell_text, heading_for_key, section_key, ArtefactContent, DocumentType, SectionBody, SectionItem};
use crate::error::PipelineError;
use crate::profiles::DocumentProfile;
use crate::templates::{Block, BlockIndex, Paragraph, TemplateDocument};
use crate::validation::{ValidationResult, ValidationViolation};

/// Formatted body content before template styles are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Paragraph(String),
    Strong(String),
    Bullet(String),
    Numbered(String),
}

/// Section rendering contract shared by every document type
pub trait SectionRenderer {
    fn document_type(&self) -> DocumentType;

    fn format_section(&self, name: &str, body: &SectionBody) -> Vec<ContentBlock> {
        format_common(name, body)
    }
}

pub struct PolicyRenderer;

impl SectionRenderer for PolicyRenderer {
    fn document_type(&self) -> DocumentType { DocumentType::Policy }

    fn format_section(&self, name: &str, body: &SectionBody) -> Vec<ContentBlock> {
        match (section_key(name).as_str(), body) {
            ("policy_statements", SectionBody::Items(items)) => items
                .iter()
                .flat_map(|item| match item {
                    SectionItem::Record(fields) => {
                        let mut out = vec![];
                        let heading = field(fields, "heading");
                        if !heading.trim().is_empty() {
                            out.push(ContentBlock::Strong(heading.trim().to_string()));
                        }
                        out.extend(paragraphs(&field(fields, "text")));
                        out
                    }
                    other => paragraphs(&item_text(other)),
                })
                .collect(),
            _ => format_common(name, body),
        }
    }
}

pub struct ProcedureRenderer;

impl SectionRenderer for ProcedureRenderer {
    fn document_type(&self) -> DocumentType { DocumentType::Procedure }

    fn format_section(&self, name: &str, body: &SectionBody) -> Vec<ContentBlock> {
        match (section_key(name).as_str(), body) {
            ("procedure_steps" | "steps", SectionBody::Items(items)) => {
                items.iter().map(|i| ContentBlock::Numbered(item_text(i))).collect()
            }
            _ => format_common(name, body),
        }
    }
}

pub struct RecordRenderer;

impl SectionRenderer for RecordRenderer {
    fn document_type(&self) -> DocumentType { DocumentType::Record }

    fn format_section(&self, name: &str, body: &SectionBody) -> Vec<ContentBlock> {
        match (section_key(name).as_str(), body) {
            ("record_content", SectionBody::Items(items)) => {
                items.iter().map(|i| ContentBlock::Bullet(item_text(i))).collect()
            }
            ("generating_a_new_document" | "creating_a_new_version", SectionBody::Items(items)) => {
                items.iter().map(|i| ContentBlock::Numbered(item_text(i))).collect()
            }
            ("json_input_structure" | "governance", SectionBody::Text(text)) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| ContentBlock::Bullet(l.to_string()))
                .collect(),
            _ => format_common(name, body),
        }
    }
}

/// Formatting shared by all document types.
pub fn format_common(name: &str, body: &SectionBody) -> Vec<ContentBlock> {
    let key = section_key(name);
    match body {
        SectionBody::Text(text) => paragraphs(text),
        SectionBody::Items(items) => items
            .iter()
            .flat_map(|item| match (key.as_str(), item) {
                ("roles_and_responsibilities", SectionItem::Record(fields)) => role_lines(fields),
                ("definitions_and_acronyms", SectionItem::Record(fields)) => {
                    vec![format!("{} – {}", field(fields, "term"), field(fields, "definition"))]
                }
                ("related_documents", SectionItem::Record(fields)) => vec![format!(
                    "{} – {} ({})",
                    field_or(fields, "id", "ID"),
                    field_or(fields, "title", "Title"),
                    field_or(fields, "type", "Doc")
                )],
                _ => vec![item_text(item)],
            })
            .filter(|line| !line.trim().is_empty())
            .map(ContentBlock::Bullet)
            .collect(),
        SectionBody::Fields(fields) => fields
            .iter()
            .map(|(k, v)| ContentBlock::Bullet(format!("{}: {}", k, cell_text(v))))
            .collect(),
        SectionBody::Other(value) => paragraphs(&cell_text(value)),
    }
}

fn paragraphs(text: &str) -> Vec<ContentBlock> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| ContentBlock::Paragraph(l.to_string()))
        .collect()
}

fn item_text(item: &SectionItem) -> String {
    match item {
        SectionItem::Text(s) => s.trim().to_string(),
        SectionItem::Record(fields) => fields
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| format!("{}: {}", k, cell_text(v)))
            .collect::<Vec<_>>()
            .join("; "),
        SectionItem::Other(v) => cell_text(v),
    }
}

fn role_lines(fields: &std::collections::BTreeMap<String, Value>) -> Vec<String> {
    let role = field_or(fields, "role", "Role");
    match fields.get("responsibilities") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|r| format!("{} – {}", role, cell_text(r)))
            .collect(),
        Some(Value::String(r)) => vec![format!("{} – {}", role, r)],
        _ => vec![role],
    }
}

fn field(fields: &std::collections::BTreeMap<String, Value>, key: &str) -> String {
    fields.get(key).map(cell_text).unwrap_or_default()
}

fn field_or(fields: &std::collections::BTreeMap<String, Value>, key: &str, fallback: &str) -> String {
    let value = field(fields, key);
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Renderer registry - built once at startup, handed to the pipeline
pub struct RendererRegistry {
    renderers: HashMap<DocumentType, Box<dyn SectionRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self { renderers: HashMap::new() }
    }

    /// Policy, Procedure and Record renderers.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PolicyRenderer));
        registry.register(Box::new(ProcedureRenderer));
        registry.register(Box::new(RecordRenderer));
        registry
    }

    pub fn register(&mut self, renderer: Box<dyn SectionRenderer>) {
        self.renderers.insert(renderer.document_type(), renderer);
    }

    pub fn get(&self, document_type: DocumentType) -> Result<&dyn SectionRenderer, PipelineError> {
        self.renderers
            .get(&document_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| PipelineError::Config(format!("no renderer for document type {}", document_type)))
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Render body sections in profile order, then any unprofiled sections.
///
/// Absent sections are skipped here; required ones are reported by the
/// validator before rendering starts.
pub fn render_body(
    doc: &mut TemplateDocument,
    content: &ArtefactContent,
    profile: &DocumentProfile,
    renderer: &dyn SectionRenderer,
    report: &mut ValidationResult,
) {
    let order: Vec<&str> = profile.sections.iter().map(|s| s.name.as_str()).collect();
    doc.reorder_sections(&order);

    for (position, rule) in profile.sections.iter().enumerate() {
        let Some(body) = content.section(&rule.name) else {
            continue;
        };
        let blocks = renderer.format_section(&rule.name, body);
        if blocks.is_empty() {
            continue;
        }
        let at = match doc.find_heading(&rule.name) {
            Some(at) => at,
            None => {
                report.push(ValidationViolation::warning(
                    "missing_heading",
                    format!("Template has no heading for section {}, added in profile order", rule.name),
                ));
                place_profile_heading(doc, &order, position)
            }
        };
        insert_under(doc, at, &rule.name, blocks);
    }

    for key in content.unprofiled_sections(profile) {
        let Some(body) = content.sections.get(key) else {
            continue;
        };
        let heading = heading_for_key(key);
        let blocks = renderer.format_section(&heading, body);
        insert_section(doc, &heading, blocks, report);
    }
}

/// Insert formatted content directly beneath `heading`, ahead of any template
/// placeholder. A heading the template lacks is appended at the end.
pub fn insert_section(
    doc: &mut TemplateDocument,
    heading: &str,
    blocks: Vec<ContentBlock>,
    report: &mut ValidationResult,
) {
    if blocks.is_empty() {
        return;
    }
    let at = match doc.find_heading(heading) {
        Some(at) => at,
        None => {
            report.push(ValidationViolation::warning(
                "missing_heading",
                format!("Template has no heading for section {}, appended at end", heading),
            ));
            doc.append_heading(heading, 1, None)
        }
    };
    insert_under(doc, at, heading, blocks);
}

/// Create the heading for `order[position]` between its profile neighbours:
/// after the nearest earlier section present, else before the nearest later
/// one, else at the end.
fn place_profile_heading(doc: &mut TemplateDocument, order: &[&str], position: usize) -> BlockIndex {
    let name = order[position];
    let earlier = order[..position].iter().rev().find_map(|n| doc.find_heading(n));
    let later = order[position + 1..].iter().find_map(|n| doc.find_heading(n));

    let (at, level) = match (earlier, later) {
        (Some(prev), next) => {
            let end = doc.section_end(prev);
            let at = match next {
                Some(next) if next > prev => end.min(next),
                _ => end,
            };
            (at, doc.heading(prev).map_or(1, |h| h.level))
        }
        (None, Some(next)) => (next, doc.heading(next).map_or(1, |h| h.level)),
        (None, None) => (doc.blocks.len(), 1),
    };
    doc.insert_heading(at, name, level, None)
}

fn insert_under(doc: &mut TemplateDocument, at: BlockIndex, heading: &str, blocks: Vec<ContentBlock>) {
    let body_style = doc.body_style_under(at);
    let paragraphs: Vec<Block> = blocks
        .into_iter()
        .map(|b| {
            let paragraph = match b {
                ContentBlock::Paragraph(text) => Paragraph::styled(text, body_style.clone()),
                ContentBlock::Strong(text) => Paragraph {
                    strong: true,
                    ..Paragraph::styled(text, body_style.clone())
                },
                ContentBlock::Bullet(text) => Paragraph::styled(text, doc.styles.list_bullet.clone()),
                ContentBlock::Numbered(text) => Paragraph::styled(text, doc.styles.list_number.clone()),
            };
            Block::Paragraph(paragraph)
        })
        .collect();
    debug!("{}: {} blocks", heading, paragraphs.len());
    doc.insert_blocks(at + 1, paragraphs);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> SectionBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_text_becomes_paragraph_per_line() {
        let blocks = format_common("Purpose", &body(json!("First line.\n\n  Second line.  ")));
        assert_eq!(
            blocks,
            vec![
                ContentBlock::Paragraph("First line.".into()),
                ContentBlock::Paragraph("Second line.".into())
            ]
        );
    }

    #[test]
    fn test_roles_flattened() {
        let blocks = format_common(
            "Roles and Responsibilities",
            &body(json!([{"role": "CISO", "responsibilities": ["Own policy", "Review yearly"]}])),
        );
        assert_eq!(
            blocks,
            vec![
                ContentBlock::Bullet("CISO – Own policy".into()),
                ContentBlock::Bullet("CISO – Review yearly".into())
            ]
        );
    }

    #[test]
    fn test_related_documents_and_definitions() {
        let related = format_common(
            "related_documents",
            &body(json!([{"id": "POL-1", "title": "Access"}, "ISO 27001"])),
        );
        assert_eq!(related[0], ContentBlock::Bullet("POL-1 – Access (Doc)".into()));
        assert_eq!(related[1], ContentBlock::Bullet("ISO 27001".into()));

        let defs = format_common(
            "Definitions and Acronyms",
            &body(json!([{"term": "ISMS", "definition": "Information Security Management System"}])),
        );
        assert_eq!(defs, vec![ContentBlock::Bullet("ISMS – Information Security Management System".into())]);
    }

    #[test]
    fn test_procedure_steps_numbered() {
        let blocks = ProcedureRenderer.format_section("Procedure Steps", &body(json!(["Open", "Close"])));
        assert_eq!(blocks[1], ContentBlock::Numbered("Close".into()));
        // other types keep bullets for the same content
        let blocks = PolicyRenderer.format_section("Procedure Steps", &body(json!(["Open"])));
        assert_eq!(blocks[0], ContentBlock::Bullet("Open".into()));
    }

    #[test]
    fn test_policy_statements() {
        let blocks = PolicyRenderer.format_section(
            "Policy Statements",
            &body(json!([{"heading": "Passwords", "text": "Use a manager."}, {"text": "No sharing."}])),
        );
        assert_eq!(
            blocks,
            vec![
                ContentBlock::Strong("Passwords".into()),
                ContentBlock::Paragraph("Use a manager.".into()),
                ContentBlock::Paragraph("No sharing.".into())
            ]
        );
    }

    #[test]
    fn test_record_governance_lines() {
        let blocks = RecordRenderer.format_section("Governance", &body(json!("Owner: CTO\nReview: yearly")));
        assert_eq!(blocks, vec![ContentBlock::Bullet("Owner: CTO".into()), ContentBlock::Bullet("Review: yearly".into())]);
    }

    #[test]
    fn test_registry_covers_every_type() {
        let registry = RendererRegistry::standard();
        for t in DocumentType::ALL {
            assert_eq!(registry.get(t).unwrap().document_type(), t);
        }
        assert!(RendererRegistry::new().get(DocumentType::Record).is_err());
    }
}
