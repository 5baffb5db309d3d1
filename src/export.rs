//! Markdown preview of a generated document

use crate::templates::{Block, TemplateDocument};

pub fn to_markdown(doc: &TemplateDocument) -> String {
    let mut out = String::new();
    if let Some(title) = doc.properties.get("title") {
        out.push_str(&format!("<!-- {} -->\n\n", title));
    }
    let mut number = 0;
    for block in &doc.blocks {
        match block {
            Block::Heading(h) => {
                number = 0;
                let level = h.level.clamp(1, 6) as usize;
                out.push_str(&format!("{} {}\n\n", "#".repeat(level), h.text));
            }
            Block::Paragraph(p) => {
                let style = p.style.as_deref().unwrap_or_default();
                let text = if p.strong { format!("**{}**", p.text) } else { p.text.clone() };
                if style == doc.styles.list_number {
                    number += 1;
                    out.push_str(&format!("{}. {}\n", number, text));
                    continue;
                }
                number = 0;
                if style == doc.styles.list_bullet {
                    out.push_str(&format!("- {}\n", text));
                } else if p.placeholder {
                    out.push_str(&format!("_{}_\n\n", text));
                } else {
                    out.push_str(&format!("{}\n\n", text));
                }
            }
            Block::Table(t) => {
                number = 0;
                let width = t.column_count();
                if width == 0 {
                    continue;
                }
                for (i, row) in t.rows().iter().enumerate() {
                    let cells: Vec<String> = (0..width)
                        .map(|c| row.get(c).map_or(String::new(), |v| v.replace('|', "\\|")))
                        .collect();
                    out.push_str(&format!("| {} |\n", cells.join(" | ")));
                    if i == 0 {
                        out.push_str(&format!("|{}\n", " --- |".repeat(width)));
                    }
                }
                out.push('\n');
            }
        }
    }
    out
}
