//! ISMS Docgen - Template-Driven Compliance Documents
//!
//! Merges JSON artefact content and YAML section profiles into a shared
//! visual template, one artefact at a time.
//!
//! # Pipeline (fixed order)
//! 1. Load profile
//! 2. Load content
//! 3. Fill front matter
//! 4. Render sections
//! 5. Insert dynamic tables
//! 6. Serialize
//! 7. Update registers

pub mod config;
pub mod content;
pub mod dynamic_tables;
pub mod error;
pub mod export;
pub mod fragments;
pub mod frontmatter;
pub mod hashing;
pub mod pipeline;
pub mod profiles;
pub mod registers;
pub mod renderers;
pub mod templates;
pub mod validation;

pub use config::GeneratorPaths;
pub use content::{ArtefactContent, DocumentType, Metadata, SectionBody};
pub use dynamic_tables::{resolve_row, DynamicTableSpec, RowError, RowValues};
pub use error::PipelineError;
pub use fragments::Fragments;
pub use pipeline::{ArtefactOutcome, GeneratedDocument, GenerationManifest, Generator, RunSummary};
pub use profiles::{DocumentProfile, ProfileSet, SectionRule};
pub use registers::Registers;
pub use renderers::{RendererRegistry, SectionRenderer};
pub use templates::{Block, TemplateDocument};
pub use validation::{ValidationResult, ValidationViolation, ViolationSeverity};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_ENGINE_VERSION: &str = "1.0.0";
