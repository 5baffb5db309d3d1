//! Generation Pipeline - Single Entry Point
//!
//! Every artefact goes through the same fixed stages on its own copy of the
//! template: front matter → body sections → dynamic tables → serialize.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::GeneratorPaths;
use crate::content::{ArtefactContent, DocumentType};
use crate::dynamic_tables::insert_dynamic_table;
use crate::error::PipelineError;
use crate::export::to_markdown;
use crate::fragments::Fragments;
use crate::frontmatter::{apply_properties, fill_front_matter};
use crate::hashing::DocumentHashes;
use crate::profiles::ProfileSet;
use crate::registers::Registers;
use crate::renderers::{render_body, RendererRegistry};
use crate::templates::TemplateDocument;
use crate::validation::{ValidationResult, ValidationViolation, Validator};
use crate::ENGINE_VERSION;

/// Audit record written next to every generated document. No timestamps:
/// identical inputs give an identical manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationManifest {
    pub doc_id: String,
    pub version: String,
    pub document_type: DocumentType,
    pub source_file: String,
    pub output_file: String,
    pub template_name: String,
    pub template_version: String,
    pub engine_version: String,
    #[serde(flatten)]
    pub hashes: DocumentHashes,
    pub validation: ValidationResult,
}

#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub file_stem: String,
    pub document: TemplateDocument,
    pub validation: ValidationResult,
    pub manifest: GenerationManifest,
}

impl GeneratedDocument {
    pub fn file_name(&self) -> String {
        format!("{}.json", self.file_stem)
    }

    /// Serialized document exactly as written to disk.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        document_bytes(&self.document)
    }
}

fn document_bytes(doc: &TemplateDocument) -> Result<Vec<u8>, PipelineError> {
    let mut bytes = serde_json::to_vec_pretty(doc)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[derive(Debug, Clone)]
pub enum ArtefactOutcome {
    Generated {
        source: PathBuf,
        output: PathBuf,
        validation: ValidationResult,
    },
    Failed {
        source: PathBuf,
        error: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<ArtefactOutcome>,
}

impl RunSummary {
    pub fn generated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ArtefactOutcome::Generated { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.generated()
    }

    /// Any artefact failed outright or was produced with validation errors.
    pub fn has_problems(&self) -> bool {
        self.outcomes.iter().any(|o| match o {
            ArtefactOutcome::Generated { validation, .. } => validation.has_errors(),
            ArtefactOutcome::Failed { .. } => true,
        })
    }
}

/// The generation pipeline - shared, read-only inputs for a whole run
pub struct Generator {
    template: TemplateDocument,
    profiles: ProfileSet,
    renderers: RendererRegistry,
    fragments: Fragments,
    validator: Validator,
    registers: Option<Registers>,
}

impl Generator {
    pub fn new(
        template: TemplateDocument,
        profiles: ProfileSet,
        renderers: RendererRegistry,
        fragments: Fragments,
    ) -> Result<Self, PipelineError> {
        check_engine_version(&template)?;
        Ok(Self {
            template,
            profiles,
            renderers,
            fragments,
            validator: Validator::new(),
            registers: None,
        })
    }

    /// Keep the document control and reference registers up to date.
    pub fn with_registers(mut self, registers: Registers) -> Self {
        self.registers = Some(registers);
        self
    }

    /// Load template, profiles and fragments. Any failure here is fatal.
    pub fn from_paths(paths: &GeneratorPaths) -> Result<Self, PipelineError> {
        let template = TemplateDocument::load(&paths.template)?;
        let profiles = ProfileSet::load(&paths.profiles)?;
        let fragments = Fragments::load_from_dir(&paths.content_blocks)?;
        info!(
            "Template {} v{}, {} profiles, {} content blocks",
            template.name,
            template.template_version,
            profiles.len(),
            fragments.len()
        );
        Ok(Self::new(template, profiles, RendererRegistry::standard(), fragments)?
            .with_registers(Registers::new(&paths.registers_dir)))
    }

    pub fn template(&self) -> &TemplateDocument {
        &self.template
    }

    /// Read, resolve fragments and decode one artefact.
    pub fn load_artefact(&self, path: &Path) -> Result<(ArtefactContent, ValidationResult), PipelineError> {
        let text = fs::read_to_string(path)?;
        let mut value: Value = serde_json::from_str(&text).map_err(|e| PipelineError::parse(path, e))?;

        let mut validation = ValidationResult::new();
        for key in self.fragments.resolve(&mut value) {
            validation.push(ValidationViolation::warning(
                "missing_fragment",
                format!("Missing content block: {}", key),
            ));
        }
        let content = ArtefactContent::from_value(path, value)?;
        Ok((content, validation))
    }

    pub fn generate(&self, path: &Path) -> Result<GeneratedDocument, PipelineError> {
        let (content, validation) = self.load_artefact(path)?;
        self.generate_content(path, &content, validation)
    }

    /// Run the fixed stages for already-loaded content.
    pub fn generate_content(
        &self,
        source: &Path,
        content: &ArtefactContent,
        mut validation: ValidationResult,
    ) -> Result<GeneratedDocument, PipelineError> {
        let document_type = content.metadata.document_type;
        let profile = self.profiles.get(document_type)?;
        let renderer = self.renderers.get(document_type)?;

        validation.extend(self.validator.validate(content, profile));

        let mut doc = self.template.clone();
        fill_front_matter(&mut doc, content, &mut validation);
        render_body(&mut doc, content, profile, renderer, &mut validation);
        for (i, spec) in content.dynamic_tables.iter().enumerate() {
            insert_dynamic_table(&mut doc, i, spec, &mut validation);
        }
        apply_properties(&mut doc, &content.metadata);

        let file_stem = content.output_stem();
        let hashes = DocumentHashes::compute(&self.template, content, &document_bytes(&doc)?, ENGINE_VERSION)?;
        let manifest = GenerationManifest {
            doc_id: content.metadata.doc_id.clone(),
            version: content.metadata.version.clone(),
            document_type,
            source_file: source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            output_file: format!("{}.json", file_stem),
            template_name: self.template.name.clone(),
            template_version: self.template.template_version.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            hashes,
            validation: validation.clone(),
        };

        Ok(GeneratedDocument {
            file_stem,
            document: doc,
            validation,
            manifest,
        })
    }

    /// Write document, Markdown preview and manifest. Returns the document path.
    pub fn write(&self, generated: &GeneratedDocument, output_dir: &Path) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(output_dir)?;
        let output = output_dir.join(generated.file_name());
        fs::write(&output, generated.to_bytes()?)?;
        fs::write(
            output_dir.join(format!("{}.md", generated.file_stem)),
            to_markdown(&generated.document),
        )?;
        let mut manifest = serde_json::to_vec_pretty(&generated.manifest)?;
        manifest.push(b'\n');
        fs::write(output_dir.join(format!("{}.manifest.json", generated.file_stem)), manifest)?;
        Ok(output)
    }

    /// Artefact files in `input_dir`, sorted for a stable run order.
    pub fn discover(input_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        if !input_dir.exists() {
            warn!("Input directory does not exist: {}", input_dir.display());
            return Ok(vec![]);
        }
        let mut paths = vec![];
        for entry in fs::read_dir(input_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map_or(false, |e| e == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Process every artefact in `input_dir`, one at a time. Per-artefact
    /// failures are recorded and the run continues; run-fatal errors return.
    /// Registers are updated only after the document is written.
    pub fn run(&self, input_dir: &Path, output_dir: &Path) -> Result<RunSummary, PipelineError> {
        let mut summary = RunSummary::default();
        for source in Self::discover(input_dir)? {
            let result = self.load_artefact(&source).and_then(|(content, validation)| {
                let generated = self.generate_content(&source, &content, validation)?;
                let output = self.write(&generated, output_dir)?;
                if let Some(registers) = &self.registers {
                    registers.record(&content, &generated.file_name())?;
                }
                Ok((output, generated))
            });
            match result {
                Ok((output, generated)) => {
                    info!("Generated {}", output.display());
                    summary.outcomes.push(ArtefactOutcome::Generated {
                        source,
                        output,
                        validation: generated.validation,
                    });
                }
                Err(e) if e.is_fatal_for_run() => return Err(e),
                Err(e) => {
                    error!("{}: {}", source.display(), e);
                    summary.outcomes.push(ArtefactOutcome::Failed {
                        source,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }
}

fn check_engine_version(template: &TemplateDocument) -> Result<(), PipelineError> {
    let engine_ver = semver::Version::parse(ENGINE_VERSION)
        .map_err(|_| PipelineError::Template("Invalid engine version".into()))?;
    let min_ver = semver::Version::parse(&template.engine_min_version).map_err(|_| {
        PipelineError::Template(format!(
            "Invalid engineMinVersion {:?} in template {}",
            template.engine_min_version, template.name
        ))
    })?;

    if engine_ver < min_ver {
        return Err(PipelineError::EngineVersionMismatch(
            template.name.clone(),
            template.engine_min_version.clone(),
            ENGINE_VERSION.to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::StyleSet;

    fn template(min: &str) -> TemplateDocument {
        TemplateDocument {
            name: "Base".into(),
            template_version: "1.0.0".into(),
            engine_min_version: min.into(),
            styles: StyleSet::default(),
            properties: Default::default(),
            blocks: vec![],
        }
    }

    #[test]
    fn test_engine_version_gate() {
        assert!(check_engine_version(&template("1.0.0")).is_ok());
        let err = check_engine_version(&template("99.0.0")).unwrap_err();
        assert!(matches!(err, PipelineError::EngineVersionMismatch(..)));
        assert!(err.is_fatal_for_run());
        assert!(check_engine_version(&template("one")).is_err());
    }

    #[test]
    fn test_missing_fragment_reported_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("POL-7.json");
        fs::write(
            &path,
            r#"{
                "metadata": {"doc_id": "POL-7", "title": "T", "version": "1", "document_type": "Policy"},
                "sections": {"Purpose": {"use_block": "known"}, "Scope": {"use_block": "absent"}}
            }"#,
        )
        .unwrap();

        let mut fragments = Fragments::new();
        fragments.insert("known", "Shared purpose.");
        let generator = Generator::new(
            template("1.0.0"),
            ProfileSet::from_yaml("Policy:\n  required_sections: [Purpose, Scope]\n").unwrap(),
            RendererRegistry::standard(),
            fragments,
        )
        .unwrap();

        let (content, validation) = generator.load_artefact(&path).unwrap();
        let missing: Vec<_> = validation.by_rule("missing_fragment").collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].message, "Missing content block: absent");
        assert!(validation.valid);

        let text = |name: &str| match content.section(name) {
            Some(crate::content::SectionBody::Text(t)) => t.clone(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(text("Purpose"), "Shared purpose.");
        assert_eq!(text("Scope"), "[Missing content block: absent]");

        let generated = generator.generate(&path).unwrap();
        assert_eq!(generated.validation.by_rule("missing_fragment").count(), 1);
    }

    #[test]
    fn test_discover_sorted_json_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let found = Generator::discover(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.json", "b.json"]);
    }
}
