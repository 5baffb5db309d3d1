//! ISMS Docgen CLI
//!
//! Generates one document per artefact found in the input directory.
//! Prints `[SEVERITY] message` lines for every diagnostic.
//! Returns 1 on a fatal error, 2 when any artefact failed or has errors.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use isms_docgen::config::{
    DEFAULT_CONTENT_BLOCKS, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_PROFILES, DEFAULT_REGISTERS_DIR,
    DEFAULT_TEMPLATE,
};
use isms_docgen::{ArtefactOutcome, Generator, GeneratorPaths};

#[derive(Parser)]
#[command(name = "isms-docgen")]
#[command(about = "ISMS Docgen - generate compliance documents from JSON artefacts")]
#[command(version)]
struct Cli {
    /// Directory of artefact JSON files
    #[arg(long, default_value = DEFAULT_INPUT_DIR)]
    input_dir: PathBuf,

    /// Document profile configuration (YAML)
    #[arg(long, default_value = DEFAULT_PROFILES)]
    profiles: PathBuf,

    /// Shared visual template
    #[arg(long, default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Directory of reusable content blocks
    #[arg(long, default_value = DEFAULT_CONTENT_BLOCKS)]
    content_blocks: PathBuf,

    /// Output directory
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Directory of the document control and reference registers (CSV)
    #[arg(long, default_value = DEFAULT_REGISTERS_DIR)]
    registers_dir: PathBuf,
}

impl From<Cli> for GeneratorPaths {
    fn from(cli: Cli) -> Self {
        Self {
            input_dir: cli.input_dir,
            profiles: cli.profiles,
            template: cli.template,
            content_blocks: cli.content_blocks,
            output_dir: cli.output_dir,
            registers_dir: cli.registers_dir,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let paths = GeneratorPaths::from(Cli::parse());

    let generator = match Generator::from_paths(&paths) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("[FATAL] {}", e);
            return ExitCode::FAILURE;
        }
    };

    let summary = match generator.run(&paths.input_dir, &paths.output_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[FATAL] {}", e);
            return ExitCode::FAILURE;
        }
    };

    for outcome in &summary.outcomes {
        match outcome {
            ArtefactOutcome::Generated { source, output, validation } => {
                println!("{}", source.display());
                for line in validation.lines() {
                    println!("  {}", line);
                }
                println!("Generated ISMS document: {}", output.display());
            }
            ArtefactOutcome::Failed { source, error } => {
                println!("{}", source.display());
                println!("  [ERROR] {}", error);
            }
        }
    }
    println!(
        "{} generated, {} failed",
        summary.generated(),
        summary.failed()
    );

    if summary.has_problems() {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_uses_fixed_layout() {
        let paths = GeneratorPaths::from(Cli::parse_from(["isms-docgen"]));
        assert_eq!(paths, GeneratorPaths::rooted_at(std::path::Path::new("")));
    }

    #[test]
    fn test_path_override() {
        let paths = GeneratorPaths::from(Cli::parse_from(["isms-docgen", "--output-dir", "/tmp/docs"]));
        assert_eq!(paths.output_dir, PathBuf::from("/tmp/docs"));
        assert_eq!(paths.input_dir, PathBuf::from(DEFAULT_INPUT_DIR));
    }
}
