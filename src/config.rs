//! Generator layout - where inputs are read and outputs written

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT_DIR: &str = "data/sample";
pub const DEFAULT_PROFILES: &str = "data/config/document_profiles.yaml";
pub const DEFAULT_TEMPLATE: &str = "data/templates/ISMS_Master_Base.json";
pub const DEFAULT_CONTENT_BLOCKS: &str = "data/content_blocks";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs/isms_docs";
pub const DEFAULT_REGISTERS_DIR: &str = "outputs/registers";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratorPaths {
    pub input_dir: PathBuf,
    pub profiles: PathBuf,
    pub template: PathBuf,
    pub content_blocks: PathBuf,
    pub output_dir: PathBuf,
    pub registers_dir: PathBuf,
}

impl GeneratorPaths {
    /// Fixed project layout rooted at `base`.
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            input_dir: base.join(DEFAULT_INPUT_DIR),
            profiles: base.join(DEFAULT_PROFILES),
            template: base.join(DEFAULT_TEMPLATE),
            content_blocks: base.join(DEFAULT_CONTENT_BLOCKS),
            output_dir: base.join(DEFAULT_OUTPUT_DIR),
            registers_dir: base.join(DEFAULT_REGISTERS_DIR),
        }
    }
}

impl Default for GeneratorPaths {
    fn default() -> Self {
        Self::rooted_at(Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rooted_layout() {
        let paths = GeneratorPaths::rooted_at(Path::new("/srv/isms"));
        assert_eq!(paths.input_dir, Path::new("/srv/isms/data/sample"));
        assert_eq!(paths.output_dir, Path::new("/srv/isms/outputs/isms_docs"));
        assert_eq!(paths.registers_dir, Path::new("/srv/isms/outputs/registers"));
    }
}
