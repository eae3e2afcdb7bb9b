/// Pipeline configuration
use crate::error::ImportError;
use crate::scanner::SUPPORTED_EXTENSIONS;
use crate::Result;
use medley_enrichment::EnrichmentConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `MEDLEY_IMPORT__LIBRARY_ROOT`
pub const ENV_PREFIX: &str = "MEDLEY";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImportConfig {
    /// Root of the managed library tree
    #[serde(default)]
    pub library_root: PathBuf,

    /// Copy files into the library instead of moving them
    #[serde(default = "default_copy_files")]
    pub copy_files: bool,

    /// Audio file extensions to pick up, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub follow_links: bool,

    /// Hash-compare copies against their source
    #[serde(default = "default_verify_copies")]
    pub verify_copies: bool,

    /// Queue directory imports that need enrichment
    #[serde(default)]
    pub auto_enrich: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            library_root: PathBuf::new(),
            copy_files: default_copy_files(),
            extensions: default_extensions(),
            follow_links: false,
            verify_copies: default_verify_copies(),
            auto_enrich: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an optional TOML file, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        // Load from config file if it exists
        if let Some(path) = path.filter(|p| p.exists()) {
            settings = settings.add_source(config::File::from(path.to_path_buf()));
        }

        // Override with environment variables (prefixed with MEDLEY_)
        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("import.extensions"),
        );

        let config: PipelineConfig = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.import.library_root.as_os_str().is_empty() {
            return Err(ImportError::InvalidPath(
                "import.library_root must be set".to_string(),
            ));
        }

        if self.import.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ImportError::InvalidPath(
                "import.extensions must name at least one extension".to_string(),
            ));
        }

        self.enrichment.validate()?;
        Ok(())
    }
}

fn default_copy_files() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_verify_copies() -> bool {
    true
}
