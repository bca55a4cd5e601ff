//! Run configuration.
//!
//! Settings come from a TOML file (`--config`, or `qti-export.toml` in the
//! working directory when present) and are overridden by command-line flags.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use qti_output::RunContext;
use qti_output::context::{DEFAULT_LANGUAGE, DEFAULT_TITLE_LANGUAGE};

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILENAME: &str = "qti-export.toml";
pub const DEFAULT_ARCHIVE_NAME: &str = "qti-export.zip";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Address of the source site; scopes every generated identifier.
    pub site_url: Option<String>,
    /// Vendor default language of item bodies.
    pub language: String,
    /// Language tag of manifest titles.
    pub title_language: String,
    pub archive_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            site_url: None,
            language: DEFAULT_LANGUAGE.to_string(),
            title_language: DEFAULT_TITLE_LANGUAGE.to_string(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub site_url: Option<String>,
    pub language: Option<String>,
    pub archive_name: Option<String>,
}

impl ExportConfig {
    /// Parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parse config file {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load `explicit`, else `dir/qti-export.toml` if it exists, else defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate: PathBuf = dir.join(CONFIG_FILENAME);
        match fs::metadata(&candidate) {
            Ok(_) => Self::load(&candidate),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %candidate.display(), "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(error) => {
                Err(error).with_context(|| format!("inspect {}", candidate.display()))
            }
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(site_url) = overrides.site_url {
            self.site_url = Some(site_url);
        }
        if let Some(language) = overrides.language {
            self.language = language;
        }
        if let Some(archive_name) = overrides.archive_name {
            self.archive_name = archive_name;
        }
        self
    }

    /// Identifier scope and languages for an export run.
    ///
    /// Fails when no site address is configured.
    pub fn run_context(&self) -> Result<RunContext> {
        let Some(site_url) = self.site_url.as_deref().filter(|url| !url.trim().is_empty())
        else {
            bail!("no site URL configured; pass --site-url or set `site_url` in {CONFIG_FILENAME}");
        };
        Ok(RunContext::new(site_url)
            .with_language(self.language.as_str())
            .with_title_language(self.title_language.as_str()))
    }
}
