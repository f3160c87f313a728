//! Resolved run configuration.
//!
//! The command line (or a JSON file) is turned into a single [`RunConfig`]
//! value which is threaded through every pipeline stage. Nothing reads
//! global state.

use crate::error::{PrepError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Console verbosity. Quiet wins when both flags are set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Verbosity {
    pub verbose: bool,
    pub quiet: bool,
}

impl Verbosity {
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    /// Default `tracing` directive for this verbosity.
    pub fn filter_directive(&self) -> &'static str {
        if self.is_quiet() {
            "off"
        } else if self.is_verbose() {
            "debug"
        } else {
            "info"
        }
    }
}

/// Image-specific options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// Reduce colour images to a single luminance channel
    pub greyscale: bool,
    /// Store values as floats in `[0, 1]` instead of bytes in `[0, 255]`
    pub float: bool,
    /// Resize every image to `m x m` before processing
    pub resize: Option<u32>,
}

/// Text-specific options. A character bound of 0 means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    pub keep_whitespace: bool,
    pub keep_punctuation: bool,
    pub strip_digits: bool,
    pub keep_case: bool,
    pub min_chars: usize,
    pub max_chars: usize,
}

/// Which kind of corpus is being flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Mode {
    Image(ImageOptions),
    Text(TextOptions),
}

impl Default for Mode {
    fn default() -> Self {
        Self::Image(ImageOptions::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory receiving the numbered record files
    pub target_dir: PathBuf,
    /// Labelled source trees, walked in order
    pub sources: Vec<PathBuf>,
    /// Where `metadata.csv` and the side lists go; defaults to `target_dir`
    pub metadata_dir: Option<PathBuf>,
    /// Drop the source root itself from each label path
    pub strip_root: bool,
    /// Gzip every record file
    pub compress: bool,
    /// Accept a target directory that already exists
    pub allow_existing_target: bool,
    /// Write absolute paths into the metadata and side lists
    pub absolute_paths: bool,
    pub verbosity: Verbosity,
    pub mode: Mode,
}

impl RunConfig {
    pub fn new(target_dir: impl Into<PathBuf>, sources: Vec<PathBuf>, mode: Mode) -> Self {
        Self {
            target_dir: target_dir.into(),
            sources,
            mode,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid configuration.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Directory that receives the ledger files.
    pub fn metadata_dir(&self) -> &Path {
        self.metadata_dir.as_deref().unwrap_or(&self.target_dir)
    }

    /// Checks that do not need the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Config`] when no source is given or the text
    /// character bounds conflict.
    pub fn validate(&self) -> Result<()> {
        if self.target_dir.as_os_str().is_empty() {
            return Err(PrepError::Config("a target directory is required".to_owned()));
        }
        if self.sources.is_empty() {
            return Err(PrepError::Config(
                "at least one source directory is required".to_owned(),
            ));
        }
        if let Mode::Text(opts) = &self.mode
            && opts.max_chars != 0
            && opts.max_chars < opts.min_chars
        {
            return Err(PrepError::Config(format!(
                "maximum character count {} is less than the minimum {}",
                opts.max_chars, opts.min_chars
            )));
        }
        if let Mode::Image(ImageOptions {
            resize: Some(0), ..
        }) = &self.mode
        {
            return Err(PrepError::Config("resize must be at least 1".to_owned()));
        }
        Ok(())
    }
}
