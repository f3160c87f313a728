//! Label derivation from directory paths.
//!
//! A file's labels are the directory names between its source root and the
//! file itself, outermost first. Labels keep their original text in memory;
//! whitespace is only collapsed to underscores when a label is persisted
//! (see [`persisted_label`]).

use std::path::{Path, is_separator};

/// Ordered label sequence for one item. Never empty.
///
/// A first element equal to `""` marks the item as unlabeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPath(Vec<String>);

impl LabelPath {
    pub fn is_unlabeled(&self) -> bool {
        self.0.first().is_none_or(String::is_empty)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Labels as they are written to the metadata file.
    pub fn persisted(&self) -> Vec<String> {
        self.0.iter().map(|l| persisted_label(l)).collect()
    }
}

impl From<Vec<String>> for LabelPath {
    fn from(mut labels: Vec<String>) -> Self {
        if labels.is_empty() {
            labels.push(String::new());
        }
        Self(labels)
    }
}

/// Derive labels for a file living in `dir`.
///
/// When `root` is given and is a prefix of `dir`, that prefix is removed
/// first. The remaining path is trimmed of separators and split on them.
/// Repeated segments are kept as they are.
pub fn labels_from_path(dir: &Path, root: Option<&Path>) -> LabelPath {
    let relative = root
        .and_then(|r| dir.strip_prefix(r).ok())
        .unwrap_or(dir);

    let text = relative.to_string_lossy();
    let trimmed = text.trim_matches(is_separator);

    let labels = trimmed
        .split(is_separator)
        .map(str::to_owned)
        .collect::<Vec<_>>();

    LabelPath::from(labels)
}

/// Collapse every whitespace run in a label to a single underscore.
pub fn persisted_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join("_")
}
