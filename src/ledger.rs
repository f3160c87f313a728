//! Metadata ledger.
//!
//! The ledger collects one [`RecordDescriptor`] per stored record plus the
//! paths of unlabeled and useless items, in the order they were seen. It is
//! flushed once at the end of a run into three files:
//!
//! - `metadata.csv`: one descriptor per line
//!   `<label_count> <labels…> <shape_len> <shape…> <format> <record_path>`
//! - `unlabeled.csv` / `useless.csv`: one raw path per line
//!
//! Existing files are never truncated or appended to. If `metadata.csv` is
//! taken the ledger tries `metadata_0.csv`, `metadata_1.csv`, … and keeps the
//! first name it manages to create. Each attempt is a single create-if-absent
//! call.

use crate::codec::ValueFormat;
use crate::error::{Result, ResultExt as _};
use crate::labeler::LabelPath;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write as _};
use std::path::{Path, PathBuf};

pub const METADATA_FILENAME: &str = "metadata.csv";
pub const UNLABELED_FILENAME: &str = "unlabeled.csv";
pub const USELESS_FILENAME: &str = "useless.csv";

/// Metadata for one stored record. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    labels: LabelPath,
    shape: Vec<usize>,
    format: ValueFormat,
    record_path: String,
}

impl RecordDescriptor {
    pub fn new(
        labels: LabelPath,
        shape: Vec<usize>,
        format: ValueFormat,
        record_path: impl Into<String>,
    ) -> Self {
        Self {
            labels,
            shape,
            format,
            record_path: record_path.into(),
        }
    }

    pub fn labels(&self) -> &LabelPath {
        &self.labels
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn format(&self) -> ValueFormat {
        self.format
    }

    pub fn record_path(&self) -> &str {
        &self.record_path
    }

    /// Encode as one metadata line, without the trailing newline.
    pub fn to_line(&self) -> String {
        let labels = self.labels.persisted();
        let mut tokens = Vec::with_capacity(labels.len() + self.shape.len() + 4);
        tokens.push(labels.len().to_string());
        tokens.extend(labels);
        tokens.push(self.shape.len().to_string());
        tokens.extend(self.shape.iter().map(ToString::to_string));
        tokens.push(self.format.to_string());
        tokens.push(self.record_path.clone());
        tokens.join(" ")
    }
}

/// Where a flush put each file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushedLedger {
    pub metadata: PathBuf,
    pub unlabeled: PathBuf,
    pub useless: PathBuf,
}

#[derive(Debug, Default)]
pub struct MetadataLedger {
    descriptors: Vec<RecordDescriptor>,
    unlabeled: Vec<String>,
    useless: Vec<String>,
}

impl MetadataLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, descriptor: RecordDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn append_unlabeled(&mut self, path: impl Into<String>) {
        self.unlabeled.push(path.into());
    }

    pub fn append_useless(&mut self, path: impl Into<String>) {
        self.useless.push(path.into());
    }

    pub fn descriptors(&self) -> &[RecordDescriptor] {
        &self.descriptors
    }

    pub fn unlabeled(&self) -> &[String] {
        &self.unlabeled
    }

    pub fn useless(&self) -> &[String] {
        &self.useless
    }

    /// Write the metadata file and both side lists into `dir`.
    ///
    /// # Errors
    ///
    /// Returns error on the first file that cannot be created or written.
    /// Files created before the failure are left in place.
    pub fn flush(self, dir: &Path) -> Result<FlushedLedger> {
        let metadata = write_lines(
            dir,
            METADATA_FILENAME,
            self.descriptors.iter().map(RecordDescriptor::to_line),
        )?;
        let unlabeled = write_lines(dir, UNLABELED_FILENAME, self.unlabeled.into_iter())?;
        let useless = write_lines(dir, USELESS_FILENAME, self.useless.into_iter())?;

        tracing::info!(
            records = self.descriptors.len(),
            metadata = %metadata.display(),
            "Exported metadata"
        );

        Ok(FlushedLedger {
            metadata,
            unlabeled,
            useless,
        })
    }
}

/// Candidate file name for an attempt: `None` is the plain name, `Some(n)`
/// inserts `_n` before the extension.
pub fn candidate_name(file_name: &str, attempt: Option<usize>) -> String {
    let Some(n) = attempt else {
        return file_name.to_owned();
    };
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{n}.{ext}"),
        _ => format!("{file_name}_{n}"),
    }
}

/// Create a fresh file in `dir`, probing `name`, `name_0`, `name_1`, …
///
/// # Errors
///
/// Returns error for any creation failure other than "already exists".
pub fn create_unique(dir: &Path, file_name: &str) -> Result<(PathBuf, File)> {
    let mut attempt = None;
    loop {
        let path = dir.join(candidate_name(file_name, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path.display(), "File exists, probing next name");
                attempt = Some(attempt.map_or(0, |n| n + 1));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()));
            }
        }
    }
}

fn write_lines(
    dir: &Path,
    file_name: &str,
    lines: impl Iterator<Item = String>,
) -> Result<PathBuf> {
    let (path, file) = create_unique(dir, file_name)?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
