//! Reading a flattened dataset back.
//!
//! Parses `metadata.csv` lines into [`MetadataEntry`] values and loads the
//! record each one points at, reformed to its recorded shape. Gzipped
//! records (`.gz`) are decompressed transparently.
//!
//! A metadata line does not say whether its record holds text, so callers
//! pass a [`RecordKind`] when loading.

use crate::codec::{ValueFormat, reform};
use crate::config::Mode;
use crate::error::{PrepError, Result, ResultExt as _};
use crate::store::COMPRESSED_EXT;
use flate2::read::GzDecoder;
use ndarray::ArrayD;
use std::fs::File;
use std::io::{BufRead as _, BufReader, Read as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One parsed metadata line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub labels: Vec<String>,
    pub shape: Vec<usize>,
    pub format: ValueFormat,
    pub record_path: PathBuf,
}

impl MetadataEntry {
    /// Parse `<n> <labels…> <m> <shape…> <format> <record_path>`.
    ///
    /// The record path is the rest of the line and may contain spaces.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Metadata`] when a field is missing or not a number.
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let label_count: usize = next_token(&mut rest, "label count")?.parse()?;
        let labels = (0..label_count)
            .map(|_| next_token(&mut rest, "label").map(str::to_owned))
            .collect::<Result<Vec<_>>>()?;

        let shape_len: usize = next_token(&mut rest, "shape length")?.parse()?;
        let shape = (0..shape_len)
            .map(|_| {
                next_token(&mut rest, "shape value")
                    .and_then(|t| t.parse::<usize>().map_err(PrepError::from))
            })
            .collect::<Result<Vec<_>>>()?;

        let format = next_token(&mut rest, "value format")?.parse::<ValueFormat>()?;

        if rest.is_empty() {
            return Err(PrepError::Metadata(format!("missing record path in '{line}'")));
        }

        Ok(Self {
            labels,
            shape,
            format,
            record_path: PathBuf::from(rest),
        })
    }
}

impl FromStr for MetadataEntry {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_line(s)
    }
}

fn next_token<'a>(rest: &mut &'a str, what: &str) -> Result<&'a str> {
    let line: &'a str = rest;
    let (token, tail) = line.split_once(' ').unwrap_or((line, ""));
    if token.is_empty() {
        return Err(PrepError::Metadata(format!("missing {what}")));
    }
    *rest = tail;
    Ok(token)
}

/// Read every non-empty line of a metadata file.
///
/// # Errors
///
/// Returns error if the file cannot be read or a line is malformed.
pub fn read_metadata(path: &Path) -> Result<Vec<MetadataEntry>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open metadata file: {}", path.display()))?;

    let mut entries = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = MetadataEntry::parse_line(&line).map_err(|e| {
            PrepError::Metadata(format!("{}:{}: {e}", path.display(), number + 1))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Read a side list (`unlabeled.csv`, `useless.csv`).
///
/// # Errors
///
/// Returns error if the file cannot be read.
pub fn read_path_list(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read path list: {}", path.display()))?;
    Ok(text.lines().map(str::to_owned).collect())
}

/// What a dataset's records hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordKind {
    /// Flattened pixel values, parsed according to the entry's format.
    #[default]
    Numeric,
    /// A formatted document, returned verbatim.
    Text,
}

impl From<&Mode> for RecordKind {
    fn from(mode: &Mode) -> Self {
        match mode {
            Mode::Image(_) => Self::Numeric,
            Mode::Text(_) => Self::Text,
        }
    }
}

/// A record restored to its original shape.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedRecord {
    Int(ArrayD<u8>),
    Float(ArrayD<f64>),
    Text(String),
}

/// Read a record body, decompressing `.gz` files.
///
/// # Errors
///
/// Returns error if the file cannot be opened or decoded as UTF-8.
pub fn read_record_body(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open record: {}", path.display()))?;

    let mut body = String::new();
    if path.extension().is_some_and(|ext| ext == COMPRESSED_EXT) {
        GzDecoder::new(file).read_to_string(&mut body)?;
    } else {
        BufReader::new(file).read_to_string(&mut body)?;
    }
    Ok(body)
}

/// Load and reform the record an entry points at.
///
/// # Errors
///
/// Returns error if the record is unreadable, holds a malformed value, or
/// does not match the recorded shape.
pub fn load_record(entry: &MetadataEntry, kind: RecordKind) -> Result<LoadedRecord> {
    let body = read_record_body(&entry.record_path)?;
    if kind == RecordKind::Text {
        return Ok(LoadedRecord::Text(body));
    }
    match entry.format {
        ValueFormat::Int => {
            let values = body
                .split_whitespace()
                .map(|t| t.parse::<u8>().map_err(PrepError::from))
                .collect::<Result<Vec<_>>>()?;
            Ok(LoadedRecord::Int(reform(&entry.shape, values)?))
        }
        ValueFormat::Float => {
            let values = body
                .split_whitespace()
                .map(|t| t.parse::<f64>().map_err(PrepError::from))
                .collect::<Result<Vec<_>>>()?;
            Ok(LoadedRecord::Float(reform(&entry.shape, values)?))
        }
    }
}
