//! Record files.
//!
//! Each useful item becomes `<index>.csv` (or `<index>.csv.gz`) in the
//! target directory. Numeric records hold one value per line; text records
//! hold the formatted document with no framing.
//!
//! Float values are written with zero decimal places, so normalized floats
//! persist as `0` or `1`. Consumers that need fractional precision cannot
//! rely on float records.

use crate::codec::FlatValues;
use crate::error::{Result, ResultExt as _};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

pub const RECORD_EXT: &str = "csv";
pub const COMPRESSED_EXT: &str = "gz";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Gzip each record and append `.gz`
    pub compress: bool,
    /// Return absolute record paths
    pub absolute_path: bool,
}

/// Writes numbered record files into one target directory.
#[derive(Debug, Clone)]
pub struct RecordStore {
    target_dir: PathBuf,
    opts: StoreOptions,
}

impl RecordStore {
    pub fn new(target_dir: impl Into<PathBuf>, opts: StoreOptions) -> Self {
        Self {
            target_dir: target_dir.into(),
            opts,
        }
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// File name for the record with this index.
    pub fn file_name(&self, index: usize) -> String {
        if self.opts.compress {
            format!("{index}.{RECORD_EXT}.{COMPRESSED_EXT}")
        } else {
            format!("{index}.{RECORD_EXT}")
        }
    }

    /// Write one record and return its path.
    ///
    /// # Errors
    ///
    /// Returns error if the target directory is not writable.
    pub fn store(&self, values: &FlatValues, index: usize) -> Result<PathBuf> {
        let mut path = self.target_dir.join(self.file_name(index));
        if self.opts.absolute_path {
            path = std::path::absolute(&path)
                .with_context(|| format!("Failed to resolve {}", path.display()))?;
        }

        let body = encode_values(values);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create record file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        if self.opts.compress {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            encoder.write_all(body.as_bytes())?;
            encoder.finish()?.flush()?;
        } else {
            writer.write_all(body.as_bytes())?;
            writer.flush()?;
        }

        tracing::debug!(index, path = %path.display(), "Stored record");
        Ok(path)
    }
}

/// Serialize a record body.
pub fn encode_values(values: &FlatValues) -> String {
    match values {
        FlatValues::Int(bytes) => bytes.iter().map(|v| format!("{v}\n")).collect(),
        FlatValues::Float(floats) => floats.iter().map(|v| format!("{v:.0}\n")).collect(),
        FlatValues::Text(text) => text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read as _;
    use tempfile::TempDir;

    #[test]
    fn test_int_record_one_value_per_line() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path(), StoreOptions::default());
        let path = store.store(&FlatValues::Int(vec![0, 128, 255]), 0).unwrap();

        assert_eq!(path, dir.path().join("0.csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "0\n128\n255\n");
    }

    #[test]
    fn test_float_record_rounds_to_whole_numbers() {
        assert_eq!(
            encode_values(&FlatValues::Float(vec![0.0, 0.4, 0.6, 1.0])),
            "0\n0\n1\n1\n"
        );
    }

    #[test]
    fn test_empty_record_body() {
        assert_eq!(encode_values(&FlatValues::Int(Vec::new())), "");
        assert_eq!(encode_values(&FlatValues::Float(Vec::new())), "");
    }

    #[test]
    fn test_text_record_is_raw() {
        assert_eq!(
            encode_values(&FlatValues::Text("hello world".to_owned())),
            "hello world"
        );
    }

    #[test]
    fn test_compressed_record() {
        let dir = TempDir::new().unwrap();
        let opts = StoreOptions {
            compress: true,
            ..Default::default()
        };
        let store = RecordStore::new(dir.path(), opts);
        let path = store.store(&FlatValues::Int(vec![1, 2]), 7).unwrap();
        assert!(path.ends_with("7.csv.gz"));

        let mut decoded = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "1\n2\n");
    }

    #[test]
    fn test_absolute_path() {
        let dir = TempDir::new().unwrap();
        let opts = StoreOptions {
            absolute_path: true,
            ..Default::default()
        };
        let path = RecordStore::new(dir.path(), opts)
            .store(&FlatValues::Text("x".to_owned()), 3)
            .unwrap();
        assert!(path.is_absolute());
    }

    #[test]
    fn test_missing_target_dir_fails() {
        let store = RecordStore::new("/nonexistent/target", StoreOptions::default());
        assert!(store.store(&FlatValues::Int(vec![1]), 0).is_err());
    }
}
