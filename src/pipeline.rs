//! Traversal driver.
//!
//! Walks every source tree in order and routes each file:
//!
//! ```text
//! file
//!   ├─> labels_from_path ── unlabeled ──────────────> ledger.unlabeled
//!   ├─> Decoder::decode ─── error ──────────────────> report.failed
//!   ├─> normalize ───────── useless ────────────────> ledger.useless
//!   ├─> flatten ─> RecordStore::store(index) ───────> ledger.append
//!   └─> (next file)
//! after the last source: ledger.flush(metadata_dir)
//! ```
//!
//! Everything runs on one thread in visit order. The record index only
//! advances after a record has been written, so stored records are numbered
//! `0, 1, 2, …` without gaps. Metadata is written once, after traversal;
//! a run that dies midway leaves record files but no `metadata.csv`.

use crate::codec::FlatRecord;
use crate::config::{Mode, RunConfig};
use crate::error::{PrepError, Result};
use crate::labeler::{LabelPath, labels_from_path};
use crate::ledger::{FlushedLedger, MetadataLedger, RecordDescriptor};
use crate::normalize::{Verdict, normalize};
use crate::sample::Decoder;
use crate::sample::image::ImageDecoder;
use crate::sample::text::TextDecoder;
use crate::store::{RecordStore, StoreOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// An item that was dropped because it could not be decoded, normalized or
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub path: String,
    pub reason: String,
}

/// Report generated after a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Records written (and descriptors flushed)
    pub stored: usize,

    /// Items with no label-bearing directory
    pub unlabeled: usize,

    /// Items rejected by the usefulness test
    pub useless: usize,

    /// Items dropped on a per-item error
    pub failed: Vec<FailedItem>,

    /// Files written by the ledger flush
    pub ledger: FlushedLedger,

    pub duration: Duration,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "Finished operation: {} stored, {} unlabeled, {} useless, {} failed in {:.2}s (metadata: {})",
            self.stored,
            self.unlabeled,
            self.useless,
            self.failed.len(),
            self.duration.as_secs_f64(),
            self.ledger.metadata.display()
        )
    }
}

/// Decoder matching the run's mode.
pub fn decoder_for(mode: &Mode) -> Box<dyn Decoder> {
    match mode {
        Mode::Image(opts) => Box::new(ImageDecoder::new(opts.resize)),
        Mode::Text(_) => Box::new(TextDecoder),
    }
}

/// Validate the configuration and prepare every directory.
///
/// # Errors
///
/// Returns a configuration or path error; nothing has been processed when
/// this fails.
pub fn prepare(config: &RunConfig) -> Result<()> {
    config.validate()?;
    prepare_dir(&config.target_dir, "target", !config.allow_existing_target)?;

    for source in &config.sources {
        if !source.is_dir() {
            return Err(PrepError::InvalidPath(format!(
                "source directory '{}' does not exist",
                source.display()
            )));
        }
    }

    if let Some(dir) = &config.metadata_dir {
        prepare_dir(dir, "metadata", false)?;
    }
    Ok(())
}

fn prepare_dir(dir: &Path, role: &str, must_be_new: bool) -> Result<()> {
    if dir.is_dir() {
        tracing::info!("The {role} directory '{}' already exists.", dir.display());
        if must_be_new {
            return Err(PrepError::Config(format!(
                "{role} directory '{}' already exists",
                dir.display()
            )));
        }
        return Ok(());
    }

    tracing::info!(
        "The {role} directory '{}' does not exist. Creating directory...",
        dir.display()
    );
    std::fs::create_dir_all(dir).map_err(|e| {
        PrepError::InvalidPath(format!(
            "failed to create {role} directory '{}': {e}",
            dir.display()
        ))
    })?;
    tracing::debug!("Created {role} directory '{}'", dir.display());
    Ok(())
}

/// Run the whole pipeline with the decoder for the configured mode.
///
/// # Errors
///
/// Returns error if preparation fails or the ledger cannot be flushed.
pub fn run(config: &RunConfig) -> Result<RunReport> {
    let decoder = decoder_for(&config.mode);
    run_with(config, decoder.as_ref())
}

/// Run the whole pipeline with an explicit decoder.
///
/// # Errors
///
/// Returns error if preparation fails or the ledger cannot be flushed.
pub fn run_with(config: &RunConfig, decoder: &dyn Decoder) -> Result<RunReport> {
    let start = Instant::now();
    prepare(config)?;

    tracing::info!("Starting operation...");

    let mut traversal = Traversal::new(config, decoder);
    for source in &config.sources {
        traversal.walk(source);
    }

    tracing::debug!("Finished processing items. Now exporting metadata...");
    traversal.finish(config.metadata_dir(), start)
}

/// Single-owner run state: the record index and the ledger.
struct Traversal<'a> {
    config: &'a RunConfig,
    decoder: &'a dyn Decoder,
    store: RecordStore,
    ledger: MetadataLedger,
    next_index: usize,
    failed: Vec<FailedItem>,
}

impl<'a> Traversal<'a> {
    fn new(config: &'a RunConfig, decoder: &'a dyn Decoder) -> Self {
        let store = RecordStore::new(
            &config.target_dir,
            StoreOptions {
                compress: config.compress,
                absolute_path: config.absolute_paths,
            },
        );
        Self {
            config,
            decoder,
            store,
            ledger: MetadataLedger::new(),
            next_index: 0,
            failed: Vec::new(),
        }
    }

    fn walk(&mut self, source: &Path) {
        let walker = WalkDir::new(source).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(source = %source.display(), "Skipping unreadable entry: {e}");
                    continue;
                }
            };
            // Symlinked files resolve to their target; directory links are not followed.
            if entry.path().is_file() {
                self.visit(source, entry.path());
            } else if !entry.path().is_dir() {
                tracing::debug!(path = %entry.path().display(), "Skipping non-file entry");
            }
        }
    }

    fn visit(&mut self, source: &Path, file: &Path) {
        let shown = self.display_path(file);
        tracing::info!(
            "Currently processing: {}",
            file.file_name().unwrap_or_default().to_string_lossy()
        );
        tracing::debug!(path = %shown, "Full path");

        let dir = file.parent().unwrap_or(Path::new(""));
        let root = self.config.strip_root.then_some(source);
        let labels = labels_from_path(dir, root);

        if labels.is_unlabeled() {
            tracing::debug!(path = %shown, "Item is unlabeled and will be ignored");
            self.ledger.append_unlabeled(shown);
            return;
        }
        tracing::debug!(labels = ?labels.labels(), "Derived labels");

        if let Err(e) = self.process(file, &shown, labels) {
            tracing::warn!(path = %shown, "Dropping item: {e}");
            self.failed.push(FailedItem {
                path: shown,
                reason: e.to_string(),
            });
        }
    }

    fn process(&mut self, file: &Path, shown: &str, labels: LabelPath) -> Result<()> {
        let sample = self.decoder.decode(file)?;

        let normalized = match normalize(sample, &self.config.mode)? {
            Verdict::Useful(n) => n,
            Verdict::Useless => {
                tracing::debug!(path = %shown, "Item carries no useful data");
                self.ledger.append_useless(shown);
                return Ok(());
            }
        };

        let record = FlatRecord::from(normalized);
        tracing::debug!(shape = ?record.shape, "Flattened item");

        let index = self.next_index;
        let record_path = self.store.store(&record.values, index)?;
        self.next_index += 1;

        self.ledger.append(RecordDescriptor::new(
            labels,
            record.shape.clone(),
            record.format(),
            record_path.display().to_string(),
        ));
        Ok(())
    }

    fn display_path(&self, file: &Path) -> String {
        let path = if self.config.absolute_paths {
            std::path::absolute(file).unwrap_or_else(|_| file.to_path_buf())
        } else {
            PathBuf::from(file)
        };
        path.display().to_string()
    }

    fn finish(self, metadata_dir: &Path, start: Instant) -> Result<RunReport> {
        let stored = self.ledger.descriptors().len();
        let unlabeled = self.ledger.unlabeled().len();
        let useless = self.ledger.useless().len();

        let ledger = self.ledger.flush(metadata_dir)?;

        let report = RunReport {
            stored,
            unlabeled,
            useless,
            failed: self.failed,
            ledger,
            duration: start.elapsed(),
        };
        tracing::info!("{}", report.summary());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImageOptions, TextOptions};
    use crate::sample::Sample;
    use ndarray::{ArrayD, IxDyn};
    use tempfile::TempDir;

    /// Decodes the first byte of each file into a 1x2 grid; `0` decodes to a
    /// flat grid, `!` fails.
    struct ByteDecoder;

    impl Decoder for ByteDecoder {
        fn decode(&self, path: &Path) -> Result<Sample> {
            let bytes = std::fs::read(path)?;
            match bytes.first() {
                Some(b'!') => Err(PrepError::Decode("bad bytes".to_owned())),
                Some(b'0') => Ok(Sample::Image(ArrayD::from_elem(IxDyn(&[1, 2]), 0.5))),
                _ => Ok(Sample::Image(
                    ArrayD::from_shape_vec(IxDyn(&[1, 2]), vec![0.0, 1.0]).unwrap(),
                )),
            }
        }
    }

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn config(tmp: &TempDir, mode: Mode) -> RunConfig {
        let mut config = RunConfig::new(
            tmp.path().join("out"),
            vec![tmp.path().join("src")],
            mode,
        );
        config.strip_root = true;
        config
    }

    #[test]
    fn test_indices_skip_dropped_items() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, "a/1.bin", "1");
        write(&src, "a/2.bin", "0");
        write(&src, "a/3.bin", "!");
        write(&src, "b/4.bin", "1");
        write(&src, "loose.bin", "1");

        let report = run_with(&config(&tmp, Mode::default()), &ByteDecoder).unwrap();
        assert_eq!(report.stored, 2);
        assert_eq!(report.useless, 1);
        assert_eq!(report.unlabeled, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].path.ends_with("3.bin"));

        let out = tmp.path().join("out");
        assert!(out.join("0.csv").exists());
        assert!(out.join("1.csv").exists());
        assert!(!out.join("2.csv").exists());

        let metadata = std::fs::read_to_string(&report.ledger.metadata).unwrap();
        let lines = metadata.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1 a 2 1 2 int "));
        assert!(lines[1].starts_with("1 b 2 1 2 int "));
    }

    #[test]
    fn test_existing_target_is_rejected_unless_allowed() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("src"), "a/1.bin", "1");
        std::fs::create_dir_all(tmp.path().join("out")).unwrap();

        let mut config = config(&tmp, Mode::default());
        assert!(matches!(
            run_with(&config, &ByteDecoder),
            Err(PrepError::Config(_))
        ));
        assert!(!tmp.path().join("out").join("metadata.csv").exists());

        config.allow_existing_target = true;
        assert_eq!(run_with(&config, &ByteDecoder).unwrap().stored, 1);
    }

    #[test]
    fn test_missing_source_aborts_before_processing() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("src"), "a/1.bin", "1");
        let mut config = config(&tmp, Mode::default());
        config.sources.push(tmp.path().join("missing"));

        assert!(matches!(
            run_with(&config, &ByteDecoder),
            Err(PrepError::InvalidPath(_))
        ));
        assert!(!tmp.path().join("out").join("0.csv").exists());
    }

    #[test]
    fn test_separate_metadata_dir() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("src"), "a/1.bin", "1");
        let mut config = config(&tmp, Mode::Image(ImageOptions::default()));
        config.metadata_dir = Some(tmp.path().join("meta"));

        let report = run_with(&config, &ByteDecoder).unwrap();
        assert_eq!(report.ledger.metadata, tmp.path().join("meta").join("metadata.csv"));
        assert!(!tmp.path().join("out").join("metadata.csv").exists());
    }

    #[test]
    fn test_keep_root_labels() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("src"), "loose.bin", "1");
        let mut config = config(&tmp, Mode::default());
        config.strip_root = false;

        let report = run_with(&config, &ByteDecoder).unwrap();
        assert_eq!(report.stored, 1);
        assert_eq!(report.unlabeled, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_processed() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        write(&src, "a/1.bin", "1");
        write(tmp.path(), "elsewhere/2.bin", "1");
        std::os::unix::fs::symlink(
            tmp.path().join("elsewhere").join("2.bin"),
            src.join("a").join("2.bin"),
        )
        .unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("elsewhere").join("missing.bin"),
            src.join("a").join("3.bin"),
        )
        .unwrap();

        let report = run_with(&config(&tmp, Mode::default()), &ByteDecoder).unwrap();
        assert_eq!(report.stored, 2);
        assert!(report.failed.is_empty());

        let metadata = std::fs::read_to_string(&report.ledger.metadata).unwrap();
        assert_eq!(metadata.lines().filter(|l| l.starts_with("1 a ")).count(), 2);
    }

    #[test]
    fn test_conflicting_text_bounds_abort() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("src"), "a/1.txt", "hello");
        let config = config(
            &tmp,
            Mode::Text(TextOptions {
                min_chars: 20,
                max_chars: 5,
                ..Default::default()
            }),
        );
        assert!(matches!(run(&config), Err(PrepError::Config(_))));
        assert!(!tmp.path().join("out").exists());
    }
}
