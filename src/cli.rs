use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use flatcorpus::config::{ImageOptions, Mode, RunConfig, TextOptions, Verbosity};
use flatcorpus::reader::{LoadedRecord, MetadataEntry, RecordKind, load_record, read_metadata};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "flatcorpus",
    version,
    about = "Flatten a directory-labelled corpus into records plus a metadata index",
    long_about = "Take files from source directories and preprocess each one for supervised \
learning. The directory tree determines the labels: every folder name is a label for all \
files beneath it, with whitespace replaced by underscores. Each useful file is exported as a \
flat record to the target directory, and a single 'metadata.csv' holds the labels, shape, \
value format and record path. Unlabeled files are listed in 'unlabeled.csv' and files without \
useful data in 'useless.csv', next to the metadata file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Copy, Default)]
#[group(multiple = false)]
pub struct VerbosityArgs {
    /// Output actions to the console and show detailed information
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress output to the console
    #[arg(short, long)]
    pub quiet: bool,
}

impl From<VerbosityArgs> for Verbosity {
    fn from(args: VerbosityArgs) -> Self {
        Self {
            verbose: args.verbose,
            quiet: args.quiet,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory where all processed record files are stored
    pub target: PathBuf,

    /// Source directory holding the files to process. Repeat for more sources
    #[arg(short, long = "source", required = true)]
    pub sources: Vec<PathBuf>,

    /// Separate directory for the metadata file and side lists
    #[arg(short, long)]
    pub metadata: Option<PathBuf>,

    /// Ignore the source root directory name when deriving labels
    #[arg(short = 'r', long)]
    pub strip_root: bool,

    /// Compress each record file using GNU zip (.gz)
    #[arg(short, long)]
    pub compress: bool,

    /// Allow the target directory to exist already; colliding record files are overwritten
    #[arg(short = 'o', long = "override")]
    pub allow_existing: bool,

    /// Force absolute path names in the metadata and side lists
    #[arg(short, long)]
    pub abspath: bool,

    #[command(flatten)]
    pub verbosity: VerbosityArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Flatten an image corpus
    Image {
        #[command(flatten)]
        common: CommonArgs,

        /// Convert images to greyscale
        #[arg(short, long)]
        greyscale: bool,

        /// Store values as floats (0-1) instead of unsigned integers (0-255)
        #[arg(short, long)]
        float: bool,

        /// Resize every image to m x m pixels
        #[arg(short = 'e', long, value_name = "M")]
        resize: Option<u32>,
    },
    /// Flatten a text corpus
    Text {
        #[command(flatten)]
        common: CommonArgs,

        /// Keep all original whitespace
        #[arg(short = 't', long)]
        keep_whitespace: bool,

        /// Keep punctuation
        #[arg(short = 'p', long)]
        keep_punctuation: bool,

        /// Remove all digits
        #[arg(short = 'n', long)]
        strip_digits: bool,

        /// Keep the original letter case
        #[arg(short = 'k', long)]
        keep_case: bool,

        /// Minimum character count for a document to be useful (0 = unbounded)
        #[arg(short = 'i', long, default_value_t = 0)]
        min_chars: usize,

        /// Maximum character count for a document to be useful (0 = unbounded)
        #[arg(short = 'f', long, default_value_t = 0)]
        max_chars: usize,
    },
    /// Run from a JSON configuration file
    Run {
        /// Path to the run configuration
        #[arg(long)]
        config: PathBuf,

        #[command(flatten)]
        verbosity: VerbosityArgs,
    },
    /// Summarise a metadata file and optionally check every record
    Inspect {
        /// Path to metadata.csv
        metadata: PathBuf,

        /// Load every record and check it reforms to its recorded shape
        #[arg(long)]
        verify: bool,

        /// The records hold formatted text rather than pixel values
        #[arg(short, long)]
        text: bool,

        #[command(flatten)]
        verbosity: VerbosityArgs,
    },
}

/// A fully resolved command.
pub enum Action {
    Process(RunConfig),
    Inspect {
        metadata: PathBuf,
        verify: bool,
        kind: RecordKind,
        verbosity: Verbosity,
    },
}

impl Action {
    pub fn verbosity(&self) -> Verbosity {
        match self {
            Self::Process(config) => config.verbosity,
            Self::Inspect { verbosity, .. } => *verbosity,
        }
    }
}

impl Commands {
    /// Verbosity requested on the command line.
    pub fn verbosity(&self) -> Verbosity {
        match self {
            Self::Image { common, .. } | Self::Text { common, .. } => common.verbosity.into(),
            Self::Run { verbosity, .. } | Self::Inspect { verbosity, .. } => (*verbosity).into(),
        }
    }

    pub fn resolve(self) -> Result<Action> {
        match self {
            Self::Image {
                common,
                greyscale,
                float,
                resize,
            } => Ok(Action::Process(common.into_config(Mode::Image(ImageOptions {
                greyscale,
                float,
                resize,
            })))),
            Self::Text {
                common,
                keep_whitespace,
                keep_punctuation,
                strip_digits,
                keep_case,
                min_chars,
                max_chars,
            } => Ok(Action::Process(common.into_config(Mode::Text(TextOptions {
                keep_whitespace,
                keep_punctuation,
                strip_digits,
                keep_case,
                min_chars,
                max_chars,
            })))),
            Self::Run { config, verbosity } => {
                let mut run_config = RunConfig::load(&config)
                    .with_context(|| format!("Failed to load {}", config.display()))?;
                run_config.verbosity.verbose |= verbosity.verbose;
                run_config.verbosity.quiet |= verbosity.quiet;
                Ok(Action::Process(run_config))
            }
            Self::Inspect {
                metadata,
                verify,
                text,
                verbosity,
            } => Ok(Action::Inspect {
                metadata,
                verify,
                kind: if text {
                    RecordKind::Text
                } else {
                    RecordKind::Numeric
                },
                verbosity: verbosity.into(),
            }),
        }
    }
}

impl CommonArgs {
    fn into_config(self, mode: Mode) -> RunConfig {
        RunConfig {
            target_dir: self.target,
            sources: self.sources,
            metadata_dir: self.metadata,
            strip_root: self.strip_root,
            compress: self.compress,
            allow_existing_target: self.allow_existing,
            absolute_paths: self.abspath,
            verbosity: self.verbosity.into(),
            mode,
        }
    }
}

pub fn execute(action: Action) -> Result<()> {
    match action {
        Action::Process(config) => {
            let report = flatcorpus::pipeline::run(&config)?;
            if !report.failed.is_empty() {
                tracing::warn!("{} item(s) were dropped", report.failed.len());
            }
            Ok(())
        }
        Action::Inspect {
            metadata,
            verify,
            kind,
            verbosity,
        } => handle_inspect(&metadata, verify, kind, verbosity),
    }
}

fn handle_inspect(
    metadata: &Path,
    verify: bool,
    kind: RecordKind,
    verbosity: Verbosity,
) -> Result<()> {
    let entries = read_metadata(metadata)
        .with_context(|| format!("Failed to read {}", metadata.display()))?;

    let mut formats: BTreeMap<String, usize> = BTreeMap::new();
    let mut labels: BTreeMap<String, usize> = BTreeMap::new();
    for entry in &entries {
        *formats.entry(entry.format.to_string()).or_default() += 1;
        *labels.entry(entry.labels.join("/")).or_default() += 1;
    }

    if !verbosity.is_quiet() {
        println!("{}: {} record(s)", metadata.display(), entries.len());
        for (format, count) in &formats {
            println!("  format {format}: {count}");
        }
        for (label, count) in &labels {
            println!("  {label}: {count}");
        }
    }

    if verify {
        let broken = entries
            .iter()
            .filter_map(|entry| verify_entry(entry, kind).err().map(|e| (entry, e)))
            .collect::<Vec<_>>();
        for (entry, e) in &broken {
            tracing::warn!(record = %entry.record_path.display(), "Record does not load: {e}");
        }
        if !broken.is_empty() {
            anyhow::bail!("{} of {} record(s) failed to load", broken.len(), entries.len());
        }
        if !verbosity.is_quiet() {
            println!("All records reform to their recorded shapes.");
        }
    }
    Ok(())
}

fn verify_entry(entry: &MetadataEntry, kind: RecordKind) -> flatcorpus::error::Result<()> {
    match load_record(entry, kind)? {
        LoadedRecord::Text(text) => {
            let chars = text.chars().count();
            if entry.shape.first() != Some(&chars) {
                return Err(flatcorpus::error::PrepError::Shape(format!(
                    "text has {chars} characters, metadata says {:?}",
                    entry.shape
                )));
            }
            Ok(())
        }
        LoadedRecord::Int(_) | LoadedRecord::Float(_) => Ok(()),
    }
}
