//! # flatcorpus - Labelled Corpus Flattening
//!
//! flatcorpus turns a directory tree of images or text documents, where the
//! folder names are the classification labels, into a flat dataset: one
//! record file per useful item plus a single metadata index.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flatcorpus::config::{ImageOptions, Mode, RunConfig};
//! use flatcorpus::pipeline;
//! use std::path::PathBuf;
//!
//! # fn example() -> flatcorpus::error::Result<()> {
//! let mut config = RunConfig::new(
//!     "out",
//!     vec![PathBuf::from("photos")],
//!     Mode::Image(ImageOptions { greyscale: true, ..Default::default() }),
//! );
//! config.strip_root = true;
//!
//! let report = pipeline::run(&config)?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Output Layout
//!
//! ```text
//! out/
//!   0.csv  1.csv  2.csv …   one flattened record per useful labelled item
//!   metadata.csv            labels, shape, value format and record path
//!   unlabeled.csv           items with no label directory
//!   useless.csv             items that carry no signal
//! ```
//!
//! ## Core Modules
//!
//! - [`labeler`]: directory path → label sequence
//! - [`normalize`]: channel handling, usefulness test, value scaling
//! - [`codec`]: flatten / reform
//! - [`store`]: numbered record files
//! - [`ledger`]: metadata and side lists, collision-safe file creation
//! - [`pipeline`]: the traversal driver tying the above together
//! - [`reader`]: reading a flattened dataset back

#![warn(clippy::all, rust_2018_idioms)]

pub mod codec;
pub mod config;
pub mod error;
pub mod labeler;
pub mod ledger;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod sample;
pub mod store;
