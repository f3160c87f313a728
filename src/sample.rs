//! In-memory samples and the decode capability.
//!
//! A [`Sample`] lives only while one file is being processed. Decoding is
//! behind the [`Decoder`] trait so the pipeline does not care which library
//! reads the bytes:
//!
//! - [`image::ImageDecoder`] turns image files into a pixel grid of `f64`
//!   values in `[0, 1]`, shaped `[height, width]` or
//!   `[height, width, channels]`.
//! - [`text::TextDecoder`] reads a UTF-8 document.

pub mod image;
pub mod text;

use crate::error::Result;
use ndarray::ArrayD;
use std::path::Path;

/// A decoded item.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Image(ArrayD<f64>),
    Text(String),
}

impl Sample {
    /// Extents of the sample. Text has no shape.
    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            Self::Image(pixels) => Some(pixels.shape()),
            Self::Text(_) => None,
        }
    }

    /// Number of colour channels; 1 for native greyscale and for text.
    pub fn channels(&self) -> usize {
        match self {
            Self::Image(pixels) => channel_count(pixels.shape()),
            Self::Text(_) => 1,
        }
    }
}

/// Whether a pixel grid carries a trailing channel axis.
pub fn has_channel_axis(shape: &[usize]) -> bool {
    shape.len() > 2
}

/// Channel count read from the trailing axis, 1 when there is none.
pub fn channel_count(shape: &[usize]) -> usize {
    if has_channel_axis(shape) {
        shape.last().copied().unwrap_or(1)
    } else {
        1
    }
}

/// Capability: "decode file → raw sample".
pub trait Decoder {
    /// # Errors
    ///
    /// Returns [`crate::error::PrepError::Decode`] or an I/O error when the
    /// file cannot be turned into a sample.
    fn decode(&self, path: &Path) -> Result<Sample>;
}
