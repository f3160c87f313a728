//! Image decoding on top of the `image` crate.

use super::{Decoder, Sample};
use crate::error::{PrepError, Result};
use ::image::DynamicImage;
use ::image::imageops::FilterType;
use ndarray::{ArrayD, IxDyn};
use std::path::Path;

/// Decodes image files into float pixel grids in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder {
    /// Resize to `m x m` right after decoding
    pub resize: Option<u32>,
}

impl ImageDecoder {
    pub fn new(resize: Option<u32>) -> Self {
        Self { resize }
    }

    /// Convert an already decoded image, applying the optional resize.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::Decode`] for colour types with an unknown layout.
    pub fn from_dynamic(&self, img: DynamicImage) -> Result<ArrayD<f64>> {
        let img = match self.resize {
            Some(side) => img.resize_exact(side, side, FilterType::Triangle),
            None => img,
        };

        let (w, h) = (img.width() as usize, img.height() as usize);
        let color = img.color();

        let (channels, raw): (usize, Vec<f32>) = match (color.channel_count(), color.has_alpha()) {
            (1, _) => (1, img.to_luma32f().into_raw()),
            (2, true) => (2, img.to_luma_alpha32f().into_raw()),
            (3, false) => (3, img.to_rgb32f().into_raw()),
            (4, true) => (4, img.to_rgba32f().into_raw()),
            (n, _) => {
                return Err(PrepError::Decode(format!(
                    "unsupported colour type {color:?} with {n} channels"
                )));
            }
        };

        let shape = if channels == 1 {
            vec![h, w]
        } else {
            vec![h, w, channels]
        };
        let values = raw.into_iter().map(f64::from).collect::<Vec<_>>();
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
    }
}

impl Decoder for ImageDecoder {
    fn decode(&self, path: &Path) -> Result<Sample> {
        let img = ::image::open(path)?;
        tracing::debug!(
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Decoded image"
        );
        Ok(Sample::Image(self.from_dynamic(img)?))
    }
}
