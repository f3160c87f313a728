//! Sample normalization and usefulness classification.
//!
//! ## Images
//!
//! ```text
//! decoded [0,1] grid
//!   ├─> 4 channels: alpha-composite onto white → 3 channels
//!   ├─> min / max over the luminance (colour) or the values (single channel)
//!   ├─> max == min: useless, stop
//!   ├─> greyscale requested and colour: keep the luminance → 1 channel
//!   ├─> rescale to (v - min) / (max - min)
//!   └─> float: keep in [0,1] | int: quantize to 0..=255
//! ```
//!
//! Rescaling is anchored to the sample's own luminance range. There is no
//! dataset-wide normalization. Kept colour channels can leave `[0, 1]`
//! after rescaling and are clamped on output.
//!
//! ## Text
//!
//! Whitespace collapsing, punctuation stripping, digit stripping and
//! lowercasing run in that order, each behind its option. The formatted
//! document is useful when it has at least one character and its character
//! count falls inside the configured bounds.

use crate::config::{ImageOptions, Mode, TextOptions};
use crate::error::{PrepError, Result};
use crate::sample::{Sample, channel_count};
use ndarray::{ArrayD, Axis, Zip};

/// Luminance weights for R, G and B (ITU-R BT.709).
pub const LUMA_WEIGHTS: [f64; 3] = [0.2125, 0.7154, 0.0721];

/// Outcome of the usefulness test.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T> {
    Useful(T),
    Useless,
}

impl<T> Verdict<T> {
    pub fn is_useful(&self) -> bool {
        matches!(self, Self::Useful(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Verdict<U> {
        match self {
            Self::Useful(v) => Verdict::Useful(f(v)),
            Self::Useless => Verdict::Useless,
        }
    }
}

/// Pixel values in their output representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    /// Level-preserving bytes in `0..=255`
    Int(ArrayD<u8>),
    /// Values in the closed unit interval
    Float(ArrayD<f64>),
}

impl Pixels {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Int(a) => a.shape(),
            Self::Float(a) => a.shape(),
        }
    }
}

/// A formatted document plus the counts written to the metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedText {
    pub text: String,
    pub char_count: usize,
    pub word_count: usize,
}

impl FormattedText {
    pub fn new(text: String) -> Self {
        let char_count = text.chars().count();
        let word_count = text.split_whitespace().count();
        Self {
            text,
            char_count,
            word_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Image(Pixels),
    Text(FormattedText),
}

/// Normalize any sample under the run's mode.
///
/// # Errors
///
/// Returns [`PrepError::Format`] when the sample kind does not match the mode
/// or the image has an unsupported channel count.
pub fn normalize(sample: Sample, mode: &Mode) -> Result<Verdict<Normalized>> {
    match (sample, mode) {
        (Sample::Image(pixels), Mode::Image(opts)) => {
            Ok(normalize_image(pixels, opts)?.map(Normalized::Image))
        }
        (Sample::Text(text), Mode::Text(opts)) => {
            Ok(normalize_text(&text, opts).map(Normalized::Text))
        }
        (Sample::Image(_), Mode::Text(_)) => Err(PrepError::Format(
            "image sample in a text run".to_owned(),
        )),
        (Sample::Text(_), Mode::Image(_)) => Err(PrepError::Format(
            "text sample in an image run".to_owned(),
        )),
    }
}

/// Normalize a decoded pixel grid with values in `[0, 1]`.
///
/// # Errors
///
/// Returns [`PrepError::Format`] for 2 channels or more than 4.
pub fn normalize_image(pixels: ArrayD<f64>, opts: &ImageOptions) -> Result<Verdict<Pixels>> {
    let channels = channel_count(pixels.shape());
    let colour = match channels {
        1 | 3 => pixels,
        4 => {
            tracing::debug!("Compositing alpha channel onto white");
            composite_alpha(&pixels)?
        }
        n => {
            return Err(PrepError::Format(format!(
                "{n} channels; expected 1 (greyscale), 3 (rgb) or 4 (rgba)"
            )));
        }
    };

    // Colour images are judged on their luminance even when the colour
    // channels are kept.
    let luma = (channels > 1).then(|| luminance(&colour));
    let Some((min, max)) = value_range(luma.as_ref().unwrap_or(&colour)) else {
        return Ok(Verdict::Useless);
    };
    if max <= min {
        tracing::debug!(value = min, "Image is one colour, no useful data");
        return Ok(Verdict::Useless);
    }

    let evaluated = match luma {
        Some(grey) if opts.greyscale => {
            tracing::debug!("Converting colour image to greyscale");
            grey
        }
        _ => colour,
    };

    let span = max - min;
    let rescaled = evaluated.mapv(|v| (v - min) / span);

    let out = if opts.float {
        Pixels::Float(rescaled.mapv(|v| v.clamp(0.0, 1.0)))
    } else {
        Pixels::Int(rescaled.mapv(to_ubyte))
    };
    Ok(Verdict::Useful(out))
}

/// Blend an RGBA grid onto a white background.
///
/// # Errors
///
/// Returns [`PrepError::Shape`] if the channel slices cannot be restacked.
pub fn composite_alpha(rgba: &ArrayD<f64>) -> Result<ArrayD<f64>> {
    let alpha = rgba.index_axis(Axis(2), 3);
    let planes = (0..3)
        .map(|c| {
            Zip::from(rgba.index_axis(Axis(2), c))
                .and(&alpha)
                .map_collect(|&v, &a| v * a + (1.0 - a))
        })
        .collect::<Vec<_>>();
    let views = planes.iter().map(|p| p.view()).collect::<Vec<_>>();
    Ok(ndarray::stack(Axis(2), &views)?)
}

/// Luminance-weighted reduction of an RGB grid to one channel.
pub fn luminance(rgb: &ArrayD<f64>) -> ArrayD<f64> {
    rgb.map_axis(Axis(2), |px| {
        px.iter()
            .zip(LUMA_WEIGHTS)
            .map(|(v, w)| v * w)
            .sum::<f64>()
    })
}

/// Minimum and maximum over all values, `None` for an empty grid.
pub fn value_range(values: &ArrayD<f64>) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Float in `[0, 1]` to a byte, rounding half to even like `rint`.
pub fn to_ubyte(v: f64) -> u8 {
    (v * 255.0).round_ties_even().clamp(0.0, 255.0) as u8
}

/// Apply the text formatting options in their fixed order.
pub fn format_text(text: &str, opts: &TextOptions) -> String {
    let mut out = if opts.keep_whitespace {
        text.to_owned()
    } else {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    };
    if !opts.keep_punctuation {
        out.retain(|c| !c.is_ascii_punctuation());
    }
    if opts.strip_digits {
        out.retain(|c| !c.is_ascii_digit());
    }
    if !opts.keep_case {
        out = out.to_lowercase();
    }
    out
}

/// Character-count usefulness test. A bound of 0 is unbounded.
pub fn text_is_useful(char_count: usize, min_chars: usize, max_chars: usize) -> bool {
    if char_count == 0 {
        return false;
    }
    if min_chars != 0 && char_count < min_chars {
        return false;
    }
    if max_chars != 0 && char_count > max_chars {
        return false;
    }
    true
}

pub fn normalize_text(text: &str, opts: &TextOptions) -> Verdict<FormattedText> {
    let formatted = FormattedText::new(format_text(text, opts));
    if text_is_useful(formatted.char_count, opts.min_chars, opts.max_chars) {
        Verdict::Useful(formatted)
    } else {
        tracing::debug!(
            chars = formatted.char_count,
            min = opts.min_chars,
            max = opts.max_chars,
            "Document outside the useful character range"
        );
        Verdict::Useless
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn grid(shape: &[usize], values: Vec<f64>) -> ArrayD<f64> {
        ArrayD::from_shape_vec(IxDyn(shape), values).unwrap()
    }

    fn int_opts() -> ImageOptions {
        ImageOptions::default()
    }

    #[test]
    fn test_uniform_image_is_useless() {
        let img = grid(&[2, 2], vec![0.4; 4]);
        assert_eq!(normalize_image(img, &int_opts()).unwrap(), Verdict::Useless);
    }

    #[test]
    fn test_uniform_colour_is_useless_after_greyscale() {
        let img = grid(&[1, 2, 3], vec![0.2, 0.5, 0.9, 0.2, 0.5, 0.9]);
        let opts = ImageOptions {
            greyscale: true,
            ..Default::default()
        };
        assert_eq!(normalize_image(img, &opts).unwrap(), Verdict::Useless);
    }

    #[test]
    fn test_two_tone_rescales_to_full_byte_range() {
        let img = grid(&[1, 3], vec![0.2, 0.6, 0.4]);
        let Verdict::Useful(Pixels::Int(out)) = normalize_image(img, &int_opts()).unwrap() else {
            panic!("expected useful int pixels");
        };
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), [0, 255, 128]);
    }

    #[test]
    fn test_colour_rescales_by_luminance_range() {
        let img = grid(&[1, 2, 3], vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let Verdict::Useful(Pixels::Int(out)) = normalize_image(img, &int_opts()).unwrap() else {
            panic!("expected useful int pixels");
        };
        assert_eq!(out.shape(), &[1, 2, 3]);
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), [0, 0, 0, 255, 0, 0]);
    }

    #[test]
    fn test_float_output_stays_in_unit_interval() {
        let img = grid(&[2, 1], vec![0.25, 0.75]);
        let opts = ImageOptions {
            float: true,
            ..Default::default()
        };
        let Verdict::Useful(Pixels::Float(out)) = normalize_image(img, &opts).unwrap() else {
            panic!("expected useful float pixels");
        };
        assert_eq!(out.iter().copied().collect::<Vec<_>>(), [0.0, 1.0]);
    }

    #[test]
    fn test_greyscale_drops_channel_axis() {
        let img = grid(&[1, 2, 3], vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let opts = ImageOptions {
            greyscale: true,
            ..Default::default()
        };
        let Verdict::Useful(pixels) = normalize_image(img, &opts).unwrap() else {
            panic!("expected useful pixels");
        };
        assert_eq!(pixels.shape(), &[1, 2]);
    }

    #[test]
    fn test_rgba_is_composited_to_rgb() {
        // Fully transparent black becomes white; opaque black stays black.
        let img = grid(&[1, 2, 4], vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let rgb = composite_alpha(&img).unwrap();
        assert_eq!(rgb.shape(), &[1, 2, 3]);
        assert_eq!(
            rgb.iter().copied().collect::<Vec<_>>(),
            [1.0, 1.0, 1.0, 0.0, 0.0, 0.0]
        );

        let Verdict::Useful(pixels) = normalize_image(img, &int_opts()).unwrap() else {
            panic!("expected useful pixels");
        };
        assert_eq!(pixels.shape(), &[1, 2, 3]);
    }

    #[test]
    fn test_unsupported_channel_counts() {
        for channels in [2, 5] {
            let img = grid(&[1, 1, channels], vec![0.5; channels]);
            assert!(matches!(
                normalize_image(img, &int_opts()),
                Err(PrepError::Format(_))
            ));
        }
    }

    #[test]
    fn test_luminance_weights() {
        let img = grid(&[1, 1, 3], vec![1.0, 0.0, 0.0]);
        let grey = luminance(&img);
        assert_eq!(grey.shape(), &[1, 1]);
        assert!((grey.iter().next().copied().unwrap() - 0.2125).abs() < 1e-12);
    }

    #[test]
    fn test_to_ubyte_rounding() {
        assert_eq!(to_ubyte(0.0), 0);
        assert_eq!(to_ubyte(1.0), 255);
        assert_eq!(to_ubyte(0.5), 128);
        assert_eq!(to_ubyte(1.5), 255);
    }

    #[test]
    fn test_format_text_defaults() {
        let out = format_text("  Hello,   World!\n It's 2024. ", &TextOptions::default());
        assert_eq!(out, "hello world its 2024");
    }

    #[test]
    fn test_format_text_options() {
        let opts = TextOptions {
            keep_whitespace: true,
            keep_punctuation: true,
            strip_digits: true,
            keep_case: true,
            ..Default::default()
        };
        assert_eq!(format_text("A1 b2,\tC3", &opts), "A b,\tC");
    }

    #[test]
    fn test_strip_digits_keeps_numeric_letters() {
        let opts = TextOptions {
            strip_digits: true,
            keep_case: true,
            ..Default::default()
        };
        assert_eq!(format_text("½ Ⅻ 42 x7", &opts), "½ Ⅻ  x");
    }

    #[test]
    fn test_text_usefulness_bounds() {
        assert!(!text_is_useful(0, 0, 0));
        assert!(text_is_useful(1, 0, 0));
        assert!(!text_is_useful(5, 10, 0));
        assert!(text_is_useful(50, 10, 0));
        assert!(text_is_useful(10, 10, 10));
        assert!(!text_is_useful(11, 0, 10));
    }

    #[test]
    fn test_normalize_text_counts() {
        let Verdict::Useful(doc) = normalize_text("The Quick  brown fox.", &TextOptions::default())
        else {
            panic!("expected useful text");
        };
        assert_eq!(doc.text, "the quick brown fox");
        assert_eq!(doc.char_count, 19);
        assert_eq!(doc.word_count, 4);
    }

    #[test]
    fn test_empty_document_is_useless() {
        assert_eq!(
            normalize_text(" \n\t ", &TextOptions::default()),
            Verdict::Useless
        );
    }

    #[test]
    fn test_mode_mismatch_is_a_format_error() {
        let result = normalize(Sample::Text("x".to_owned()), &Mode::default());
        assert!(matches!(result, Err(PrepError::Format(_))));
    }
}
