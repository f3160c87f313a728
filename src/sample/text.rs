//! Plain-text document decoding.

use super::{Decoder, Sample};
use crate::error::{PrepError, Result, ResultExt as _};
use std::path::Path;

/// Reads a document as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl Decoder for TextDecoder {
    fn decode(&self, path: &Path) -> Result<Sample> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| PrepError::Decode(format!("{} is not UTF-8: {e}", path.display())))?;
        Ok(Sample::Text(text))
    }
}
