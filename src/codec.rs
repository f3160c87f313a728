//! Flattening of normalized samples and its inverse.
//!
//! `flatten` linearizes an N-dimensional grid in row-major order and returns
//! the original extents alongside. `reform` is its exact left inverse:
//! `reform(shape, flatten(s).1) == s` for every grid `s` with that shape.
//!
//! Text does not flatten dimensionally: the record is the formatted string
//! and the shape is `[character_count, word_count]`. The metadata line only
//! knows `int` and `float`, so text records reuse the `int` token.

use crate::error::{PrepError, Result};
use crate::normalize::{Normalized, Pixels};
use ndarray::{ArrayD, IxDyn};
use std::fmt;
use std::str::FromStr;

/// Row-major linearization. Returns `(shape, values)`.
pub fn flatten<T: Clone>(sample: &ArrayD<T>) -> (Vec<usize>, Vec<T>) {
    let shape = sample.shape().to_vec();
    let values = sample.iter().cloned().collect();
    (shape, values)
}

/// Rebuild a grid from its shape and row-major values.
///
/// # Errors
///
/// Returns [`PrepError::Shape`] when the element count does not match.
pub fn reform<T>(shape: &[usize], flat: Vec<T>) -> Result<ArrayD<T>> {
    let expected = shape.iter().product::<usize>();
    if expected != flat.len() {
        return Err(PrepError::Shape(format!(
            "shape {shape:?} needs {expected} values, got {}",
            flat.len()
        )));
    }
    Ok(ArrayD::from_shape_vec(IxDyn(shape), flat)?)
}

/// Value representation recorded in the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueFormat {
    Int,
    Float,
}

impl ValueFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueFormat {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            other => Err(PrepError::Metadata(format!("unknown value format '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlatValues {
    Int(Vec<u8>),
    Float(Vec<f64>),
    Text(String),
}

/// One record ready for the store: its shape descriptor and its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub shape: Vec<usize>,
    pub values: FlatValues,
}

impl FlatRecord {
    pub fn format(&self) -> ValueFormat {
        match self.values {
            FlatValues::Int(_) | FlatValues::Text(_) => ValueFormat::Int,
            FlatValues::Float(_) => ValueFormat::Float,
        }
    }
}

impl From<Normalized> for FlatRecord {
    fn from(normalized: Normalized) -> Self {
        match normalized {
            Normalized::Image(Pixels::Int(grid)) => {
                let (shape, values) = flatten(&grid);
                Self {
                    shape,
                    values: FlatValues::Int(values),
                }
            }
            Normalized::Image(Pixels::Float(grid)) => {
                let (shape, values) = flatten(&grid);
                Self {
                    shape,
                    values: FlatValues::Float(values),
                }
            }
            Normalized::Text(doc) => Self {
                shape: vec![doc.char_count, doc.word_count],
                values: FlatValues::Text(doc.text),
            },
        }
    }
}
