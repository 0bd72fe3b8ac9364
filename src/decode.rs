//! Decoder for the ray tracer's stdout
//!
//! The executable prints a few labelled lines followed by one line of
//! whitespace-separated temperature values:
//!
//! ```text
//! Plane: P1
//! Width: 2.0
//! Height: 3.0
//! 1.0 2.0 3.0
//! ```
//!
//! Leading and trailing whitespace of the whole output is dropped first.
//! After that any non-empty line without a `Plane:`/`Width:`/`Height:` label
//! is a data row, and each data row replaces the previous one. Only the last
//! row survives; rows are never merged.

use std::num::ParseFloatError;
use thiserror::Error;

use crate::types::PlaneResult;

const PLANE_PREFIX: &str = "Plane: ";
const WIDTH_PREFIX: &str = "Width: ";
const HEIGHT_PREFIX: &str = "Height: ";

/// Labels that exclude a line from being read as a data row,
/// even when the separating space is missing
const LABELS: [&str; 3] = ["Plane:", "Width:", "Height:"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("could not parse {field} value '{value}' as a number: {source}")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Decode stdout of a successful run into a [`PlaneResult`].
/// Fields that never appear stay `None`; a malformed number is an error.
pub fn decode_plane_output(stdout: &str) -> Result<PlaneResult, DecodeError> {
    let mut plane = PlaneResult::default();

    for line in stdout.trim().lines() {
        // Whitespace-only rows inside the output still count: they clear `values`
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line.strip_prefix(PLANE_PREFIX) {
            plane.name = Some(name.to_string());
        } else if let Some(width) = line.strip_prefix(WIDTH_PREFIX) {
            plane.width = Some(parse_number("width", width)?);
        } else if let Some(height) = line.strip_prefix(HEIGHT_PREFIX) {
            plane.height = Some(parse_number("height", height)?);
        } else if !LABELS.iter().any(|label| line.starts_with(label)) {
            let values = line
                .split_whitespace()
                .map(|token| parse_number("values", token))
                .collect::<Result<Vec<_>, _>>()?;
            plane.values = Some(values);
        }
    }

    Ok(plane)
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, DecodeError> {
    let trimmed = raw.trim();
    trimmed.parse::<f64>().map_err(|source| DecodeError::InvalidNumber {
        field,
        value: trimmed.to_string(),
        source,
    })
}
