//! Structural input validation
//!
//! Only presence and coarse type of the two required keys are checked.
//! Nested geometry is left to the ray tracer.

use serde_json::Value;
use thiserror::Error;

pub const RECEIVER_PLANES: &str = "receiver_planes";
pub const POLYGONS: &str = "polygons";

/// Required top-level keys, checked in this order
pub const REQUIRED_FIELDS: [&str; 2] = [RECEIVER_PLANES, POLYGONS];

/// Message paired with a passing validation
pub const VALID: &str = "Valid";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("receiver_planes must be an object")]
    ReceiverPlanesNotObject,

    #[error("polygons must be an array")]
    PolygonsNotArray,
}

/// Check that the request carries `receiver_planes` (object) and `polygons` (array).
/// A document that is not an object has no fields, so it reports the first missing one.
pub fn validate_request(data: &Value) -> Result<(), InvalidInput> {
    for field in REQUIRED_FIELDS {
        if data.get(field).is_none() {
            return Err(InvalidInput::MissingField(field));
        }
    }

    if !data[RECEIVER_PLANES].is_object() {
        return Err(InvalidInput::ReceiverPlanesNotObject);
    }

    if !data[POLYGONS].is_array() {
        return Err(InvalidInput::PolygonsNotArray);
    }

    Ok(())
}

/// `(ok, message)` form of [`validate_request`]
pub fn validation_report(data: &Value) -> (bool, String) {
    match validate_request(data) {
        Ok(()) => (true, VALID.to_string()),
        Err(e) => (false, e.to_string()),
    }
}
