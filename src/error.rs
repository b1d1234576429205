//! Defines [`GeoJsonEncoderError`], representing all errors returned by this crate.

use std::borrow::Cow;
use std::fmt::Debug;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GeoJsonEncoderError {
    /// A coordinate token could not be parsed as a finite number.
    ///
    /// This is fatal for the geometry: writing anything else would leave the coordinate arrays
    /// unbalanced.
    #[error("Malformed coordinate value: {token:?}")]
    MalformedCoordinate { token: String },

    /// A property value could not be encoded.
    #[error("Invalid value for property {name}: {message}")]
    InvalidProperty { name: String, message: String },

    /// The encoder options describe an unsupported combination.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(Cow<'static, str>),

    /// The coordinate transformer failed.
    #[error("Coordinate transformation failed: {0}")]
    Transform(String),

    /// The JSON writer was driven into an invalid structural state.
    #[error("Invalid JSON structure: {0}")]
    InvalidStructure(&'static str),

    /// An earlier error already closed this stream.
    #[error("Stream aborted by an earlier error")]
    Aborted,

    /// [geodesy::Error]
    #[cfg(feature = "geodesy")]
    #[error(transparent)]
    GeodesyError(#[from] geodesy::Error),

    /// [geozero::error::GeozeroError]
    #[cfg(feature = "geozero")]
    #[error(transparent)]
    GeozeroError(#[from] geozero::error::GeozeroError),

    /// [std::io::Error]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// [serde_json::Error]
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, GeoJsonEncoderError>;

#[cfg(feature = "geozero")]
impl From<GeoJsonEncoderError> for geozero::error::GeozeroError {
    fn from(err: GeoJsonEncoderError) -> Self {
        match err {
            GeoJsonEncoderError::GeozeroError(err) => err,
            GeoJsonEncoderError::IOError(err) => geozero::error::GeozeroError::IoError(err),
            GeoJsonEncoderError::InvalidProperty { .. } => {
                geozero::error::GeozeroError::Property(err.to_string())
            }
            _ => geozero::error::GeozeroError::Geometry(err.to_string()),
        }
    }
}
