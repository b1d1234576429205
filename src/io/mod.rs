//! Interoperability with other geospatial crates.

#[cfg(feature = "geozero")]
pub mod geozero;
