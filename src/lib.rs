//! A streaming GeoJSON and [JSON-FG](https://docs.ogc.org/DRAFTS/21-045.html) encoder.
//!
//! An upstream parser reports features as a sequence of typed events (see
//! [`FeatureConsumer`]). The [`FeatureEncoder`] hands every event to an ordered chain of
//! [writer stages](chain::WriterStage) which write the output incrementally, so a feature
//! collection is never held in memory as a whole. Coordinates arrive as text and are
//! reprojected, axis-swapped, generalized and rounded on the way through
//! ([`coord::CoordinateWriter`]).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(not(test), deny(unused_crate_dependencies))]

pub use encoder::{FeatureConsumer, FeatureEncoder};
pub use error::{GeoJsonEncoderError, Result};
pub use event::{
    Event, FeatureProperty, FeatureType, GeometryKind, PathSegment, TargetMapping, ValueType,
};
pub use options::{EncoderOptions, JsonFgOptions, Link, MultiplicityStrategy, NestingStrategy};

pub mod chain;
pub mod context;
pub mod coord;
mod encoder;
pub mod error;
pub mod event;
pub mod io;
pub mod json;
pub mod options;
pub mod stages;
#[cfg(test)]
pub(crate) mod test;
pub mod transform;
