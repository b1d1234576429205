//! The built-in writer stages of the GeoJSON format.
//!
//! Each stage owns one group of members of the output. Their priorities fix the member order
//! within the feature collection and each feature.

mod crs;
mod geometry;
mod id;
mod json_fg;
mod links;
mod properties;
mod skeleton;

pub use crs::CrsStage;
pub use geometry::GeometryStage;
pub use id::IdStage;
pub use json_fg::JsonFgStage;
pub use links::LinksStage;
pub use properties::PropertiesStage;
pub use skeleton::SkeletonStage;

use std::io::Write;

use crate::chain::WriterStage;
use crate::options::EncoderOptions;

pub const SKELETON_PRIORITY: i32 = 0;
pub const ID_PRIORITY: i32 = 10;
pub const CRS_PRIORITY: i32 = 20;
pub const JSON_FG_PRIORITY: i32 = 30;
pub const LINKS_PRIORITY: i32 = 40;
pub const GEOMETRY_PRIORITY: i32 = 50;
pub const PROPERTIES_PRIORITY: i32 = 60;

/// The stages needed for `options`, in registration order.
pub fn default_stages<W: Write>(options: &EncoderOptions) -> Vec<Box<dyn WriterStage<W>>> {
    let mut stages: Vec<Box<dyn WriterStage<W>>> = vec![
        Box::new(SkeletonStage::new(options)),
        Box::new(IdStage::new()),
    ];
    if let Some(crs_uri) = &options.crs_uri {
        stages.push(Box::new(CrsStage::new(crs_uri.clone(), options)));
    }
    if let Some(json_fg) = &options.json_fg {
        stages.push(Box::new(JsonFgStage::new(json_fg.clone(), options)));
    }
    if !options.links.is_empty() || options.self_link_template.is_some() {
        stages.push(Box::new(LinksStage::new(options)));
    }
    stages.push(Box::new(GeometryStage::new(options)));
    stages.push(Box::new(PropertiesStage::new(options)));
    stages
}
