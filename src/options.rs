//! Configuration of a [`FeatureEncoder`][crate::FeatureEncoder].

use std::sync::Arc;

use serde::Deserialize;

use crate::coord::{RingReversal, DEFAULT_BUFFER_CAPACITY};
use crate::error::{GeoJsonEncoderError, Result};
use crate::transform::CrsTransformer;

/// How properties with a multi-segment path are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum NestingStrategy {
    /// Every path segment becomes a nested object.
    #[default]
    Nest,
    /// Path segments are joined into a single key.
    Flatten,
}

/// How properties that occur more than once are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum MultiplicityStrategy {
    /// Repeated values become JSON arrays.
    #[default]
    Array,
    /// The index of each value is appended to its key.
    Suffix,
}

/// A link written to the `links` member of a feature collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            r#type: None,
            title: None,
        }
    }

    pub fn with_type(self, media_type: impl Into<String>) -> Self {
        Self {
            r#type: Some(media_type.into()),
            ..self
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..self
        }
    }
}

/// Options for the JSON-FG members.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonFgOptions {
    /// Conformance class URIs written as `conformsTo`.
    pub conforms_to: Vec<String>,

    /// Write coordinates to `place` and set `geometry` to `null`. Used when the output CRS is
    /// not WGS 84.
    pub place: bool,
}

impl Default for JsonFgOptions {
    fn default() -> Self {
        Self {
            conforms_to: vec!["http://www.opengis.net/spec/json-fg-1/0.2/conf/core".to_string()],
            place: false,
        }
    }
}

/// Options for encoding a feature stream.
///
/// Options are read once when the encoder is created.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncoderOptions {
    pub nesting: NestingStrategy,
    pub multiplicity: MultiplicityStrategy,

    /// Separator between path segments and suffixes for [`NestingStrategy::Flatten`].
    pub flatten_separator: String,

    pub pretty: bool,

    /// Applied to every coordinate tuple before it is written.
    #[serde(skip)]
    pub transformer: Option<Arc<dyn CrsTransformer>>,

    /// Douglas-Peucker tolerance for lines and rings, in source CRS units. `0` disables
    /// generalization.
    pub max_allowable_offset: f64,

    /// Number of fraction digits of coordinate values. `0` keeps full precision.
    pub precision: usize,

    /// Write Y before X.
    pub swap_xy: bool,

    /// Never write Z values.
    pub force_2d: bool,

    pub ring_reversal: RingReversal,

    /// Write a single `Feature` instead of a `FeatureCollection`.
    pub single_feature: bool,

    /// Written as `coordRefSys`.
    pub crs_uri: Option<String>,

    pub links: Vec<Link>,

    /// Template for the `self` link of each feature. `{id}` is replaced by the feature id.
    pub self_link_template: Option<String>,

    /// Enables the JSON-FG members.
    pub json_fg: Option<JsonFgOptions>,

    /// Initial capacity, in values, of the buffer holding a ring.
    pub coordinate_buffer_capacity: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            nesting: NestingStrategy::default(),
            multiplicity: MultiplicityStrategy::default(),
            flatten_separator: ".".to_string(),
            pretty: false,
            transformer: None,
            max_allowable_offset: 0.0,
            precision: 0,
            swap_xy: false,
            force_2d: false,
            ring_reversal: RingReversal::default(),
            single_feature: false,
            crs_uri: None,
            links: vec![],
            self_link_template: None,
            json_fg: None,
            coordinate_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl EncoderOptions {
    /// Options for [`NestingStrategy::Flatten`] with [`MultiplicityStrategy::Suffix`].
    pub fn flattened(separator: impl Into<String>) -> Self {
        Self {
            nesting: NestingStrategy::Flatten,
            multiplicity: MultiplicityStrategy::Suffix,
            flatten_separator: separator.into(),
            ..Default::default()
        }
    }

    pub fn with_pretty(self, pretty: bool) -> Self {
        Self { pretty, ..self }
    }

    pub fn with_transformer(self, transformer: Arc<dyn CrsTransformer>) -> Self {
        Self {
            transformer: Some(transformer),
            ..self
        }
    }

    pub fn with_max_allowable_offset(self, max_allowable_offset: f64) -> Self {
        Self {
            max_allowable_offset,
            ..self
        }
    }

    pub fn with_precision(self, precision: usize) -> Self {
        Self { precision, ..self }
    }

    pub fn with_swap_xy(self, swap_xy: bool) -> Self {
        Self { swap_xy, ..self }
    }

    pub fn with_force_2d(self, force_2d: bool) -> Self {
        Self { force_2d, ..self }
    }

    pub fn with_ring_reversal(self, ring_reversal: RingReversal) -> Self {
        Self {
            ring_reversal,
            ..self
        }
    }

    pub fn with_single_feature(self, single_feature: bool) -> Self {
        Self {
            single_feature,
            ..self
        }
    }

    pub fn with_crs_uri(self, crs_uri: impl Into<String>) -> Self {
        Self {
            crs_uri: Some(crs_uri.into()),
            ..self
        }
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_self_link_template(self, template: impl Into<String>) -> Self {
        Self {
            self_link_template: Some(template.into()),
            ..self
        }
    }

    pub fn with_json_fg(self, json_fg: JsonFgOptions) -> Self {
        Self {
            json_fg: Some(json_fg),
            ..self
        }
    }

    pub fn with_coordinate_buffer_capacity(self, coordinate_buffer_capacity: usize) -> Self {
        Self {
            coordinate_buffer_capacity,
            ..self
        }
    }

    /// Name of the member holding the primary geometry.
    pub fn geometry_member(&self) -> &'static str {
        match &self.json_fg {
            Some(json_fg) if json_fg.place => "place",
            _ => "geometry",
        }
    }

    /// Checks that the options describe a supported combination.
    pub fn validate(&self) -> Result<()> {
        match (self.nesting, self.multiplicity) {
            (NestingStrategy::Nest, MultiplicityStrategy::Array)
            | (NestingStrategy::Flatten, MultiplicityStrategy::Suffix) => {}
            (nesting, multiplicity) => {
                return Err(GeoJsonEncoderError::InvalidConfiguration(
                    format!("{nesting:?} nesting cannot be combined with {multiplicity:?} multiplicity")
                        .into(),
                ))
            }
        }
        if self.nesting == NestingStrategy::Flatten && self.flatten_separator.is_empty() {
            return Err(GeoJsonEncoderError::InvalidConfiguration(
                "flatten separator must not be empty".into(),
            ));
        }
        if !self.max_allowable_offset.is_finite() || self.max_allowable_offset < 0.0 {
            return Err(GeoJsonEncoderError::InvalidConfiguration(
                "max allowable offset must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let options = EncoderOptions::default();
        options.validate().unwrap();
        assert_eq!(options.geometry_member(), "geometry");
        assert_eq!(options.coordinate_buffer_capacity, 10_000);
        EncoderOptions::flattened("_").validate().unwrap();
    }

    #[test]
    fn rejects_mixed_strategies() {
        let options = EncoderOptions {
            multiplicity: MultiplicityStrategy::Suffix,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(GeoJsonEncoderError::InvalidConfiguration(_))
        ));

        let options = EncoderOptions {
            nesting: NestingStrategy::Flatten,
            ..Default::default()
        };
        assert!(options.validate().is_err());
        assert!(EncoderOptions::flattened("").validate().is_err());
    }

    #[test]
    fn deserialize_from_json() {
        let options: EncoderOptions = serde_json::from_str(
            r#"{
                "nesting": "Flatten",
                "multiplicity": "Suffix",
                "flattenSeparator": "_",
                "precision": 6,
                "swapXy": true,
                "ringReversal": "RightHandRule",
                "links": [{"href": "https://example.com/items", "rel": "self"}],
                "jsonFg": {"place": true}
            }"#,
        )
        .unwrap();
        options.validate().unwrap();
        assert_eq!(options.flatten_separator, "_");
        assert_eq!(options.precision, 6);
        assert!(options.swap_xy);
        assert!(matches!(options.ring_reversal, RingReversal::RightHandRule));
        assert_eq!(options.links, vec![Link::new("https://example.com/items", "self")]);
        assert_eq!(options.geometry_member(), "place");
        assert_eq!(options.json_fg.unwrap().conforms_to.len(), 1);
        assert!(options.transformer.is_none());
    }
}
