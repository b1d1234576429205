//! The mutable state shared by all writer stages of one feature stream.

use std::io::Write;
use std::sync::Arc;

use crate::event::{Event, FeatureProperty, FeatureType, GeometryKind};
use crate::json::JsonWriter;
use crate::options::EncoderOptions;

/// A nesting operation reported by the upstream parser between two coordinate events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    Open,
    Close,
}

/// Per-stream record of what the upstream parser reported last.
///
/// `current_geometry_kind` is only set between geometry start and end, `current_value` is
/// cleared at the end of every property and geometry.
#[derive(Debug, Clone, Default)]
pub struct TransformationState {
    pub current_feature_type: Option<Arc<FeatureType>>,
    pub current_property: Option<Arc<FeatureProperty>>,
    pub current_value: Option<String>,
    pub current_geometry_kind: Option<GeometryKind>,
    /// Dimension of the current geometry, 2 or 3.
    pub current_dimension: usize,
    /// Net number of arrays opened since the last coordinates.
    pub nesting_change: i32,
    /// The nesting operations since the last coordinates, in order.
    pub nesting: Vec<Nesting>,
    pub multiplicities: Vec<i32>,
    pub number_returned: Option<u64>,
    pub number_matched: Option<u64>,
    /// Number of features started so far.
    pub feature_count: u64,
}

impl TransformationState {
    pub fn value(&self) -> Option<&str> {
        self.current_value.as_deref()
    }

    pub fn property(&self) -> Option<&FeatureProperty> {
        self.current_property.as_deref()
    }

    pub(crate) fn clear_property(&mut self) {
        self.current_property = None;
        self.current_value = None;
        self.multiplicities.clear();
    }

    pub(crate) fn clear_geometry(&mut self) {
        self.current_property = None;
        self.current_value = None;
        self.current_geometry_kind = None;
        self.nesting.clear();
        self.nesting_change = 0;
    }
}

/// What every writer stage receives: the current event, the stream state and the output.
pub struct TransformationContext<W: Write> {
    pub(crate) event: Event,
    pub state: TransformationState,
    pub json: JsonWriter<W>,
    options: Arc<EncoderOptions>,
}

impl<W: Write> TransformationContext<W> {
    pub fn new(json: JsonWriter<W>, options: Arc<EncoderOptions>) -> Self {
        Self {
            event: Event::Start,
            state: TransformationState::default(),
            json,
            options,
        }
    }

    /// The event currently travelling through the chain.
    pub fn event(&self) -> Event {
        self.event
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn is_buffering(&self) -> bool {
        self.json.is_buffering()
    }
}
