//! The entry points driven by the upstream parser.

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::chain::{WriterChain, WriterStage};
use crate::context::{Nesting, TransformationContext};
use crate::error::{GeoJsonEncoderError, Result};
use crate::event::{Event, FeatureProperty, FeatureType, GeometryKind, TargetMapping};
use crate::json::JsonWriter;
use crate::options::EncoderOptions;
use crate::stages;

/// Receives the typed events of a feature stream.
///
/// Calls follow the structure
/// `start (feature_start (property_start property_text* property_end | geometry_start
/// (geometry_nested_start | geometry_coordinates | geometry_nested_end)* geometry_end)*
/// feature_end)* end`.
pub trait FeatureConsumer {
    fn on_start(&mut self, number_returned: Option<u64>, number_matched: Option<u64>) -> Result<()>;

    fn on_feature_start(&mut self, feature_type: &Arc<FeatureType>) -> Result<()>;

    /// `multiplicities` holds the position of the value for every multiple segment of the
    /// property path.
    fn on_property_start(
        &mut self,
        property: &Arc<FeatureProperty>,
        multiplicities: Vec<i32>,
    ) -> Result<()>;

    /// The value of the current property. May be called any number of times.
    fn on_property_text(&mut self, text: &str) -> Result<()>;

    fn on_property_end(&mut self) -> Result<()>;

    fn on_geometry_start(
        &mut self,
        property: &Arc<FeatureProperty>,
        kind: GeometryKind,
        dimension: Option<i32>,
    ) -> Result<()>;

    fn on_geometry_nested_start(&mut self) -> Result<()>;

    /// Whitespace or comma separated coordinate values. A value may be split across calls.
    fn on_geometry_coordinates(&mut self, text: &str) -> Result<()>;

    fn on_geometry_nested_end(&mut self) -> Result<()>;

    fn on_geometry_end(&mut self) -> Result<()>;

    fn on_feature_end(&mut self) -> Result<()>;

    fn on_end(&mut self) -> Result<()>;
}

/// Encodes a feature stream as GeoJSON.
///
/// Every entry point records its arguments in the [`TransformationContext`], sets the current
/// [`Event`] and runs the writer chain. The first error closes the stream: it is returned to the
/// caller and every later call fails with [`GeoJsonEncoderError::Aborted`].
///
/// ```
/// use std::sync::Arc;
/// use geojson_encoder::{
///     EncoderOptions, FeatureConsumer, FeatureEncoder, FeatureProperty, FeatureType,
///     GeometryKind,
/// };
///
/// let feature_type = Arc::new(FeatureType::new("buildings"));
/// let id = Arc::new(FeatureProperty::id("id"));
/// let geometry = Arc::new(FeatureProperty::geometry("location"));
///
/// let mut encoder = FeatureEncoder::new(Vec::new(), EncoderOptions::default()).unwrap();
/// encoder.on_start(None, None).unwrap();
/// encoder.on_feature_start(&feature_type).unwrap();
/// encoder.on_property_start(&id, vec![]).unwrap();
/// encoder.on_property_text("42").unwrap();
/// encoder.on_property_end().unwrap();
/// encoder.on_geometry_start(&geometry, GeometryKind::Point, Some(2)).unwrap();
/// encoder.on_geometry_coordinates("7.0 50.0").unwrap();
/// encoder.on_geometry_end().unwrap();
/// encoder.on_feature_end().unwrap();
/// encoder.on_end().unwrap();
///
/// let json = String::from_utf8(encoder.into_inner()).unwrap();
/// assert!(json.contains(r#""geometry":{"type":"Point","coordinates":[7.0,50.0]}"#));
/// ```
pub struct FeatureEncoder<W: Write> {
    chain: WriterChain<W>,
    context: TransformationContext<W>,
    /// Set while the current property has no target.
    skipping: bool,
    failed: bool,
}

impl<W: Write> FeatureEncoder<W> {
    /// Creates an encoder with the built-in stages for `options`.
    pub fn new(out: W, options: EncoderOptions) -> Result<Self> {
        let stages = stages::default_stages(&options);
        Self::with_stages(out, options, stages)
    }

    /// Creates an encoder with a custom set of stages. They are sorted by priority once.
    pub fn with_stages(
        out: W,
        options: EncoderOptions,
        stages: Vec<Box<dyn WriterStage<W>>>,
    ) -> Result<Self> {
        options.validate()?;
        let json = if options.pretty {
            JsonWriter::pretty(out)
        } else {
            JsonWriter::new(out)
        };
        Ok(Self {
            chain: WriterChain::new(stages),
            context: TransformationContext::new(json, Arc::new(options)),
            skipping: false,
            failed: false,
        })
    }

    pub fn context(&self) -> &TransformationContext<W> {
        &self.context
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    /// `true` once an error has closed the stream.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.context.json.into_inner()
    }

    fn guard<F>(&mut self, operation: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if self.failed {
            return Err(GeoJsonEncoderError::Aborted);
        }
        let result = operation(self);
        if let Err(err) = &result {
            self.failed = true;
            error!(
                error = %err,
                features = self.context.state.feature_count,
                "aborting feature stream"
            );
        }
        result
    }

    fn dispatch(&mut self, event: Event) -> Result<()> {
        self.context.event = event;
        self.chain.dispatch(&mut self.context)
    }
}

impl<W: Write> FeatureConsumer for FeatureEncoder<W> {
    fn on_start(&mut self, number_returned: Option<u64>, number_matched: Option<u64>) -> Result<()> {
        self.guard(|encoder| {
            let state = &mut encoder.context.state;
            state.number_returned = number_returned;
            state.number_matched = number_matched;
            debug!(stages = ?encoder.chain.names(), "starting feature stream");
            encoder.dispatch(Event::Start)
        })
    }

    fn on_feature_start(&mut self, feature_type: &Arc<FeatureType>) -> Result<()> {
        self.guard(|encoder| {
            let state = &mut encoder.context.state;
            state.current_feature_type = Some(feature_type.clone());
            state.feature_count += 1;
            trace!(
                feature_type = %feature_type.name,
                feature = state.feature_count,
                "feature start"
            );
            encoder.dispatch(Event::FeatureStart)
        })
    }

    fn on_property_start(
        &mut self,
        property: &Arc<FeatureProperty>,
        multiplicities: Vec<i32>,
    ) -> Result<()> {
        self.guard(|encoder| {
            if matches!(property.mapping, None | Some(TargetMapping::Geometry)) {
                trace!(property = %property.name, "skipping unmapped property");
                encoder.skipping = true;
                return Ok(());
            }
            let state = &mut encoder.context.state;
            state.current_property = Some(property.clone());
            state.current_value = None;
            state.multiplicities = multiplicities;
            Ok(())
        })
    }

    fn on_property_text(&mut self, text: &str) -> Result<()> {
        self.guard(|encoder| {
            if encoder.skipping {
                return Ok(());
            }
            encoder
                .context
                .state
                .current_value
                .get_or_insert_with(String::new)
                .push_str(text);
            Ok(())
        })
    }

    fn on_property_end(&mut self) -> Result<()> {
        self.guard(|encoder| {
            if encoder.skipping {
                encoder.skipping = false;
                return Ok(());
            }
            let result = encoder.dispatch(Event::Property);
            encoder.context.state.clear_property();
            result
        })
    }

    fn on_geometry_start(
        &mut self,
        property: &Arc<FeatureProperty>,
        kind: GeometryKind,
        dimension: Option<i32>,
    ) -> Result<()> {
        self.guard(|encoder| {
            let state = &mut encoder.context.state;
            state.current_property = Some(property.clone());
            state.current_geometry_kind = Some(kind);
            state.current_dimension = match dimension {
                Some(3) => 3,
                _ => 2,
            };
            state.current_value = None;
            state.nesting.clear();
            state.nesting_change = 0;
            Ok(())
        })
    }

    fn on_geometry_nested_start(&mut self) -> Result<()> {
        self.guard(|encoder| {
            let state = &mut encoder.context.state;
            state.nesting.push(Nesting::Open);
            state.nesting_change += 1;
            Ok(())
        })
    }

    fn on_geometry_coordinates(&mut self, text: &str) -> Result<()> {
        self.guard(|encoder| {
            let state = &mut encoder.context.state;
            if state.current_geometry_kind.is_none() {
                return Err(GeoJsonEncoderError::InvalidStructure(
                    "coordinates outside of a geometry",
                ));
            }
            let value = state.current_value.get_or_insert_with(String::new);
            value.clear();
            value.push_str(text);

            let result = encoder.dispatch(Event::Coordinates);
            let state = &mut encoder.context.state;
            state.nesting.clear();
            state.nesting_change = 0;
            result
        })
    }

    fn on_geometry_nested_end(&mut self) -> Result<()> {
        self.guard(|encoder| {
            let state = &mut encoder.context.state;
            state.nesting.push(Nesting::Close);
            state.nesting_change -= 1;
            Ok(())
        })
    }

    fn on_geometry_end(&mut self) -> Result<()> {
        self.guard(|encoder| {
            let result = encoder.dispatch(Event::GeometryEnd);
            encoder.context.state.clear_geometry();
            result
        })
    }

    fn on_feature_end(&mut self) -> Result<()> {
        self.guard(|encoder| {
            let result = encoder.dispatch(Event::FeatureEnd);
            encoder.context.state.current_feature_type = None;
            result
        })
    }

    fn on_end(&mut self) -> Result<()> {
        self.guard(|encoder| {
            encoder.dispatch(Event::End)?;
            encoder.context.json.flush()?;
            debug!(
                features = encoder.context.state.feature_count,
                "finished feature stream"
            );
            Ok(())
        })
    }
}
