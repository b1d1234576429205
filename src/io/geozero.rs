//! Drives a [`FeatureConsumer`] from any [`geozero`] datasource.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use std::sync::Arc;

use geozero::error::{GeozeroError, Result as GeozeroResult};
use geozero::{ColumnValue, FeatureProcessor, GeomProcessor, GeozeroDatasource, PropertyProcessor};

use crate::encoder::{FeatureConsumer, FeatureEncoder};
use crate::error::Result;
use crate::event::{FeatureProperty, FeatureType, GeometryKind, TargetMapping, ValueType};
use crate::options::EncoderOptions;

/// Translates geozero processor callbacks into feature stream events.
///
/// Geometries are reported with two dimensions. Geometry collections have no counterpart in the
/// event model and are reported as [`GeometryKind::Unknown`].
pub struct GeozeroFeatureAdapter<'a, C: FeatureConsumer> {
    consumer: &'a mut C,
    feature_type: Arc<FeatureType>,
    geometry: Arc<FeatureProperty>,
    id_property: Option<String>,
    properties: HashMap<String, Arc<FeatureProperty>>,
    coordinates: String,
    /// Number of open geometry parts.
    depth: usize,
    /// Number of open geometry collections.
    collections: usize,
}

impl<'a, C: FeatureConsumer> GeozeroFeatureAdapter<'a, C> {
    pub fn new(consumer: &'a mut C, feature_type: FeatureType) -> Self {
        Self {
            consumer,
            feature_type: Arc::new(feature_type),
            geometry: Arc::new(FeatureProperty::geometry("geometry")),
            id_property: None,
            properties: HashMap::new(),
            coordinates: String::with_capacity(1024),
            depth: 0,
            collections: 0,
        }
    }

    /// The source property written as the feature `id`.
    pub fn with_id_property(self, name: impl Into<String>) -> Self {
        Self {
            id_property: Some(name.into()),
            ..self
        }
    }

    fn property_for(&mut self, name: &str, value_type: ValueType) -> Arc<FeatureProperty> {
        if let Some(property) = self.properties.get(name) {
            if property.is_id() || property.mapping == Some(TargetMapping::Value(value_type)) {
                return property.clone();
            }
        }
        let property = if self.id_property.as_deref() == Some(name) {
            FeatureProperty::id(name)
        } else {
            FeatureProperty::value(name, value_type)
        };
        let property = Arc::new(property);
        self.properties.insert(name.to_string(), property.clone());
        property
    }

    fn flush_coordinates(&mut self) -> GeozeroResult<()> {
        if !self.coordinates.is_empty() {
            self.consumer.on_geometry_coordinates(&self.coordinates)?;
            self.coordinates.clear();
        }
        Ok(())
    }

    fn open(&mut self, kind: GeometryKind) -> GeozeroResult<()> {
        if self.collections == 0 {
            if self.depth == 0 {
                self.consumer
                    .on_geometry_start(&self.geometry, kind, Some(2))?;
            } else {
                self.flush_coordinates()?;
                self.consumer.on_geometry_nested_start()?;
            }
        }
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self) -> GeozeroResult<()> {
        self.depth = self.depth.saturating_sub(1);
        if self.collections > 0 {
            return Ok(());
        }
        self.flush_coordinates()?;
        if self.depth == 0 {
            self.consumer.on_geometry_end()?;
        } else {
            self.consumer.on_geometry_nested_end()?;
        }
        Ok(())
    }
}

/// The text and declared type of a property value. Binary values have no text form.
fn column_text(value: &ColumnValue) -> Option<(ValueType, String)> {
    let typed = match value {
        ColumnValue::Byte(v) => (ValueType::Integer, v.to_string()),
        ColumnValue::UByte(v) => (ValueType::Integer, v.to_string()),
        ColumnValue::Short(v) => (ValueType::Integer, v.to_string()),
        ColumnValue::UShort(v) => (ValueType::Integer, v.to_string()),
        ColumnValue::Int(v) => (ValueType::Integer, v.to_string()),
        ColumnValue::UInt(v) => (ValueType::Integer, v.to_string()),
        ColumnValue::Long(v) => (ValueType::Integer, v.to_string()),
        ColumnValue::ULong(v) => (ValueType::Integer, v.to_string()),
        ColumnValue::Float(v) => (ValueType::Float, v.to_string()),
        ColumnValue::Double(v) => (ValueType::Float, v.to_string()),
        ColumnValue::Bool(v) => (ValueType::Boolean, v.to_string()),
        ColumnValue::String(v) | ColumnValue::DateTime(v) => (ValueType::String, v.to_string()),
        ColumnValue::Json(v) => (ValueType::Json, v.to_string()),
        ColumnValue::Binary(_) => return None,
    };
    Some(typed)
}

impl<C: FeatureConsumer> FeatureProcessor for GeozeroFeatureAdapter<'_, C> {
    fn dataset_begin(&mut self, _name: Option<&str>) -> GeozeroResult<()> {
        self.consumer.on_start(None, None).map_err(Into::into)
    }

    fn dataset_end(&mut self) -> GeozeroResult<()> {
        self.consumer.on_end().map_err(Into::into)
    }

    fn feature_begin(&mut self, _idx: u64) -> GeozeroResult<()> {
        self.consumer.on_feature_start(&self.feature_type).map_err(Into::into)
    }

    fn feature_end(&mut self, _idx: u64) -> GeozeroResult<()> {
        self.consumer.on_feature_end().map_err(Into::into)
    }
}

impl<C: FeatureConsumer> PropertyProcessor for GeozeroFeatureAdapter<'_, C> {
    fn property(&mut self, _idx: usize, name: &str, value: &ColumnValue) -> GeozeroResult<bool> {
        let Some((value_type, text)) = column_text(value) else {
            return Ok(false);
        };
        let property = self.property_for(name, value_type);
        self.consumer.on_property_start(&property, vec![])?;
        self.consumer.on_property_text(&text)?;
        self.consumer.on_property_end()?;
        Ok(false)
    }
}

impl<C: FeatureConsumer> GeomProcessor for GeozeroFeatureAdapter<'_, C> {
    fn xy(&mut self, x: f64, y: f64, _idx: usize) -> GeozeroResult<()> {
        if self.collections > 0 {
            return Ok(());
        }
        write!(self.coordinates, "{x} {y} ")
            .map_err(|err| GeozeroError::Geometry(err.to_string()))
    }

    fn empty_point(&mut self, _idx: usize) -> GeozeroResult<()> {
        if self.collections == 0 && self.depth == 0 {
            self.consumer
                .on_geometry_start(&self.geometry, GeometryKind::Point, Some(2))?;
            self.consumer.on_geometry_end()?;
        }
        Ok(())
    }

    fn point_begin(&mut self, _idx: usize) -> GeozeroResult<()> {
        self.open(GeometryKind::Point)
    }

    fn point_end(&mut self, _idx: usize) -> GeozeroResult<()> {
        self.close()
    }

    fn multipoint_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        self.open(GeometryKind::MultiPoint)
    }

    fn multipoint_end(&mut self, _idx: usize) -> GeozeroResult<()> {
        self.close()
    }

    fn linestring_begin(&mut self, _tagged: bool, _size: usize, _idx: usize) -> GeozeroResult<()> {
        self.open(GeometryKind::LineString)
    }

    fn linestring_end(&mut self, _tagged: bool, _idx: usize) -> GeozeroResult<()> {
        self.close()
    }

    fn multilinestring_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        self.open(GeometryKind::MultiLineString)
    }

    fn multilinestring_end(&mut self, _idx: usize) -> GeozeroResult<()> {
        self.close()
    }

    fn polygon_begin(&mut self, _tagged: bool, _size: usize, _idx: usize) -> GeozeroResult<()> {
        self.open(GeometryKind::Polygon)
    }

    fn polygon_end(&mut self, _tagged: bool, _idx: usize) -> GeozeroResult<()> {
        self.close()
    }

    fn multipolygon_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        self.open(GeometryKind::MultiPolygon)
    }

    fn multipolygon_end(&mut self, _idx: usize) -> GeozeroResult<()> {
        self.close()
    }

    fn geometrycollection_begin(&mut self, _size: usize, _idx: usize) -> GeozeroResult<()> {
        if self.collections == 0 && self.depth == 0 {
            self.consumer
                .on_geometry_start(&self.geometry, GeometryKind::Unknown, Some(2))?;
        }
        self.collections += 1;
        self.depth += 1;
        Ok(())
    }

    fn geometrycollection_end(&mut self, _idx: usize) -> GeozeroResult<()> {
        self.collections = self.collections.saturating_sub(1);
        self.depth = self.depth.saturating_sub(1);
        if self.collections == 0 && self.depth == 0 {
            self.consumer.on_geometry_end()?;
        }
        Ok(())
    }
}

/// Encodes all features of a geozero datasource and returns the output.
///
/// ```
/// use geojson_encoder::io::geozero::encode_datasource;
/// use geojson_encoder::EncoderOptions;
/// use geozero::geojson::GeoJsonReader;
///
/// let input = r#"{"type": "FeatureCollection", "features": [
///     {"type": "Feature", "properties": {"name": "a"},
///      "geometry": {"type": "Point", "coordinates": [7.0, 50.0]}}
/// ]}"#;
/// let output = encode_datasource(
///     &mut GeoJsonReader(input.as_bytes()),
///     Vec::new(),
///     EncoderOptions::default(),
///     "places",
///     None,
/// )
/// .unwrap();
/// let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
/// assert_eq!(value["features"][0]["properties"]["name"], "a");
/// ```
pub fn encode_datasource<D, W>(
    datasource: &mut D,
    out: W,
    options: EncoderOptions,
    feature_type: &str,
    id_property: Option<&str>,
) -> Result<W>
where
    D: GeozeroDatasource,
    W: Write,
{
    let mut encoder = FeatureEncoder::new(out, options)?;
    let mut adapter = GeozeroFeatureAdapter::new(&mut encoder, FeatureType::new(feature_type));
    if let Some(id_property) = id_property {
        adapter = adapter.with_id_property(id_property);
    }
    datasource.process(&mut adapter)?;
    Ok(encoder.into_inner())
}
