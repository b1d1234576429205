use std::io::Write;

use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::chain::{Next, WriterStage};
use crate::context::TransformationContext;
use crate::error::{GeoJsonEncoderError, Result};
use crate::event::{FeatureProperty, PathSegment, TargetMapping, ValueType};
use crate::json::{JsonSink, TokenBuffer};
use crate::options::{EncoderOptions, NestingStrategy};
use crate::stages::PROPERTIES_PRIORITY;

type Members = IndexMap<String, Node>;

/// A member of the `properties` object, staged until the end of the feature.
#[derive(Debug, Clone)]
enum Node {
    Value(TokenBuffer),
    Object(Members),
    /// The elements of a multiple path segment, keyed by their position.
    Array(Vec<(i32, Node)>),
}

impl Node {
    fn object() -> Self {
        Node::Object(Members::new())
    }

    fn array() -> Self {
        Node::Array(Vec::new())
    }

    fn write<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        match self {
            Node::Value(value) => value.replay_into(sink),
            Node::Object(members) => {
                sink.start_object()?;
                for (name, node) in members.iter_mut() {
                    sink.field_name(name)?;
                    node.write(sink)?;
                }
                sink.end_object()
            }
            Node::Array(elements) => {
                sink.start_array()?;
                for (_, node) in elements.iter_mut() {
                    node.write(sink)?;
                }
                sink.end_array()
            }
        }
    }
}

/// The members of `node`. A node of another shape is replaced by an empty object.
fn as_object<'a>(node: &'a mut Node, name: &str) -> &'a mut Members {
    if !matches!(node, Node::Object(_)) {
        warn!(member = name, "replacing value with nested object");
        *node = Node::object();
    }
    let Node::Object(members) = node else {
        unreachable!()
    };
    members
}

/// The elements of `node`. A node of another shape is replaced by an empty array.
fn as_array<'a>(node: &'a mut Node, name: &str) -> &'a mut Vec<(i32, Node)> {
    if !matches!(node, Node::Array(_)) {
        warn!(member = name, "replacing value with array");
        *node = Node::array();
    }
    let Node::Array(elements) = node else {
        unreachable!()
    };
    elements
}

/// Writes the `properties` object.
///
/// Members are collected per feature into a tree keyed by property path and written at the end
/// of the feature. Properties that share a parent end up in the same object however they are
/// interleaved with other properties or the geometry.
#[derive(Debug, Clone)]
pub struct PropertiesStage {
    nesting: NestingStrategy,
    separator: String,
    members: Members,
}

impl PropertiesStage {
    pub fn new(options: &EncoderOptions) -> Self {
        Self {
            nesting: options.nesting,
            separator: options.flatten_separator.clone(),
            members: Members::new(),
        }
    }

    fn insert_nested(&mut self, path: &[PathSegment], multiplicities: &[i32], value: Node) {
        let Some((leaf, parents)) = path.split_last() else {
            return;
        };
        let mut indices = multiplicities.iter().copied();
        let mut members = &mut self.members;
        for segment in parents {
            let empty: fn() -> Node = if segment.multiple {
                Node::array
            } else {
                Node::object
            };
            let node = members.entry(segment.name.clone()).or_insert_with(empty);
            members = if segment.multiple {
                let index = indices.next().unwrap_or(1);
                let elements = as_array(node, &segment.name);
                let position = match elements.iter().position(|(i, _)| *i == index) {
                    Some(position) => position,
                    None => {
                        elements.push((index, Node::object()));
                        elements.len() - 1
                    }
                };
                as_object(&mut elements[position].1, &segment.name)
            } else {
                as_object(node, &segment.name)
            };
        }

        if leaf.multiple {
            let index = indices.next().unwrap_or(1);
            let node = members.entry(leaf.name.clone()).or_insert_with(Node::array);
            as_array(node, &leaf.name).push((index, value));
        } else {
            members.insert(leaf.name.clone(), value);
        }
    }

    fn flattened_key(&self, path: &[PathSegment], multiplicities: &[i32]) -> String {
        let mut indices = multiplicities.iter().copied();
        let mut key = String::new();
        for segment in path {
            if !key.is_empty() {
                key.push_str(&self.separator);
            }
            key.push_str(&segment.name);
            if segment.multiple {
                key.push_str(&self.separator);
                key.push_str(&indices.next().unwrap_or(1).to_string());
            }
        }
        key
    }

    fn insert(
        &mut self,
        property: &FeatureProperty,
        multiplicities: &[i32],
        value_type: ValueType,
        text: &str,
    ) -> Result<()> {
        let mut value = TokenBuffer::new();
        write_value(&mut value, &property.name, value_type, text)?;
        let value = Node::Value(value);

        let single;
        let path = if property.path.is_empty() {
            single = [PathSegment::single(property.name.as_str())];
            &single[..]
        } else {
            &property.path[..]
        };
        match self.nesting {
            NestingStrategy::Nest => self.insert_nested(path, multiplicities, value),
            NestingStrategy::Flatten => {
                let key = self.flattened_key(path, multiplicities);
                self.members.insert(key, value);
            }
        }
        Ok(())
    }
}

/// Writes `text` as a JSON value of `value_type`. Numbers and booleans that do not parse are
/// written as strings.
fn write_value<S: JsonSink + ?Sized>(
    sink: &mut S,
    name: &str,
    value_type: ValueType,
    text: &str,
) -> Result<()> {
    match value_type {
        ValueType::String => sink.string_value(text),
        ValueType::Integer | ValueType::Float => {
            let trimmed = text.trim();
            match serde_json::from_str::<serde_json::Number>(trimmed) {
                Ok(number)
                    if value_type == ValueType::Float || number.is_i64() || number.is_u64() =>
                {
                    sink.raw_value(trimmed)
                }
                _ => {
                    warn!(property = name, value = text, ?value_type, "writing value as string");
                    sink.string_value(text)
                }
            }
        }
        ValueType::Boolean => match text.trim() {
            "true" | "1" => sink.bool_value(true),
            "false" | "0" => sink.bool_value(false),
            _ => {
                warn!(property = name, value = text, ?value_type, "writing value as string");
                sink.string_value(text)
            }
        },
        ValueType::Json => {
            let parsed: serde_json::Value =
                serde_json::from_str(text).map_err(|err| GeoJsonEncoderError::InvalidProperty {
                    name: name.to_string(),
                    message: err.to_string(),
                })?;
            sink.raw_value(&serde_json::to_string(&parsed)?)
        }
    }
}

impl<W: Write> WriterStage<W> for PropertiesStage {
    fn name(&self) -> &'static str {
        "properties"
    }

    fn priority(&self) -> i32 {
        PROPERTIES_PRIORITY
    }

    fn on_feature_start(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        self.members.clear();
        next.run(ctx)
    }

    fn on_property(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        let state = &ctx.state;
        if let Some(property) = state.property() {
            if let Some(TargetMapping::Value(value_type)) = property.mapping {
                match state.value() {
                    Some(text) => self.insert(property, &state.multiplicities, value_type, text)?,
                    None => trace!(property = %property.name, "skipping property without value"),
                }
            }
        }
        next.run(ctx)
    }

    fn on_feature_end(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        if self.members.is_empty() {
            ctx.json.null_field("properties")?;
        } else {
            let mut properties = Node::Object(std::mem::take(&mut self.members));
            ctx.json.field_name("properties")?;
            properties.write(&mut ctx.json)?;
        }
        next.run(ctx)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::test::{encode, feature_type};
    use crate::{FeatureConsumer, FeatureEncoder, GeometryKind};

    fn encode_feature<F>(options: EncoderOptions, events: F) -> Result<serde_json::Value>
    where
        F: FnOnce(&mut FeatureEncoder<Vec<u8>>) -> Result<()>,
    {
        let mut encoder = FeatureEncoder::new(Vec::new(), options.with_single_feature(true))?;
        encoder.on_start(None, None)?;
        encoder.on_feature_start(&feature_type())?;
        events(&mut encoder)?;
        encoder.on_feature_end()?;
        encoder.on_end()?;
        Ok(serde_json::from_slice(&encoder.into_inner())?)
    }

    fn send(
        encoder: &mut FeatureEncoder<Vec<u8>>,
        property: &Arc<FeatureProperty>,
        multiplicities: Vec<i32>,
        text: &str,
    ) -> Result<()> {
        encoder.on_property_start(property, multiplicities)?;
        encoder.on_property_text(text)?;
        encoder.on_property_end()
    }

    fn address(leaf: &str) -> Arc<FeatureProperty> {
        Arc::new(
            FeatureProperty::value(format!("address.{leaf}"), ValueType::String).with_path(vec![
                PathSegment::multiple("address"),
                PathSegment::single(leaf),
            ]),
        )
    }

    fn building(options: EncoderOptions) -> serde_json::Value {
        let name = Arc::new(FeatureProperty::value("name", ValueType::String));
        let street = address("street");
        let city = address("city");
        let tags = Arc::new(
            FeatureProperty::value("tags", ValueType::String)
                .with_path(vec![PathSegment::multiple("tags")]),
        );
        let height = Arc::new(FeatureProperty::value("height", ValueType::Float));
        let geometry = Arc::new(FeatureProperty::geometry("geom"));

        let feature = encode_feature(options, |encoder| {
            send(encoder, &name, vec![], "Rathaus")?;
            send(encoder, &street, vec![1], "Markt 1")?;
            send(encoder, &city, vec![1], "Bonn")?;
            send(encoder, &street, vec![2], "Hauptstr. 2")?;
            send(encoder, &tags, vec![1], "historic")?;
            send(encoder, &tags, vec![2], "public")?;
            encoder.on_geometry_start(&geometry, GeometryKind::Point, None)?;
            encoder.on_geometry_coordinates("7 50")?;
            encoder.on_geometry_end()?;
            send(encoder, &height, vec![], "12.5")
        })
        .unwrap();
        feature["properties"].clone()
    }

    #[test]
    fn nest_and_array() {
        assert_eq!(
            building(EncoderOptions::default()),
            serde_json::json!({
                "name": "Rathaus",
                "address": [
                    {"street": "Markt 1", "city": "Bonn"},
                    {"street": "Hauptstr. 2"}
                ],
                "tags": ["historic", "public"],
                "height": 12.5
            })
        );
    }

    #[test]
    fn flatten_and_suffix() {
        assert_eq!(
            building(EncoderOptions::flattened(".")),
            serde_json::json!({
                "name": "Rathaus",
                "address.1.street": "Markt 1",
                "address.1.city": "Bonn",
                "address.2.street": "Hauptstr. 2",
                "tags.1": "historic",
                "tags.2": "public",
                "height": 12.5
            })
        );
    }

    #[test]
    fn properties_after_geometry_stay_in_one_object() {
        let json = encode(EncoderOptions::default(), |encoder| {
            let first = Arc::new(FeatureProperty::value("first", ValueType::Integer));
            let last = Arc::new(FeatureProperty::value("last", ValueType::Integer));
            let geometry = Arc::new(FeatureProperty::geometry("geom"));
            encoder.on_start(None, None)?;
            encoder.on_feature_start(&feature_type())?;
            send(encoder, &first, vec![], "1")?;
            encoder.on_geometry_start(&geometry, GeometryKind::Point, None)?;
            encoder.on_geometry_coordinates("7 50")?;
            encoder.on_geometry_end()?;
            send(encoder, &last, vec![], "2")?;
            encoder.on_feature_end()?;
            encoder.on_end()
        });
        assert!(json.contains(r#""properties":{"first":1,"last":2}"#));
    }

    #[test]
    fn typed_values() {
        let count = Arc::new(FeatureProperty::value("count", ValueType::Integer));
        let ratio = Arc::new(FeatureProperty::value("ratio", ValueType::Float));
        let open = Arc::new(FeatureProperty::value("open", ValueType::Boolean));
        let closed = Arc::new(FeatureProperty::value("closed", ValueType::Boolean));
        let extra = Arc::new(FeatureProperty::value("extra", ValueType::Json));
        let broken = Arc::new(FeatureProperty::value("broken", ValueType::Integer));
        let quote = Arc::new(FeatureProperty::value("quote", ValueType::String));

        let feature = encode_feature(EncoderOptions::default(), |encoder| {
            send(encoder, &count, vec![], " 42 ")?;
            send(encoder, &ratio, vec![], "-1.5e3")?;
            send(encoder, &open, vec![], "1")?;
            send(encoder, &closed, vec![], "false")?;
            send(encoder, &extra, vec![], "{\"a\": [1, 2]}")?;
            send(encoder, &broken, vec![], "4.5")?;
            send(encoder, &quote, vec![], "say \"hi\"")
        })
        .unwrap();
        assert_eq!(
            feature["properties"],
            serde_json::json!({
                "count": 42,
                "ratio": -1500.0,
                "open": true,
                "closed": false,
                "extra": {"a": [1, 2]},
                "broken": "4.5",
                "quote": "say \"hi\""
            })
        );
    }

    #[test]
    fn invalid_json_value() {
        let extra = Arc::new(FeatureProperty::value("extra", ValueType::Json));
        let result = encode_feature(EncoderOptions::default(), |encoder| {
            send(encoder, &extra, vec![], "{not json")
        });
        assert!(matches!(
            result,
            Err(GeoJsonEncoderError::InvalidProperty { name, .. }) if name == "extra"
        ));
    }

    #[test]
    fn property_without_value_is_skipped() {
        let name = Arc::new(FeatureProperty::value("name", ValueType::String));
        let feature = encode_feature(EncoderOptions::default(), |encoder| {
            encoder.on_property_start(&name, vec![])?;
            encoder.on_property_end()
        })
        .unwrap();
        assert_eq!(feature["properties"], serde_json::Value::Null);
    }

    #[test]
    fn interleaved_members_share_their_parent() {
        let name = Arc::new(FeatureProperty::value("name", ValueType::String));
        let json = encode(EncoderOptions::default().with_single_feature(true), |encoder| {
            encoder.on_start(None, None)?;
            encoder.on_feature_start(&feature_type())?;
            send(encoder, &address("street"), vec![1], "Markt 1")?;
            send(encoder, &name, vec![], "Rathaus")?;
            send(encoder, &address("city"), vec![1], "Bonn")?;
            send(encoder, &address("street"), vec![2], "Hauptstr. 2")?;
            encoder.on_feature_end()?;
            encoder.on_end()
        });
        assert_eq!(json.matches(r#""address""#).count(), 1);
        let feature: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            feature["properties"],
            serde_json::json!({
                "address": [
                    {"street": "Markt 1", "city": "Bonn"},
                    {"street": "Hauptstr. 2"}
                ],
                "name": "Rathaus"
            })
        );
    }

    #[test]
    fn interleaved_members_in_document_order() {
        let street = Arc::new(
            FeatureProperty::value("street", ValueType::String).with_path(vec![
                PathSegment::single("address"),
                PathSegment::single("street"),
            ]),
        );
        let city = Arc::new(
            FeatureProperty::value("city", ValueType::String).with_path(vec![
                PathSegment::single("address"),
                PathSegment::single("city"),
            ]),
        );
        let name = Arc::new(FeatureProperty::value("name", ValueType::String));

        let json = encode(EncoderOptions::default(), |encoder| {
            encoder.on_start(None, None)?;
            encoder.on_feature_start(&feature_type())?;
            send(encoder, &street, vec![], "Markt")?;
            send(encoder, &name, vec![], "Rathaus")?;
            send(encoder, &city, vec![], "Bonn")?;
            encoder.on_feature_end()?;
            encoder.on_end()
        });
        assert!(json.contains(
            r#""properties":{"address":{"street":"Markt","city":"Bonn"},"name":"Rathaus"}"#
        ));
    }

    #[test]
    fn nested_objects_close_between_features() {
        let street = Arc::new(
            FeatureProperty::value("street", ValueType::String).with_path(vec![
                PathSegment::single("address"),
                PathSegment::single("street"),
            ]),
        );
        let json = encode(EncoderOptions::default(), |encoder| {
            encoder.on_start(None, None)?;
            for value in ["a", "b"] {
                encoder.on_feature_start(&feature_type())?;
                send(encoder, &street, vec![], value)?;
                encoder.on_feature_end()?;
            }
            encoder.on_end()
        });
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["features"][1]["properties"],
            serde_json::json!({"address": {"street": "b"}})
        );
    }
}
