use std::io::Write;

use chrono::NaiveDate;

use crate::chain::{Next, WriterStage};
use crate::context::TransformationContext;
use crate::error::Result;
use crate::event::TargetMapping;
use crate::json::JsonSink;
use crate::options::{EncoderOptions, JsonFgOptions};
use crate::stages::JSON_FG_PRIORITY;

/// Writes the JSON-FG members `conformsTo`, `featureType` and `time`, plus the `geometry` or
/// `place` member the geometry stage does not own.
#[derive(Debug, Clone)]
pub struct JsonFgStage {
    options: JsonFgOptions,
    single_feature: bool,
    instant: Option<String>,
}

impl JsonFgStage {
    pub fn new(options: JsonFgOptions, encoder_options: &EncoderOptions) -> Self {
        Self {
            options,
            single_feature: encoder_options.single_feature,
            instant: None,
        }
    }

    fn write_conforms_to<S: JsonSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        if self.options.conforms_to.is_empty() {
            return Ok(());
        }
        sink.field_name("conformsTo")?;
        sink.start_array()?;
        for uri in &self.options.conforms_to {
            sink.string_value(uri)?;
        }
        sink.end_array()
    }

    fn write_time<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let Some(instant) = self.instant.take() else {
            return sink.null_field("time");
        };
        sink.field_name("time")?;
        sink.start_object()?;
        if is_calendar_date(&instant) {
            sink.string_field("date", &instant)?;
        } else {
            sink.string_field("timestamp", &instant)?;
        }
        sink.end_object()
    }
}

/// `true` for a plain `YYYY-MM-DD` date such as `2024-05-01`.
fn is_calendar_date(instant: &str) -> bool {
    instant.len() == 10 && NaiveDate::parse_from_str(instant, "%Y-%m-%d").is_ok()
}

impl<W: Write> WriterStage<W> for JsonFgStage {
    fn name(&self) -> &'static str {
        "json-fg"
    }

    fn priority(&self) -> i32 {
        JSON_FG_PRIORITY
    }

    fn on_start(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        if !self.single_feature {
            self.write_conforms_to(&mut ctx.json)?;
        }
        next.run(ctx)
    }

    fn on_feature_start(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        self.instant = None;
        if self.single_feature {
            self.write_conforms_to(&mut ctx.json)?;
        }
        if let Some(feature_type) = &ctx.state.current_feature_type {
            ctx.json.string_field("featureType", &feature_type.name)?;
        }
        next.run(ctx)
    }

    fn on_property(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        let is_instant = ctx
            .state
            .property()
            .is_some_and(|property| property.mapping == Some(TargetMapping::Instant));
        if is_instant && self.instant.is_none() {
            self.instant = ctx.state.value().map(|value| value.trim().to_string());
        }
        next.run(ctx)
    }

    fn on_feature_end(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        self.write_time(&mut ctx.json)?;
        if self.options.place {
            ctx.json.null_field("geometry")?;
        } else {
            ctx.json.null_field("place")?;
        }
        next.run(ctx)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::is_calendar_date;
    use crate::options::JsonFgOptions;
    use crate::test::{encode, feature_type};
    use crate::{EncoderOptions, FeatureConsumer, FeatureProperty, GeometryKind, TargetMapping};

    fn encode_with_instant(place: bool, instant: Option<&str>) -> serde_json::Value {
        let json_fg = JsonFgOptions {
            place,
            ..Default::default()
        };
        let when = Arc::new(FeatureProperty::new("when", Some(TargetMapping::Instant)));
        let geometry = Arc::new(FeatureProperty::geometry("geom"));
        let json = encode(EncoderOptions::default().with_json_fg(json_fg), |encoder| {
            encoder.on_start(None, None)?;
            encoder.on_feature_start(&feature_type())?;
            if let Some(instant) = instant {
                encoder.on_property_start(&when, vec![])?;
                encoder.on_property_text(instant)?;
                encoder.on_property_end()?;
            }
            encoder.on_geometry_start(&geometry, GeometryKind::Point, None)?;
            encoder.on_geometry_coordinates("500000 5700000")?;
            encoder.on_geometry_end()?;
            encoder.on_feature_end()?;
            encoder.on_end()
        });
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn members() {
        let value = encode_with_instant(false, Some("2024-05-01"));
        assert_eq!(
            value["conformsTo"][0],
            "http://www.opengis.net/spec/json-fg-1/0.2/conf/core"
        );
        let feature = &value["features"][0];
        assert_eq!(feature["featureType"], "buildings");
        assert_eq!(feature["time"], serde_json::json!({"date": "2024-05-01"}));
        assert_eq!(feature["place"], serde_json::Value::Null);
        assert_eq!(feature["geometry"]["type"], "Point");
    }

    #[test]
    fn place_mode() {
        let value = encode_with_instant(true, Some("2024-05-01T10:00:00Z"));
        let feature = &value["features"][0];
        assert_eq!(
            feature["time"],
            serde_json::json!({"timestamp": "2024-05-01T10:00:00Z"})
        );
        assert_eq!(feature["geometry"], serde_json::Value::Null);
        assert_eq!(
            feature["place"]["coordinates"],
            serde_json::json!([500000.0, 5700000.0])
        );
        assert!(feature.as_object().unwrap().contains_key("geometry"));
    }

    #[test]
    fn only_calendar_dates_are_dates() {
        assert!(is_calendar_date("2024-05-01"));
        assert!(!is_calendar_date("1714550400"));
        assert!(!is_calendar_date("2024-13-01"));
        assert!(!is_calendar_date("2024/05/01"));

        let value = encode_with_instant(false, Some("1714550400"));
        assert_eq!(
            value["features"][0]["time"],
            serde_json::json!({"timestamp": "1714550400"})
        );
    }

    #[test]
    fn missing_instant() {
        let value = encode_with_instant(false, None);
        assert!(value["features"][0]
            .as_object()
            .unwrap()
            .get("time")
            .is_some_and(|time| time.is_null()));
    }
}
