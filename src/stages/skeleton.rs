use std::io::Write;

use crate::chain::{Next, WriterStage};
use crate::context::TransformationContext;
use crate::error::Result;
use crate::json::JsonSink;
use crate::options::EncoderOptions;
use crate::stages::SKELETON_PRIORITY;

/// Writes the `FeatureCollection` and `Feature` objects every other stage writes into.
#[derive(Debug, Clone, Default)]
pub struct SkeletonStage {
    single_feature: bool,
}

impl SkeletonStage {
    pub fn new(options: &EncoderOptions) -> Self {
        Self {
            single_feature: options.single_feature,
        }
    }
}

impl<W: Write> WriterStage<W> for SkeletonStage {
    fn name(&self) -> &'static str {
        "skeleton"
    }

    fn priority(&self) -> i32 {
        SKELETON_PRIORITY
    }

    fn on_start(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        if self.single_feature {
            return next.run(ctx);
        }
        ctx.json.start_object()?;
        ctx.json.string_field("type", "FeatureCollection")?;
        next.run(ctx)?;

        if let Some(number_matched) = ctx.state.number_matched {
            ctx.json
                .raw_field("numberMatched", &number_matched.to_string())?;
        }
        if let Some(number_returned) = ctx.state.number_returned {
            ctx.json
                .raw_field("numberReturned", &number_returned.to_string())?;
        }
        ctx.json.field_name("features")?;
        ctx.json.start_array()
    }

    fn on_end(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        if self.single_feature {
            return next.run(ctx);
        }
        ctx.json.end_array()?;
        next.run(ctx)?;
        ctx.json.end_object()
    }

    fn on_feature_start(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        ctx.json.start_object()?;
        ctx.json.string_field("type", "Feature")?;
        next.run(ctx)
    }

    fn on_feature_end(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        next.run(ctx)?;
        ctx.json.end_object()
    }
}

#[cfg(test)]
mod test {
    use crate::test::{encode, point_feature};
    use crate::{EncoderOptions, FeatureConsumer};

    #[test]
    fn empty_collection() {
        let json = encode(EncoderOptions::default(), |encoder| {
            encoder.on_start(Some(0), Some(12))?;
            encoder.on_end()
        });
        assert_eq!(
            json,
            r#"{"type":"FeatureCollection","numberMatched":12,"numberReturned":0,"features":[]}"#
        );
    }

    #[test]
    fn features_are_separated() {
        let json = encode(EncoderOptions::default(), |encoder| {
            encoder.on_start(None, None)?;
            point_feature(encoder, "1", "1 2")?;
            point_feature(encoder, "2", "3 4")?;
            encoder.on_end()
        });
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[1]["id"], "2");
        assert_eq!(features[1]["type"], "Feature");
    }

    #[test]
    fn single_feature() {
        let options = EncoderOptions::default().with_single_feature(true);
        let json = encode(options, |encoder| {
            encoder.on_start(None, None)?;
            point_feature(encoder, "a", "1 2")?;
            encoder.on_end()
        });
        assert_eq!(
            json,
            r#"{"type":"Feature","id":"a","geometry":{"type":"Point","coordinates":[1.0,2.0]},"properties":null}"#
        );
    }
}
