use std::io::Write;

use crate::chain::{Next, WriterStage};
use crate::context::TransformationContext;
use crate::error::Result;
use crate::json::JsonSink;
use crate::options::EncoderOptions;
use crate::stages::CRS_PRIORITY;

/// Writes the output CRS as `coordRefSys`, on the collection or on a single feature.
#[derive(Debug, Clone)]
pub struct CrsStage {
    crs_uri: String,
    single_feature: bool,
}

impl CrsStage {
    pub fn new(crs_uri: String, options: &EncoderOptions) -> Self {
        Self {
            crs_uri,
            single_feature: options.single_feature,
        }
    }
}

impl<W: Write> WriterStage<W> for CrsStage {
    fn name(&self) -> &'static str {
        "crs"
    }

    fn priority(&self) -> i32 {
        CRS_PRIORITY
    }

    fn on_start(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        if !self.single_feature {
            ctx.json.string_field("coordRefSys", &self.crs_uri)?;
        }
        next.run(ctx)
    }

    fn on_feature_start(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        if self.single_feature {
            ctx.json.string_field("coordRefSys", &self.crs_uri)?;
        }
        next.run(ctx)
    }
}
