use std::io::Write;

use crate::chain::{Next, WriterStage};
use crate::context::TransformationContext;
use crate::error::Result;
use crate::json::JsonSink;
use crate::stages::ID_PRIORITY;

/// Writes the feature `id` as the first member after `type`.
///
/// Everything the following stages write for a feature is held back until the id property has
/// been seen. The held back members are then flushed behind the id, or at the end of the feature
/// if it has no id.
///
/// A feature without an id, or with the id last, is held in memory as a whole. The held back
/// tokens share one text buffer, see [`TokenBuffer`](crate::json::TokenBuffer).
#[derive(Debug, Clone, Default)]
pub struct IdStage {
    written: bool,
}

impl IdStage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<W: Write> WriterStage<W> for IdStage {
    fn name(&self) -> &'static str {
        "id"
    }

    fn priority(&self) -> i32 {
        ID_PRIORITY
    }

    fn on_feature_start(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        self.written = false;
        ctx.json.start_buffering();
        next.run(ctx)
    }

    fn on_property(&mut self, ctx: &mut TransformationContext<W>, next: Next<'_, W>) -> Result<()> {
        let is_id = ctx.state.property().is_some_and(|property| property.is_id());
        if is_id && !self.written {
            if let Some(id) = ctx.state.current_value.as_deref() {
                if ctx.json.is_buffering() {
                    ctx.json.stop_buffering();
                }
                ctx.json.string_field("id", id)?;
                if ctx.json.has_buffer() {
                    ctx.json.flush_buffer()?;
                }
                self.written = true;
            }
        }
        next.run(ctx)
    }

    fn on_feature_end(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        if ctx.json.has_buffer() {
            ctx.json.flush_buffer()?;
        }
        next.run(ctx)
    }
}
