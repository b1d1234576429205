use std::io::Write;

use tracing::warn;

use crate::chain::{Next, WriterStage};
use crate::context::{Nesting, TransformationContext};
use crate::coord::{CoordinateWriter, RingContext};
use crate::error::{GeoJsonEncoderError, Result};
use crate::event::GeometryKind;
use crate::json::JsonSink;
use crate::options::EncoderOptions;
use crate::stages::GEOMETRY_PRIORITY;

/// Writes the primary geometry of a feature.
///
/// The geometry object is opened on the first coordinates, or at the end of an empty geometry.
/// Nesting operations reported since the previous coordinates are replayed in order before new
/// coordinates are written, so a ring ending and the next one starting are kept apart even
/// though the net nesting change is zero. Array levels the parser does not report are opened
/// implicitly.
#[derive(Debug)]
pub struct GeometryStage {
    member: &'static str,
    options: EncoderOptions,
    writer: Option<CoordinateWriter>,
    kind: GeometryKind,
    /// One entry per open coordinate array, counting the arrays opened inside it.
    children: Vec<usize>,
    /// Nesting operations below the innermost coordinate array, which have no output.
    transparent: usize,
    block_pending: bool,
    active: bool,
    skipping: bool,
    written: bool,
}

impl GeometryStage {
    pub fn new(options: &EncoderOptions) -> Self {
        Self {
            member: options.geometry_member(),
            options: options.clone(),
            writer: None,
            kind: GeometryKind::Unknown,
            children: Vec::new(),
            transparent: 0,
            block_pending: false,
            active: false,
            skipping: false,
            written: false,
        }
    }

    fn depth(&self) -> usize {
        self.kind.coordinate_depth()
    }

    fn ring(&self) -> RingContext {
        let index = match self.children.len() {
            0 | 1 => 0,
            len => self.children[len - 2].saturating_sub(1),
        };
        RingContext::new(self.kind, index)
    }

    /// Opens the geometry object for the current geometry. Returns `false` if the geometry is
    /// skipped.
    fn begin<W: Write>(&mut self, ctx: &mut TransformationContext<W>) -> Result<bool> {
        if self.active {
            return Ok(true);
        }
        if self.skipping {
            return Ok(false);
        }
        let kind = ctx.state.current_geometry_kind.unwrap_or(GeometryKind::Unknown);
        let Some(geojson_type) = kind.geojson_type() else {
            warn!(feature = ctx.state.feature_count, "skipping geometry of unsupported type");
            self.skipping = true;
            return Ok(false);
        };
        if self.written {
            warn!(
                feature = ctx.state.feature_count,
                %kind,
                "skipping additional geometry of feature"
            );
            self.skipping = true;
            return Ok(false);
        }

        self.kind = kind;
        self.active = true;
        self.written = true;
        self.children.clear();
        self.transparent = 0;
        self.block_pending = false;
        self.writer = Some(CoordinateWriter::for_geometry(
            kind,
            ctx.state.current_dimension,
            &self.options,
        ));

        let json = &mut ctx.json;
        json.field_name(self.member)?;
        json.start_object()?;
        json.string_field("type", geojson_type)?;
        json.field_name("coordinates")?;
        if self.depth() >= 1 {
            self.open_level(json)?;
        }
        Ok(true)
    }

    fn open_level<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        if let Some(count) = self.children.last_mut() {
            *count += 1;
        }
        sink.start_array()?;
        self.children.push(0);
        Ok(())
    }

    fn close_level<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        self.finish_block(sink)?;
        self.children.pop();
        sink.end_array()
    }

    fn finish_block<S: JsonSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        if !self.block_pending {
            return Ok(());
        }
        self.block_pending = false;
        let ring = self.ring();
        match self.writer.as_mut() {
            Some(writer) => writer.finish_block(ring, sink),
            None => Ok(()),
        }
    }

    fn apply<S: JsonSink + ?Sized>(&mut self, nesting: Nesting, sink: &mut S) -> Result<()> {
        match nesting {
            // still separates the values of two coordinate events
            Nesting::Open if self.transparent > 0 || self.children.len() >= self.depth() => {
                self.finish_block(sink)?;
                self.transparent += 1;
                Ok(())
            }
            Nesting::Open => self.open_level(sink),
            Nesting::Close if self.transparent > 0 => {
                self.finish_block(sink)?;
                self.transparent -= 1;
                Ok(())
            }
            // the outermost array belongs to the geometry object
            Nesting::Close if self.children.len() <= 1 => {
                Err(GeoJsonEncoderError::InvalidStructure(
                    "geometry nesting closed more often than opened",
                ))
            }
            Nesting::Close => self.close_level(sink),
        }
    }

    fn replay_nesting<W: Write>(&mut self, ctx: &mut TransformationContext<W>) -> Result<()> {
        for nesting in &ctx.state.nesting {
            self.apply(*nesting, &mut ctx.json)?;
        }
        Ok(())
    }
}

impl<W: Write> WriterStage<W> for GeometryStage {
    fn name(&self) -> &'static str {
        "geometry"
    }

    fn priority(&self) -> i32 {
        GEOMETRY_PRIORITY
    }

    fn on_feature_start(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        self.written = false;
        next.run(ctx)
    }

    fn on_coordinates(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        if !self.begin(ctx)? {
            return next.run(ctx);
        }
        self.replay_nesting(ctx)?;
        while self.children.len() < self.depth() {
            self.open_level(&mut ctx.json)?;
        }

        if let (Some(writer), Some(text)) = (self.writer.as_mut(), ctx.state.current_value.as_deref())
        {
            writer.write(text, &mut ctx.json)?;
            self.block_pending = true;
        }
        next.run(ctx)
    }

    fn on_geometry_end(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        let empty = !self.active;
        if self.begin(ctx)? {
            if empty && self.depth() == 0 {
                // an empty point
                ctx.json.start_array()?;
                ctx.json.end_array()?;
            }
            self.replay_nesting(ctx)?;
            self.finish_block(&mut ctx.json)?;
            while !self.children.is_empty() {
                self.close_level(&mut ctx.json)?;
            }
            ctx.json.end_object()?;
        }

        self.active = false;
        self.skipping = false;
        self.writer = None;
        next.run(ctx)
    }

    fn on_feature_end(
        &mut self,
        ctx: &mut TransformationContext<W>,
        next: Next<'_, W>,
    ) -> Result<()> {
        if !self.written {
            ctx.json.null_field(self.member)?;
        }
        next.run(ctx)
    }
}
