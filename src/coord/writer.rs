use std::sync::Arc;

use crate::coord::buffered::RingBuffer;
use crate::coord::format::CoordinateFormatter;
use crate::coord::ring::RingContext;
use crate::coord::tokenizer::{CoordinateTokenizer, CoordinateValue};
use crate::coord::write_tuple;
use crate::error::Result;
use crate::event::GeometryKind;
use crate::json::JsonSink;
use crate::options::EncoderOptions;
use crate::transform::CrsTransformer;

/// The transformation applied between tokenizing and formatting.
#[derive(Debug)]
pub enum WriterVariant {
    /// Tuples are written as received.
    Identity,
    /// Y is written before X.
    AxisSwap,
    /// Each tuple is transformed, then optionally axis-swapped.
    Reproject {
        transformer: Arc<dyn CrsTransformer>,
        swap_xy: bool,
    },
    /// Whole blocks are collected first, for ring reversal or generalization.
    Buffered(RingBuffer),
}

/// Turns coordinate text of one geometry into JSON coordinate tuples.
///
/// A writer lives from the first coordinates of a geometry until its end. Text is fed with
/// [`write`](CoordinateWriter::write), possibly in several chunks per block, and every block
/// (ring, line, point list) is completed with [`finish_block`](CoordinateWriter::finish_block).
#[derive(Debug)]
pub struct CoordinateWriter {
    tokenizer: CoordinateTokenizer,
    formatter: CoordinateFormatter,
    output_dimension: usize,
    tuple: [f64; 3],
    tuples: u64,
    variant: WriterVariant,
}

impl CoordinateWriter {
    /// Creates a writer for tuples of `dimension` values. With `force_2d`, Z values are parsed
    /// but not written.
    pub fn new(dimension: usize, precision: usize, force_2d: bool, variant: WriterVariant) -> Self {
        let tokenizer = CoordinateTokenizer::new(dimension);
        let output_dimension = if force_2d { 2 } else { tokenizer.dimension() };
        Self {
            tokenizer,
            formatter: CoordinateFormatter::new(precision),
            output_dimension,
            tuple: [0.; 3],
            tuples: 0,
            variant,
        }
    }

    pub fn identity(dimension: usize) -> Self {
        Self::new(dimension, 0, false, WriterVariant::Identity)
    }

    pub fn axis_swap(dimension: usize) -> Self {
        Self::new(dimension, 0, false, WriterVariant::AxisSwap)
    }

    pub fn reproject(dimension: usize, transformer: Arc<dyn CrsTransformer>) -> Self {
        Self::new(
            dimension,
            0,
            false,
            WriterVariant::Reproject {
                transformer,
                swap_xy: false,
            },
        )
    }

    /// Picks the variant needed for a geometry of `kind` under `options`.
    pub fn for_geometry(kind: GeometryKind, dimension: usize, options: &EncoderOptions) -> Self {
        let dimension = dimension.clamp(2, 3);
        let generalize =
            options.max_allowable_offset > 0.0 && (kind.is_polygonal() || kind.is_lineal());
        let transformer = options
            .transformer
            .clone()
            .filter(|transformer| !transformer.is_identity());

        let variant = if generalize || options.ring_reversal.applies_to(kind) {
            WriterVariant::Buffered(RingBuffer::new(
                dimension,
                options.coordinate_buffer_capacity,
                transformer,
                options.swap_xy,
                options.ring_reversal.clone(),
                options.max_allowable_offset,
            ))
        } else if let Some(transformer) = transformer {
            WriterVariant::Reproject {
                transformer,
                swap_xy: options.swap_xy,
            }
        } else if options.swap_xy {
            WriterVariant::AxisSwap
        } else {
            WriterVariant::Identity
        };

        Self::new(dimension, options.precision, options.force_2d, variant)
    }

    pub fn variant(&self) -> &WriterVariant {
        &self.variant
    }

    /// Number of complete tuples consumed so far.
    pub fn tuples(&self) -> u64 {
        self.tuples
    }

    /// Feeds a chunk of coordinate text belonging to the current block.
    pub fn write<S: JsonSink + ?Sized>(&mut self, text: &str, sink: &mut S) -> Result<()> {
        let Self {
            tokenizer,
            formatter,
            output_dimension,
            tuple,
            tuples,
            variant,
        } = self;
        tokenizer.tokenize(text, |value| {
            handle_value(
                value,
                tuple,
                tuples,
                variant,
                formatter,
                *output_dimension,
                &mut *sink,
            )
        })
    }

    /// Completes the current block: the trailing value is flushed and buffered tuples are
    /// written.
    pub fn finish_block<S: JsonSink + ?Sized>(
        &mut self,
        ring: RingContext,
        sink: &mut S,
    ) -> Result<()> {
        let Self {
            tokenizer,
            formatter,
            output_dimension,
            tuple,
            tuples,
            variant,
        } = self;
        tokenizer.finish(|value| {
            handle_value(
                value,
                tuple,
                tuples,
                variant,
                formatter,
                *output_dimension,
                &mut *sink,
            )
        })?;

        if let WriterVariant::Buffered(buffer) = variant {
            buffer.emit(ring, formatter, *output_dimension, sink)?;
        }
        Ok(())
    }
}

fn handle_value<S: JsonSink + ?Sized>(
    value: CoordinateValue<'_>,
    tuple: &mut [f64; 3],
    tuples: &mut u64,
    variant: &mut WriterVariant,
    formatter: &mut CoordinateFormatter,
    output_dimension: usize,
    sink: &mut S,
) -> Result<()> {
    let axis = value.axis.index();
    tuple[axis] = CoordinateFormatter::parse(value.text)?;
    if !value.ends_tuple {
        return Ok(());
    }
    *tuples += 1;

    let values = &mut tuple[..=axis];
    let written = output_dimension.min(values.len());
    match variant {
        WriterVariant::Identity => write_tuple(sink, formatter, &values[..written]),
        WriterVariant::AxisSwap => {
            values.swap(0, 1);
            write_tuple(sink, formatter, &values[..written])
        }
        WriterVariant::Reproject {
            transformer,
            swap_xy,
        } => {
            transformer.transform(values)?;
            if *swap_xy {
                values.swap(0, 1);
            }
            write_tuple(sink, formatter, &values[..written])
        }
        WriterVariant::Buffered(buffer) => {
            buffer.push(values);
            Ok(())
        }
    }
}
