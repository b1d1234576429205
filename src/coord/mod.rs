//! Coordinate handling: splitting coordinate text into values and writing them as GeoJSON
//! position arrays.

mod buffered;
mod format;
mod ring;
mod tokenizer;
mod writer;

pub use buffered::{RingBuffer, DEFAULT_BUFFER_CAPACITY};
pub use format::CoordinateFormatter;
pub use ring::{RingContext, RingPredicate, RingReversal};
pub use tokenizer::{Axis, CoordinateTokenizer, CoordinateValue};
pub use writer::{CoordinateWriter, WriterVariant};

use crate::error::Result;
use crate::json::JsonSink;

/// Writes one position as a JSON array of numbers.
pub(crate) fn write_tuple<S: JsonSink + ?Sized>(
    sink: &mut S,
    formatter: &mut CoordinateFormatter,
    values: &[f64],
) -> Result<()> {
    sink.start_array()?;
    for value in values {
        sink.raw_value(formatter.format(*value)?)?;
    }
    sink.end_array()
}
