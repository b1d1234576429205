use std::sync::Arc;

use geo::{Coord, LineString, SimplifyIdx};
use tracing::debug;

use crate::coord::format::CoordinateFormatter;
use crate::coord::ring::{RingContext, RingReversal};
use crate::coord::write_tuple;
use crate::error::Result;
use crate::json::JsonSink;
use crate::transform::CrsTransformer;

/// Default number of values a [`RingBuffer`] reserves up front.
pub const DEFAULT_BUFFER_CAPACITY: usize = 10_000;

/// Holds all tuples of one coordinate block until the block is complete.
///
/// Ring orientation and generalization need the whole block, so nothing is written before
/// [`emit`](RingBuffer::emit). The buffer grows past its initial capacity instead of flushing
/// early: a partial flush would write the first part of a reversed ring in the wrong order.
#[derive(Debug)]
pub struct RingBuffer {
    coords: Vec<f64>,
    capacity: usize,
    dimension: usize,
    transformer: Option<Arc<dyn CrsTransformer>>,
    swap_xy: bool,
    reversal: RingReversal,
    max_allowable_offset: f64,
}

impl RingBuffer {
    pub fn new(
        dimension: usize,
        capacity: usize,
        transformer: Option<Arc<dyn CrsTransformer>>,
        swap_xy: bool,
        reversal: RingReversal,
        max_allowable_offset: f64,
    ) -> Self {
        Self {
            coords: Vec::with_capacity(capacity),
            capacity,
            dimension,
            transformer,
            swap_xy,
            reversal,
            max_allowable_offset,
        }
    }

    pub fn len(&self) -> usize {
        self.coords.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn push(&mut self, tuple: &[f64]) {
        if self.coords.len() + tuple.len() > self.capacity && self.coords.len() <= self.capacity {
            debug!(
                capacity = self.capacity,
                "coordinate block exceeds buffer capacity, growing"
            );
        }
        self.coords.extend_from_slice(tuple);
    }

    /// Writes the buffered block as an array of tuples and clears the buffer.
    pub fn emit<S: JsonSink + ?Sized>(
        &mut self,
        ring: RingContext,
        formatter: &mut CoordinateFormatter,
        output_dimension: usize,
        sink: &mut S,
    ) -> Result<()> {
        let dimension = self.dimension;
        self.simplify(&ring);

        if let Some(transformer) = &self.transformer {
            transformer.transform_all(&mut self.coords, dimension)?;
        }
        if self.swap_xy {
            for tuple in self.coords.chunks_exact_mut(dimension) {
                tuple.swap(0, 1);
            }
        }

        let tuples = self.coords.chunks_exact(dimension);
        if self.reversal.should_reverse(&ring, &self.coords, dimension) {
            for tuple in tuples.rev() {
                write_tuple(sink, formatter, &tuple[..output_dimension])?;
            }
        } else {
            for tuple in tuples {
                write_tuple(sink, formatter, &tuple[..output_dimension])?;
            }
        }

        self.coords.clear();
        if self.coords.capacity() > self.capacity * 4 {
            self.coords.shrink_to(self.capacity);
        }
        Ok(())
    }

    /// Douglas-Peucker generalization in source coordinates. Blocks that are too small, or that
    /// would become too small, are left untouched.
    fn simplify(&mut self, ring: &RingContext) {
        if self.max_allowable_offset <= 0.0 || !(ring.kind.is_polygonal() || ring.kind.is_lineal())
        {
            return;
        }
        let min_tuples = ring.min_tuples();
        if self.len() < min_tuples {
            return;
        }

        let dimension = self.dimension;
        let line: LineString = self
            .coords
            .chunks_exact(dimension)
            .map(|tuple| Coord {
                x: tuple[0],
                y: tuple[1],
            })
            .collect();
        let keep = line.simplify_idx(&self.max_allowable_offset);
        if keep.len() < min_tuples || keep.len() == self.len() {
            return;
        }

        // indices are ascending, so every copy moves a tuple towards the front
        let kept = keep.len();
        for (target, source) in keep.into_iter().enumerate() {
            self.coords
                .copy_within(source * dimension..(source + 1) * dimension, target * dimension);
        }
        self.coords.truncate(kept * dimension);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::GeometryKind;
    use crate::json::JsonWriter;
    use crate::transform::FnTransformer;

    fn emit(buffer: &mut RingBuffer, ring: RingContext, tuples: &[[f64; 2]]) -> serde_json::Value {
        for tuple in tuples {
            buffer.push(tuple);
        }
        let mut json = JsonWriter::new(Vec::new());
        json.start_array().unwrap();
        buffer
            .emit(ring, &mut CoordinateFormatter::new(0), 2, &mut json)
            .unwrap();
        json.end_array().unwrap();
        serde_json::from_slice(&json.into_inner()).unwrap()
    }

    #[test]
    fn grows_past_capacity() {
        let mut buffer = RingBuffer::new(2, 4, None, false, RingReversal::Always, 0.0);
        let tuples: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 0.0]).collect();
        let value = emit(
            &mut buffer,
            RingContext::new(GeometryKind::Polygon, 0),
            &tuples,
        );
        assert_eq!(value.as_array().unwrap().len(), 10);
        assert_eq!(value[0], serde_json::json!([9.0, 0.0]));
        assert!(buffer.is_empty());
    }

    #[test]
    fn simplifies_before_transforming() {
        // the transformer scales by 1000, so an offset of 0.5 only removes the source-level noise
        let transformer = Arc::new(FnTransformer::new(|coord: &mut [f64]| {
            coord[0] *= 1000.0;
            coord[1] *= 1000.0;
            Ok(())
        }));
        let mut buffer = RingBuffer::new(2, 16, Some(transformer), true, RingReversal::Never, 0.5);
        let value = emit(
            &mut buffer,
            RingContext::new(GeometryKind::LineString, 0),
            &[[0.0, 0.0], [1.0, 0.1], [2.0, 0.0]],
        );
        assert_eq!(value, serde_json::json!([[0.0, 0.0], [0.0, 2000.0]]));
    }

    #[test]
    fn keeps_minimum_ring_size() {
        let mut buffer = RingBuffer::new(2, 16, None, false, RingReversal::Never, 100.0);
        let ring = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];
        let value = emit(
            &mut buffer,
            RingContext::new(GeometryKind::Polygon, 0),
            &ring,
        );
        assert_eq!(value.as_array().unwrap().len(), 5);
    }
}
