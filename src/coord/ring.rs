use std::fmt;
use std::sync::Arc;

use geo::winding_order::{Winding, WindingOrder};
use geo::{Coord, LineString};
use serde::Deserialize;

use crate::event::GeometryKind;

/// Identifies a coordinate block: a ring of a polygon, or a line or point list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingContext {
    pub kind: GeometryKind,
    /// Position of the block within its parent array. For polygon rings, `0` is the exterior.
    pub index: usize,
}

impl RingContext {
    pub fn new(kind: GeometryKind, index: usize) -> Self {
        Self { kind, index }
    }

    pub fn is_exterior(&self) -> bool {
        self.index == 0
    }

    /// The smallest number of tuples the block may be generalized to.
    pub fn min_tuples(&self) -> usize {
        if self.kind.is_polygonal() {
            4
        } else {
            2
        }
    }
}

/// Signature of a caller-provided reversal predicate. It receives the block, its coordinates in
/// output order (after transformation and axis swap) and the tuple dimension.
pub type RingPredicate = dyn Fn(&RingContext, &[f64], usize) -> bool + Send + Sync;

/// Decides whether the tuples of a polygon ring are written in reverse order.
#[derive(Clone, Default, Deserialize)]
pub enum RingReversal {
    /// Rings are written as received.
    #[default]
    Never,
    /// Every polygon ring is reversed.
    Always,
    /// Rings are reversed where needed so exteriors are counter-clockwise and holes clockwise
    /// ([RFC 7946, section 3.1.6](https://www.rfc-editor.org/rfc/rfc7946#section-3.1.6)).
    RightHandRule,
    #[serde(skip)]
    Custom(Arc<RingPredicate>),
}

impl RingReversal {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&RingContext, &[f64], usize) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    /// `true` if rings of `kind` may have to be reversed, which requires buffering them.
    pub fn applies_to(&self, kind: GeometryKind) -> bool {
        kind.is_polygonal() && !matches!(self, RingReversal::Never)
    }

    pub fn should_reverse(&self, ring: &RingContext, coords: &[f64], dimension: usize) -> bool {
        if !ring.kind.is_polygonal() || dimension < 2 {
            return false;
        }
        match self {
            RingReversal::Never => false,
            RingReversal::Always => true,
            RingReversal::RightHandRule => {
                let line: LineString = coords
                    .chunks_exact(dimension)
                    .map(|tuple| Coord {
                        x: tuple[0],
                        y: tuple[1],
                    })
                    .collect();
                match line.winding_order() {
                    Some(WindingOrder::Clockwise) => ring.is_exterior(),
                    Some(WindingOrder::CounterClockwise) => !ring.is_exterior(),
                    None => false,
                }
            }
            RingReversal::Custom(predicate) => predicate(ring, coords, dimension),
        }
    }
}

impl fmt::Debug for RingReversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingReversal::Never => f.write_str("Never"),
            RingReversal::Always => f.write_str("Always"),
            RingReversal::RightHandRule => f.write_str("RightHandRule"),
            RingReversal::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
