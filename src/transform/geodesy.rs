use std::fmt::{self, Debug};
use std::sync::Mutex;

use geodesy::prelude::*;

use crate::error::{GeoJsonEncoderError, Result};
use crate::transform::CrsTransformer;

/// A [`CrsTransformer`] backed by a [`geodesy`] operation.
///
/// Note that [`geodesy`] does **not** aim to be a full PROJ "rewrite in Rust". Consult the
/// [library's documentation][geodesy] for how to construct the operation definition. Coordinates
/// are handed to the operation unchanged, so angular input must be converted inside the
/// definition (e.g. with an `adapt` step).
pub struct GeodesyTransformer {
    context: Mutex<Minimal>,
    operation: OpHandle,
    inverse: bool,
}

impl GeodesyTransformer {
    pub fn new(definition: &str, direction: Direction) -> Result<Self> {
        let mut context = Minimal::new();
        let operation = context.op(definition)?;
        Ok(Self {
            context: Mutex::new(context),
            operation,
            inverse: matches!(direction, Direction::Inv),
        })
    }

    /// The direction the operation is applied in.
    fn direction(&self) -> Direction {
        if self.inverse {
            Direction::Inv
        } else {
            Direction::Fwd
        }
    }

    fn apply(&self, coords: &mut Vec<Coor4D>) -> Result<()> {
        let context = self
            .context
            .lock()
            .map_err(|_| GeoJsonEncoderError::Transform("geodesy context poisoned".into()))?;
        context.apply(self.operation, self.direction(), coords)?;
        Ok(())
    }
}

impl Debug for GeodesyTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeodesyTransformer")
            .field("inverse", &self.inverse)
            .finish_non_exhaustive()
    }
}

impl CrsTransformer for GeodesyTransformer {
    fn transform(&self, coord: &mut [f64]) -> Result<()> {
        let dimension = coord.len();
        self.transform_all(coord, dimension)
    }

    fn transform_all(&self, coords: &mut [f64], dimension: usize) -> Result<()> {
        if !(2..=3).contains(&dimension) || coords.len() % dimension != 0 {
            return Err(GeoJsonEncoderError::Transform(format!(
                "unsupported coordinate dimension {}",
                dimension
            )));
        }
        let mut operands: Vec<Coor4D> = coords
            .chunks_exact(dimension)
            .map(|tuple| {
                let z = if dimension == 3 { tuple[2] } else { 0. };
                Coor4D::raw(tuple[0], tuple[1], z, 0.)
            })
            .collect();

        self.apply(&mut operands)?;

        for (tuple, transformed) in coords.chunks_exact_mut(dimension).zip(operands.iter()) {
            for (axis, value) in tuple.iter_mut().enumerate() {
                *value = transformed[axis];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn round_trip_through_utm() {
        let forward = GeodesyTransformer::new("utm zone=32", Direction::Fwd).unwrap();
        let inverse = GeodesyTransformer::new("utm zone=32", Direction::Inv).unwrap();

        let lon = 9f64.to_radians();
        let lat = 50f64.to_radians();
        let mut coords = vec![lon, lat];
        forward.transform_all(&mut coords, 2).unwrap();
        assert!(coords[0] > 100_000.0);

        inverse.transform_all(&mut coords, 2).unwrap();
        assert_relative_eq!(coords[0], lon, epsilon = 1e-9);
        assert_relative_eq!(coords[1], lat, epsilon = 1e-9);
    }

    #[test]
    fn repeated_calls_keep_direction() {
        let transformer: std::sync::Arc<dyn CrsTransformer> =
            std::sync::Arc::new(GeodesyTransformer::new("utm zone=32", Direction::Fwd).unwrap());
        let mut first = [9f64.to_radians(), 50f64.to_radians()];
        let mut second = first;
        transformer.transform(&mut first).unwrap();
        transformer.transform(&mut second).unwrap();
        assert_relative_eq!(first[0], second[0]);
        assert_relative_eq!(first[1], second[1]);
        assert!(first[0] > 100_000.0);
        assert!(format!("{transformer:?}").contains("inverse: false"));
    }
}
