//! Coordinate reference system transformation hooks.
//!
//! The encoder does not compute transformations itself. It invokes a [`CrsTransformer`] supplied
//! with the [`EncoderOptions`][crate::EncoderOptions] on every coordinate tuple, after parsing and
//! before axis swapping and number formatting.

#[cfg(feature = "geodesy")]
mod geodesy;

#[cfg(feature = "geodesy")]
pub use self::geodesy::GeodesyTransformer;

use std::fmt::{self, Debug};

use crate::error::{GeoJsonEncoderError, Result};

/// Transforms coordinates from the source CRS into the output CRS.
pub trait CrsTransformer: Send + Sync + Debug {
    /// Transforms one tuple in place. `coord` holds `x, y` or `x, y, z`.
    fn transform(&self, coord: &mut [f64]) -> Result<()>;

    /// Transforms a flat buffer of tuples with `dimension` values each.
    fn transform_all(&self, coords: &mut [f64], dimension: usize) -> Result<()> {
        if dimension == 0 || coords.len() % dimension != 0 {
            return Err(GeoJsonEncoderError::Transform(format!(
                "{} values do not form tuples of dimension {}",
                coords.len(),
                dimension
            )));
        }
        for tuple in coords.chunks_exact_mut(dimension) {
            self.transform(tuple)?;
        }
        Ok(())
    }

    /// `true` if this transformer never changes a coordinate.
    fn is_identity(&self) -> bool {
        false
    }
}

/// A transformer that leaves coordinates unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl CrsTransformer for IdentityTransformer {
    fn transform(&self, _coord: &mut [f64]) -> Result<()> {
        Ok(())
    }

    fn transform_all(&self, _coords: &mut [f64], _dimension: usize) -> Result<()> {
        Ok(())
    }

    fn is_identity(&self) -> bool {
        true
    }
}

/// Adapts a closure to [`CrsTransformer`].
///
/// ```
/// use geojson_encoder::transform::{CrsTransformer, FnTransformer};
///
/// let shift = FnTransformer::new(|coord: &mut [f64]| {
///     coord[0] += 10.0;
///     Ok(())
/// });
/// let mut coord = [1.0, 2.0];
/// shift.transform(&mut coord).unwrap();
/// assert_eq!(coord, [11.0, 2.0]);
/// ```
pub struct FnTransformer<F> {
    function: F,
}

impl<F> FnTransformer<F>
where
    F: Fn(&mut [f64]) -> Result<()> + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> Debug for FnTransformer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransformer").finish_non_exhaustive()
    }
}

impl<F> CrsTransformer for FnTransformer<F>
where
    F: Fn(&mut [f64]) -> Result<()> + Send + Sync,
{
    fn transform(&self, coord: &mut [f64]) -> Result<()> {
        (self.function)(coord)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transform_all_visits_every_tuple() {
        let scale = FnTransformer::new(|coord: &mut [f64]| {
            coord.iter_mut().for_each(|v| *v *= 2.0);
            Ok(())
        });
        let mut coords = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        scale.transform_all(&mut coords, 3).unwrap();
        assert_eq!(coords, vec![2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);
    }

    #[test]
    fn transform_all_rejects_partial_tuples() {
        let mut coords = vec![1.0, 2.0, 3.0];
        let result = FnTransformer::new(|_: &mut [f64]| Ok(())).transform_all(&mut coords, 2);
        assert!(matches!(result, Err(GeoJsonEncoderError::Transform(_))));
    }

    #[test]
    fn identity() {
        let mut coords = vec![1.0, 2.0];
        IdentityTransformer.transform_all(&mut coords, 2).unwrap();
        assert_eq!(coords, vec![1.0, 2.0]);
        assert!(IdentityTransformer.is_identity());
    }
}
