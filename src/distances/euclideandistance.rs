use crate::{KMeansError, Primitive, Result};

/// Squared euclidean distance, without checking dimensions.
/// Both operands have to come from the same run (same `sample_dims`).
#[inline(always)]
pub(crate) fn squared_unchecked<T: Primitive>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter())
        .map(|(&av, &bv)| av - bv)      // <a> - <b>
        .map(|v| v * v)                 // <vec_components> ^2
        .sum()                          // sum(<vec_components>^2)
}

fn check_dims<T>(a: &[T], b: &[T]) -> Result<()> {
    if a.len() != b.len() {
        return Err(KMeansError::DimensionMismatch { index: 1, expected: a.len(), got: b.len() });
    }
    Ok(())
}

/// Squared euclidean distance between **a** and **b**.
///
/// K-Means++ weighting and nearest-centroid comparisons only need the squared value,
/// so the square root is never taken here.
///
/// ## Errors
/// [`KMeansError::DimensionMismatch`] if both vectors differ in length (**index** 1 refers to **b**).
pub fn squared_distance<T: Primitive>(a: &[T], b: &[T]) -> Result<T> {
    check_dims(a, b)?;
    Ok(squared_unchecked(a, b))
}

/// Euclidean distance between **a** and **b**.
///
/// ## Errors
/// [`KMeansError::DimensionMismatch`] if both vectors differ in length (**index** 1 refers to **b**).
pub fn distance<T: Primitive>(a: &[T], b: &[T]) -> Result<T> {
    squared_distance(a, b).map(|d| d.sqrt())
}
