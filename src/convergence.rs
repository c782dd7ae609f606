use crate::{distances, memory::*};

/// Convergence checker of a running calculation.
/// Compares the centroids from before an iteration's update step with the ones after it,
/// index for index.
pub(crate) struct Convergence<T: Primitive> {
	epsilon: T,
	sample_dims: usize
}

/// Outcome of a single convergence check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ConvergenceCheck<T: Primitive> {
	/// **true** when every centroid moved at most `epsilon`
	pub converged: bool,
	/// Largest (true, not squared) distance any centroid moved
	pub max_shift: T
}

impl<T: Primitive> Convergence<T> {
	pub(crate) fn new(epsilon: T, sample_dims: usize) -> Self {
		Self { epsilon, sample_dims }
	}

	/// ## Arguments
	/// - **old**: Centroids [row-major] snapshotted before the update step
	/// - **new**: Centroids [row-major] after the update step
	pub(crate) fn check(&self, old: &[T], new: &[T]) -> ConvergenceCheck<T> {
		debug_assert_eq!(old.len(), new.len());
		let mut converged = true;
		let mut max_shift = T::zero();
		old.chunks_exact(self.sample_dims)
			.zip(new.chunks_exact(self.sample_dims))
			.for_each(|(o, n)| {
				let shift = distances::squared_unchecked(o, n).sqrt();
				// a single exceedance (or NaN) means not converged
				if !(shift <= self.epsilon) {
					converged = false;
				}
				if shift > max_shift {
					max_shift = shift;
				}
			});
		ConvergenceCheck { converged, max_shift }
	}
}
