use crate::{KMeans, KMeansState, Result, memory::*};

#[inline(always)]
pub fn calculate<T: Primitive>(kmean: &KMeans<T>, state: &mut KMeansState<T>) -> Result<()> {
    // Copy the first k samples into state.centroids, each sample seeding its own cluster
    kmean.samples.chunks_exact(kmean.sample_dims)
        .take(state.k)
        .enumerate()
        .for_each(|(ci, c)| {
            state.set_centroid_from_iter(ci, c.iter().cloned());
            state.assignments[ci] = ci;
        });
    state.chosen_indices = Some((0..state.k).collect());
    Ok(())
}
