use crate::{KMeans, KMeansConfig, KMeansError, KMeansState, Result, UNASSIGNED, memory::*};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use std::ops::DerefMut;

#[inline(always)]
pub fn calculate<T: Primitive>(kmean: &KMeans<T>, state: &mut KMeansState<T>, config: &KMeansConfig<'_, T>) -> Result<()> {
    let mut chosen = Vec::with_capacity(state.k);
    {
        // Randomly select first centroid
        let first_idx = config.rnd.borrow_mut().gen_range(0..kmean.sample_cnt);
        state.set_centroid_from_iter(0, kmean.sample(first_idx).iter().cloned());
        chosen.push(first_idx);
    }
    for k in 1..state.k {
        // For each following centroid...
        // (squared) distance of every sample to its nearest already chosen centroid
        kmean.update_cluster_assignments(state, Some(k));

        // Draw proportional to D(x), the plain distance. Samples on top of a chosen centroid weigh 0.
        let weights: Vec<T> = state.centroid_distances.iter().map(|d| d.sqrt()).collect();
        // WeightedIndex accepts an infinite weight and then panics while sampling
        if let Some(index) = weights.iter().position(|w| !w.is_finite()) {
            return Err(KMeansError::NonFiniteDistance { index });
        }
        let centroid_index = WeightedIndex::new(&weights)
            .map_err(|_| KMeansError::InitializationDegenerate { round: k })?;
        let sampled_centroid_id = centroid_index.sample(config.rnd.borrow_mut().deref_mut());
        state.set_centroid_from_iter(k, kmean.sample(sampled_centroid_id).iter().cloned());
        chosen.push(sampled_centroid_id);
    }

    // Only the chosen samples are assigned (to their own clusters) until the first iteration
    state.assignments.iter_mut().for_each(|a| *a = UNASSIGNED);
    state.centroid_distances.iter_mut().for_each(|d| *d = T::infinity());
    chosen.iter().enumerate().for_each(|(ci, &si)| {
        state.assignments[si] = ci;
        state.centroid_distances[si] = T::zero();
    });
    state.chosen_indices = Some(chosen);
    Ok(())
}
