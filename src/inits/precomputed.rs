use crate::{KMeans, KMeansError, KMeansState, Result, memory::*};

#[inline(always)]
pub fn calculate<T: Primitive>(kmean: &KMeans<T>, state: &mut KMeansState<T>, computed: Vec<T>) -> Result<()> {
    if computed.len() != state.k * kmean.sample_dims {
        return Err(KMeansError::InvalidParameter(format!(
            "expected {} precomputed centroid values ({} centroids x {} dims), got {}",
            state.k * kmean.sample_dims, state.k, kmean.sample_dims, computed.len()
        )));
    }
    computed.chunks_exact(kmean.sample_dims).enumerate().for_each(|(ci, c)| {
        state.set_centroid_from_iter(ci, c.iter().cloned());
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn train_with_precomputed_centroids() {
        let samples = vec![0.0, 1.0, 2.0, 20.0, 21.0, 22.0];
        let centroids = vec![0.0, 22.0];
        let (sample_cnt, sample_dims) = (samples.len(), 1);

        let kmean: KMeans<f32> = KMeans::new(samples, sample_cnt, sample_dims).unwrap();
        let result = kmean.kmeans_lloyd(2, 200, Init::Precomputed(centroids), &KMeansConfig::default()).unwrap();

        assert_eq!(result.centroids, vec![1.0, 21.0]);
        assert_eq!(result.chosen_indices, None);
        assert_eq!(result.phase, Phase::Converged);
    }

    #[test]
    fn wrong_centroid_count_is_rejected() {
        let kmean = KMeans::new(vec![0.0f64, 1.0, 2.0, 3.0], 2, 2).unwrap();
        let res = kmean.kmeans_lloyd(1, 10, Init::Precomputed(vec![0.0, 1.0, 2.0]), &KMeansConfig::default());
        assert!(matches!(res, Err(KMeansError::InvalidParameter(_))));
    }
}
