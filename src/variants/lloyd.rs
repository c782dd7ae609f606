use crate::{KMeans, KMeansConfig, KMeansError, KMeansState, Result, memory::*};
use crate::api::{EmptyClusterPolicy, Phase};
use crate::convergence::Convergence;
use crate::inits::Init;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Amount of samples each partial (sum, count) accumulation works on.
/// Partials are merged in block order, so results do not depend on the thread-pool.
const UPDATE_BLOCK_SIZE: usize = 4096;

pub(crate) struct Lloyd<T: Primitive> {
	_p: std::marker::PhantomData<T>
}
impl<T: Primitive> Lloyd<T> {
    fn check_preconditions(data: &KMeans<T>, k: usize, max_iter: usize, config: &KMeansConfig<'_, T>) -> Result<()> {
        if k == 0 || k >= data.sample_cnt {
            return Err(KMeansError::InvalidParameter(format!(
                "k must be within 1..{} (sample count), got {}", data.sample_cnt, k)));
        }
        if max_iter == 0 {
            return Err(KMeansError::InvalidParameter("max_iter must be at least 1".into()));
        }
        if !(config.epsilon >= T::zero()) {
            return Err(KMeansError::InvalidParameter(format!("epsilon must be >= 0, got {}", config.epsilon)));
        }
        Ok(())
    }

    /// Recompute every centroid as the mean of its currently assigned samples.
    fn update_centroids(data: &KMeans<T>, state: &mut KMeansState<T>, iteration: usize, policy: EmptyClusterPolicy) -> Result<()> {
        let (k, sample_dims) = (state.k, data.sample_dims);

        // Sum all samples in a cluster together into new_centroids, per block of samples
        let partials: Vec<(Vec<T>, Vec<usize>)> = data.samples.par_chunks(UPDATE_BLOCK_SIZE * sample_dims)
            .zip(state.assignments.par_chunks(UPDATE_BLOCK_SIZE))
            .map(|(block, assignments)| {
                let mut sums = vec![T::zero(); k * sample_dims];
                let mut counts = vec![0usize; k];
                block.chunks_exact(sample_dims)
                    .zip(assignments.iter().cloned())
                    .for_each(|(s, centroid_id)| {
                        counts[centroid_id] += 1;
                        sums[centroid_id * sample_dims..(centroid_id + 1) * sample_dims].iter_mut()
                            .zip(s.iter())
                            .for_each(|(cv, sv)| *cv += sv);
                    });
                (sums, counts)
            })
            .collect();

        let mut new_centroids = vec![T::zero(); k * sample_dims];
        let centroid_frequency = &mut state.centroid_frequency;
        centroid_frequency.iter_mut().for_each(|v| *v = 0);
        for (sums, counts) in partials {
            new_centroids.iter_mut().zip(sums.iter()).for_each(|(cv, sv)| *cv += sv);
            centroid_frequency.iter_mut().zip(counts).for_each(|(f, c)| *f += c);
        }

        // Check for empty clusters before any centroid is touched
        if let Some(cluster) = centroid_frequency.iter().position(|&f| f == 0) {
            match policy {
                EmptyClusterPolicy::Fail => return Err(KMeansError::EmptyCluster { cluster, iteration }),
                EmptyClusterPolicy::KeepPrevious =>
                    warn!(cluster, iteration, "cluster became empty, keeping its previous centroid"),
            }
        }

        // Calculate new centroids from the per-cluster sums
        state.centroids.chunks_exact_mut(sample_dims)
            .zip(new_centroids.chunks_exact(sample_dims))
            .zip(centroid_frequency.iter().cloned())
            .filter(|(_, cfreq)| *cfreq > 0)
            .for_each(|((c, nc), cfreq)| {
                let cfreq = T::from(cfreq).unwrap_or_else(T::nan);
                c.iter_mut().zip(nc.iter()).for_each(|(cv, &ncv)| *cv = ncv / cfreq);
            });
        Ok(())
    }

    pub fn calculate(data: &KMeans<T>, k: usize, max_iter: usize, init: Init<T>, config: &KMeansConfig<'_, T>) -> Result<KMeansState<T>> {
        Self::check_preconditions(data, k, max_iter, config)?;

        let mut state = KMeansState::new(data.sample_cnt, data.sample_dims, k);

        // Initialize clusters and notify subscriber
        init.initialize(data, &mut state, config)?;
        debug!(k, chosen = ?state.chosen_indices, "centroids initialized");
        (config.init_done)(&state);

        let convergence = Convergence::new(config.epsilon, data.sample_dims);
        state.phase = Phase::Iterating;
        for i in 1..=max_iter {
            let previous_centroids = state.centroids.clone();
            data.update_cluster_assignments(&mut state, None);
            let new_distsum: T = state.centroid_distances.iter().cloned().sum();
            Self::update_centroids(data, &mut state, i, config.empty_cluster)?;
            let check = convergence.check(&previous_centroids, &state.centroids);
            state.iterations = i;
            debug!(iteration = i, distsum = %new_distsum, max_shift = %check.max_shift, "iteration done");

            // Notify subscriber about finished iteration
            (config.iteration_done)(&state, i, new_distsum);
            state.distsum = new_distsum;
            if check.converged {
                state.phase = Phase::Converged;
                break;
            }
            if (config.abort_check)(&state, i) {
                state.phase = Phase::Aborted;
                break;
            }
        }
        if state.phase == Phase::Iterating {
            warn!(max_iter, "iteration limit reached without convergence");
            state.phase = Phase::IterationLimitReached;
        }

        // Final assignments belong to the final centroids
        data.update_cluster_assignments(&mut state, None);
        data.update_cluster_frequencies(&state.assignments, &mut state.centroid_frequency);
        state.distsum = state.centroid_distances.iter().cloned().sum();
        info!(phase = ?state.phase, iterations = state.iterations, distsum = %state.distsum, "k-means finished");
        Ok(state)
    }
}


#[cfg(test)]
mod tests {
    use crate::*;
    use crate::helpers::testing::*;
    use std::cell::RefCell;

    #[test]
    fn two_obvious_clusters_naive() {
        let kmean = KMeans::from_rows(&two_blobs()).unwrap();
        let res = kmean.kmeans_lloyd(2, 100, Init::Naive, &KMeansConfig::default()).unwrap();

        assert_eq!(res.phase, Phase::Converged);
        assert!(res.iterations <= 3, "took {} iterations", res.iterations);
        assert_approx_eq!(res.centroid(0)[0], 1.0 / 3.0, 1e-12);
        assert_approx_eq!(res.centroid(0)[1], 1.0 / 3.0, 1e-12);
        assert_approx_eq!(res.centroid(1)[0], 31.0 / 3.0, 1e-12);
        assert_approx_eq!(res.centroid(1)[1], 31.0 / 3.0, 1e-12);
        assert_eq!(res.assignments, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(res.centroid_frequency, vec![3, 3]);
        assert_eq!(res.chosen_indices, Some(vec![0, 1]));
        // per blob: 2/9 + 5/9 + 5/9
        assert_approx_eq!(res.distsum, 8.0 / 3.0, 1e-12);
    }

    #[test]
    fn two_obvious_clusters_kmeanplusplus() {
        let kmean = KMeans::from_rows(&two_blobs()).unwrap();
        let conf = KMeansConfig::build().random_seed(0).build();
        let res = kmean.kmeans_lloyd(2, 100, Init::KMeansPlusPlus, &conf).unwrap();

        let should = KMeansShouldResult {
            sample_dims: 2,
            assignments: vec![0, 0, 0, 1, 1, 1],
            centroids: vec![1.0 / 3.0, 1.0 / 3.0, 31.0 / 3.0, 31.0 / 3.0],
            distsum: 8.0 / 3.0,
        };
        assert_kmeans_result_eq(should, &res);
        assert_eq!(res.phase, Phase::Converged);
    }

    /// One sample of every iris species as initial centroids
    fn iris_seeds<T: Primitive>(samples: &[T]) -> Init<T> {
        Init::Precomputed([0, 50, 100].iter().flat_map(|&i| samples[i * 2..i * 2 + 2].to_vec()).collect())
    }

    #[test]
    fn iris_dataset_f64() {
        let samples = iris_petals::<f64>();
        let kmean = KMeans::new(samples.clone(), 150, 2).unwrap();
        let res = kmean.kmeans_lloyd(3, 100, iris_seeds(&samples), &KMeansConfig::default()).unwrap();

        let should_centroids = vec![1.462, 0.246, 4.292592592592593, 1.359259259259259, 5.626086956521738, 2.0478260869565217];
        for (c, s) in res.centroids.iter().zip(should_centroids.iter()) {
            assert_approx_eq!(*c, *s, 1e-9);
        }
        assert_eq!(res.iterations, 7);
        assert_eq!(res.phase, Phase::Converged);
        assert_eq!(res.centroid_frequency, vec![50, 54, 46]);
        assert_approx_eq!(res.distsum, 31.41288566827696, 1e-9);
        // Setosa petals are separated from the rest by a wide gap
        assert!(res.assignments[..50].iter().all(|&a| a == 0));
        assert!(res.assignments[50..].iter().all(|&a| a != 0));
    }

    #[test]
    fn iris_dataset_f32() {
        let samples = iris_petals::<f32>();
        let kmean = KMeans::new(samples.clone(), 150, 2).unwrap();
        let res = kmean.kmeans_lloyd(3, 100, iris_seeds(&samples), &KMeansConfig::default()).unwrap();

        let should_centroids = vec![1.462f32, 0.246, 4.2925925, 1.3592592, 5.626087, 2.0478265];
        for (c, s) in res.centroids.iter().zip(should_centroids.iter()) {
            assert_approx_eq!(*c, *s, 1e-4);
        }
        assert_eq!(res.centroid_frequency.iter().sum::<usize>(), 150);
        assert!(res.phase.is_terminal());
    }

    #[test]
    fn empty_cluster_fails_by_default() {
        let samples = vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0];
        let initial_centroids = vec![2.0, 0.0, 1337.0, 0.0];

        let kmean = KMeans::new(samples, 3, 2).unwrap();
        let res = kmean.kmeans_lloyd(2, 10, Init::Precomputed(initial_centroids), &KMeansConfig::default());
        assert_eq!(res.unwrap_err(), KMeansError::EmptyCluster { cluster: 1, iteration: 1 });
    }

    #[test]
    fn empty_cluster_keeps_previous_centroid() {
        let samples = vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0];
        let initial_centroids = vec![2.0, 0.0, 1337.0, 0.0];

        let kmean = KMeans::new(samples, 3, 2).unwrap();
        let conf = KMeansConfig::build().empty_cluster(EmptyClusterPolicy::KeepPrevious).build();
        let res = kmean.kmeans_lloyd(2, 10, Init::Precomputed(initial_centroids), &conf).unwrap();
        assert_eq!(&res.centroids, &[2.0, 0.0, 1337.0, 0.0]);
        assert_eq!(&res.centroid_frequency, &[3, 0]);
        assert_eq!(&res.assignments, &[0, 0, 0]);
        assert_eq!(res.distsum, 2.0);
        assert_eq!(res.phase, Phase::Converged);
    }

    #[test]
    fn duplicate_naive_seeds_leave_a_cluster_empty() {
        // Two identical samples seed two identical centroids; ties go to the lower index
        let kmean = KMeans::new(vec![1.0f64, 1.0, 5.0, 6.0], 4, 1).unwrap();
        let res = kmean.kmeans_lloyd(2, 10, Init::Naive, &KMeansConfig::default());
        assert_eq!(res.unwrap_err(), KMeansError::EmptyCluster { cluster: 1, iteration: 1 });
    }

    #[test]
    fn near_duplicates_with_k_n_minus_1() {
        let kmean = KMeans::new(vec![0.0f64, 0.01, 0.02, 0.03], 4, 1).unwrap();
        let res = kmean.kmeans_lloyd(3, 50, Init::Naive, &KMeansConfig::default()).unwrap();
        assert_eq!(res.centroid_frequency, vec![1, 1, 2]);

        let conf = KMeansConfig::build().random_seed(11).build();
        let res = kmean.kmeans_lloyd(3, 50, Init::KMeansPlusPlus, &conf).unwrap();
        assert!(res.centroid_frequency.iter().all(|&f| f > 0));
    }

    #[test]
    fn identical_samples_kmeanplusplus_is_degenerate() {
        let kmean = KMeans::new(vec![4.0f64; 10], 5, 2).unwrap();
        let conf = KMeansConfig::build().random_seed(5).build();
        let res = kmean.kmeans_lloyd(3, 10, Init::KMeansPlusPlus, &conf);
        assert_eq!(res.unwrap_err(), KMeansError::InitializationDegenerate { round: 1 });
    }

    #[test]
    fn huge_samples_kmeanplusplus_returns_an_error() {
        let kmean = KMeans::from_rows(&[[0.0f64], [1e200], [-1e200], [5.0]]).unwrap();
        let conf = KMeansConfig::build().random_seed(0).build();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| kmean.kmeans_lloyd(2, 10, Init::KMeansPlusPlus, &conf)));
        assert!(matches!(res, Ok(Err(KMeansError::NonFiniteDistance { .. }))));
    }

    #[test]
    fn iteration_limit_is_not_an_error() {
        let samples = iris_petals::<f64>();
        let kmean = KMeans::new(samples.clone(), 150, 2).unwrap();
        let res = kmean.kmeans_lloyd(3, 1, iris_seeds(&samples), &KMeansConfig::default()).unwrap();
        assert_eq!(res.phase, Phase::IterationLimitReached);
        assert_eq!(res.iterations, 1);
        assert_eq!(res.centroids.len(), 6);
    }

    #[test]
    fn abort_check_stops_between_iterations() {
        let samples = iris_petals::<f64>();
        let kmean = KMeans::new(samples.clone(), 150, 2).unwrap();
        let conf = KMeansConfig::build()
            .epsilon(0.0)
            .abort_check(&|_, iteration| iteration >= 2)
            .build();
        let res = kmean.kmeans_lloyd(3, 100, iris_seeds(&samples), &conf).unwrap();
        assert_eq!(res.iterations, 2);
        assert_eq!(res.phase, Phase::Aborted);
        assert_eq!(res.centroid_frequency.iter().sum::<usize>(), 150);
    }

    #[test]
    fn status_callbacks() {
        let kmean = KMeans::from_rows(&two_blobs()).unwrap();
        let init_seen = RefCell::new(Vec::new());
        let iterations_seen = RefCell::new(Vec::new());
        let init_done = |s: &KMeansState<f64>| init_seen.borrow_mut().push((s.phase, s.centroids.clone()));
        let iteration_done = |s: &KMeansState<f64>, nr: usize, distsum: f64| iterations_seen.borrow_mut().push((nr, s.distsum, distsum));
        let conf = KMeansConfig::build()
            .init_done(&init_done)
            .iteration_done(&iteration_done)
            .build();
        let res = kmean.kmeans_lloyd(2, 100, Init::Naive, &conf).unwrap();

        assert_eq!(*init_seen.borrow(), vec![(Phase::Initializing, vec![0.0, 0.0, 0.0, 1.0])]);
        let iterations_seen = iterations_seen.borrow();
        assert_eq!(iterations_seen.len(), res.iterations);
        assert_eq!(iterations_seen[0].0, 1);
        assert!(iterations_seen[0].1.is_infinite());
        for w in iterations_seen.windows(2) {
            assert_eq!(w[1].1, w[0].2);
            assert!(w[1].2 <= w[0].2);
        }
    }

    #[test]
    fn invalid_parameters() {
        let kmean = KMeans::from_rows(&two_blobs()).unwrap();
        let conf = KMeansConfig::default();
        for (k, max_iter) in [(0, 10), (6, 10), (7, 10), (2, 0)] {
            assert!(matches!(kmean.kmeans_lloyd(k, max_iter, Init::Naive, &conf), Err(KMeansError::InvalidParameter(_))));
        }
        let conf = KMeansConfig::build().epsilon(-1.0).build();
        assert!(matches!(kmean.kmeans_lloyd(2, 10, Init::Naive, &conf), Err(KMeansError::InvalidParameter(_))));
        let conf = KMeansConfig::build().epsilon(f64::NAN).build();
        assert!(matches!(kmean.kmeans_lloyd(2, 10, Init::Naive, &conf), Err(KMeansError::InvalidParameter(_))));
    }

    #[test]
    fn block_partials_match_sequential_means() {
        // More samples than one update block
        let sample_cnt = 3 * super::UPDATE_BLOCK_SIZE + 17;
        let samples: Vec<f64> = (0..sample_cnt).map(|i| (i % 97) as f64).collect();
        let kmean = KMeans::new(samples.clone(), sample_cnt, 1).unwrap();
        let conf = KMeansConfig::build().random_seed(3).build();
        let res = kmean.kmeans_lloyd(4, 1, Init::KMeansPlusPlus, &conf).unwrap();

        // Redo the last update sequentially from the pre-final assignments
        let chosen = res.chosen_indices.clone().unwrap();
        let mut centroids: Vec<f64> = chosen.iter().map(|&i| samples[i]).collect();
        let assignments: Vec<usize> = samples.iter().map(|s| {
            (0..4).fold(0, |best, ci| if (s - centroids[ci]).powi(2) < (s - centroids[best]).powi(2) { ci } else { best })
        }).collect();
        for ci in 0..4 {
            let members: Vec<f64> = samples.iter().zip(assignments.iter()).filter(|(_, &a)| a == ci).map(|(s, _)| *s).collect();
            centroids[ci] = members.iter().sum::<f64>() / members.len() as f64;
        }
        for ci in 0..4 {
            assert_approx_eq!(res.centroids[ci], centroids[ci], 1e-9);
        }
    }
}
