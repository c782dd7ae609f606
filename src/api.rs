use crate::{distances, inits::Init, memory::*, KMeansError, Result};
use std::cell::RefCell;
use rayon::prelude::*;
use rand::prelude::*;

pub type InitDoneCallbackFn<'a, T> = &'a dyn Fn(&KMeansState<T>);
pub type IterationDoneCallbackFn<'a, T> = &'a dyn Fn(&KMeansState<T>, usize, T);
pub type AbortCheckFn<'a, T> = &'a dyn Fn(&KMeansState<T>, usize) -> bool;

/// Sentinel used in [`KMeansState::assignments`] for samples that have not been assigned to a cluster yet.
/// Only ever visible from the `init_done` callback; after the first iteration, every sample is assigned.
pub const UNASSIGNED: usize = usize::MAX;

/// What to do, when an assignment round leaves a cluster without members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmptyClusterPolicy {
    /// Abort the run with [`KMeansError::EmptyCluster`].
    #[default]
    Fail,
    /// Keep the empty cluster's previous centroid unchanged and continue.
    KeepPrevious,
}

/// This is a structure holding various configuration options for a k-means calculation, such as
/// the random number generator to use, the convergence tolerance, or a couple of callbacks, that can be set
/// to get status information from a running k-means calculation.
///
/// For a more detailed information about all possible options, have a look at [`KMeansConfigBuilder`].
pub struct KMeansConfig<'a, T: Primitive> {
    /// Callback that is called, when the initialization phase finished
    /// ## Arguments
    /// - **state**: Current [`KMeansState`] after the initialization
    pub(crate) init_done: InitDoneCallbackFn<'a, T>,
    /// Callback that is called after each iteration
    /// ## Arguments
    /// - **state**: Current [`KMeansState`] after the iteration
    /// - **iteration_id**: Number of the current iteration
    /// - **distsum**: New distance sum (**state** contains the distsum from the previous iteration)
    pub(crate) iteration_done: IterationDoneCallbackFn<'a, T>,
    /// Callback that is asked at every iteration boundary, whether the calculation should stop
    /// ## Arguments
    /// - **state**: Current [`KMeansState`] after the iteration
    /// - **iteration_id**: Number of the iteration that just finished
    pub(crate) abort_check: AbortCheckFn<'a, T>,
    /// Random number generator to use
    pub(crate) rnd: Box<RefCell<dyn RngCore>>,
    /// Maximum distance every centroid may move within one iteration, for the calculation to count as converged
    pub(crate) epsilon: T,
    pub(crate) empty_cluster: EmptyClusterPolicy
}
impl<'a, T: Primitive> Default for KMeansConfig<'a, T> {
    fn default() -> Self {
        Self {
            init_done: &|_| {},
            iteration_done: &|_,_,_| {},
            abort_check: &|_,_| false,
            rnd: Box::new(RefCell::new(rand::thread_rng())),
            epsilon: T::from(0.001).unwrap_or_else(T::epsilon),
            empty_cluster: EmptyClusterPolicy::default()
        }
    }
}
impl<'a, T: Primitive> KMeansConfig<'a, T> {
    /// Use the [`KMeansConfigBuilder`] to build a [`KMeansConfig`] instance.
    pub fn build() -> KMeansConfigBuilder<'a, T> {
        KMeansConfigBuilder { config: KMeansConfig::default() }
    }

    pub fn epsilon(&self) -> T { self.epsilon }
}
impl<'a, T: Primitive> std::fmt::Debug for KMeansConfig<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KMeansConfig")
            .field("epsilon", &self.epsilon)
            .field("empty_cluster", &self.empty_cluster)
            .finish_non_exhaustive()
    }
}

pub struct KMeansConfigBuilder<'a, T: Primitive> {
    config: KMeansConfig<'a, T>
}
impl<'a, T: Primitive> KMeansConfigBuilder<'a, T> {
    /// Set the callback that should be called after the centroid initialization, before the iteration starts.
    pub fn init_done(mut self, init_done: InitDoneCallbackFn<'a, T>) -> Self {
        self.config.init_done = init_done; self
    }
    /// Set the callback that should be called after each iteration during a running k-means calculation.
    pub fn iteration_done(mut self, iteration_done: IterationDoneCallbackFn<'a, T>) -> Self {
        self.config.iteration_done = iteration_done; self
    }
    /// Set a callback that can stop a running calculation. It is only consulted between two
    /// iterations; returning **true** ends the run with [`Phase::Aborted`].
    pub fn abort_check(mut self, abort_check: AbortCheckFn<'a, T>) -> Self {
        self.config.abort_check = abort_check; self
    }
    /// Set the random number generator that should be used in the k-means calculation.
    /// Use a seeded generator for deterministically repeatable results.
    pub fn random_generator<R: RngCore + 'static>(mut self, rnd: R) -> Self {
        self.config.rnd = Box::new(RefCell::new(rnd)); self
    }
    /// Shortcut for [`KMeansConfigBuilder::random_generator`] with a [`StdRng`] seeded from **seed**.
    pub fn random_seed(self, seed: u64) -> Self {
        self.random_generator(StdRng::seed_from_u64(seed))
    }
    /// Set the convergence tolerance.
    /// ## Default
    /// `0.001`
    pub fn epsilon(mut self, epsilon: T) -> Self {
        self.config.epsilon = epsilon; self
    }
    /// Set the policy for clusters that lose all of their members.
    /// ## Default
    /// [`EmptyClusterPolicy::Fail`]
    pub fn empty_cluster(mut self, policy: EmptyClusterPolicy) -> Self {
        self.config.empty_cluster = policy; self
    }
    /// Return the internally built configuration structure.
    pub fn build(self) -> KMeansConfig<'a, T> { self.config }
}


/// Lifecycle of a calculation. A run starts in `Initializing`, moves to `Iterating` and ends in one
/// of the three terminal phases. All terminal phases carry a usable result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Iterating,
    /// No centroid moved more than `epsilon` in the last iteration.
    Converged,
    /// `max_iter` iterations ran without convergence.
    IterationLimitReached,
    /// The configured abort-check stopped the calculation.
    Aborted,
}
impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Converged | Phase::IterationLimitReached | Phase::Aborted)
    }
}


/// This is the internally used data-structure, storing the current state during calculation, as
/// well as the final result, as returned by the API.
/// All mutations are done in this structure, making [`KMeans`] immutable, and therefore allowing
/// it to be used in parallel, without having to duplicate the input-data.
///
/// ## Generics
/// - **T**: Underlying primitive type that was used for the calculation
///
/// ## Fields
/// - **k**: The amount of clusters that were requested when calculating this k-means result
/// - **sample_dims**: Amount of dimensions of every sample and centroid
/// - **distsum**: The total sum of (squared) distances from all samples to their respective centroids
/// - **centroids**: Calculated cluster centers [row-major] = [<centroid0>,<centroid1>,<centroid2>,...]
/// - **centroid_frequency**: Amount of samples in each centroid
/// - **assignments**: Vector mapping each sample to its respective nearest cluster
/// - **centroid_distances**: Vector containing each sample's (squared) distance to its centroid
/// - **chosen_indices**: Indices of the samples that were used as initial centroids, in selection order
///   (`None` for precomputed centroids)
/// - **iterations**: Amount of finished iterations
/// - **phase**: Where the calculation is in its lifecycle; terminal once returned
#[derive(Clone, Debug)]
pub struct KMeansState<T: Primitive> {
    pub k: usize,
    pub sample_dims: usize,
    pub distsum: T,
    pub centroids: Vec<T>,
    pub centroid_frequency: Vec<usize>,
    pub assignments: Vec<usize>,
    pub centroid_distances: Vec<T>,
    pub chosen_indices: Option<Vec<usize>>,
    pub iterations: usize,
    pub phase: Phase
}
impl<T: Primitive> KMeansState<T> {
    pub(crate) fn new(sample_cnt: usize, sample_dims: usize, k: usize) -> Self {
        Self {
            k,
            sample_dims,
            distsum: T::infinity(),
            centroids: vec![T::zero();sample_dims * k],
            centroid_frequency: vec![0usize;k],
            assignments: vec![UNASSIGNED;sample_cnt],
            centroid_distances: vec![T::infinity();sample_cnt],
            chosen_indices: None,
            iterations: 0,
            phase: Phase::Initializing
        }
    }
    pub(crate) fn set_centroid_from_iter(&mut self, idx: usize, src: impl Iterator<Item = T>) {
        self.centroids.iter_mut().skip(self.sample_dims * idx).take(self.sample_dims)
                .zip(src)
                .for_each(|(c,s)| *c = s);
    }

    /// View of the **idx**-th centroid.
    pub fn centroid(&self, idx: usize) -> &[T] {
        &self.centroids[idx * self.sample_dims..(idx + 1) * self.sample_dims]
    }

    /// Iterate over all k centroids, in cluster order.
    pub fn centroids_iter(&self) -> std::slice::ChunksExact<'_, T> {
        self.centroids.chunks_exact(self.sample_dims)
    }
}


/// Entrypoint of this crate's API-Surface.
///
/// Create an instance of this struct, giving the samples you want to operate on. The primitive type
/// of the passed samples array will be the type used internaly for all calculations, as well as the result
/// as stored in the returned [`KMeansState`] structure.
///
/// The samples are read-only for the lifetime of the instance.
///
/// ## Supported initialization methods
/// - Naive (first k samples) [`Init::Naive`]
/// - K-Mean++ [`Init::KMeansPlusPlus`]
/// - Precomputed centroids [`Init::Precomputed`]
#[derive(Clone, Debug)]
pub struct KMeans<T: Primitive> {
    pub(crate) sample_cnt: usize,
    pub(crate) sample_dims: usize,
    pub(crate) samples: Vec<T>
}
impl<T: Primitive> KMeans<T> {
    /// Create a new instance of the [`KMeans`] structure.
    ///
    /// ## Arguments
    /// - **samples**: Vector of samples [row-major] = [<sample0>,<sample1>,<sample2>,...]
    /// - **sample_cnt**: Amount of samples, contained in the passed **samples** vector
    /// - **sample_dims**: Amount of dimensions each sample from the **sample** vector has
    ///
    /// ## Errors
    /// [`KMeansError::InvalidParameter`] if **sample_dims** is zero or **samples** does not
    /// contain exactly `sample_cnt * sample_dims` values.
    pub fn new(samples: Vec<T>, sample_cnt: usize, sample_dims: usize) -> Result<Self> {
        if sample_dims == 0 {
            return Err(KMeansError::InvalidParameter("sample_dims must be at least 1".into()));
        }
        if samples.len() != sample_cnt * sample_dims {
            return Err(KMeansError::InvalidParameter(format!(
                "expected {} values ({} samples x {} dims), got {}",
                sample_cnt * sample_dims, sample_cnt, sample_dims, samples.len()
            )));
        }
        Ok(Self { sample_cnt, sample_dims, samples })
    }

    /// Create a new instance from individual rows. The first row determines the dimension.
    ///
    /// ## Errors
    /// - [`KMeansError::DimensionMismatch`] for the first row whose length differs from the first row's
    /// - [`KMeansError::InvalidParameter`] if there are no rows, or the rows are empty
    pub fn from_rows<R: AsRef<[T]>>(rows: &[R]) -> Result<Self> {
        let sample_dims = rows.first()
            .map(|r| r.as_ref().len())
            .ok_or_else(|| KMeansError::InvalidParameter("no samples given".into()))?;
        let mut samples = Vec::with_capacity(rows.len() * sample_dims);
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != sample_dims {
                return Err(KMeansError::DimensionMismatch { index, expected: sample_dims, got: row.len() });
            }
            samples.extend_from_slice(row);
        }
        Self::new(samples, rows.len(), sample_dims)
    }

    pub fn sample_cnt(&self) -> usize { self.sample_cnt }
    pub fn sample_dims(&self) -> usize { self.sample_dims }

    /// View of the **idx**-th sample.
    pub fn sample(&self, idx: usize) -> &[T] {
        &self.samples[idx * self.sample_dims..(idx + 1) * self.sample_dims]
    }

    /// Assign every sample to its nearest centroid, and store the (squared) distance to it.
    /// Ties are broken towards the lowest cluster index.
    ///
    /// With **limit_k**, only the first `limit_k` centroids are considered (used while centroids are still being chosen).
    pub(crate) fn update_cluster_assignments(&self, state: &mut KMeansState<T>, limit_k: Option<usize>) {
        let centroids = &state.centroids;
        let k = limit_k.unwrap_or(state.k);
        let sample_dims = self.sample_dims;

        self.samples.par_chunks_exact(sample_dims)
            .zip(state.assignments.par_iter_mut())
            .zip(state.centroid_distances.par_iter_mut())
            .for_each(|((s, assignment), centroid_dist)| {
                let mut best_idx = 0;
                let mut best_dist = T::infinity();
                for (ci, c) in centroids.chunks_exact(sample_dims).take(k).enumerate() {
                    let dist = distances::squared_unchecked(s, c);
                    // strict comparison keeps the lowest index on ties
                    if dist < best_dist {
                        best_idx = ci;
                        best_dist = dist;
                    }
                }
                *assignment = best_idx;
                *centroid_dist = best_dist;
            });
    }

    /// Count the members of every cluster. Unassigned samples are not counted.
    pub(crate) fn update_cluster_frequencies(&self, assignments: &[usize], centroid_frequency: &mut[usize]) {
        centroid_frequency.iter_mut().for_each(|v| *v = 0);
        assignments.iter().cloned()
            .filter(|&centroid_id| centroid_id != UNASSIGNED)
            .for_each(|centroid_id| centroid_frequency[centroid_id] += 1);
    }


    /// Normal K-Means algorithm implementation (Lloyd).
    ///
    /// Initializes the centroids once, then repeats assignment, update and convergence check until
    /// every centroid moved at most `epsilon` (see [`KMeansConfigBuilder::epsilon`]) or **max_iter**
    /// iterations ran. Reaching **max_iter** is not an error.
    ///
    /// ## Arguments
    /// - **k**: Amount of clusters to search for (`1 <= k < sample_cnt`)
    /// - **max_iter**: Limit the maximum amount of iterations (at least 1)
    /// - **init**: Initialization-Method to use for the initialization of the **k** centroids
    /// - **config**: [`KMeansConfig`] instance, containing several configuration options for the calculation.
    ///
    /// ## Returns
    /// Instance of [`KMeansState`], containing the final state (result).
    ///
    /// ## Errors
    /// - [`KMeansError::InvalidParameter`] for violated preconditions
    /// - [`KMeansError::InitializationDegenerate`] if k-means++ runs out of distinct samples
    /// - [`KMeansError::NonFiniteDistance`] if k-means++ meets a distance that overflows
    /// - [`KMeansError::EmptyCluster`] if a cluster loses all members (with [`EmptyClusterPolicy::Fail`])
    ///
    /// ## Example
    /// ```rust
    /// use kmeans_pp::*;
    ///
    /// let samples = vec![0.0f64, 0.0, 0.0, 1.0, 1.0, 0.0, 10.0, 10.0, 10.0, 11.0, 11.0, 10.0];
    /// let kmean = KMeans::new(samples, 6, 2).unwrap();
    /// let conf = KMeansConfig::build().random_seed(0).build();
    /// let result = kmean.kmeans_lloyd(2, 300, Init::KMeansPlusPlus, &conf).unwrap();
    ///
    /// println!("Chosen seeds: {:?}", result.chosen_indices);
    /// println!("Centroids: {:?}", result.centroids);
    /// println!("Error: {}", result.distsum);
    /// ```
    pub fn kmeans_lloyd(&self, k: usize, max_iter: usize, init: Init<T>, config: &KMeansConfig<'_, T>) -> Result<KMeansState<T>> {
        crate::variants::Lloyd::calculate(self, k, max_iter, init, config)
    }
}
