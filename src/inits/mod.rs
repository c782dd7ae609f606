use crate::{KMeans, KMeansConfig, KMeansState, Result, memory::*};

pub(crate) mod kmeanplusplus;
pub(crate) mod naive;
pub(crate) mod precomputed;

/// Centroid initialization method, used for the initialization of the k centroids
/// before the first iteration.
#[derive(Clone, Debug, PartialEq)]
pub enum Init<T: Primitive> {
    /// The first k samples, in input order, become the initial centroids.
    ///
    /// ## Note
    /// Duplicate samples are not filtered. Two identical samples among the first k seed two
    /// identical centroids; the later one then stays empty after the first assignment round.
    Naive,
    /// K-Means++ initialization method
    ///
    /// ## Description
    /// This initialization method starts by selecting one sample uniformly at random as first centroid.
    /// Proceeding from there, the method iteratively selects one new centroid (per round) by drawing
    /// a sample with a probability proportional to its distance to the nearest already chosen centroid.
    /// Samples that coincide with a chosen centroid can not be drawn again.
    KMeansPlusPlus,
    /// Use the given centroids [row-major] = [<centroid0>,<centroid1>,...] (exactly `k * sample_dims` values).
    Precomputed(Vec<T>),
}

impl<T: Primitive> Init<T> {
    pub(crate) fn initialize(self, kmean: &KMeans<T>, state: &mut KMeansState<T>, config: &KMeansConfig<'_, T>) -> Result<()> {
        match self {
            Init::Naive => naive::calculate(kmean, state),
            Init::KMeansPlusPlus => kmeanplusplus::calculate(kmean, state, config),
            Init::Precomputed(centroids) => precomputed::calculate(kmean, state, centroids),
        }
    }
}
