//! Error types of a clustering run.

use thiserror::Error;

/// Result type alias for clustering operations.
pub type Result<T> = std::result::Result<T, KMeansError>;

/// Failures that abort a single clustering run. None of them is retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KMeansError {
    /// Two vectors that should share the run's dimension do not.
    /// **index** is the offending row; for [`crate::distance`] and [`crate::squared_distance`]
    /// it is the operand position, which is always 1 (the second operand is measured against the first).
    #[error("dimension mismatch at row {index}: expected {expected}, got {got}")]
    DimensionMismatch { index: usize, expected: usize, got: usize },

    /// K-Means++ could not draw the next centroid, because every remaining point
    /// coincides with an already chosen centroid (all weights are zero).
    #[error("k-means++ initialization is degenerate: no point left to draw in round {round}")]
    InitializationDegenerate { round: usize },

    /// The distance of sample **index** to its nearest chosen centroid is not finite
    /// (the squared distance overflowed, or the sample contains NaN), so k-means++ can not weigh it.
    #[error("distance of sample {index} to its nearest centroid is not finite")]
    NonFiniteDistance { index: usize },

    /// An assignment round left a cluster without any member.
    #[error("cluster {cluster} became empty in iteration {iteration}")]
    EmptyCluster { cluster: usize, iteration: usize },

    /// A caller precondition (k, d, max_iter, epsilon, ...) is violated.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
