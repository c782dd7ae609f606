//! # kmeans_pp - API documentation
//!
//! kmeans_pp is a small rust library for the calculation of k-means-clustering, using Lloyd's
//! algorithm with either a naive or a k-means++ centroid initialization.
//!
//! ## Design target
//! Its API-surface is rather plain: samples are given using a raw row-major vector, instead of
//! any high-level arithmetics / matrix crate such as nalgebra or ndarray. Centroids are returned
//! the same way.
//!
//! ## Supported centroid initializations
//! The outcome of each K-Means run depends on the initialization of its clusters. For a list of
//! implemented initialization methods, see [`Init`].
//! - The naive initialization is fully deterministic.
//! - K-Means++ draws from the random number generator configured in [`KMeansConfig`]. Seed it
//!   (see [`KMeansConfigBuilder::random_seed`]) for reproducible results.
//!
//! ## Supported primitive types
//! - [`f32`]
//! - [`f64`]
//!
//! ## Example
//! ```rust
//! use kmeans_pp::*;
//!
//! let (sample_cnt, sample_dims, k, max_iter) = (2000, 8, 4, 300);
//!
//! // Generate some random data
//! let mut samples = vec![0.0f64;sample_cnt * sample_dims];
//! samples.iter_mut().for_each(|v| *v = rand::random());
//!
//! // Calculate kmeans, using kmean++ as initialization-method
//! let kmean = KMeans::new(samples, sample_cnt, sample_dims).unwrap();
//! let conf = KMeansConfig::build().random_seed(0).epsilon(0.001).build();
//! let result = kmean.kmeans_lloyd(k, max_iter, Init::KMeansPlusPlus, &conf).unwrap();
//!
//! println!("Chosen samples: {:?}", result.chosen_indices);
//! println!("Centroids: {:?}", result.centroids);
//! println!("Cluster-Assignments: {:?}", result.assignments);
//! println!("Error: {}", result.distsum);
//! ```
//!
//! ## Example (using the status event callbacks)
//! ```rust
//! use kmeans_pp::*;
//!
//! let (sample_cnt, sample_dims, k, max_iter) = (2000, 8, 4, 300);
//! let mut samples = vec![0.0f64;sample_cnt * sample_dims];
//! samples.iter_mut().for_each(|v| *v = rand::random());
//!
//! let conf = KMeansConfig::build()
//!     .init_done(&|_| println!("Initialization completed."))
//!     .iteration_done(&|s, nr, new_distsum|
//!         println!("Iteration {} - Error: {:.2} -> {:.2} | Improvement: {:.2}",
//!             nr, s.distsum, new_distsum, s.distsum - new_distsum))
//!     .build();
//!
//! let kmean = KMeans::new(samples, sample_cnt, sample_dims).unwrap();
//! let result = kmean.kmeans_lloyd(k, max_iter, Init::KMeansPlusPlus, &conf).unwrap();
//! println!("Finished after {} iterations: {:?}", result.iterations, result.phase);
//! ```
//!
//! ## Short API-Overview / Description
//! Entry-point of the library is the [`KMeans`] struct, generic over the underlying primitive
//! type. An instance takes over the sample data into its ownership and never mutates it.
//!
//! Calling [`KMeans::kmeans_lloyd`] does not mutate the instance either, so multiple runs can be
//! done in parallel (the assignment and update steps are already parallelized though). Internally,
//! a new instance of [`KMeansState`] stores the state (and finally the result) of a calculation.
//!
//! Failures are reported as [`KMeansError`]; the library never prints and never panics on bad input.
//! Progress is reported through [`tracing`] events (no subscriber is installed by the library).

#[macro_use] mod helpers;
mod memory;
mod error;
mod api;
mod distances;
mod convergence;
mod variants;
mod inits;

pub use api::{
    AbortCheckFn, EmptyClusterPolicy, InitDoneCallbackFn, IterationDoneCallbackFn, KMeans, KMeansConfig,
    KMeansConfigBuilder, KMeansState, Phase, UNASSIGNED,
};
pub use distances::{distance, squared_distance};
pub use error::{KMeansError, Result};
pub use inits::Init;
pub use memory::Primitive;
