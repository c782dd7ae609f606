mod euclideandistance;

pub(crate) use euclideandistance::squared_unchecked;
pub use euclideandistance::{distance, squared_distance};
