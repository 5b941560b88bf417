//! Aggregate statistics projected from a synced collection.
//!
//! Projections are pure functions over the full committed collection and are
//! re-run after every successful mutation. There is no incremental
//! accumulation path: recomputing from scratch keeps the stats impossible to
//! drift from the collection they summarize.

/// A pure projection from a collection to its aggregate statistics.
pub trait StatsProjector<T> {
    type Stats: Clone + Default + Send + Sync + 'static;

    fn project(&self, entities: &[T]) -> Self::Stats;
}

/// Mean of an iterator of floats; zero when empty.
pub fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
