//! Bounded newest-first indexes.
//!
//! Report runs and insight history are each tracked by an index stored
//! under one key: a list of record identifiers, newest first, capped at a
//! capacity. Identifiers sort chronologically (fixed-width run timestamps,
//! epoch milliseconds), so "newest first" is plain descending order.
//!
//! [`IndexUpdate::compute`] is the pure part of an index update. The
//! stores turn its result into one atomic batch that writes the new index
//! and deletes the records of evicted identifiers together.

/// Result of inserting an identifier into an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUpdate<T> {
    /// The new index, newest first, at most `capacity` long.
    pub kept: Vec<T>,
    /// Identifiers that fell off the end. Their records must be deleted.
    pub evicted: Vec<T>,
}

impl<T: Ord + Clone> IndexUpdate<T> {
    /// Insert `id` (if absent), sort descending, and split at `capacity`.
    pub fn compute(mut current: Vec<T>, id: T, capacity: usize) -> Self {
        if !current.contains(&id) {
            current.push(id);
        }
        current.sort_unstable_by(|a, b| b.cmp(a));
        current.dedup();
        let evicted = if current.len() > capacity {
            current.split_off(capacity)
        } else {
            Vec::new()
        };
        Self {
            kept: current,
            evicted,
        }
    }
}
