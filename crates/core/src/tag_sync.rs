// Template/tag association reconciliation
//
// Given the current association set and the requested one, produce the
// minimal set of inserts and deletes. Applying the same target twice
// yields an empty plan the second time.

use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagReconciliation<T> {
    /// Ids in the target but not currently associated, in target order.
    pub to_add: Vec<T>,
    /// Ids currently associated but absent from the target.
    pub to_remove: Vec<T>,
}

impl<T> TagReconciliation<T>
where
    T: Eq + Hash + Clone,
{
    pub fn plan(current: &[T], target: &[T]) -> Self {
        let current_set: HashSet<&T> = current.iter().collect();
        let target_set: HashSet<&T> = target.iter().collect();

        let to_add = dedup_preserving_order(target)
            .into_iter()
            .filter(|id| !current_set.contains(id))
            .collect();
        let to_remove = dedup_preserving_order(current)
            .into_iter()
            .filter(|id| !target_set.contains(id))
            .collect();

        Self { to_add, to_remove }
    }

    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Drop repeated ids, keeping the first occurrence.
pub fn dedup_preserving_order<T>(ids: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}
