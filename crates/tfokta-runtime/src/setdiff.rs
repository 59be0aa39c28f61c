//! Set difference for set-typed attributes.

use std::collections::HashSet;
use std::hash::Hash;

/// Members to add and remove to turn one set into another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    /// In the order they appear in the new set.
    pub to_add: Vec<T>,
    /// In the order they appear in the old set.
    pub to_remove: Vec<T>,
}

impl<T> SetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Number of mutating calls needed to apply the diff.
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

impl<T> Default for SetDiff<T> {
    fn default() -> Self {
        Self {
            to_add: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}

/// Compute the members of `new` missing from `old`, and of `old` missing from `new`.
///
/// Duplicates in either input are reported once.
pub fn set_diff<T>(old: &[T], new: &[T]) -> SetDiff<T>
where
    T: Eq + Hash + Clone,
{
    let old_members: HashSet<&T> = old.iter().collect();
    let new_members: HashSet<&T> = new.iter().collect();

    let mut seen = HashSet::new();
    let to_add = new
        .iter()
        .filter(|item| !old_members.contains(item) && seen.insert(*item))
        .cloned()
        .collect();

    let mut seen = HashSet::new();
    let to_remove = old
        .iter()
        .filter(|item| !new_members.contains(item) && seen.insert(*item))
        .cloned()
        .collect();

    SetDiff { to_add, to_remove }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_and_remove() {
        let diff = set_diff(&strings(&["A", "B", "C"]), &strings(&["B", "C", "D"]));
        assert_eq!(diff.to_add, strings(&["D"]));
        assert_eq!(diff.to_remove, strings(&["A"]));
        assert_eq!(diff.len(), 2);
    }

    #[test]
    fn test_equal_sets_are_empty() {
        let diff = set_diff(&strings(&["A", "B"]), &strings(&["B", "A"]));
        assert!(diff.is_empty());
    }

    #[test]
    fn test_stable_order() {
        let diff = set_diff(&strings(&["x", "c", "a"]), &strings(&["z", "b", "y"]));
        assert_eq!(diff.to_add, strings(&["z", "b", "y"]));
        assert_eq!(diff.to_remove, strings(&["x", "c", "a"]));
    }

    #[test]
    fn test_duplicates_ignored() {
        let diff = set_diff(&strings(&["A", "A", "B"]), &strings(&["C", "C"]));
        assert_eq!(diff.to_add, strings(&["C"]));
        assert_eq!(diff.to_remove, strings(&["A", "B"]));
    }

    #[test]
    fn test_empty_inputs() {
        let diff: SetDiff<String> = set_diff(&[], &[]);
        assert!(diff.is_empty());
        let diff = set_diff(&[], &strings(&["A"]));
        assert_eq!(diff.to_add, strings(&["A"]));
    }
}
