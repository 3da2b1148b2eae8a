//! Tag Index Module
//!
//! Secondary index from tag to the set of members carrying it.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

// == Tag Index ==
/// Maps each tag to the members (cache keys, cache names, typed keys) labelled
/// with it.
///
/// Empty buckets are dropped eagerly, so `len()` counts live tags only.
#[derive(Debug, Clone)]
pub struct TagIndex<K = String> {
    buckets: HashMap<String, HashSet<K>>,
}

impl<K> Default for TagIndex<K> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> TagIndex<K> {
    // == Constructor ==
    /// Creates an empty tag index.
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Labels `member` with every tag in `tags`.
    pub fn insert<'a, I>(&mut self, member: &K, tags: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            self.buckets
                .entry(tag.clone())
                .or_default()
                .insert(member.clone());
        }
    }

    // == Remove ==
    /// Removes `member` from the buckets of `tags`, dropping buckets left empty.
    pub fn remove<'a, I>(&mut self, member: &K, tags: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for tag in tags {
            if let Some(bucket) = self.buckets.get_mut(tag) {
                bucket.remove(member);
                if bucket.is_empty() {
                    self.buckets.remove(tag);
                }
            }
        }
    }

    // == Take ==
    /// Removes the bucket for `tag` and returns its members.
    ///
    /// Returns an empty set for unknown tags.
    pub fn take(&mut self, tag: &str) -> HashSet<K> {
        self.buckets.remove(tag).unwrap_or_default()
    }

    /// Returns the members labelled with `tag`, if any.
    pub fn members(&self, tag: &str) -> Option<&HashSet<K>> {
        self.buckets.get(tag)
    }

    /// Returns true if `member` is in the bucket for `tag`.
    pub fn contains(&self, tag: &str, member: &K) -> bool {
        self.buckets
            .get(tag)
            .is_some_and(|bucket| bucket.contains(member))
    }

    /// Iterates over every `(tag, member)` pair.
    pub fn pairs(&self) -> impl Iterator<Item = (&String, &K)> {
        self.buckets
            .iter()
            .flat_map(|(tag, bucket)| bucket.iter().map(move |member| (tag, member)))
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Returns the number of live tags.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
