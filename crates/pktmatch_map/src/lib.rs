//! This module provides the ordered maps used as per-field rule storage: a probabilistic
//! [SkipList] and a self-adjusting [SplayTree]. Both keep their nodes in an arena and link them
//! by index, and both implement [OrderedMap] so the classifier never needs to know which one it
//! is talking to.
mod skiplist;
mod splay;

pub use crate::{
    skiplist::{SkipList, SkipListConfig, DEFAULT_MAX_LEVEL, DEFAULT_PROBABILITY},
    splay::SplayTree,
};

/// An ordered dictionary that supports insertion and exact-key lookup.
///
/// - Keys are unique, a later [insert](OrderedMap::insert) of an existing key overwrites its value.
/// - [find](OrderedMap::find) takes `&mut self` because some implementations restructure
///   themselves on access. The logical key order observed through [iter](OrderedMap::iter) is
///   never changed by a lookup.
pub trait OrderedMap {
    type Key: Ord;
    type Value;

    // Required methods
    fn insert(&mut self, key: Self::Key, value: Self::Value);

    fn find(&mut self, key: &Self::Key) -> Option<&Self::Value>;

    fn len(&self) -> usize;

    fn clear(&mut self);

    /// In-order traversal, keys are strictly ascending.
    fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a Self::Key, &'a Self::Value)>
    where
        Self::Key: 'a,
        Self::Value: 'a;

    // Provided methods
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&mut self, key: &Self::Key) -> bool {
        self.find(key).is_some()
    }
}

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{OrderedMap, SkipList, SkipListConfig, SplayTree};
}
