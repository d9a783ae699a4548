use std::fmt::{self, Display, Formatter};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::OrderedMap;

pub const DEFAULT_PROBABILITY: f64 = 0.5;
pub const DEFAULT_MAX_LEVEL: usize = 16;

/// Leveling parameters of a [SkipList].
///
/// `probability` is the chance of promoting a node one level further, `max_level` caps the
/// number of levels a node (and therefore the list) may reach. When `seed` is set the level
/// assignment, and with it the shape of the list, is reproducible.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SkipListConfig {
    pub probability: f64,
    pub max_level: usize,
    pub seed: Option<u64>,
}

impl Default for SkipListConfig {
    fn default() -> Self {
        SkipListConfig {
            probability: DEFAULT_PROBABILITY,
            max_level: DEFAULT_MAX_LEVEL,
            seed: None,
        }
    }
}

impl SkipListConfig {
    /// Default probability with `max_level = ceil(log2(n)) + 1`.
    pub fn for_capacity(n: usize) -> Self {
        let max_level = match n {
            0 | 1 => 1,
            _ => (usize::BITS - (n - 1).leading_zeros()) as usize + 1,
        };
        SkipListConfig {
            max_level,
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_seed(self, seed: u64) -> Self {
        SkipListConfig {
            seed: Some(seed),
            ..self
        }
    }
}

struct SkipNode<K, V> {
    key: K,
    value: V,
    // forward[l] is the next node on level l, its length is the level of this node
    forward: Vec<Option<usize>>,
}

/// Skip list with arena-allocated nodes.
///
/// Level 0 holds every key in ascending order, each higher level holds a random subset of the
/// level below it. The head sentinel has no key and is represented by `head`, one forward link
/// per level currently in use.
pub struct SkipList<K, V> {
    nodes: Vec<SkipNode<K, V>>,
    head: Vec<Option<usize>>,
    probability: f64,
    max_level: usize,
    rng: StdRng,
}

impl<K: Ord, V> Default for SkipList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> SkipList<K, V> {
    #[inline]
    pub fn new() -> Self {
        Self::with_config(SkipListConfig::default())
    }

    pub fn with_config(config: SkipListConfig) -> Self {
        let probability = if (0.0..=1.0).contains(&config.probability) {
            config.probability
        } else {
            DEFAULT_PROBABILITY
        };
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        SkipList {
            nodes: Vec::new(),
            head: vec![None],
            probability,
            max_level: config.max_level.max(1),
            rng,
        }
    }

    /// Number of levels currently in use, at least 1.
    #[inline]
    pub fn level(&self) -> usize {
        self.head.len()
    }

    #[inline]
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Lookup without `&mut`, the skip list never restructures on reads.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.locate(key).map(|idx| &self.nodes[idx].value)
    }

    /// The number of levels the node holding `key` takes part in.
    pub fn node_level(&self, key: &K) -> Option<usize> {
        self.locate(key).map(|idx| self.nodes[idx].forward.len())
    }

    #[inline]
    fn next_of(&self, at: Option<usize>, level: usize) -> Option<usize> {
        match at {
            None => self.head[level],
            Some(idx) => self.nodes[idx].forward[level],
        }
    }

    // the last node on level 0 whose key is smaller than `key`, None for the head
    fn predecessor(&self, key: &K, mut update: Option<&mut Vec<Option<usize>>>) -> Option<usize> {
        let mut cur = None;
        for level in (0..self.head.len()).rev() {
            while let Some(next) = self.next_of(cur, level) {
                if self.nodes[next].key < *key {
                    cur = Some(next);
                } else {
                    break;
                }
            }
            if let Some(update) = update.as_deref_mut() {
                update[level] = cur;
            }
        }
        cur
    }

    fn locate(&self, key: &K) -> Option<usize> {
        let pred = self.predecessor(key, None);
        self.next_of(pred, 0).filter(|&idx| self.nodes[idx].key == *key)
    }

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < self.max_level && self.rng.random_bool(self.probability) {
            level += 1;
        }
        level
    }
}

impl<K: Ord, V> OrderedMap for SkipList<K, V> {
    type Key = K;
    type Value = V;

    fn insert(&mut self, key: K, value: V) {
        let mut update = vec![None; self.head.len()];
        let pred = self.predecessor(&key, Some(&mut update));
        if let Some(idx) = self.next_of(pred, 0) {
            if self.nodes[idx].key == key {
                self.nodes[idx].value = value;
                return;
            }
        }

        let level = self.random_level();
        if level > self.head.len() {
            // new levels start at the head, so the splice below links the head to the new node
            self.head.resize(level, None);
            update.resize(level, None);
        }

        let idx = self.nodes.len();
        let forward = (0..level).map(|l| self.next_of(update[l], l)).collect();
        self.nodes.push(SkipNode {
            key,
            value,
            forward,
        });
        for (l, at) in update.iter().take(level).enumerate() {
            match *at {
                None => self.head[l] = Some(idx),
                Some(u) => self.nodes[u].forward[l] = Some(idx),
            }
        }
    }

    #[inline]
    fn find(&mut self, key: &K) -> Option<&V> {
        self.get(key)
    }

    #[inline]
    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.head = vec![None];
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a K, &'a V)>
    where
        Self::Key: 'a,
        Self::Value: 'a,
    {
        SkipListIter {
            list: self,
            cur: self.head[0],
        }
    }
}

struct SkipListIter<'a, K, V> {
    list: &'a SkipList<K, V>,
    cur: Option<usize>,
}

impl<'a, K, V> Iterator for SkipListIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.list.nodes[self.cur?];
        self.cur = node.forward[0];
        Some((&node.key, &node.value))
    }
}

/// One line per level, topmost first:
/// ```text
/// L1: 3 18
/// L0: 1 3 7 18 22
/// ```
impl<K: Display, V> Display for SkipList<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for level in (0..self.head.len()).rev() {
            write!(f, "L{}:", level)?;
            let mut cur = self.head[level];
            while let Some(idx) = cur {
                write!(f, " {}", self.nodes[idx].key)?;
                cur = self.nodes[idx].forward[level];
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
