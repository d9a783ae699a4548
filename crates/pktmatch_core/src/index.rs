//! # Rule index
//!
//! A [RuleIndex] is five [FieldMap]s, one per [Field], built from a [RuleSet]. All five maps of
//! one index use the same [Backend], the backend is picked once when the index is built.
use std::fmt::{Display, Formatter};

use pktmatch_map::{OrderedMap, SkipList, SkipListConfig, SplayTree};
use tracing::{debug, warn};

use crate::{
    packet::{Field, FieldValue},
    rule::{RuleSet, RuleTable},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    SkipList,
    SplayTree,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::SkipList, Backend::SplayTree];

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Backend::SkipList => "skip list",
            Backend::SplayTree => "splay tree",
        }
    }
}

impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Either of the two ordered maps, keyed by a field value.
pub enum FieldMap<V> {
    SkipList(SkipList<FieldValue, V>),
    SplayTree(SplayTree<FieldValue, V>),
}

impl<V> FieldMap<V> {
    pub fn new(backend: Backend, config: &SkipListConfig) -> Self {
        match backend {
            Backend::SkipList => FieldMap::SkipList(SkipList::with_config(*config)),
            Backend::SplayTree => FieldMap::SplayTree(SplayTree::new()),
        }
    }

    #[inline]
    pub fn backend(&self) -> Backend {
        match self {
            FieldMap::SkipList(_) => Backend::SkipList,
            FieldMap::SplayTree(_) => Backend::SplayTree,
        }
    }
}

impl<V> OrderedMap for FieldMap<V> {
    type Key = FieldValue;
    type Value = V;

    #[inline]
    fn insert(&mut self, key: FieldValue, value: V) {
        match self {
            FieldMap::SkipList(m) => m.insert(key, value),
            FieldMap::SplayTree(m) => m.insert(key, value),
        }
    }

    #[inline]
    fn find(&mut self, key: &FieldValue) -> Option<&V> {
        match self {
            FieldMap::SkipList(m) => m.find(key),
            FieldMap::SplayTree(m) => m.find(key),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        match self {
            FieldMap::SkipList(m) => m.len(),
            FieldMap::SplayTree(m) => m.len(),
        }
    }

    fn clear(&mut self) {
        match self {
            FieldMap::SkipList(m) => m.clear(),
            FieldMap::SplayTree(m) => m.clear(),
        }
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a FieldValue, &'a V)>
    where
        Self::Key: 'a,
        Self::Value: 'a,
    {
        match self {
            FieldMap::SkipList(m) => EitherIter::Left(m.iter()),
            FieldMap::SplayTree(m) => EitherIter::Right(m.iter()),
        }
    }
}

enum EitherIter<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Iterator for EitherIter<L, R>
where
    L: Iterator,
    R: Iterator<Item = L::Item>,
{
    type Item = L::Item;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        match self {
            EitherIter::Left(l) => l.next(),
            EitherIter::Right(r) => r.next(),
        }
    }
}

/// A rule value that was left out of the index because it does not fit its field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Discarded {
    pub field: Field,
    pub value: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub inserted: usize,
    pub discarded: Vec<Discarded>,
}

pub struct RuleIndex<V> {
    backend: Backend,
    // in Field::ALL order
    maps: Vec<(FieldMap<V>, Field)>,
}

impl<V> RuleIndex<V> {
    #[inline]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[inline]
    pub fn field_maps(&self) -> &[(FieldMap<V>, Field)] {
        &self.maps
    }

    /// The `(map, field)` pairs the classifier consumes, in packet order.
    #[inline]
    pub fn field_maps_mut(&mut self) -> &mut [(FieldMap<V>, Field)] {
        &mut self.maps
    }

    #[inline]
    pub fn map(&self, field: Field) -> &FieldMap<V> {
        &self.maps[field.position() - 1].0
    }

    #[inline]
    pub fn map_mut(&mut self, field: Field) -> &mut FieldMap<V> {
        &mut self.maps[field.position() - 1].0
    }
}

/// Builds a single map from one table. Values wider than the field are skipped and recorded in
/// `report`.
pub fn build_map<P: Clone>(
    table: &RuleTable<P>,
    field: Field,
    backend: Backend,
    config: &SkipListConfig,
    report: &mut BuildReport,
) -> FieldMap<P> {
    let mut map = FieldMap::new(backend, config);
    for (value, payload) in table.iter() {
        match field.fit(*value) {
            Some(key) => {
                map.insert(key, payload.clone());
                report.inserted += 1;
            }
            None => {
                warn!(field = %field, value, "discarding out-of-range rule value");
                report.discarded.push(Discarded {
                    field,
                    value: *value,
                });
            }
        }
    }
    debug!(field = %field, backend = %backend, entries = map.len(), "built field map");
    map
}

/// Builds all five maps of a [RuleIndex] with one backend. Construction never aborts, malformed
/// entries are listed in the returned [BuildReport].
pub fn build_index<P: Clone>(
    rules: &RuleSet<P>,
    backend: Backend,
    config: &SkipListConfig,
) -> (RuleIndex<P>, BuildReport) {
    let mut report = BuildReport::default();
    let maps = Field::ALL
        .into_iter()
        .map(|field| {
            (
                build_map(rules.table(field), field, backend, config, &mut report),
                field,
            )
        })
        .collect();
    (RuleIndex { backend, maps }, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rules() -> RuleSet<usize> {
        let mut rules = RuleSet::new();
        rules.add_rule([3232235777, 167772161, 1024, 80, 6], 0);
        rules.add_rule([3232235778, 167772162, 2048, 443, 17], 1);
        rules.insert(Field::DestinationPort, 70000, 2);
        rules.insert(Field::Protocol, 300, 3);
        rules
    }

    #[test]
    fn test_build_index_reports_discards() {
        let rules = sample_rules();
        for backend in Backend::ALL {
            let config = SkipListConfig::default().with_seed(5);
            let (mut index, report) = build_index(&rules, backend, &config);
            assert_eq!(index.backend(), backend);
            assert_eq!(report.inserted, 10);
            assert_eq!(
                report.discarded,
                vec![
                    Discarded {
                        field: Field::DestinationPort,
                        value: 70000
                    },
                    Discarded {
                        field: Field::Protocol,
                        value: 300
                    },
                ]
            );
            let fields: Vec<Field> = index.field_maps().iter().map(|(_, f)| *f).collect();
            assert_eq!(fields, Field::ALL.to_vec());
            assert!(index
                .field_maps()
                .iter()
                .all(|(m, _)| m.backend() == backend));
            assert_eq!(index.map_mut(Field::Protocol).find(&17), Some(&1));
            assert_eq!(index.map_mut(Field::DestinationPort).find(&80), Some(&0));
            assert_eq!(index.map_mut(Field::DestinationPort).find(&(70000u64 as u32)), None);
            assert_eq!(index.map(Field::SourcePort).len(), 2);
        }
    }

    #[test]
    fn test_field_map_iter_ordered() {
        let mut table = RuleTable::default();
        for v in [80u64, 22, 443, 8080, 22] {
            table.insert(v, v as usize);
        }
        for backend in Backend::ALL {
            let mut report = BuildReport::default();
            let config = SkipListConfig::default().with_seed(1);
            let map = build_map(&table, Field::DestinationPort, backend, &config, &mut report);
            let keys: Vec<FieldValue> = map.iter().map(|(k, _)| *k).collect();
            assert_eq!(keys, vec![22, 80, 443, 8080]);
            assert_eq!(report.inserted, 4);
        }
    }

    #[test]
    fn test_empty_index() {
        let rules = RuleSet::<()>::new();
        let config = SkipListConfig::default();
        let (mut index, report) = build_index(&rules, Backend::SkipList, &config);
        assert_eq!(report, BuildReport::default());
        for (map, _) in index.field_maps_mut() {
            assert!(map.is_empty());
            assert_eq!(map.find(&0), None);
        }
    }
}
