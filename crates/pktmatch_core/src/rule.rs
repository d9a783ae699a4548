//! # Rule tables
//!
//! A [RuleTable] maps a raw field value to the payload of the rule that carries it. Values are
//! kept as `u64` so that a value too wide for its field survives loading and can be reported when
//! the index is built. Tables keep insertion order and a later value overwrites an earlier one.
use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::packet::Field;

pub type RuleTable<P> = IndexMap<u64, P, FxBuildHasher>;

/// One [RuleTable] per [Field].
#[derive(Debug, Clone)]
pub struct RuleSet<P> {
    tables: [RuleTable<P>; 5],
}

impl<P> Default for RuleSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> RuleSet<P> {
    pub fn new() -> Self {
        RuleSet {
            tables: std::array::from_fn(|_| RuleTable::default()),
        }
    }

    #[inline]
    pub fn table(&self, field: Field) -> &RuleTable<P> {
        &self.tables[field.position() - 1]
    }

    #[inline]
    pub fn table_mut(&mut self, field: Field) -> &mut RuleTable<P> {
        &mut self.tables[field.position() - 1]
    }

    /// Returns the payload that was overwritten, if any.
    #[inline]
    pub fn insert(&mut self, field: Field, value: u64, payload: P) -> Option<P> {
        self.table_mut(field).insert(value, payload)
    }

    /// Total number of entries across all tables.
    pub fn len(&self) -> usize {
        self.tables.iter().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: Clone> RuleSet<P> {
    /// Spreads a five-tuple rule over the tables, `values` in [Field::ALL] order.
    pub fn add_rule(&mut self, values: [u64; 5], payload: P) {
        for (field, value) in Field::ALL.into_iter().zip(values) {
            self.insert(field, value, payload.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ruleset_overwrite_keeps_order() {
        let mut rules = RuleSet::new();
        assert!(rules.is_empty());
        rules.insert(Field::Protocol, 6, "tcp-rule");
        rules.insert(Field::Protocol, 17, "udp-rule");
        assert_eq!(rules.insert(Field::Protocol, 6, "tcp-rule-2"), Some("tcp-rule"));
        let table = rules.table(Field::Protocol);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec![(&6, &"tcp-rule-2"), (&17, &"udp-rule")]
        );
        assert!(rules.table(Field::SourcePort).is_empty());
    }

    #[test]
    fn test_ruleset_add_rule() {
        let mut rules = RuleSet::new();
        rules.add_rule([1, 2, 3, 4, 5], 0usize);
        rules.add_rule([1, 20, 30, 40, 5], 1usize);
        assert_eq!(rules.len(), 8);
        assert_eq!(rules.table(Field::SourceAddress).get(&1u64), Some(&1));
        assert_eq!(rules.table(Field::DestinationAddress).get(&2u64), Some(&0));
        assert_eq!(rules.table(Field::Protocol).len(), 1);
    }
}
