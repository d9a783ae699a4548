//! This module provides the packet model, per-field rule tables, the [RuleIndex] built from them
//! and the conjunctive classifier that runs packets against the index.
//!
//! ## Example
//! ```no_run
//! use pktmatch_core::prelude::*;
//!
//! let mut rules = RuleSet::new();
//! rules.insert(Field::Protocol, 6, "tcp-rule");
//! rules.insert(Field::Protocol, 17, "udp-rule");
//!
//! let (mut index, report) = build_index(&rules, Backend::SplayTree, &SkipListConfig::default());
//! assert!(report.discarded.is_empty());
//!
//! let packets = vec![Packet::new(1, [0, 0, 0, 0, 6]), Packet::new(3, [0, 0, 0, 0, 47])];
//! let matched: Vec<_> = single_field_filter(&packets, index.map_mut(Field::Protocol)).collect();
//! assert_eq!(matched.len(), 1);
//! ```
pub mod classify;
pub mod index;
pub mod packet;
pub mod rule;

pub use crate::{
    classify::{field_filter, filter, match_bitmap, matches, single_field_filter},
    index::{build_index, Backend, BuildReport, Discarded, FieldMap, RuleIndex},
    packet::{Field, FieldValue, Packet},
    rule::{RuleSet, RuleTable},
};

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        build_index, field_filter, filter, match_bitmap, matches, single_field_filter, Backend,
        BuildReport, Discarded, Field, FieldMap, FieldValue, Packet, RuleIndex, RuleSet,
        RuleTable,
    };
    #[doc(hidden)]
    pub use pktmatch_map::prelude::*;
}
