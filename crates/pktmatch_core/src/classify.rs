//! # Classifier
//!
//! A packet matches a collection of `(map, field)` pairs iff, for every pair, the packet's value
//! at that field is present in the map. Only presence is tested, the stored payload is never
//! looked at. An empty collection matches every packet.
use bitvec::vec::BitVec;
use pktmatch_map::OrderedMap;

use crate::{
    index::RuleIndex,
    packet::{Field, FieldValue, Packet},
};

#[inline]
fn field_matches<M>(map: &mut M, field: Field, packet: &Packet) -> bool
where
    M: OrderedMap<Key = FieldValue> + ?Sized,
{
    map.find(&packet.field(field)).is_some()
}

/// Stops at the first field whose value is absent.
pub fn matches<M>(packet: &Packet, field_maps: &mut [(M, Field)]) -> bool
where
    M: OrderedMap<Key = FieldValue>,
{
    field_maps
        .iter_mut()
        .all(|(map, field)| field_matches(map, *field, packet))
}

/// Lazily yields the packets that [matches] accepts, in input order.
pub fn filter<'a, I, M>(
    packets: I,
    field_maps: &'a mut [(M, Field)],
) -> impl Iterator<Item = &'a Packet> + 'a
where
    I: IntoIterator<Item = &'a Packet>,
    I::IntoIter: 'a,
    M: OrderedMap<Key = FieldValue> + 'a,
{
    packets
        .into_iter()
        .filter(move |packet| matches(packet, field_maps))
}

/// [filter] with a single pair.
pub fn field_filter<'a, I, M>(
    packets: I,
    map: &'a mut M,
    field: Field,
) -> impl Iterator<Item = &'a Packet> + 'a
where
    I: IntoIterator<Item = &'a Packet>,
    I::IntoIter: 'a,
    M: OrderedMap<Key = FieldValue> + ?Sized + 'a,
{
    packets
        .into_iter()
        .filter(move |packet| field_matches(map, field, packet))
}

/// Protocol-only matching.
#[inline]
pub fn single_field_filter<'a, I, M>(
    packets: I,
    map: &'a mut M,
) -> impl Iterator<Item = &'a Packet> + 'a
where
    I: IntoIterator<Item = &'a Packet>,
    I::IntoIter: 'a,
    M: OrderedMap<Key = FieldValue> + ?Sized + 'a,
{
    field_filter(packets, map, Field::Protocol)
}

/// One bit per packet, set when the packet matches.
pub fn match_bitmap<M>(packets: &[Packet], field_maps: &mut [(M, Field)]) -> BitVec
where
    M: OrderedMap<Key = FieldValue>,
{
    packets
        .iter()
        .map(|packet| matches(packet, field_maps))
        .collect()
}

impl<V> RuleIndex<V> {
    /// Five-field conjunctive matching against every map of the index.
    pub fn filter<'a, I>(&'a mut self, packets: I) -> impl Iterator<Item = &'a Packet> + 'a
    where
        I: IntoIterator<Item = &'a Packet>,
        I::IntoIter: 'a,
        V: 'a,
    {
        filter(packets, self.field_maps_mut())
    }

    #[inline]
    pub fn matches(&mut self, packet: &Packet) -> bool {
        matches(packet, self.field_maps_mut())
    }
}
