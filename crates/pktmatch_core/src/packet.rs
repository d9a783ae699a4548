//! # Packet model
//!
//! A packet is a fixed-arity header record. Fields are addressed by position, position 0 is the
//! packet id and positions 1..=5 follow the order of [Field::ALL]:
//!
//! ```text
//! [id, sip, dip, sport, dport, proto]
//! ```
use std::{
    fmt::{Display, Formatter},
    ops::Index,
};

/// Every header field is carried as an unsigned integer, IPv4 addresses included.
pub type FieldValue = u32;

/// A header field that rules can be written against. The discriminant is the position of the
/// field in a [Packet] record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    SourceAddress = 1,
    DestinationAddress = 2,
    SourcePort = 3,
    DestinationPort = 4,
    Protocol = 5,
}

impl Field {
    /// All fields in packet order.
    pub const ALL: [Field; 5] = [
        Field::SourceAddress,
        Field::DestinationAddress,
        Field::SourcePort,
        Field::DestinationPort,
        Field::Protocol,
    ];

    #[inline]
    pub fn position(&self) -> usize {
        *self as usize
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        match self {
            Field::SourceAddress | Field::DestinationAddress => 32,
            Field::SourcePort | Field::DestinationPort => 16,
            Field::Protocol => 8,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Field::SourceAddress => "sip",
            Field::DestinationAddress => "dip",
            Field::SourcePort => "sport",
            Field::DestinationPort => "dport",
            Field::Protocol => "proto",
        }
    }

    /// Narrows a raw value to the field width, `None` if it does not fit.
    #[inline]
    pub fn fit(&self, value: u64) -> Option<FieldValue> {
        if value >> self.bits() == 0 {
            Some(value as FieldValue)
        } else {
            None
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Packet {
    pub id: FieldValue,
    pub header: [FieldValue; 5],
}

impl Packet {
    #[inline]
    pub fn new(id: FieldValue, header: [FieldValue; 5]) -> Self {
        Packet { id, header }
    }

    #[inline]
    pub fn field(&self, field: Field) -> FieldValue {
        self.header[field.position() - 1]
    }
}

impl Index<usize> for Packet {
    type Output = FieldValue;

    #[inline]
    fn index(&self, position: usize) -> &Self::Output {
        match position {
            0 => &self.id,
            _ => &self.header[position - 1],
        }
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.id)?;
        for field in Field::ALL {
            write!(f, " {}={}", field, self.field(field))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_positions() {
        let pkt = Packet::new(9, [3232235777, 167772161, 1024, 80, 6]);
        assert_eq!(pkt[0], 9);
        for field in Field::ALL {
            assert_eq!(pkt[field.position()], pkt.field(field));
        }
        assert_eq!(pkt.field(Field::DestinationPort), 80);
        assert_eq!(pkt.field(Field::Protocol), 6);
        assert_eq!(
            pkt.to_string(),
            "#9 sip=3232235777 dip=167772161 sport=1024 dport=80 proto=6"
        );
    }

    #[test]
    fn test_field_fit() {
        assert_eq!(Field::Protocol.fit(255), Some(255));
        assert_eq!(Field::Protocol.fit(256), None);
        assert_eq!(Field::SourcePort.fit(65535), Some(65535));
        assert_eq!(Field::DestinationPort.fit(70000), None);
        assert_eq!(Field::SourceAddress.fit(u32::MAX as u64), Some(u32::MAX));
        assert_eq!(Field::DestinationAddress.fit(1 << 32), None);
    }
}
