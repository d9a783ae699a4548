//! This module provides parsing of ClassBench style rule sets (`.txt` filter files) and packet
//! header traces into a [RuleSet] and a packet list.
//!
//! Parsing is line oriented: a line that does not parse is skipped and its line number is
//! returned in [Loaded::skipped], the remaining lines are still loaded.
mod default;

use std::{fs, path::Path};

use nom::{
    error::{Error as NomError, ParseError},
    Finish, IResult,
};
use thiserror::Error;
use tracing::{debug, warn};

use pktmatch_core::{FieldValue, Packet, RuleSet};

pub use default::{ClassBenchRuleLoader, ClassBenchTraceLoader};

/// Rules are identified by their order in the rule file.
pub type RuleId = usize;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: none of the {skipped} lines could be parsed")]
    NothingParsed { path: String, skipped: usize },
}

/// Parsed content together with the 1-based numbers of the lines that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub data: T,
    pub skipped: Vec<usize>,
}

fn content_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn ensure_parsed<T>(path: &Path, loaded: Loaded<T>, len: usize) -> Result<Loaded<T>, LoadError> {
    if len == 0 && !loaded.skipped.is_empty() {
        return Err(LoadError::NothingParsed {
            path: path.display().to_string(),
            skipped: loaded.skipped.len(),
        });
    }
    Ok(loaded)
}

/// [RuleLoader] parses one rule per line into the raw values of the five fields, in
/// [Field](pktmatch_core::Field) order.
///
/// ***The trait and the format are benchmark-suite specific.***
pub trait RuleLoader {
    // Required method
    fn _parse_rule<'x, E: ParseError<&'x str>>(
        &self,
        line: &'x str,
    ) -> IResult<&'x str, [u64; 5], E>;

    // Provided methods
    fn load(&self, content: &str) -> Loaded<RuleSet<RuleId>> {
        let mut rules = RuleSet::new();
        let mut skipped = vec![];
        let mut id: RuleId = 0;
        for (lineno, line) in content_lines(content) {
            match self._parse_rule::<NomError<&str>>(line).finish() {
                Ok((_, values)) => {
                    rules.add_rule(values, id);
                    id += 1;
                }
                Err(e) => {
                    warn!(line = lineno, kind = ?e.code, "skipping malformed rule");
                    skipped.push(lineno);
                }
            }
        }
        debug!(rules = id, skipped = skipped.len(), "loaded rule set");
        Loaded {
            data: rules,
            skipped,
        }
    }

    fn load_file(&self, path: impl AsRef<Path>) -> Result<Loaded<RuleSet<RuleId>>, LoadError> {
        let path = path.as_ref();
        let loaded = self.load(&read_file(path)?);
        let len = loaded.data.len();
        ensure_parsed(path, loaded, len)
    }
}

/// [TraceLoader] parses one packet header per line. Packets are numbered by their order among
/// the accepted lines.
///
/// ***The trait and the format are benchmark-suite specific.***
pub trait TraceLoader {
    // Required method
    fn _parse_header<'x, E: ParseError<&'x str>>(
        &self,
        line: &'x str,
    ) -> IResult<&'x str, [FieldValue; 5], E>;

    // Provided methods
    fn load(&self, content: &str) -> Loaded<Vec<Packet>> {
        let mut packets = vec![];
        let mut skipped = vec![];
        for (lineno, line) in content_lines(content) {
            match self._parse_header::<NomError<&str>>(line).finish() {
                Ok((_, header)) => packets.push(Packet::new(packets.len() as FieldValue, header)),
                Err(e) => {
                    warn!(line = lineno, kind = ?e.code, "skipping malformed packet header");
                    skipped.push(lineno);
                }
            }
        }
        debug!(packets = packets.len(), skipped = skipped.len(), "loaded trace");
        Loaded {
            data: packets,
            skipped,
        }
    }

    fn load_file(&self, path: impl AsRef<Path>) -> Result<Loaded<Vec<Packet>>, LoadError> {
        let path = path.as_ref();
        let loaded = self.load(&read_file(path)?);
        let len = loaded.data.len();
        ensure_parsed(path, loaded, len)
    }
}

/// Basics for io
pub mod basic {
    /// Basic helper functions for parsing
    pub mod parser {
        use nom::bytes::complete::tag;
        use nom::character::complete::{char, digit1, hex_digit1, space0};
        use nom::error::{ErrorKind, ParseError};
        use nom::sequence::{preceded, separated_pair, tuple};
        use nom::Err::Error;
        use nom::IResult;

        /// r"[0-9]+" as u64
        pub fn parse_u64<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u64, E> {
            let (rest, num) = digit1(input)?;
            if let Ok(num) = num.parse::<u64>() {
                Ok((rest, num))
            } else {
                Err(Error(E::from_error_kind(input, ErrorKind::Digit)))
            }
        }

        /// r"0x[0-9a-fA-F]+"
        pub fn parse_hex<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u64, E> {
            let (rest, num) = preceded(tag("0x"), hex_digit1)(input)?;
            if let Ok(num) = u64::from_str_radix(num, 16) {
                Ok((rest, num))
            } else {
                Err(Error(E::from_error_kind(input, ErrorKind::HexDigit)))
            }
        }

        /// r"[<=255].[<=255].[<=255].[<=255]"
        pub fn parse_ipv4_dotted<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u32, E> {
            fn parse_u8<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u8, E> {
                let (rest, num) = digit1(input)?;
                if let Ok(num) = num.parse::<u8>() {
                    Ok((rest, num))
                } else {
                    Err(Error(E::from_error_kind(input, ErrorKind::Digit)))
                }
            }

            let (rest, (o1, _, o2, _, o3, _, o4)) = tuple((
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
                char('.'),
                parse_u8,
            ))(input)?;
            Ok((
                rest,
                (o1 as u32) << 24 | (o2 as u32) << 16 | (o3 as u32) << 8 | o4 as u32,
            ))
        }

        /// r"<ipv4>/[<=32]", the address with host bits cleared
        pub fn parse_ipv4_prefix<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u32, E> {
            let (rest, (addr, plen)) =
                separated_pair(parse_ipv4_dotted, char('/'), parse_u64)(input)?;
            let mask = match plen {
                0 => 0,
                1..=32 => u32::MAX << (32 - plen),
                _ => return Err(Error(E::from_error_kind(input, ErrorKind::Verify))),
            };
            Ok((rest, addr & mask))
        }

        /// r"<lo> : <hi>", both inclusive, `lo <= hi`
        pub fn parse_range<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, (u64, u64), E> {
            let (rest, (lo, hi)) = separated_pair(
                parse_u64,
                tuple((space0, char(':'), space0)),
                parse_u64,
            )(input)?;
            if lo > hi {
                return Err(Error(E::from_error_kind(input, ErrorKind::Verify)));
            }
            Ok((rest, (lo, hi)))
        }

        /// r"0x<value>/0x<mask>", the value with unmasked bits cleared
        pub fn parse_hex_masked<'a, E: ParseError<&'a str>>(
            input: &'a str,
        ) -> IResult<&'a str, u64, E> {
            let (rest, (value, mask)) = separated_pair(parse_hex, char('/'), parse_hex)(input)?;
            Ok((rest, value & mask))
        }

    }
}

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        ClassBenchRuleLoader, ClassBenchTraceLoader, LoadError, Loaded, RuleId, RuleLoader,
        TraceLoader,
    };
}
