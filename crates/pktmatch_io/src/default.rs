use nom::{
    character::complete::{char, space0, space1},
    combinator::{all_consuming, opt},
    error::{ErrorKind, ParseError},
    multi::many0,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

use pktmatch_core::{Field, FieldValue};

use crate::{
    basic::parser::{parse_hex_masked, parse_ipv4_prefix, parse_range, parse_u64},
    RuleLoader, TraceLoader,
};

/// Loads ClassBench filter files:
///
/// ```text
/// @192.151.11.17/32	15.0.120.4/32	10 : 655	1221 : 1221	0x06/0xFF	0x1000/0x1000
/// ```
///
/// The key a rule contributes to each table is the address with host bits cleared, the low end of
/// each port range and the masked protocol number. The trailing flags column is optional and
/// ignored.
#[derive(Default)]
pub struct ClassBenchRuleLoader {}

impl RuleLoader for ClassBenchRuleLoader {
    fn _parse_rule<'x, E: ParseError<&'x str>>(
        &self,
        line: &'x str,
    ) -> IResult<&'x str, [u64; 5], E> {
        let (rest, (_, sip, _, dip, _, (sport, _), _, (dport, _), _, proto)) = tuple((
            char('@'),
            parse_ipv4_prefix,
            space1,
            parse_ipv4_prefix,
            space1,
            parse_range,
            space1,
            parse_range,
            space1,
            parse_hex_masked,
        ))(line)?;
        let (rest, _) = all_consuming(terminated(
            opt(preceded(space1, parse_hex_masked)),
            space0,
        ))(rest)?;
        Ok((rest, [sip as u64, dip as u64, sport, dport, proto]))
    }
}

/// Loads ClassBench header traces, one packet per line:
///
/// ```text
/// 3247770897	252885509	1024	1221	6	0	7
/// ```
///
/// The first five columns are the header in [Field] order, any further numeric columns are
/// ignored.
#[derive(Default)]
pub struct ClassBenchTraceLoader {}

fn parse_field<'x, E: ParseError<&'x str>>(
    field: Field,
) -> impl Fn(&'x str) -> IResult<&'x str, FieldValue, E> {
    move |input| {
        let (rest, value) = parse_u64(input)?;
        match field.fit(value) {
            Some(value) => Ok((rest, value)),
            None => Err(nom::Err::Error(E::from_error_kind(input, ErrorKind::Verify))),
        }
    }
}

impl TraceLoader for ClassBenchTraceLoader {
    fn _parse_header<'x, E: ParseError<&'x str>>(
        &self,
        line: &'x str,
    ) -> IResult<&'x str, [FieldValue; 5], E> {
        let (rest, (sip, _, dip, _, sport, _, dport, _, proto)) = tuple((
            parse_field(Field::SourceAddress),
            space1,
            parse_field(Field::DestinationAddress),
            space1,
            parse_field(Field::SourcePort),
            space1,
            parse_field(Field::DestinationPort),
            space1,
            parse_field(Field::Protocol),
        ))(line)?;
        let (rest, _) = all_consuming(terminated(many0(pair(space1, parse_u64)), space0))(rest)?;
        Ok((rest, [sip, dip, sport, dport, proto]))
    }
}

#[cfg(test)]
mod tests {
    use pktmatch_core::{Packet, RuleSet};

    use super::*;
    use crate::Loaded;

    #[test]
    fn test_rule_loader() {
        let content = "
        @192.151.11.17/32\t15.0.120.4/32\t10 : 655\t1221 : 1221\t0x06/0xFF\t0x1000/0x1000
        @192.151.11.0/24\t15.0.120.4/32\t0 : 65535\t80 : 80\t0x11/0xFF
        this line is not a rule
        @10.0.0.1/32\t10.0.0.2/32\t0 : 65535\t70000 : 70000\t0x00/0x00\t
        @300.0.0.1/32\t10.0.0.2/32\t0 : 65535\t1 : 2\t0x06/0xFF
        ";
        let Loaded { data, skipped } = ClassBenchRuleLoader::default().load(content);
        assert_eq!(skipped, vec![4, 6]);

        let sip = data.table(Field::SourceAddress);
        assert_eq!(sip.get(&0xC0970B11u64), Some(&0));
        assert_eq!(sip.get(&0xC0970B00u64), Some(&1));
        assert_eq!(sip.get(&0x0A000001u64), Some(&2));
        let dip = data.table(Field::DestinationAddress);
        // the second rule overwrites the first one for 15.0.120.4
        assert_eq!(dip.get(&0x0F007804u64), Some(&1));
        assert_eq!(dip.len(), 2);
        let sport = data.table(Field::SourcePort);
        assert_eq!(sport.keys().copied().collect::<Vec<_>>(), vec![10, 0]);
        let dport = data.table(Field::DestinationPort);
        assert_eq!(dport.keys().copied().collect::<Vec<_>>(), vec![1221, 80, 70000]);
        let proto = data.table(Field::Protocol);
        assert_eq!(proto.keys().copied().collect::<Vec<_>>(), vec![6, 17, 0]);
    }

    #[test]
    fn test_trace_loader() {
        let content = "3247770897\t252885509\t1024\t1221\t6\t0\t7\n\
                       3247770898 252885510 80 443 17\n\
                       1 2 3 70000 6\n\
                       1 2 3 4\n\
                       \n\
                       5 6 7 8 47 \n";
        let Loaded { data, skipped } = ClassBenchTraceLoader::default().load(content);
        assert_eq!(skipped, vec![3, 4]);
        assert_eq!(
            data,
            vec![
                Packet::new(0, [3247770897, 252885509, 1024, 1221, 6]),
                Packet::new(1, [3247770898, 252885510, 80, 443, 17]),
                Packet::new(2, [5, 6, 7, 8, 47]),
            ]
        );
    }

    #[test]
    fn test_empty_content() {
        let loaded = ClassBenchRuleLoader::default().load("");
        assert!(loaded.data.is_empty());
        assert!(loaded.skipped.is_empty());
        let loaded: Loaded<Vec<Packet>> = ClassBenchTraceLoader::default().load("\n\n");
        assert!(loaded.data.is_empty());
        let loaded: Loaded<RuleSet<usize>> = ClassBenchRuleLoader::default().load("@");
        assert!(loaded.data.is_empty());
        assert_eq!(loaded.skipped, vec![1]);
    }
}
