use std::{
    fmt::{self, Display, Formatter},
    time::Duration,
};

use pktmatch_core::{Backend, Discarded};

use crate::Workload;

/// One timed matching pass of one backend over one packet set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Measurement {
    pub workload: Workload,
    pub backend: Backend,
    /// Label of the packet set, e.g. `8k`.
    pub label: String,
    pub packets: usize,
    pub matched: usize,
    pub elapsed: Duration,
}

/// Outcome of comparing the match bitmaps of both backends for one packet set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Agreement {
    pub workload: Workload,
    pub label: String,
    /// Packets that one backend matched and the other did not.
    pub mismatched: usize,
}

impl Agreement {
    #[inline]
    pub fn holds(&self) -> bool {
        self.mismatched == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub measurements: Vec<Measurement>,
    pub agreements: Vec<Agreement>,
    /// Rule values left out of the maps of each workload because they do not fit their field.
    pub discarded: Vec<(Workload, Discarded)>,
}

impl Report {
    /// True when the backends matched the same packets in every pass.
    pub fn agreement(&self) -> bool {
        self.agreements.iter().all(Agreement::holds)
    }

    pub fn discarded_by(&self, workload: Workload) -> usize {
        self.discarded.iter().filter(|(w, _)| *w == workload).count()
    }

    pub fn measurement(
        &self,
        workload: Workload,
        backend: Backend,
        label: &str,
    ) -> Option<&Measurement> {
        self.measurements
            .iter()
            .find(|m| m.workload == workload && m.backend == backend && m.label == label)
    }
}

/// ```text
/// workload    backend     set       packets   matched  elapsed (us)
/// protocol    skip list   8k           8000      7923           311
/// ```
/// followed by one agreement line per workload and packet set and, if any rule value was left
/// out of the maps, one discard line per workload.
impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12}{:<12}{:<8}{:>10}{:>10}{:>14}",
            "workload", "backend", "set", "packets", "matched", "elapsed (us)"
        )?;
        for m in &self.measurements {
            writeln!(
                f,
                "{:<12}{:<12}{:<8}{:>10}{:>10}{:>14}",
                m.workload.name(),
                m.backend.name(),
                m.label,
                m.packets,
                m.matched,
                m.elapsed.as_micros()
            )?;
        }
        if !self.agreements.is_empty() {
            writeln!(f)?;
        }
        for a in &self.agreements {
            if a.holds() {
                writeln!(f, "{} {}: backends agree", a.workload, a.label)?;
            } else {
                writeln!(
                    f,
                    "{} {}: backends disagree on {} packets",
                    a.workload, a.label, a.mismatched
                )?;
            }
        }
        let mut workloads: Vec<Workload> = self.discarded.iter().map(|(w, _)| *w).collect();
        workloads.dedup();
        for workload in workloads {
            writeln!(
                f,
                "{}: {} rule values discarded",
                workload,
                self.discarded_by(workload)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pktmatch_core::Field;

    use super::*;

    #[test]
    fn test_report_display() {
        let report = Report {
            measurements: vec![Measurement {
                workload: Workload::FiveField,
                backend: Backend::SplayTree,
                label: "32k".to_string(),
                packets: 32000,
                matched: 17,
                elapsed: Duration::from_micros(1500),
            }],
            agreements: vec![
                Agreement {
                    workload: Workload::FiveField,
                    label: "32k".to_string(),
                    mismatched: 0,
                },
                Agreement {
                    workload: Workload::Protocol,
                    label: "8k".to_string(),
                    mismatched: 3,
                },
            ],
            discarded: vec![
                (
                    Workload::FiveField,
                    Discarded {
                        field: Field::DestinationPort,
                        value: 70000,
                    },
                ),
                (
                    Workload::FiveField,
                    Discarded {
                        field: Field::Protocol,
                        value: 300,
                    },
                ),
            ],
        };
        assert!(!report.agreement());
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("workload    backend     set"));
        assert_eq!(
            lines[1].split_whitespace().collect::<Vec<_>>(),
            vec!["five-field", "splay", "tree", "32k", "32000", "17", "1500"]
        );
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "five-field 32k: backends agree");
        assert_eq!(lines[4], "protocol 8k: backends disagree on 3 packets");
        assert_eq!(lines[5], "five-field: 2 rule values discarded");
        assert_eq!(report.discarded_by(Workload::Protocol), 0);
        assert!(report
            .measurement(Workload::FiveField, Backend::SplayTree, "32k")
            .is_some());
        assert!(report
            .measurement(Workload::FiveField, Backend::SkipList, "32k")
            .is_none());
    }

    #[test]
    fn test_empty_report_agrees() {
        let report = Report::default();
        assert!(report.agreement());
        assert_eq!(report.to_string().lines().count(), 1);
    }
}
