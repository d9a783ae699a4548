//! This module times the two classification workloads against both map backends.
//!
//! - [Workload::Protocol] runs [single_field_filter] over a map built from the protocol table.
//! - [Workload::FiveField] runs the conjunctive filter of a whole [RuleIndex].
//!
//! Maps are built once per workload and backend, then every packet set is matched against them
//! in turn, one timed pass per set. The match bitmaps used to compare the two backends, see
//! [Report::agreement], come from a second set of maps so the timed ones see nothing but the
//! timed passes.
mod dataset;
mod report;

use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
    time::Instant,
};

use bitvec::vec::BitVec;
use thiserror::Error;
use tracing::{debug, warn};

use pktmatch_core::{
    build_index, index::build_map, match_bitmap, single_field_filter, Backend, BuildReport, Field,
    FieldMap, Packet, RuleIndex, RuleSet,
};
use pktmatch_io::{ClassBenchRuleLoader, ClassBenchTraceLoader, LoadError, RuleLoader, TraceLoader};
use pktmatch_map::{OrderedMap, SkipListConfig};

pub use dataset::Dataset;
pub use report::{Agreement, Measurement, Report};

#[derive(Error, Debug)]
pub enum BenchError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("unknown dataset `{0}`, expected acl2 or ipc2")]
    UnknownDataset(String),

    #[error("unknown workload `{0}`, expected protocol or five-field")]
    UnknownWorkload(String),

    #[error("no packet trace to run")]
    NoTraces,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Workload {
    Protocol,
    FiveField,
}

impl Workload {
    pub const ALL: [Workload; 2] = [Workload::Protocol, Workload::FiveField];

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Workload::Protocol => "protocol",
            Workload::FiveField => "five-field",
        }
    }
}

impl Display for Workload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Workload {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Workload::ALL
            .into_iter()
            .find(|w| w.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| BenchError::UnknownWorkload(s.to_string()))
    }
}

/// A header trace file and the label it is reported under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceSource {
    pub label: String,
    pub path: PathBuf,
}

impl TraceSource {
    /// Labels the trace with its file stem.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let label = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        TraceSource {
            label,
            path: path.to_path_buf(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BenchConfig {
    pub rules: PathBuf,
    pub traces: Vec<TraceSource>,
    pub workloads: Vec<Workload>,
    /// Leveling of every skip list built during the run.
    pub map_config: SkipListConfig,
}

impl BenchConfig {
    /// Both workloads with the default skip list leveling.
    pub fn new(rules: impl Into<PathBuf>, traces: Vec<TraceSource>) -> Self {
        BenchConfig {
            rules: rules.into(),
            traces,
            workloads: Workload::ALL.to_vec(),
            map_config: SkipListConfig::default(),
        }
    }
}

/// A loaded trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketSet {
    pub label: String,
    pub packets: Vec<Packet>,
}

// the maps one workload matches against
enum Subject<P> {
    Protocol(FieldMap<P>),
    FiveField(RuleIndex<P>),
}

impl<P: Clone> Subject<P> {
    fn build(
        workload: Workload,
        rules: &RuleSet<P>,
        backend: Backend,
        config: &SkipListConfig,
    ) -> (Self, BuildReport) {
        match workload {
            Workload::Protocol => {
                let mut report = BuildReport::default();
                let table = rules.table(Field::Protocol);
                let map = build_map(table, Field::Protocol, backend, config, &mut report);
                (Subject::Protocol(map), report)
            }
            Workload::FiveField => {
                let (index, report) = build_index(rules, backend, config);
                (Subject::FiveField(index), report)
            }
        }
    }

    fn count_matches(&mut self, packets: &[Packet]) -> usize {
        match self {
            Subject::Protocol(map) => single_field_filter(packets, map).count(),
            Subject::FiveField(index) => index.filter(packets).count(),
        }
    }

    fn bitmap(&mut self, packets: &[Packet]) -> BitVec {
        match self {
            Subject::Protocol(map) => packets
                .iter()
                .map(|packet| map.contains(&packet.field(Field::Protocol)))
                .collect(),
            Subject::FiveField(index) => match_bitmap(packets, index.field_maps_mut()),
        }
    }
}

// exactly one matching pass over `set`
fn timed_pass<P: Clone>(
    subject: &mut Subject<P>,
    workload: Workload,
    backend: Backend,
    set: &PacketSet,
) -> Measurement {
    let start = Instant::now();
    let matched = subject.count_matches(&set.packets);
    let elapsed = start.elapsed();
    debug!(
        workload = %workload,
        backend = %backend,
        set = %set.label,
        matched,
        elapsed_us = elapsed.as_micros() as u64,
        "matching pass done"
    );
    Measurement {
        workload,
        backend,
        label: set.label.clone(),
        packets: set.packets.len(),
        matched,
        elapsed,
    }
}

fn mismatches(a: &BitVec, b: &BitVec) -> usize {
    let differing = a
        .iter()
        .by_vals()
        .zip(b.iter().by_vals())
        .filter(|(x, y)| x != y)
        .count();
    differing + a.len().abs_diff(b.len())
}

/// Runs every workload with both backends over every packet set. Rules and packets are taken as
/// they are, nothing is loaded from disk.
pub fn run_workloads<P: Clone>(
    rules: &RuleSet<P>,
    sets: &[PacketSet],
    workloads: &[Workload],
    config: &SkipListConfig,
) -> Report {
    let mut report = Report::default();
    for &workload in workloads {
        // bitmaps[backend][set]
        let mut bitmaps: Vec<Vec<BitVec>> = Vec::with_capacity(Backend::ALL.len());
        for backend in Backend::ALL {
            let (mut subject, built) = Subject::build(workload, rules, backend, config);
            // both backends discard the same values
            if backend == Backend::ALL[0] {
                report
                    .discarded
                    .extend(built.discarded.into_iter().map(|d| (workload, d)));
            }
            for set in sets {
                let measurement = timed_pass(&mut subject, workload, backend, set);
                report.measurements.push(measurement);
            }

            let (mut checker, _) = Subject::build(workload, rules, backend, config);
            bitmaps.push(sets.iter().map(|set| checker.bitmap(&set.packets)).collect());
        }

        if let [first, second] = bitmaps.as_slice() {
            for ((set, a), b) in sets.iter().zip(first).zip(second) {
                let mismatched = mismatches(a, b);
                if mismatched > 0 {
                    warn!(workload = %workload, set = %set.label, mismatched, "backends disagree");
                }
                report.agreements.push(Agreement {
                    workload,
                    label: set.label.clone(),
                    mismatched,
                });
            }
        }
    }
    report
}

/// Loads the rule file and every trace of `config`, then runs [run_workloads].
pub fn run_analysis(config: &BenchConfig) -> Result<Report, BenchError> {
    if config.traces.is_empty() {
        return Err(BenchError::NoTraces);
    }
    let rules = ClassBenchRuleLoader::default().load_file(&config.rules)?;
    if !rules.skipped.is_empty() {
        warn!(
            path = %config.rules.display(),
            skipped = rules.skipped.len(),
            "some rules could not be parsed"
        );
    }

    let trace_loader = ClassBenchTraceLoader::default();
    let mut sets = Vec::with_capacity(config.traces.len());
    for trace in &config.traces {
        let loaded = trace_loader.load_file(&trace.path)?;
        if !loaded.skipped.is_empty() {
            warn!(
                path = %trace.path.display(),
                skipped = loaded.skipped.len(),
                "some packet headers could not be parsed"
            );
        }
        debug!(set = %trace.label, packets = loaded.data.len(), "loaded packet set");
        sets.push(PacketSet {
            label: trace.label.clone(),
            packets: loaded.data,
        });
    }

    Ok(run_workloads(
        &rules.data,
        &sets,
        &config.workloads,
        &config.map_config,
    ))
}

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use crate::{
        run_analysis, run_workloads, Agreement, BenchConfig, BenchError, Dataset, Measurement,
        PacketSet, Report, TraceSource, Workload,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (RuleSet<usize>, Vec<PacketSet>) {
        let mut rules = RuleSet::new();
        rules.add_rule([10, 20, 1000, 80, 6], 0);
        rules.add_rule([11, 21, 1001, 53, 17], 1);
        let small = PacketSet {
            label: "small".to_string(),
            packets: vec![
                Packet::new(0, [10, 20, 1000, 80, 6]),
                Packet::new(1, [10, 21, 1000, 53, 17]),
                Packet::new(2, [12, 20, 1000, 80, 6]),
                Packet::new(3, [10, 20, 1000, 80, 47]),
            ],
        };
        let large = PacketSet {
            label: "large".to_string(),
            packets: (0..64)
                .map(|i| Packet::new(i, [10 + i % 4, 20, 1000, 80, [6, 17, 1][i as usize % 3]]))
                .collect(),
        };
        (rules, vec![small, large])
    }

    #[test]
    fn test_run_workloads() {
        let (rules, sets) = sample();
        let config = SkipListConfig::default().with_seed(21);
        let report = run_workloads(&rules, &sets, &Workload::ALL, &config);
        assert_eq!(report.measurements.len(), 2 * 2 * 2);
        assert_eq!(report.agreements.len(), 2 * 2);
        assert!(report.agreement());

        for backend in Backend::ALL {
            let m = report
                .measurement(Workload::Protocol, backend, "small")
                .unwrap();
            assert_eq!((m.packets, m.matched), (4, 3));
            let m = report
                .measurement(Workload::FiveField, backend, "small")
                .unwrap();
            assert_eq!(m.matched, 2);
            // sip cycles through 10..=13, proto through 6, 17, 1
            let m = report
                .measurement(Workload::FiveField, backend, "large")
                .unwrap();
            assert_eq!((m.packets, m.matched), (64, 22));
            let m = report
                .measurement(Workload::Protocol, backend, "large")
                .unwrap();
            assert_eq!(m.matched, 43);
        }
    }

    #[test]
    fn test_single_workload() {
        let (rules, sets) = sample();
        let report = run_workloads(
            &rules,
            &sets[..1],
            &[Workload::FiveField],
            &SkipListConfig::default(),
        );
        assert_eq!(report.measurements.len(), 2);
        assert!(report
            .measurements
            .iter()
            .all(|m| m.workload == Workload::FiveField));
    }

    fn splay_shape<P>(subject: &Subject<P>) -> (Option<u32>, usize) {
        match subject {
            Subject::Protocol(FieldMap::SplayTree(tree)) => {
                (tree.root_key().copied(), tree.height())
            }
            _ => panic!("not a splay protocol map"),
        }
    }

    #[test]
    fn test_timed_pass_is_the_only_pass() {
        let mut rules = RuleSet::new();
        for k in 0..200u64 {
            rules.insert(Field::Protocol, k, k as usize);
        }
        let sets: Vec<PacketSet> = (0..3u32)
            .map(|n| PacketSet {
                label: n.to_string(),
                packets: (0..300u32)
                    .map(|i| Packet::new(i, [0, 0, 0, 0, (i * 7 + n * 31) % 256]))
                    .collect(),
            })
            .collect();
        let config = SkipListConfig::default();
        let build = || Subject::build(Workload::Protocol, &rules, Backend::SplayTree, &config).0;
        let mut timed = build();
        let mut single = build();
        for set in &sets {
            let m = timed_pass(&mut timed, Workload::Protocol, Backend::SplayTree, set);
            let matched = single.count_matches(&set.packets);
            assert_eq!(m.matched, matched);
            // the next set has to start from the tree one pass leaves behind
            assert_eq!(splay_shape(&timed), splay_shape(&single));
        }

        let report = run_workloads(&rules, &sets, &[Workload::Protocol], &config);
        assert!(report.agreement());
        for set in &sets {
            let m = report
                .measurement(Workload::Protocol, Backend::SplayTree, &set.label)
                .unwrap();
            assert_eq!(m.packets, 300);
        }
    }

    #[test]
    fn test_discarded_values_reach_report() {
        let (mut rules, sets) = sample();
        rules.insert(Field::DestinationPort, 70000, 2);
        rules.insert(Field::Protocol, 300, 3);
        let report = run_workloads(&rules, &sets, &Workload::ALL, &SkipListConfig::default());
        assert_eq!(report.discarded_by(Workload::Protocol), 1);
        assert_eq!(report.discarded_by(Workload::FiveField), 2);
        assert!(report.to_string().contains("five-field: 2 rule values discarded"));
        assert!(report.agreement());
    }

    #[test]
    fn test_workload_from_str() {
        assert_eq!("five-field".parse::<Workload>().unwrap(), Workload::FiveField);
        assert_eq!("Protocol".parse::<Workload>().unwrap(), Workload::Protocol);
        assert!("ports".parse::<Workload>().is_err());
    }

    #[test]
    fn test_mismatches() {
        let a: BitVec = [true, false, true].into_iter().collect();
        let b: BitVec = [true, true, false].into_iter().collect();
        assert_eq!(mismatches(&a, &a), 0);
        assert_eq!(mismatches(&a, &b), 2);
    }

    #[test]
    fn test_trace_source_label() {
        let trace = TraceSource::from_path("traces/acl_8k.txt");
        assert_eq!(trace.label, "acl_8k");
    }

    #[test]
    fn test_run_analysis_errors() {
        let config = BenchConfig::new("rules.txt", vec![]);
        assert!(matches!(run_analysis(&config), Err(BenchError::NoTraces)));

        let missing = std::env::temp_dir().join("pktmatch-bench-missing-rules.txt");
        let config = BenchConfig::new(missing, vec![TraceSource::from_path("t.txt")]);
        assert!(matches!(
            run_analysis(&config),
            Err(BenchError::Load(LoadError::Io { .. }))
        ));
    }
}
