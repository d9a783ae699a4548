use std::{
    fmt::{Display, Formatter},
    path::Path,
    str::FromStr,
};

use crate::{BenchConfig, BenchError, TraceSource};

/// The ClassBench rule sets the benchmark ships presets for. Each preset is one 8k rule file
/// and three header traces of growing size, laid out as in the published data set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dataset {
    Acl2,
    Ipc2,
}

impl Dataset {
    pub const ALL: [Dataset; 2] = [Dataset::Acl2, Dataset::Ipc2];

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::Acl2 => "acl2",
            Dataset::Ipc2 => "ipc2",
        }
    }

    pub fn rules_path(&self) -> &'static str {
        match self {
            Dataset::Acl2 => "Data_set/acl2/acl2_8k/acl2-8k.txt",
            Dataset::Ipc2 => "Data_set/ip2/ipc2_8k/ipc2-8k.txt",
        }
    }

    /// `(label, path)` of each trace, smallest first.
    pub fn trace_paths(&self) -> [(&'static str, &'static str); 3] {
        match self {
            Dataset::Acl2 => [
                ("8k", "Data_set/acl2/acl2_8k/acl8k_header8k/skewness 0.txt"),
                ("32k", "Data_set/acl2/acl2_8k/acl8k_header32k/skewness 0.txt"),
                // the directory really is named without the trailing k
                ("128k", "Data_set/acl2/acl2_8k/acl8k_header128/skewness 0.txt"),
            ],
            Dataset::Ipc2 => [
                ("8k", "Data_set/ip2/ipc2_8k/ipc8k_header8k/skewness 0.txt"),
                ("32k", "Data_set/ip2/ipc2_8k/ipc8k_header32k/skewness 0.txt"),
                ("128k", "Data_set/ip2/ipc2_8k/ipc8k_header128k/skewness 0.txt"),
            ],
        }
    }

    /// A [BenchConfig] with every path resolved against `data_dir`.
    pub fn config(&self, data_dir: impl AsRef<Path>) -> BenchConfig {
        let data_dir = data_dir.as_ref();
        let traces = self
            .trace_paths()
            .into_iter()
            .map(|(label, path)| TraceSource {
                label: label.to_string(),
                path: data_dir.join(path),
            })
            .collect();
        BenchConfig::new(data_dir.join(self.rules_path()), traces)
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dataset {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dataset::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| BenchError::UnknownDataset(s.to_string()))
    }
}
