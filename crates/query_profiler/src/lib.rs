//! Live workload profiling for MySQL: sample the processlist, reduce every
//! query to its shape, and rank the shapes by how often they are seen.

pub mod aggregate;
pub mod dump;
pub mod error;
pub mod mycnf;
pub mod normalize;
pub mod profiler;
pub mod report;
pub mod source;

use std::collections::HashMap;

pub use aggregate::{Aggregator, CountTable, CumulativeCounter, Sample, WindowedCounter};
pub use dump::DumpSink;
pub use error::ProfilerError;
pub use mycnf::{option_file_paths, read_option_files, ClientOptions};
pub use normalize::normalize_query;
pub use profiler::{Profiler, ProfilerConfig};
pub use report::{rank, render, render_now, RankedEntry};
pub use source::{ConnectionOptions, MySqlSource, QuerySource, PROCESSLIST_QUERY};

/// Ranks the query shapes of a raw dump, one query per line. Blank lines,
/// `#` comments and the trailing `Summary` block written on shutdown are
/// ignored.
pub fn digest_dump(contents: &str, top_n: usize) -> Vec<RankedEntry> {
    let mut counts: CountTable = HashMap::new();
    for line in contents.lines() {
        if line == "Summary" {
            break;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        *counts.entry(normalize_query(line)).or_default() += 1;
    }
    rank(&counts, top_n)
}
