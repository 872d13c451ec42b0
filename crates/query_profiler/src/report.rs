use std::fmt::Write as _;

use chrono::{DateTime, Local, TimeZone};

use crate::aggregate::CountTable;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RankedEntry {
    pub query: String,
    pub count: u64,
}

/// Most frequent queries first. Equal counts are ordered by query text so the
/// output is stable across runs.
pub fn rank(table: &CountTable, top_n: usize) -> Vec<RankedEntry> {
    let mut entries = table
        .iter()
        .map(|(query, count)| RankedEntry {
            query: query.clone(),
            count: *count,
        })
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
    entries.truncate(top_n);
    entries
}

pub fn render<Tz>(entries: &[RankedEntry], at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = format!("## {}\n", at.format("%Y-%m-%d %H:%M:%S%.3f %:z"));
    for entry in entries {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{:>4} {}", entry.count, entry.query);
    }
    out
}

pub fn render_now(entries: &[RankedEntry]) -> String {
    render(entries, &Local::now())
}
