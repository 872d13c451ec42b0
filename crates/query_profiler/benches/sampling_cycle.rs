//! Throughput of one profiler cycle without the database: normalize a
//! synthetic processlist, feed the aggregator, rank the snapshot.
//!
//!   cargo bench --bench sampling_cycle -- cycles=20000 sessions=200 window=60 top=10

use std::hint::black_box;
use std::process::ExitCode;
use std::time::Instant;

use query_profiler::{normalize_query, rank, Aggregator, Sample};

struct Workload {
    cycles: usize,
    sessions: usize,
    window: usize,
    top: usize,
}

impl Workload {
    fn from_args(args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut workload = Workload {
            cycles: 10_000,
            sessions: 100,
            window: 0,
            top: 10,
        };
        for arg in args.filter(|arg| arg != "--bench") {
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got {arg:?}"))?;
            let value = value
                .replace('_', "")
                .parse::<usize>()
                .map_err(|err| format!("{key}: {err}"))?;
            match key {
                "cycles" => workload.cycles = value,
                "sessions" => workload.sessions = value,
                "window" => workload.window = value,
                "top" => workload.top = value,
                _ => return Err(format!("unknown option {key:?} (cycles, sessions, window, top)")),
            }
        }
        Ok(workload)
    }
}

/// A mix of shapes with varying literals, so most raw texts are distinct.
fn processlist(cycle: usize, sessions: usize) -> Vec<String> {
    (0..sessions)
        .map(|session| {
            let id = cycle * sessions + session;
            match session % 4 {
                0 => format!("SELECT * FROM users WHERE id = {id}"),
                1 => format!(
                    "SELECT id FROM orders WHERE user_id IN ({}) AND state = 'open'",
                    (0..(id % 12 + 1)).map(|n| n.to_string()).collect::<Vec<_>>().join(", ")
                ),
                2 => format!("UPDATE sessions SET seen_at = NOW() WHERE token = 0x{id:x}"),
                _ => format!("INSERT INTO audit (actor, action) VALUES ('user{id}', \"login\")"),
            }
        })
        .collect()
}

fn main() -> ExitCode {
    let workload = match Workload::from_args(std::env::args().skip(1)) {
        Ok(workload) => workload,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let inputs = (0..workload.cycles.min(64))
        .map(|cycle| processlist(cycle, workload.sessions))
        .collect::<Vec<_>>();
    let mut aggregator = Aggregator::with_window(workload.window);

    let start = Instant::now();
    let mut shapes = 0;
    for cycle in 0..workload.cycles {
        let raw = &inputs[cycle % inputs.len().max(1)];
        let sample: Sample = raw.iter().map(|q| normalize_query(black_box(q))).collect();
        aggregator.update(sample);
        let ranked = rank(&aggregator.snapshot(), workload.top);
        shapes = ranked.len();
        black_box(ranked);
    }
    let elapsed = start.elapsed().as_secs_f64();
    let queries = (workload.cycles * workload.sessions) as f64;

    println!(
        "sampling_cycle cycles={} sessions={} window={} top={}",
        workload.cycles, workload.sessions, workload.window, workload.top
    );
    println!("  elapsed      {elapsed:>10.4} s");
    println!("  cycles/s     {:>10.0}", workload.cycles as f64 / elapsed.max(f64::MIN_POSITIVE));
    println!("  queries/s    {:>10.0}", queries / elapsed.max(f64::MIN_POSITIVE));
    println!("  ranked shapes {shapes}");
    ExitCode::SUCCESS
}
