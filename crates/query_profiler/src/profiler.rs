//! The sampling loop: fetch, normalize, aggregate, report every `delay`
//! cycles, then sleep until the next cycle or until shutdown is signalled.

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::aggregate::{Aggregator, Sample};
use crate::dump::DumpSink;
use crate::error::ProfilerError;
use crate::normalize::normalize_query;
use crate::report::{rank, render_now, RankedEntry};
use crate::source::QuerySource;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfilerConfig {
    /// How many of the most frequent queries a report shows.
    pub top_n: usize,
    /// Number of recent samples counted; `0` counts the whole run.
    pub window: usize,
    pub interval: Duration,
    /// Report once every `delay` cycles.
    pub delay: u32,
}

impl ProfilerConfig {
    pub fn new(
        top_n: usize,
        window: usize,
        interval_secs: f64,
        delay: u32,
    ) -> Result<Self, ProfilerError> {
        let interval = Duration::try_from_secs_f64(interval_secs).map_err(|_| {
            ProfilerError::Configuration(format!(
                "interval must be a non-negative number of seconds, got {interval_secs}"
            ))
        })?;
        Ok(Self {
            top_n,
            window,
            interval,
            delay: delay.max(1),
        })
    }
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            window: 0,
            interval: Duration::from_secs(1),
            delay: 1,
        }
    }
}

pub struct Profiler<S, W> {
    source: S,
    out: W,
    config: ProfilerConfig,
    aggregator: Aggregator,
    dump: Option<DumpSink>,
    cadence: u32,
    cycles: u64,
}

impl<S, W> Profiler<S, W>
where
    S: QuerySource,
    W: Write,
{
    pub fn new(source: S, config: ProfilerConfig, out: W) -> Self {
        Self {
            aggregator: Aggregator::with_window(config.window),
            source,
            out,
            config,
            dump: None,
            cadence: 0,
            cycles: 0,
        }
    }

    pub fn with_dump(mut self, dump: DumpSink) -> Self {
        self.dump = Some(dump);
        self
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs cycles until `shutdown` flips to `true` or its sender is dropped.
    /// Both an in-flight fetch and the inter-cycle sleep are interrupted.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            top_n = self.config.top_n,
            window = self.config.window,
            interval_ms = self.config.interval.as_millis() as u64,
            delay = self.config.delay,
            "profiling started"
        );

        while !*shutdown.borrow() {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                fetched = self.source.fetch_active_queries() => fetched,
            };
            let queries = match fetched {
                Ok(queries) => queries,
                Err(err) => {
                    warn!(error = %err, "fetch failed, recording an empty sample");
                    Vec::new()
                }
            };
            self.record(queries);

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        info!(cycles = self.cycles, "profiling stopped");
    }

    /// Records one cycle's raw queries and returns the ranking when this
    /// cycle is a reporting one.
    pub fn record(&mut self, queries: Vec<String>) -> Option<Vec<RankedEntry>> {
        self.cycles += 1;
        self.mirror(&queries);

        let sample: Sample = queries.iter().map(|q| normalize_query(q)).collect();
        debug!(cycle = self.cycles, queries = sample.len(), "sampled");
        self.aggregator.update(sample);

        self.cadence += 1;
        if self.cadence < self.config.delay {
            return None;
        }
        self.cadence = 0;

        let ranked = self.summary();
        if let Err(err) = self.out.write_all(render_now(&ranked).as_bytes()) {
            warn!(error = %err, "failed to write report");
        }
        if let Err(err) = self.out.flush() {
            warn!(error = %err, "failed to flush report");
        }
        Some(ranked)
    }

    pub fn summary(&self) -> Vec<RankedEntry> {
        rank(&self.aggregator.snapshot(), self.config.top_n)
    }

    /// Appends the final ranking to the dump file, if there is one.
    pub fn finish(&mut self) -> Result<(), ProfilerError> {
        let summary = render_now(&self.summary());
        let Some(dump) = self.dump.as_mut() else {
            return Ok(());
        };
        dump.write_line("")?;
        dump.write_line("Summary")?;
        dump.write_line(summary.trim_end())?;
        dump.flush()?;
        info!(path = %dump.path().display(), "wrote final summary to dump file");
        Ok(())
    }

    pub fn into_inner(self) -> (S, W) {
        (self.source, self.out)
    }

    fn mirror(&mut self, queries: &[String]) {
        let Some(dump) = self.dump.as_mut() else {
            return;
        };
        let written = queries
            .iter()
            .try_for_each(|query| dump.write_line(query))
            .and_then(|()| dump.flush());
        if let Err(err) = written {
            warn!(error = %err, path = %dump.path().display(), "failed to write raw queries");
        }
    }
}
