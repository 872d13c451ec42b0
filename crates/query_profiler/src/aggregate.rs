use std::collections::{HashMap, VecDeque};

/// Normalized queries observed during one sampling cycle. Duplicates count.
pub type Sample = Vec<String>;

/// Occurrence count per normalized query.
pub type CountTable = HashMap<String, u64>;

/// Counts every occurrence for the life of the process.
#[derive(Debug, Default)]
pub struct CumulativeCounter {
    counts: CountTable,
}

impl CumulativeCounter {
    pub fn update(&mut self, sample: Sample) {
        for query in sample {
            *self.counts.entry(query).or_default() += 1;
        }
    }

    pub fn snapshot(&self) -> CountTable {
        self.counts.clone()
    }
}

/// Counts only the occurrences within the last `capacity` samples.
///
/// Counts are adjusted incrementally on every update: the incoming sample is
/// added and an evicted sample is subtracted, so `snapshot` never has to walk
/// the retained samples.
#[derive(Debug)]
pub struct WindowedCounter {
    capacity: usize,
    samples: VecDeque<Sample>,
    counts: CountTable,
}

impl WindowedCounter {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity + 1),
            counts: CountTable::new(),
        }
    }

    pub fn update(&mut self, sample: Sample) {
        for query in &sample {
            *self.counts.entry(query.clone()).or_default() += 1;
        }
        self.samples.push_back(sample);

        while self.samples.len() > self.capacity {
            let Some(evicted) = self.samples.pop_front() else {
                break;
            };
            for query in evicted {
                if let Some(count) = self.counts.get_mut(&query) {
                    *count -= 1;
                    if *count == 0 {
                        self.counts.remove(&query);
                    }
                }
            }
        }
    }

    pub fn snapshot(&self) -> CountTable {
        self.counts.clone()
    }
}

#[derive(Debug)]
pub enum Aggregator {
    Cumulative(CumulativeCounter),
    Windowed(WindowedCounter),
}

impl Aggregator {
    /// A window of `0` means "count everything since startup".
    pub fn with_window(window: usize) -> Self {
        if window > 0 {
            Self::Windowed(WindowedCounter::new(window))
        } else {
            Self::Cumulative(CumulativeCounter::default())
        }
    }

    pub fn update(&mut self, sample: Sample) {
        match self {
            Self::Cumulative(counter) => counter.update(sample),
            Self::Windowed(counter) => counter.update(sample),
        }
    }

    pub fn snapshot(&self) -> CountTable {
        match self {
            Self::Cumulative(counter) => counter.snapshot(),
            Self::Windowed(counter) => counter.snapshot(),
        }
    }
}
