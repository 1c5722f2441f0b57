//! Per-day, per-thread aggregation of messages
//!
//! Sequential accumulation for streamed sources, plus a rayon map-reduce path
//! for messages already held in memory. Both produce the same map.

use crate::window::Window;
use crate::{DayKey, Participant, RawMessage, ThreadKey};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

pub type Accumulators = HashMap<(DayKey, ThreadKey), ThreadAccumulator>;

/// Running tally for one thread on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadAccumulator {
    pub message_count: u64,
    pub participants: HashSet<Participant>,
}

impl ThreadAccumulator {
    fn add_message(&mut self, msg: &RawMessage) {
        self.message_count = self.message_count.saturating_add(1);
        self.participants.insert(msg.participant());
    }

    fn merge(&mut self, other: ThreadAccumulator) {
        self.message_count = self.message_count.saturating_add(other.message_count);
        self.participants.extend(other.participants);
    }

    pub fn user_count(&self) -> u64 {
        self.participants.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Counted,
    BeforeWindow,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub observed: u64,
    pub counted: u64,
    pub before_window: u64,
}

/// Owns the accumulator map for the duration of one run.
pub struct Aggregator<'w> {
    window: &'w Window,
    accumulators: Accumulators,
    stats: AggregateStats,
}

impl<'w> Aggregator<'w> {
    pub fn new(window: &'w Window) -> Self {
        Self {
            window,
            accumulators: HashMap::new(),
            stats: AggregateStats::default(),
        }
    }

    pub fn observe(&mut self, msg: &RawMessage) -> Observation {
        self.stats.observed += 1;

        if !self.window.contains(msg.timestamp) {
            self.stats.before_window += 1;
            return Observation::BeforeWindow;
        }

        let key = (self.window.day_key(msg.timestamp), msg.thread_key());
        self.accumulators.entry(key).or_default().add_message(msg);
        self.stats.counted += 1;
        Observation::Counted
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    pub fn finish(self) -> (Accumulators, AggregateStats) {
        (self.accumulators, self.stats)
    }
}

/// Aggregate a message sequence, consuming it once in the order supplied.
pub fn aggregate<I>(messages: I, window: &Window) -> Accumulators
where
    I: IntoIterator<Item = RawMessage>,
{
    let mut aggregator = Aggregator::new(window);
    for msg in messages {
        aggregator.observe(&msg);
    }
    aggregator.finish().0
}

/// Same result as [`aggregate`], computed over shards in parallel and merged.
pub fn aggregate_parallel(messages: Vec<RawMessage>, window: &Window) -> Accumulators {
    if messages.is_empty() {
        return HashMap::new();
    }

    messages
        .into_par_iter()
        .filter(|msg| window.contains(msg.timestamp))
        .fold(HashMap::new, |mut acc: Accumulators, msg| {
            let key = (window.day_key(msg.timestamp), msg.thread_key());
            acc.entry(key).or_default().add_message(&msg);
            acc
        })
        .reduce(HashMap::new, |mut a, b| {
            for (key, acc) in b {
                a.entry(key).or_default().merge(acc);
            }
            a
        })
}
