//! The wave object: counters, cross-indexed storage, insert and query.

use swave_error::{Result, WaveError};
use swave_types::{DEFAULT_EPSILON, Triple, UNBOUNDED, WaveConfig, WaveSnapshot};
use tracing::debug;

use crate::level::wave_level;
use crate::list::TripleList;
use crate::sizing;

/// Deterministic wave over a stream of bounded non-negative integers.
///
/// Maintains an approximation of the sum over the items whose timestamp
/// lies within the last `window` time units, with relative error at most
/// `epsilon` on the fast query path. Insertion, expiry, and eviction are
/// all O(levels) per call; queries walk at most the live triples.
///
/// All calls on one wave must be serialized by the host. The engine never
/// reads a clock; timestamps arrive as parameters.
#[derive(Debug)]
pub struct Wave {
    config: WaveConfig,
    modulus: i64,
    num_levels: usize,
    level_cap: usize,
    /// Creation (or last reset) timestamp.
    start: i64,
    /// Most recent accepted timestamp.
    last: i64,
    /// Modular position, `(last - start) mod M`.
    pos: i64,
    /// Running sum mod M of every value since the last reset.
    total: i64,
    /// z-field of the most recently expired triple, 0 if none.
    z: i64,
    items: TripleList,
}

impl Wave {
    /// Create a wave at timestamp `ts` (host-resolved, `> 0`).
    ///
    /// A zero `epsilon` falls back to the default; `bound == UNBOUNDED`
    /// resolves to the largest increment safe for `window`.
    pub fn new(config: WaveConfig, ts: i64) -> Result<Self> {
        if ts <= 0 {
            return Err(WaveError::syntax("creation timestamp must be > 0"));
        }
        let config = resolve(config)?;
        let modulus = sizing::modulus(config.window, config.bound);
        let num_levels = sizing::num_levels(config.window, config.epsilon, config.bound);
        let level_cap = sizing::level_cap(config.epsilon);

        debug!(
            window = config.window,
            epsilon = config.epsilon,
            bound = config.bound,
            modulus,
            num_levels,
            level_cap,
            start = ts,
            "wave created"
        );

        Ok(Self {
            config,
            modulus,
            num_levels,
            level_cap,
            start: ts,
            last: ts,
            pos: 0,
            total: 0,
            z: 0,
            items: TripleList::new(num_levels),
        })
    }

    /// Record an item of value `v` at timestamp `ts`.
    ///
    /// Timestamps at or after `start` are accepted; `ts <= last` does not
    /// advance the position but the item is still recorded at the current
    /// one, which permits small out-of-order bursts. A timestamp before
    /// `start` is a successful no-op.
    pub fn incr(&mut self, v: i64, ts: i64) -> Result<()> {
        if v <= 0 {
            return Err(WaveError::syntax("increment must be > 0"));
        }
        if ts == 0 {
            return Err(WaveError::syntax("timestamp must be > 0"));
        }
        if ts < self.start {
            return Ok(());
        }

        if ts > self.start && ts > self.last {
            self.pos = (ts - self.start) % self.modulus;
            self.last = ts;
        }

        // Expire from the head of L. The horizon is negative until the
        // first full window has elapsed, matching nothing.
        let horizon = self.pos - self.config.window;
        while let Some(head) = self.items.front() {
            if head.pos > horizon {
                break;
            }
            self.z = head.z;
            self.items.pop_front();
            debug!(pos = head.pos, z = head.z, "triple expired");
        }

        let level = wave_level(self.total, v, self.num_levels);
        self.total = add_mod(self.total, v, self.modulus);

        if self.items.level_len(level) >= self.level_cap {
            if let Some(evicted) = self.items.evict_level_tail(level) {
                debug!(level, pos = evicted.pos, "full level queue, tail evicted");
            }
        }

        self.items.push(Triple::new(self.pos, v, self.total), level);
        Ok(())
    }

    /// Answer a window-sum query at timestamp `ts`.
    ///
    /// Boundary cases (query outside the wave's lifetime or window, query
    /// at `last`, an empty list, a triple straddling the window edge) are
    /// answered exactly. Otherwise `fast` returns the midpoint estimate
    /// from the effective head triple, and the slow path scans the
    /// chronological list for the modular window sum.
    #[must_use]
    pub fn get(&self, ts: i64, fast: bool) -> i64 {
        let window = self.config.window;

        if ts == 0 {
            return 0;
        }
        if ts < self.start {
            return 0;
        }
        if ts <= self.last - window {
            return 0;
        }
        if ts >= self.last + window {
            return 0;
        }
        if ts == self.last {
            return self.total - self.z;
        }
        if self.items.is_empty() {
            return 0;
        }

        // Walk to the effective head: the first triple at or past the
        // window edge, or the newest triple when none is.
        let mut iter = self.items.iter();
        let Some(mut head) = iter.next() else {
            return 0;
        };
        for next in iter {
            if head.pos >= ts - window {
                break;
            }
            head = next;
        }
        let z1 = self.z;
        let Triple { pos: p, v: v2, z: z2 } = head;

        if p == ts - window + 1 {
            return self.total - z2 + v2;
        }
        if p == ts - window {
            return self.total - z2;
        }
        if ts == self.pos {
            return self.total - self.z;
        }

        if fast {
            return self.total - midpoint(z1, z2, v2);
        }

        if ts < self.last {
            let limit = (ts - self.start) % self.modulus;
            let seen: i64 = self
                .items
                .iter_rev()
                .filter(|item| item.pos <= limit)
                .map(|item| item.v)
                .sum();
            return self.total - seen;
        }

        let limit = (ts - self.start - window) % self.modulus;
        self.items
            .iter()
            .filter(|item| item.pos > limit)
            .map(|item| item.v)
            .sum()
    }

    /// Empty the wave and restart its clock at `now`. Configuration is
    /// retained.
    pub fn reset(&mut self, now: i64) {
        self.start = now;
        self.last = now;
        self.pos = 0;
        self.total = 0;
        self.z = 0;
        self.items.clear();
        debug!(now, "wave reset");
    }

    /// Re-shape the wave for a new geometry, purging all stored triples.
    ///
    /// Counters are retained; callers treat a resize as a semantic reset.
    pub fn resize(&mut self, window: i64, epsilon: f64, bound: i64) -> Result<()> {
        let config = resolve(WaveConfig::new(
            window,
            epsilon,
            bound,
            self.config.auto_expire,
        ))?;
        self.config = config;
        self.modulus = sizing::modulus(config.window, config.bound);
        self.num_levels = sizing::num_levels(config.window, config.epsilon, config.bound);
        self.level_cap = sizing::level_cap(config.epsilon);
        self.items.rebuild(self.num_levels);
        debug!(
            window = config.window,
            epsilon = config.epsilon,
            bound = config.bound,
            modulus = self.modulus,
            num_levels = self.num_levels,
            "wave resized"
        );
        Ok(())
    }

    /// Serializable form: configuration, counters, and L oldest-first.
    #[must_use]
    pub fn snapshot(&self) -> WaveSnapshot {
        WaveSnapshot {
            config: self.config,
            start: self.start,
            last: self.last,
            pos: self.pos,
            total: self.total,
            z: self.z,
            items: self.items.iter().collect(),
        }
    }

    /// Rebuild a wave from its serialized form.
    ///
    /// Each triple's level is recovered from its own fields: the running
    /// sum before the triple was added is `(z - v) mod M`, so the level
    /// selection replays without touching expiry or eviction.
    pub fn from_snapshot(snapshot: &WaveSnapshot) -> Result<Self> {
        let mut wave = Self::new(snapshot.config, snapshot.start.max(1))?;
        wave.start = snapshot.start;
        wave.last = snapshot.last;
        wave.pos = snapshot.pos;
        wave.total = snapshot.total;
        wave.z = snapshot.z;
        for item in &snapshot.items {
            let before = (item.z - item.v).rem_euclid(wave.modulus);
            let level = wave_level(before, item.v, wave.num_levels);
            wave.items.push(*item, level);
        }
        Ok(wave)
    }

    /// Raw running total (mod M), unreduced by the window.
    #[must_use]
    pub const fn total_raw(&self) -> i64 {
        self.total
    }

    /// Absolute key-expiry deadline in milliseconds: one window past the
    /// last accepted timestamp.
    #[must_use]
    pub const fn expiry_deadline_ms(&self) -> i64 {
        self.last
            .saturating_add(self.config.window)
            .saturating_add(1)
            .saturating_mul(1000)
    }

    #[must_use]
    pub const fn window(&self) -> i64 {
        self.config.window
    }

    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.config.epsilon
    }

    #[must_use]
    pub const fn bound(&self) -> i64 {
        self.config.bound
    }

    #[must_use]
    pub const fn auto_expire(&self) -> bool {
        self.config.auto_expire
    }

    pub fn set_auto_expire(&mut self, auto_expire: bool) {
        self.config.auto_expire = auto_expire;
    }

    #[must_use]
    pub const fn start(&self) -> i64 {
        self.start
    }

    #[must_use]
    pub const fn last(&self) -> i64 {
        self.last
    }

    #[must_use]
    pub const fn pos(&self) -> i64 {
        self.pos
    }

    #[must_use]
    pub const fn z(&self) -> i64 {
        self.z
    }

    #[must_use]
    pub const fn modulus(&self) -> i64 {
        self.modulus
    }

    #[must_use]
    pub const fn num_levels(&self) -> usize {
        self.num_levels
    }

    #[must_use]
    pub const fn level_cap(&self) -> usize {
        self.level_cap
    }

    /// Live triple count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Live triples in chronological order, oldest first.
    pub fn triples(&self) -> impl Iterator<Item = Triple> + '_ {
        self.items.iter()
    }

    /// Triples of one level queue, newest first.
    pub fn level_triples(&self, level: usize) -> impl Iterator<Item = Triple> + '_ {
        self.items.level_iter(level)
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        self.items.check_consistency()?;

        let horizon = self.pos - self.config.window;
        for item in self.items.iter() {
            if item.pos <= horizon {
                return Err(format!(
                    "triple at pos {} survived past horizon {horizon}",
                    item.pos
                ));
            }
        }
        for level in 0..self.items.num_levels() {
            if self.items.level_len(level) > self.level_cap {
                return Err(format!(
                    "level {level} holds {} > cap {}",
                    self.items.level_len(level),
                    self.level_cap
                ));
            }
        }
        if self.total < 0 || self.total >= self.modulus {
            return Err(format!("total {} outside [0, M)", self.total));
        }
        if self.z < 0 || self.z >= self.modulus {
            return Err(format!("z {} outside [0, M)", self.z));
        }
        Ok(())
    }
}

#[allow(clippy::float_cmp)]
fn resolve(mut config: WaveConfig) -> Result<WaveConfig> {
    if config.window <= 0 {
        return Err(WaveError::syntax("value for N must be bigger than 0"));
    }
    if config.epsilon == 0.0 {
        config.epsilon = DEFAULT_EPSILON;
    }
    if config.epsilon <= 0.0 || config.epsilon >= 1.0 {
        return Err(WaveError::syntax("value for E must be between ]0,1["));
    }
    if config.bound == UNBOUNDED {
        config.bound = sizing::max_increment(config.window);
    }
    if config.bound <= 0 {
        return Err(WaveError::syntax("value for R must be bigger than 0"));
    }
    Ok(config)
}

/// `(total + v) mod M` without intermediate overflow, even when M has
/// degraded to `i64::MAX`.
#[allow(clippy::cast_possible_truncation)]
fn add_mod(total: i64, v: i64, modulus: i64) -> i64 {
    ((i128::from(total) + i128::from(v)) % i128::from(modulus)) as i64
}

/// Midpoint reduction for the fast estimate: `floor((z1 + z2 - v2) / 2)`.
#[allow(clippy::cast_possible_truncation)]
fn midpoint(z1: i64, z2: i64, v2: i64) -> i64 {
    ((i128::from(z1) + i128::from(z2) - i128::from(v2)).div_euclid(2)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(window: i64, epsilon: f64, bound: i64, ts: i64) -> Wave {
        Wave::new(WaveConfig::new(window, epsilon, bound, true), ts)
            .expect("test config should resolve")
    }

    #[test]
    fn fresh_wave_answers_zero() {
        let w = wave(60, 0.05, 1024, 1000);
        assert_eq!(w.get(1000, false), 0);
        assert_eq!(w.total_raw(), 0);
        assert_eq!(w.modulus(), 1 << 17);
        assert_eq!(w.num_levels(), 14);
        assert_eq!(w.level_cap(), 21);
    }

    #[test]
    fn single_increment_is_exact_at_last() {
        let mut w = wave(60, 0.05, 1024, 1000);
        w.incr(5, 1000).unwrap();
        assert_eq!(w.get(1000, false), 5);
        assert_eq!(w.total_raw(), 5);
    }

    #[test]
    fn running_sum_is_exact_at_last() {
        let mut w = wave(60, 0.05, 1024, 1000);
        w.incr(5, 1000).unwrap();
        w.incr(3, 1001).unwrap();
        w.incr(7, 1002).unwrap();
        assert_eq!(w.get(1002, false), 15);
        assert_eq!(w.total_raw(), 15);
        assert_eq!(w.last(), 1002);
        assert_eq!(w.pos(), 2);
    }

    #[test]
    fn future_query_sums_window_survivors() {
        let mut w = wave(60, 0.05, 1024, 1000);
        w.incr(5, 1000).unwrap();
        w.incr(3, 1001).unwrap();
        w.incr(7, 1002).unwrap();
        // All three items are inside (970, 1030]; the modular limit is
        // negative, so every triple counts.
        assert_eq!(w.get(1030, false), 15);
    }

    #[test]
    fn expiry_records_the_discarded_partial_sum() {
        let mut w = wave(3, 0.5, 10, 100);
        w.incr(1, 100).unwrap();
        w.incr(2, 101).unwrap();
        w.incr(3, 102).unwrap();
        w.incr(4, 103).unwrap();

        // The item from ts=100 (pos 0) fell out of the window at pos 3.
        assert_eq!(w.len(), 3);
        assert_eq!(w.z(), 1);
        assert_eq!(w.get(103, false), 9);
    }

    #[test]
    fn expiry_loops_over_many_windows() {
        let mut w = wave(3, 0.5, 10, 100);
        for ts in 100..110 {
            w.incr(1, ts).unwrap();
        }
        // Jump far ahead: everything but the newest item expires.
        w.incr(1, 200).unwrap();
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn straddling_triple_is_exact() {
        let mut w = wave(5, 0.5, 10, 1);
        w.incr(1, 3).unwrap();
        w.incr(1, 5).unwrap();
        w.incr(1, 7).unwrap();
        // Effective head sits exactly one past the window edge.
        assert_eq!(w.get(8, false), 2);
        // Effective head is the discarded-edge triple.
        assert_eq!(w.get(9, false), 1);
    }

    #[test]
    fn fast_query_returns_the_midpoint() {
        let mut w = wave(3, 0.5, 10, 100);
        w.incr(1, 100).unwrap();
        w.incr(2, 101).unwrap();
        w.incr(3, 102).unwrap();
        w.incr(4, 103).unwrap();
        // z1 = 1, effective head (3, 4, 10): 10 - floor((1 + 10 - 4) / 2).
        assert_eq!(w.get(104, true), 7);
        // The slow path agrees here.
        assert_eq!(w.get(104, false), 7);
    }

    #[test]
    fn past_query_subtracts_by_modular_limit() {
        let mut w = wave(3, 0.5, 10, 100);
        w.incr(1, 100).unwrap();
        w.incr(2, 101).unwrap();
        w.incr(3, 102).unwrap();
        w.incr(4, 103).unwrap();
        // Limit (102 - 100) mod 64 = 2 keeps pos 1 and 2: 10 - (2 + 3).
        assert_eq!(w.get(102, false), 5);
    }

    #[test]
    fn out_of_range_queries_answer_zero() {
        let mut w = wave(60, 0.05, 1024, 1000);
        w.incr(5, 1000).unwrap();
        assert_eq!(w.get(0, false), 0);
        assert_eq!(w.get(999, false), 0); // before the wave existed
        assert_eq!(w.get(940, false), 0); // window entirely in the past
        assert_eq!(w.get(1060, false), 0); // window entirely in the future
    }

    #[test]
    fn stale_timestamps_do_not_advance_position() {
        let mut w = wave(60, 0.05, 1024, 1000);
        w.incr(5, 1010).unwrap();
        w.incr(3, 1005).unwrap();
        assert_eq!(w.last(), 1010);
        assert_eq!(w.pos(), 10);
        // Both items recorded; the stale one at the current position.
        assert_eq!(w.len(), 2);
        assert_eq!(w.total_raw(), 8);
    }

    #[test]
    fn timestamps_before_start_are_ignored() {
        let mut w = wave(60, 0.05, 1024, 1000);
        w.incr(5, 500).unwrap();
        assert_eq!(w.len(), 0);
        assert_eq!(w.total_raw(), 0);
    }

    #[test]
    fn rejects_degenerate_arguments() {
        let mut w = wave(60, 0.05, 1024, 1000);
        assert!(w.incr(0, 1000).is_err());
        assert!(w.incr(-1, 1000).is_err());
        assert!(w.incr(5, 0).is_err());
    }

    #[test]
    fn full_level_queue_evicts_its_tail() {
        // epsilon 0.5 gives cap 3; every v=1 insert with an even total
        // lands on level 0, odd totals alternate.
        let mut w = wave(1000, 0.5, 10, 1);
        for ts in 2..40 {
            w.incr(1, ts).unwrap();
        }
        for level in 0..w.num_levels() {
            assert!(w.level_triples(level).count() <= w.level_cap());
        }
        assert!(w.len() < 38);
    }

    #[test]
    fn reset_empties_and_restarts() {
        let mut w = wave(60, 0.05, 1024, 1000);
        w.incr(5, 1000).unwrap();
        w.incr(3, 1001).unwrap();
        w.reset(2000);
        assert!(w.is_empty());
        assert_eq!(w.total_raw(), 0);
        assert_eq!(w.z(), 0);
        assert_eq!(w.start(), 2000);
        assert_eq!(w.get(2000, false), 0);
        assert_eq!(w.get(2010, false), 0);
    }

    #[test]
    fn resize_purges_and_reshapes() {
        let mut w = wave(60, 0.05, 1024, 1000);
        w.incr(5, 1000).unwrap();
        w.resize(3, 0.5, 10).unwrap();
        assert!(w.is_empty());
        assert_eq!(w.window(), 3);
        assert_eq!(w.bound(), 10);
        assert_eq!(w.modulus(), 64);
        assert_eq!(w.num_levels(), 6);
        assert_eq!(w.level_cap(), 3);
        // Counters survive the reshape.
        assert_eq!(w.start(), 1000);
        assert_eq!(w.total_raw(), 5);
    }

    #[test]
    fn unbounded_config_resolves_to_max_increment() {
        let w = wave(60, 0.05, UNBOUNDED, 1000);
        assert_eq!(w.bound(), i64::MAX / 60);
        assert_eq!(w.modulus(), i64::MAX);
    }

    #[test]
    fn zero_epsilon_resolves_to_default() {
        let w = wave(60, 0.0, 1024, 1000);
        assert!((w.epsilon() - DEFAULT_EPSILON).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let at = |window, epsilon, bound| {
            Wave::new(WaveConfig::new(window, epsilon, bound, true), 1000)
        };
        assert!(at(0, 0.05, 1024).is_err());
        assert!(at(-2, 0.05, 1024).is_err());
        assert!(at(60, 1.5, 1024).is_err());
        assert!(at(60, 0.05, 0).is_err());
        assert!(at(60, 0.05, -2).is_err());
        assert!(Wave::new(WaveConfig::default(), 0).is_err());
    }

    #[test]
    fn expiry_deadline_is_one_window_past_last() {
        let mut w = wave(60, 0.05, 1024, 1000);
        w.incr(5, 1010).unwrap();
        assert_eq!(w.expiry_deadline_ms(), (1010 + 60 + 1) * 1000);
    }

    #[test]
    fn snapshot_round_trips_structure() {
        let mut w = wave(3, 0.5, 10, 100);
        w.incr(1, 100).unwrap();
        w.incr(2, 101).unwrap();
        w.incr(3, 102).unwrap();
        w.incr(4, 103).unwrap();

        let snapshot = w.snapshot();
        let back = Wave::from_snapshot(&snapshot).unwrap();

        assert_eq!(back.start(), w.start());
        assert_eq!(back.last(), w.last());
        assert_eq!(back.pos(), w.pos());
        assert_eq!(back.total_raw(), w.total_raw());
        assert_eq!(back.z(), w.z());
        assert_eq!(
            back.triples().collect::<Vec<_>>(),
            w.triples().collect::<Vec<_>>()
        );
        for level in 0..w.num_levels() {
            assert_eq!(
                back.level_triples(level).collect::<Vec<_>>(),
                w.level_triples(level).collect::<Vec<_>>(),
                "level {level} queue should match"
            );
        }
    }
}
