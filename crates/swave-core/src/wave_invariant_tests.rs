//! Wave invariant and property tests over randomized increment streams.
//!
//! Covers, after arbitrary accepted insert sequences:
//! 1. Structural consistency: every triple in the chronological list and
//!    in exactly one level queue, lengths matching
//! 2. Expiry: nothing older than one window survives
//! 3. Level queues never exceed their capacity
//! 4. Counters stay inside the modular domain
//! 5. Exactness of the query at the last timestamp, with and without
//!    prior expirations
//! 6. Snapshot round-trip agreement across a sweep of query timestamps

#[cfg(test)]
mod tests {
    use crate::Wave;
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;
    use swave_types::WaveConfig;

    /// A randomized stream: per item the value and the timestamp delta to
    /// the previous item (0 keeps the position, small jumps cross window
    /// edges).
    fn stream(max_value: i64, max_len: usize) -> impl Strategy<Value = Vec<(i64, i64)>> {
        prop::collection::vec((1..=max_value, 0..=3_i64), 0..=max_len)
    }

    fn build(window: i64, epsilon: f64, bound: i64, items: &[(i64, i64)]) -> Wave {
        let mut wave =
            Wave::new(WaveConfig::new(window, epsilon, bound, true), 1000).expect("valid config");
        let mut ts = 1000;
        for &(v, dt) in items {
            ts += dt;
            wave.incr(v, ts).expect("accepted increment");
        }
        wave
    }

    proptest! {
        #[test]
        fn invariants_hold_after_any_stream(items in stream(10, 120)) {
            let mut wave =
                Wave::new(WaveConfig::new(5, 0.3, 10, true), 1000).expect("valid config");
            let mut ts = 1000;
            for &(v, dt) in &items {
                ts += dt;
                wave.incr(v, ts).expect("accepted increment");
                wave.check_invariants().map_err(TestCaseError::fail)?;
            }
        }

        #[test]
        fn total_tracks_the_stream_modulo_m(items in stream(10, 120)) {
            let wave = build(5, 0.3, 10, &items);
            let sum: i128 = items.iter().map(|&(v, _)| i128::from(v)).sum();
            let expected = (sum % i128::from(wave.modulus())) as i64;
            prop_assert_eq!(wave.total_raw(), expected);
        }

        #[test]
        fn query_at_last_is_total_minus_z(items in stream(10, 120)) {
            let wave = build(5, 0.3, 10, &items);
            if !items.is_empty() {
                prop_assert_eq!(wave.get(wave.last(), false), wave.total_raw() - wave.z());
                prop_assert_eq!(wave.get(wave.last(), true), wave.total_raw() - wave.z());
            }
        }

        #[test]
        fn unexpired_window_is_exact_at_last(items in stream(1024, 50)) {
            // Strictly advancing timestamps inside one window: nothing
            // expires, so the query at `last` is the plain stream sum.
            let mut wave =
                Wave::new(WaveConfig::new(60, 0.05, 1024, true), 1000).expect("valid config");
            let mut sum = 0_i64;
            for (offset, &(v, _)) in items.iter().enumerate() {
                let ts = 1001 + offset as i64;
                wave.incr(v, ts).expect("accepted increment");
                sum += v;
            }
            if !items.is_empty() {
                prop_assert!(wave.pos() < wave.window());
                prop_assert_eq!(wave.get(wave.last(), false), sum);
            }
        }

        #[test]
        fn reset_answers_zero_everywhere(items in stream(10, 60)) {
            let mut wave = build(5, 0.3, 10, &items);
            wave.reset(5000);
            prop_assert_eq!(wave.get(5000, false), 0);
            prop_assert_eq!(wave.get(5002, false), 0);
            prop_assert_eq!(wave.get(5002, true), 0);
            prop_assert_eq!(wave.len(), 0);
        }

        #[test]
        fn snapshot_round_trip_preserves_every_answer(items in stream(10, 80)) {
            let wave = build(5, 0.3, 10, &items);
            let restored = Wave::from_snapshot(&wave.snapshot()).expect("snapshot restores");
            for ts in (wave.start() - 2)..=(wave.last() + wave.window() + 2) {
                prop_assert_eq!(
                    restored.get(ts, false),
                    wave.get(ts, false),
                    "slow answers diverge at ts {}",
                    ts
                );
                prop_assert_eq!(
                    restored.get(ts, true),
                    wave.get(ts, true),
                    "fast answers diverge at ts {}",
                    ts
                );
            }
        }

        #[test]
        fn expiry_survives_window_jumps(items in stream(10, 60), jump in 10..200_i64) {
            // Interleave a large timestamp jump so several windows elapse
            // between inserts; the expiry loop must drain every stale
            // triple, not just one per insert.
            let mut wave =
                Wave::new(WaveConfig::new(5, 0.3, 10, true), 1000).expect("valid config");
            let mut ts = 1000;
            for (offset, &(v, dt)) in items.iter().enumerate() {
                ts += if offset == items.len() / 2 { jump } else { dt };
                wave.incr(v, ts).expect("accepted increment");
                wave.check_invariants().map_err(TestCaseError::fail)?;
            }
            let horizon = wave.pos() - wave.window();
            for item in wave.triples() {
                prop_assert!(item.pos > horizon, "stale triple at pos {}", item.pos);
            }
        }
    }
}
