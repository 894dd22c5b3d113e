//! Deterministic wave engine for approximate sliding-window sums.
//!
//! For a stream of items with non-decreasing integer timestamps, each
//! carrying a value in `[0, R]`, a [`Wave`] answers "what is the sum of
//! the items from the last N time units?" with a configurable relative
//! error. The scheme follows the deterministic wave of Gibbons and
//! Tirthapura ("Distributed Streams Algorithms for Sliding Windows"),
//! extended to sums of bounded integers: positions of the running sum are
//! kept at `log(2 epsilon N R)` levels of bounded queues over one
//! chronologically ordered list, and the level for each insertion is read
//! off the carry bits of the running sum in O(1).
//!
//! The engine is deliberately host-agnostic: it never reads a clock, never
//! allocates a key, and never blocks. Keying waves, wire encoding, and key
//! expiry belong to the embedding store; see the `swave` facade crate.

pub mod dump;
pub mod level;
mod list;
pub mod sizing;
pub mod wave;

pub use wave::Wave;

#[cfg(test)]
mod wave_invariant_tests;
