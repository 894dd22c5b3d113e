//! Shared value types for the swave engine.
//!
//! The engine proper lives in `swave-core`; this crate holds the plain data
//! carried across crate boundaries: the stored [`Triple`], the wave
//! configuration, the tristate expire toggle used by the command surface,
//! and the serializable [`WaveSnapshot`] form.

use serde::{Deserialize, Serialize};

/// Default window size in time units.
pub const DEFAULT_WINDOW: i64 = 60;

/// Default target relative error for the fast query.
pub const DEFAULT_EPSILON: f64 = 0.05;

/// Sentinel bound meaning "derive the largest safe per-item value from the
/// window size".
pub const UNBOUNDED: i64 = -1;

/// The unit stored in level queues and the chronological list.
///
/// Triples are immutable once inserted and unique within a wave: `pos` is
/// the modular position at insertion, `v` the item value, and `z` the
/// running sum (mod M) immediately after this item was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub pos: i64,
    pub v: i64,
    pub z: i64,
}

impl Triple {
    #[must_use]
    pub const fn new(pos: i64, v: i64, z: i64) -> Self {
        Self { pos, v, z }
    }
}

/// Wave configuration: window size, target error, value bound, auto-expiry.
///
/// `bound == UNBOUNDED` is resolved by the engine to the largest per-item
/// value that cannot overflow the running sum within one window. A zero
/// `epsilon` is resolved to [`DEFAULT_EPSILON`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Window size N: how many most-recent time units the sum covers.
    pub window: i64,
    /// Target relative error for the fast query, in (0, 1).
    pub epsilon: f64,
    /// Upper bound R on accepted item values.
    pub bound: i64,
    /// Whether the host should expire the key once the window has passed.
    pub auto_expire: bool,
}

impl WaveConfig {
    #[must_use]
    pub const fn new(window: i64, epsilon: f64, bound: i64, auto_expire: bool) -> Self {
        Self {
            window,
            epsilon,
            bound,
            auto_expire,
        }
    }
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            epsilon: DEFAULT_EPSILON,
            bound: UNBOUNDED,
            auto_expire: true,
        }
    }
}

/// Tristate flag for the expire argument of the increment command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Toggle {
    Yes,
    No,
    #[default]
    Unset,
}

impl Toggle {
    /// Collapse to a bool, keeping `default` when unset.
    #[must_use]
    pub const fn unwrap_or(self, default: bool) -> bool {
        match self {
            Self::Yes => true,
            Self::No => false,
            Self::Unset => default,
        }
    }

    #[must_use]
    pub const fn is_set(self) -> bool {
        !matches!(self, Self::Unset)
    }
}

/// Serializable form of a wave: configuration, counters, and the
/// chronological list of live triples (oldest first).
///
/// Hosts persist a wave by walking the list; the engine reconstructs the
/// cross-indexed queues from this form without replaying the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveSnapshot {
    pub config: WaveConfig,
    pub start: i64,
    pub last: i64,
    pub pos: i64,
    pub total: i64,
    pub z: i64,
    pub items: Vec<Triple>,
}
