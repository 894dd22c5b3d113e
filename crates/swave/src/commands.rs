//! Engine-side command semantics for the host's wave operations.
//!
//! The host parses its wire protocol into these typed requests and maps
//! the results (or [`WaveError`]s) back onto replies; everything between
//! those two points lives here: defaults, range clamping, wave creation,
//! geometry changes, and the auto-expire hand-off.

use swave_core::{Wave, dump, sizing};
use swave_error::{Result, WaveError};
use swave_types::{DEFAULT_EPSILON, DEFAULT_WINDOW, Toggle, UNBOUNDED, WaveConfig};

use crate::store::WaveStore;

/// Increment request: `key`, amount, timestamp, and optional geometry.
///
/// The wire form is positional, so a supplied geometry argument implies
/// every earlier argument was supplied too; the `Option` fields mirror
/// that trailing-argument shape.
#[derive(Debug, Clone)]
pub struct IncrBy {
    pub key: String,
    /// Amount to add; 0 still creates the wave and answers the query.
    pub incr: i64,
    /// Item timestamp; 0 means the host's current time.
    pub ts: i64,
    /// Auto-expire toggle; unset keeps the wave's current setting.
    pub expire: Toggle,
    /// Window size; `-1` or absent selects the default.
    pub window: Option<i64>,
    pub epsilon: Option<f64>,
    /// Value bound; `-1` derives the largest safe increment.
    pub bound: Option<i64>,
}

impl IncrBy {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            incr: 1,
            ts: 0,
            expire: Toggle::Unset,
            window: None,
            epsilon: None,
            bound: None,
        }
    }

    #[must_use]
    pub fn amount(mut self, incr: i64) -> Self {
        self.incr = incr;
        self
    }

    #[must_use]
    pub fn at(mut self, ts: i64) -> Self {
        self.ts = ts;
        self
    }

    #[must_use]
    pub fn with_expire(mut self, expire: Toggle) -> Self {
        self.expire = expire;
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: i64) -> Self {
        self.window = Some(window);
        self
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    #[must_use]
    pub fn with_bound(mut self, bound: i64) -> Self {
        self.bound = Some(bound);
        self
    }
}

/// Query request: `key`, timestamp (0 means now), fast/exact flag.
#[derive(Debug, Clone)]
pub struct Get {
    pub key: String,
    pub ts: i64,
    pub fast: bool,
}

impl Get {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ts: 0,
            fast: false,
        }
    }

    #[must_use]
    pub fn at(mut self, ts: i64) -> Self {
        self.ts = ts;
        self
    }

    #[must_use]
    pub fn fast(mut self) -> Self {
        self.fast = true;
        self
    }
}

/// Increment a wave, creating it on first touch, and answer the exact
/// query at the item's timestamp.
///
/// `now` is the host's current time, used when `req.ts` is 0. When the
/// wave has auto-expire on, the refreshed key-expiry deadline is pushed
/// to the store after the increment.
#[allow(clippy::float_cmp)]
pub fn incrby<S: WaveStore>(store: &mut S, req: &IncrBy, now: i64) -> Result<i64> {
    validate_incrby(req)?;

    let ts = if req.ts == 0 { now } else { req.ts };
    let window = match req.window {
        None | Some(UNBOUNDED) => DEFAULT_WINDOW,
        Some(window) => window,
    };
    let epsilon = req.epsilon.unwrap_or(DEFAULT_EPSILON);
    let bound = match req.bound {
        None | Some(UNBOUNDED) => sizing::max_increment(window),
        Some(bound) => bound,
    };

    if store.lookup_mut(&req.key)?.is_none() {
        let config = WaveConfig::new(window, epsilon, bound, req.expire.unwrap_or(true));
        let wave = Wave::new(config, ts)?;
        store.insert(&req.key, wave);
        tracing::debug!(key = %req.key, window, epsilon, bound, "wave created");
    }

    let (reply, deadline) = {
        let Some(wave) = store.lookup_mut(&req.key)? else {
            return Err(WaveError::internal("wave missing right after insert"));
        };

        // Geometry only changes when the last-supplied argument differs
        // from the stored wave.
        let differs = if req.bound.is_some() {
            wave.bound() != bound
        } else if req.epsilon.is_some() {
            wave.epsilon() != epsilon
        } else if req.window.is_some() {
            wave.window() != window
        } else {
            false
        };
        if differs {
            wave.resize(window, epsilon, bound)?;
            tracing::debug!(key = %req.key, window, epsilon, bound, "wave resized");
        }

        if req.expire.is_set()
            && req.window.is_none()
            && req.epsilon.is_none()
            && req.bound.is_none()
        {
            wave.set_auto_expire(req.expire.unwrap_or(true));
        }

        if req.incr > wave.bound() {
            return Err(WaveError::IncrementTooBig {
                incr: req.incr,
                bound: wave.bound(),
            });
        }

        if req.incr > 0 {
            wave.incr(req.incr, ts)?;
        }

        let deadline = wave.auto_expire().then(|| wave.expiry_deadline_ms());
        (wave.get(ts, false), deadline)
    };

    if let Some(deadline) = deadline {
        store.set_expiry(&req.key, deadline);
    }
    Ok(reply)
}

/// Answer a window-sum query. `NoSuchKey` when the key is absent.
pub fn get<S: WaveStore>(store: &S, req: &Get, now: i64) -> Result<i64> {
    if req.ts < 0 {
        return Err(WaveError::syntax("value for ts must not be negative"));
    }
    let Some(wave) = store.lookup(&req.key)? else {
        return Err(WaveError::NoSuchKey);
    };
    let ts = if req.ts == 0 { now } else { req.ts };
    Ok(wave.get(ts, req.fast))
}

/// Raw running total of a wave. `NoSuchKey` when the key is absent.
pub fn total<S: WaveStore>(store: &S, key: &str) -> Result<i64> {
    match store.lookup(key)? {
        Some(wave) => Ok(wave.total_raw()),
        None => Err(WaveError::NoSuchKey),
    }
}

/// Reset every named wave to `now`, returning how many were reset.
/// Missing keys and foreign values are skipped.
pub fn reset<S: WaveStore>(store: &mut S, keys: &[&str], now: i64) -> i64 {
    let mut done = 0;
    for key in keys {
        if let Ok(Some(wave)) = store.lookup_mut(key) {
            wave.reset(now);
            done += 1;
        }
    }
    done
}

/// Render the debug dump for a wave. `NoSuchKey` when the key is absent.
pub fn debug<S: WaveStore>(
    store: &S,
    key: &str,
    show_lists: bool,
    now: i64,
) -> Result<Vec<String>> {
    let Some(wave) = store.lookup(key)? else {
        return Err(WaveError::NoSuchKey);
    };
    Ok(dump::render(wave, show_lists, now))
}

fn validate_incrby(req: &IncrBy) -> Result<()> {
    if req.incr < 0 {
        return Err(WaveError::syntax("value for incr must not be negative"));
    }
    if req.ts < 0 {
        return Err(WaveError::syntax("value for ts must not be negative"));
    }
    if let Some(window) = req.window {
        if window != UNBOUNDED && window <= 0 {
            return Err(WaveError::syntax("value for N must be bigger than 0"));
        }
    }
    if let Some(epsilon) = req.epsilon {
        if epsilon <= 0.0 || epsilon >= 1.0 {
            return Err(WaveError::syntax("value for E must be between ]0,1["));
        }
    }
    if let Some(bound) = req.bound {
        if bound != UNBOUNDED && bound <= 0 {
            return Err(WaveError::syntax("value for R must be bigger than 0"));
        }
    }
    Ok(())
}
