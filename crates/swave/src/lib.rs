//! Public API facade for the swave engine.
//!
//! Re-exports the engine, error, and value types, and carries the two
//! host-facing surfaces: the typed command layer ([`commands`]) and the
//! store contract with its in-memory implementation ([`store`]).

pub use swave_core::{Wave, dump};
pub use swave_error::{ReplyCode, Result, WaveError};
pub use swave_types::{Toggle, Triple, WaveConfig, WaveSnapshot};

pub mod commands;
pub mod store;
