use thiserror::Error;

/// Primary error type for swave engine operations.
///
/// One variant per failure kind the engine can hand back to its host:
/// structured variants for the common cases, a string payload only where
/// the detail is genuinely free-form.
#[derive(Error, Debug)]
pub enum WaveError {
    /// Argument count, type, or range violated.
    #[error("syntax error: {detail}")]
    Syntax { detail: String },

    /// The key exists in the host store but does not hold a wave.
    #[error("key holds a value that is not a wave")]
    WrongType,

    /// The key is absent from the host store.
    #[error("no such key")]
    NoSuchKey,

    /// The increment exceeds the wave's value bound.
    #[error("increment too big: {incr} exceeds bound {bound}")]
    IncrementTooBig { incr: i64, bound: i64 },

    /// Allocation failed during create, insert, or reply construction.
    #[error("out of memory")]
    OutOfMemory,

    /// An invariant would be violated. Fatal; not recoverable by the host.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Numeric reply codes for wire-protocol compatibility.
///
/// Hosts that speak a binary protocol map [`WaveError`] onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReplyCode {
    /// Successful result.
    Ok = 0,
    /// Generic client error (syntax, range).
    Err = 1,
    /// Key holds the wrong kind of value.
    WrongType = 2,
    /// Key absent.
    NoKey = 3,
    /// Increment exceeds the configured bound.
    TooBig = 4,
    /// Out of memory.
    NoMem = 5,
    /// Internal invariant failure.
    Internal = 6,
}

impl WaveError {
    /// Map this error to its wire reply code.
    pub const fn reply_code(&self) -> ReplyCode {
        match self {
            Self::Syntax { .. } => ReplyCode::Err,
            Self::WrongType => ReplyCode::WrongType,
            Self::NoSuchKey => ReplyCode::NoKey,
            Self::IncrementTooBig { .. } => ReplyCode::TooBig,
            Self::OutOfMemory => ReplyCode::NoMem,
            Self::Internal(_) => ReplyCode::Internal,
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. }
                | Self::WrongType
                | Self::NoSuchKey
                | Self::IncrementTooBig { .. }
        )
    }

    /// Create a syntax error.
    pub fn syntax(detail: impl Into<String>) -> Self {
        Self::Syntax {
            detail: detail.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using [`WaveError`].
pub type Result<T> = std::result::Result<T, WaveError>;
