//! Top-level error type and the recovery side-channel.
//!
//! Mirrors the teacher's one-`thiserror`-enum-per-concern shape
//! (`SuperblockError`, `CodecError`, `CryptoError`) collapsed into a single
//! enum here because the reader pipeline is one cooperating state machine,
//! not several independently-failing subsystems.

use thiserror::Error;

/// Which layer detected damage and can attempt to resume past it.
///
/// Carried alongside `DataLoss`/`Truncated` so callers never need a second
/// query to know whether — and how — `RecordReader::recover` can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverableAt {
    /// No recovery is possible (clean EOF, or a non-recoverable error kind).
    No,
    /// The chunk reader can scan forward for the next valid block boundary.
    ChunkReader,
    /// The chunk decoder can discard the remainder of the current chunk.
    ChunkDecoder,
}

#[derive(Error, Debug)]
pub enum RiegeliError {
    /// Hash mismatch, unknown chunk type, bad size table, decompression
    /// failure, or malformed protobuf wire data.
    #[error("data loss: {reason}")]
    DataLoss {
        reason: String,
        recoverable: RecoverableAt,
    },

    /// The underlying source hit EOF in the middle of a chunk.
    #[error("truncated: {reason}")]
    Truncated {
        reason: String,
        recoverable: RecoverableAt,
    },

    /// A random-access operation was requested on a non-seekable source.
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// An operation was invoked outside its required precondition (e.g.
    /// `read_metadata` when not at byte 0).
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// An internal allocation or invariant failure unrelated to file content.
    #[error("internal error: {0}")]
    Internal(String),

    /// A computed position or size would exceed `u64::MAX`.
    #[error("overflow: {0}")]
    Overflow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RiegeliError {
    /// The `recoverable` tag for this error, `No` for kinds that have none.
    pub fn recoverable(&self) -> RecoverableAt {
        match self {
            RiegeliError::DataLoss { recoverable, .. } => *recoverable,
            RiegeliError::Truncated { recoverable, .. } => *recoverable,
            _ => RecoverableAt::No,
        }
    }

    pub fn data_loss(reason: impl Into<String>, recoverable: RecoverableAt) -> Self {
        RiegeliError::DataLoss {
            reason: reason.into(),
            recoverable,
        }
    }

    pub fn truncated(reason: impl Into<String>, recoverable: RecoverableAt) -> Self {
        RiegeliError::Truncated {
            reason: reason.into(),
            recoverable,
        }
    }
}

pub type Result<T> = std::result::Result<T, RiegeliError>;
