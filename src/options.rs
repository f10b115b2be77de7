//! Reader-wide configuration, mirroring the teacher's `PackOptions`.

use crate::chunk_decoder::projection::FieldProjection;
use crate::chunk_reader::SkippedRegion;

/// Callback invoked once per recovered region. Returning `false` asks the
/// reader to re-surface the original error instead of continuing.
pub type RecoveryCallback = Box<dyn FnMut(&SkippedRegion) -> bool>;

/// Options controlling a [`crate::record_reader::RecordReader`].
pub struct ReaderOptions {
    /// Whether a missing `FileMetadata` chunk is tolerated (default
    /// metadata is returned) instead of treated as an error.
    pub tolerate_missing_metadata: bool,
    /// Field projection applied to transposed chunks at open time. `None`
    /// means "all fields".
    pub projection: Option<FieldProjection>,
    /// Invoked by `RecordReader::recover` once a region has been
    /// identified; absent means every recoverable error is surfaced to the
    /// caller without an automatic retry policy.
    pub recovery_callback: Option<RecoveryCallback>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            tolerate_missing_metadata: true,
            projection: None,
            recovery_callback: None,
        }
    }
}

impl std::fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("tolerate_missing_metadata", &self.tolerate_missing_metadata)
            .field("projection", &self.projection)
            .field("recovery_callback", &self.recovery_callback.is_some())
            .finish()
    }
}

impl ReaderOptions {
    pub fn with_projection(mut self, projection: FieldProjection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_recovery_callback(mut self, callback: RecoveryCallback) -> Self {
        self.recovery_callback = Some(callback);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_tolerate_missing_metadata() {
        let opts = ReaderOptions::default();
        assert!(opts.tolerate_missing_metadata);
        assert!(opts.projection.is_none());
    }
}
