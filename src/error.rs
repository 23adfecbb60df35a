//! Error taxonomy for pipeline construction and audio I/O.
//!
//! Runtime degeneracies (silent analyzer reads, zero-sum stack positions,
//! out-of-disk drag input) are not errors and never surface here; they are
//! handled in place by skipping, zeroing, or clamping. Everything in this
//! module is fatal and raised before the tick timer starts.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal pipeline setup errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed configuration (empty track list, bad resolution, zero rate).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An audio asset failed to decode. Construction aborts; no partial
    /// pipeline is started.
    #[error("failed to load audio asset {}", path.display())]
    AssetLoad {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// Audio device or stream setup failure.
    #[error("audio device error: {0}")]
    Audio(String),
}
