// THEORY:
// Every stage of the counting pipeline is a pure transform over buffers the
// pipeline allocates itself, so the set of things that can go wrong is small:
// the caller hands us something that is not an image, the configuration is
// nonsensical, or the machine cannot hold the O(width * height) working set.
// All of them are reported through one error type so that `segment` either
// returns a complete `DetectionResult` or nothing at all.

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Stages are only defined for positive dimensions.
    #[error("invalid image dimensions {width}x{height}")]
    InvalidImage { width: u32, height: u32 },

    #[error("RGBA buffer has {actual} bytes, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    /// A working buffer could not be reserved.
    #[error("failed to allocate working buffer: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(&'static str),

    /// The batch worker pool stopped accepting or answering tasks.
    #[error("counting worker is no longer available")]
    WorkerUnavailable,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Allocates a zeroed byte buffer of `len` bytes, surfacing allocation
/// failure as `PipelineError::Allocation` instead of aborting.
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, 0);
    Ok(buffer)
}
