use thiserror::Error;

/// Failures with dedicated handling paths. Missing data is never one of
/// these: it flows through the attribute maps as `None`.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// One submitted computation would be too large for the backend.
    /// Raised at plan time; fixed by raising the batch count, never retried.
    #[error("batch of {points} points exceeds the backend quota of {limit}; increase the batch count")]
    QuotaExceeded { points: usize, limit: usize },

    /// The acquisition date cannot be parsed out of an encoded scene
    /// identifier. The offending scene is skipped, processing continues.
    #[error("cannot parse an acquisition date from scene identifier '{id}'")]
    MalformedSceneId { id: String },

    /// Scenes handed to one composite sit on different grids. Resampling is
    /// out of scope, so this is a hard error for the batch.
    #[error("scene '{id}' is not aligned to the composite grid")]
    GridMismatch { id: String },
}
