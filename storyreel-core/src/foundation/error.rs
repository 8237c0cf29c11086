/// Convenience result type used across storyreel.
pub type StoryreelResult<T> = Result<T, StoryreelError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Per-asset failures (missing background, character art, overlay, font,
/// audio) never surface here; they degrade through [`Resolution`] and are
/// only logged.
///
/// [`Resolution`]: crate::Resolution
#[derive(thiserror::Error, Debug)]
pub enum StoryreelError {
    /// The scene script is structurally invalid (missing required
    /// sequences or keys). Nothing is rendered.
    #[error("schema error: {0}")]
    Schema(String),

    /// Invalid user-provided configuration or render parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// The script produced zero render units.
    #[error("empty timeline: the script produced no renderable units")]
    EmptyTimeline,

    /// The final mux/encode step failed. The partial output file has
    /// already been removed when this is returned.
    #[error("encode error: {0}")]
    Encode(String),

    /// The render was abandoned through a [`CancelToken`](crate::pipeline::CancelToken).
    #[error("render cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoryreelError {
    /// Build a [`StoryreelError::Schema`] value.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Build a [`StoryreelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StoryreelError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
