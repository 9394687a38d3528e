/// Result alias used by the rendering core.
pub type SpindleResult<T> = Result<T, SpindleError>;

#[derive(thiserror::Error, Debug)]
pub enum SpindleError {
    /// Input rejected at the loading boundary.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Analysis data that breaks an ordering assumption mid-render.
    #[error("malformed analysis: {0}")]
    MalformedAnalysis(String),

    #[error("font error: {0}")]
    Font(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpindleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedAnalysis(msg.into())
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self::Font(msg.into())
    }
}
