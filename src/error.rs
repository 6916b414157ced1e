use thiserror::Error;
use uuid::Uuid;

pub type MockupResult<T> = std::result::Result<T, MockupError>;

#[derive(Debug, Error)]
pub enum MockupError {
    #[error("unsupported media kind: {0}")]
    UnsupportedMediaKind(String),

    #[error("generation failed: {0:#}")]
    GenerationFailed(#[source] anyhow::Error),

    #[error("edit failed: {0:#}")]
    EditFailed(#[source] anyhow::Error),

    #[error("no image returned by the model")]
    NoImageReturned,

    #[error("invalid image payload: {0}")]
    InvalidPayload(String),

    #[error("an edit session is already open")]
    SessionAlreadyOpen,

    #[error("no edit session is open")]
    NoOpenSession,

    #[error("an edit is already in progress")]
    EditInProgress,

    #[error("no edit is in progress")]
    NoEditInProgress,

    #[error("edit instruction is empty")]
    EmptyInstruction,

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("image {0} not found in gallery")]
    ImageNotFound(Uuid),

    #[error("no logo uploaded")]
    NoLogo,

    #[error("no products selected")]
    EmptySelection,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MockupError {
    /// Failures the user can retry with the same or a revised request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MockupError::GenerationFailed(_)
                | MockupError::EditFailed(_)
                | MockupError::NoImageReturned
        )
    }
}
