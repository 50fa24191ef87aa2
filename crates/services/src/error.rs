//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;

/// Errors from the remote attention and question-type classifiers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClassifierError {
    #[error("classifier request timed out")]
    Timeout,
    #[error("classifier request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("unexpected classifier response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ClassifierError {
    /// The service answered, but not in the agreed shape.
    #[must_use]
    pub fn is_unexpected_response(&self) -> bool {
        matches!(self, Self::UnexpectedResponse(_))
    }
}

/// Errors from the camera collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("frame capture failed: {0}")]
    Capture(String),
}

/// Errors from the fullscreen presentation collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PresentationError {
    #[error("fullscreen permission denied")]
    PermissionDenied,
    #[error("fullscreen is not supported")]
    Unsupported,
    #[error("fullscreen change failed: {0}")]
    Failed(String),
}

/// Errors emitted by the exam controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("question {0} is not in the catalog")]
    UnknownQuestion(proctor_core::model::QuestionIndex),
}
