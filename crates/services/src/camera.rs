use async_trait::async_trait;

use crate::error::CameraError;

/// One encoded camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
    mime: &'static str,
}

impl Frame {
    /// Wrap a JPEG-encoded frame.
    #[must_use]
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "image/jpeg",
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn mime(&self) -> &'static str {
        self.mime
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Camera collaborator owned by the host.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Ask for camera access and start the stream.
    ///
    /// # Errors
    ///
    /// Returns `CameraError::PermissionDenied` when the user refuses access.
    async fn acquire(&self) -> Result<(), CameraError>;

    /// Grab the current frame.
    ///
    /// # Errors
    ///
    /// Returns `CameraError` when no frame is available.
    async fn capture(&self) -> Result<Frame, CameraError>;

    /// Stop the stream. Must be safe to call more than once.
    fn release(&self);
}
