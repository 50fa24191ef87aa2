use proctor_core::alignment::{NoticeId, PreCheckNotice};
use proctor_core::model::QuestionIndex;
use proctor_core::warning::{Severity, Threshold, Warning};
use serde::Serialize;
use tokio::sync::mpsc;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum NotificationKind {
    LookAway {
        question: QuestionIndex,
        threshold: Threshold,
    },
    FullscreenExited,
    FullscreenDenied,
    CameraDenied,
    CameraUnavailable,
    ClassifierResponse,
    Alignment(NoticeId),
}

/// A user-facing message raised by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn new(severity: Severity, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn fullscreen_exited() -> Self {
        Self::new(
            Severity::Warning,
            NotificationKind::FullscreenExited,
            "You exited fullscreen. Please return to fullscreen to continue the exam.",
        )
    }

    pub(crate) fn fullscreen_denied() -> Self {
        Self::new(
            Severity::Error,
            NotificationKind::FullscreenDenied,
            "Fullscreen permission denied. Please allow fullscreen to continue.",
        )
    }

    pub(crate) fn camera_denied() -> Self {
        Self::new(
            Severity::Error,
            NotificationKind::CameraDenied,
            "Camera permission denied. Please allow camera access.",
        )
    }

    pub(crate) fn camera_unavailable() -> Self {
        Self::new(
            Severity::Error,
            NotificationKind::CameraUnavailable,
            "Camera unavailable. Please check that no other app is using it.",
        )
    }

    pub(crate) fn classifier_response() -> Self {
        Self::new(
            Severity::Error,
            NotificationKind::ClassifierResponse,
            "Unexpected response from the server.",
        )
    }
}

impl From<Warning> for Notification {
    fn from(warning: Warning) -> Self {
        Self::new(
            warning.severity,
            NotificationKind::LookAway {
                question: warning.question,
                threshold: warning.threshold,
            },
            warning.message,
        )
    }
}

impl From<PreCheckNotice> for Notification {
    fn from(notice: PreCheckNotice) -> Self {
        Self::new(
            notice.severity,
            NotificationKind::Alignment(notice.id),
            notice.message,
        )
    }
}

/// Receives notifications for display.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to an unbounded channel drained by the presentation layer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!(kind = ?notification.kind, message = %notification.message, "notify");
        if self.tx.send(notification).is_err() {
            tracing::debug!("notification receiver dropped");
        }
    }
}
