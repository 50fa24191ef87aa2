use std::sync::Arc;

use proctor_core::Clock;
use proctor_core::alignment::{
    AlignmentReport, FrameSize, Landmark, NoticeLimiter, PreCheck, assess,
};

use crate::camera::FrameSource;
use crate::error::{CameraError, PresentationError};
use crate::notify::{Notification, Notifier};
use crate::presentation::{Lockdown, Presentation};

/// Drives the pre-exam check: permissions first, then face alignment.
pub struct PreCheckService {
    clock: Clock,
    notifier: Arc<dyn Notifier>,
    limiter: NoticeLimiter,
    gate: PreCheck,
}

impl PreCheckService {
    #[must_use]
    pub fn new(clock: Clock, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            clock,
            notifier,
            limiter: NoticeLimiter::new(),
            gate: PreCheck::default(),
        }
    }

    #[must_use]
    pub fn gate(&self) -> &PreCheck {
        &self.gate
    }

    #[must_use]
    pub fn ready_to_proceed(&self) -> bool {
        self.gate.ready_to_proceed()
    }

    /// Ask for camera access. Denial is reported and may be retried.
    pub async fn request_camera(&mut self, camera: &dyn FrameSource) -> bool {
        match camera.acquire().await {
            Ok(()) => {
                self.gate.camera_allowed = true;
                tracing::info!("camera allowed");
            }
            Err(err) => {
                self.gate.camera_allowed = false;
                tracing::warn!(error = %err, "camera request failed");
                self.notifier.notify(match err {
                    CameraError::PermissionDenied => Notification::camera_denied(),
                    _ => Notification::camera_unavailable(),
                });
            }
        }
        self.gate.camera_allowed
    }

    /// Ask for fullscreen and turn lockdown on once it is granted.
    pub async fn request_fullscreen(
        &mut self,
        presentation: &dyn Presentation,
        lockdown: &Lockdown,
    ) -> bool {
        match presentation.enter_fullscreen().await {
            Ok(()) => {
                self.gate.fullscreen_allowed = true;
                lockdown.set(true).await;
            }
            Err(err) => {
                self.gate.fullscreen_allowed = false;
                tracing::warn!(error = %err, "fullscreen request failed");
                if matches!(err, PresentationError::PermissionDenied) {
                    self.notifier.notify(Notification::fullscreen_denied());
                }
            }
        }
        self.gate.fullscreen_allowed
    }

    /// Assess one landmark frame and surface throttled guidance.
    pub fn observe(&mut self, faces: &[Vec<Landmark>], frame: FrameSize) -> &AlignmentReport {
        let report = assess(faces, frame);
        let now = self.clock.now();
        for notice in report.notices() {
            if self.limiter.allow(notice.id, now) {
                self.notifier.notify(notice.into());
            }
        }
        self.gate.observe(report);
        &self.gate.latest
    }

    /// Move a fixed clock forward. Used to replay landmark streams.
    pub fn advance_clock(&mut self, delta: chrono::Duration) {
        self.clock.advance(delta);
    }
}
