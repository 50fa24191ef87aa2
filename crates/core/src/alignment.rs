//! Pre-exam camera check.
//!
//! Works on face-mesh landmarks in normalized `[0, 1]` coordinates. A single
//! face must be centered in the frame (pixel tolerances below) and must not be
//! turned: the outer eye-corner span relative to face width drops when the head
//! rotates.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::warning::Severity;

pub const OFFSET_X_TOLERANCE_PX: f32 = 25.0;
pub const OFFSET_Y_TOLERANCE_PX: f32 = 35.0;
pub const TURN_RATIO_THRESHOLD: f32 = 0.56;

/// Face-mesh indices of the outer eye corners.
pub const LEFT_EYE_OUTER: usize = 33;
pub const RIGHT_EYE_OUTER: usize = 263;

/// Minimum gap between two notices with the same id.
pub const NOTICE_INTERVAL_MS: i64 = 1500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSize {
    pub width: f32,
    pub height: f32,
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 480.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveHint {
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignmentReport {
    pub face_detected: bool,
    pub multiple_faces: bool,
    pub aligned: bool,
    pub turned_away: bool,
    pub offset_px: Option<(f32, f32)>,
    pub eye_to_face_ratio: Option<f32>,
    pub hints: Vec<MoveHint>,
}

/// Assess one frame's detected faces.
#[must_use]
pub fn assess(faces: &[Vec<Landmark>], frame: FrameSize) -> AlignmentReport {
    let detected: Vec<&Vec<Landmark>> = faces.iter().filter(|f| !f.is_empty()).collect();

    match detected.as_slice() {
        [] => AlignmentReport::default(),
        [landmarks] => assess_single(landmarks, frame),
        _ => AlignmentReport {
            face_detected: true,
            multiple_faces: true,
            ..AlignmentReport::default()
        },
    }
}

fn assess_single(landmarks: &[Landmark], frame: FrameSize) -> AlignmentReport {
    let (min_x, max_x, min_y, max_y) = landmarks.iter().fold(
        (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
        |(min_x, max_x, min_y, max_y), p| {
            (min_x.min(p.x), max_x.max(p.x), min_y.min(p.y), max_y.max(p.y))
        },
    );

    let face_width = (max_x - min_x) * frame.width;
    let center_x = (min_x + max_x) / 2.0;
    let offset_x = center_x * frame.width - frame.width / 2.0;
    let offset_y = (min_y + max_y) / 2.0 * frame.height - frame.height / 2.0;

    let eye_span = match (landmarks.get(LEFT_EYE_OUTER), landmarks.get(RIGHT_EYE_OUTER)) {
        (Some(left), Some(right)) => (left.x - right.x).abs() * frame.width,
        _ => half_split_span(landmarks, center_x) * frame.width,
    };
    let ratio = if face_width > 0.0 {
        eye_span / face_width
    } else {
        0.0
    };
    let turned_away = ratio < TURN_RATIO_THRESHOLD;

    let mut hints = Vec::new();
    if !turned_away {
        if offset_x.abs() > OFFSET_X_TOLERANCE_PX {
            hints.push(if offset_x > 0.0 {
                MoveHint::Left
            } else {
                MoveHint::Right
            });
        }
        if offset_y.abs() > OFFSET_Y_TOLERANCE_PX {
            hints.push(if offset_y > 0.0 {
                MoveHint::Up
            } else {
                MoveHint::Down
            });
        }
    }

    AlignmentReport {
        face_detected: true,
        multiple_faces: false,
        aligned: !turned_away && hints.is_empty(),
        turned_away,
        offset_px: Some((offset_x, offset_y)),
        eye_to_face_ratio: Some(ratio),
        hints,
    }
}

/// Distance between the mean x of points left and right of the face center.
fn half_split_span(landmarks: &[Landmark], center_x: f32) -> f32 {
    let mean = |pred: &dyn Fn(f32) -> bool| {
        let (sum, count) = landmarks
            .iter()
            .filter(|p| pred(p.x))
            .fold((0.0_f32, 0_u32), |(s, c), p| (s + p.x, c + 1));
        sum / count.max(1) as f32
    };
    (mean(&|x| x > center_x) - mean(&|x| x < center_x)).abs()
}

//
// ─── NOTICES ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NoticeId {
    NoFace,
    MultipleFaces,
    MoveX,
    MoveY,
    Rotated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreCheckNotice {
    pub id: NoticeId,
    pub severity: Severity,
    pub message: &'static str,
}

impl AlignmentReport {
    /// Guidance to show the candidate for this frame.
    #[must_use]
    pub fn notices(&self) -> Vec<PreCheckNotice> {
        if !self.face_detected {
            return vec![PreCheckNotice {
                id: NoticeId::NoFace,
                severity: Severity::Warning,
                message: "No face detected. Please look at the camera.",
            }];
        }
        if self.multiple_faces {
            return vec![PreCheckNotice {
                id: NoticeId::MultipleFaces,
                severity: Severity::Error,
                message: "Multiple faces detected. Only one person allowed!",
            }];
        }
        if self.turned_away {
            return vec![PreCheckNotice {
                id: NoticeId::Rotated,
                severity: Severity::Error,
                message: "Please face the camera directly (don't turn your head).",
            }];
        }
        self.hints
            .iter()
            .map(|hint| {
                let (id, message) = match hint {
                    MoveHint::Left => (NoticeId::MoveX, "Move left"),
                    MoveHint::Right => (NoticeId::MoveX, "Move right"),
                    MoveHint::Up => (NoticeId::MoveY, "Move up"),
                    MoveHint::Down => (NoticeId::MoveY, "Move down"),
                };
                PreCheckNotice {
                    id,
                    severity: Severity::Warning,
                    message,
                }
            })
            .collect()
    }
}

/// Lets a notice through at most once per `NOTICE_INTERVAL_MS` per id.
#[derive(Debug, Default)]
pub struct NoticeLimiter {
    last_shown: HashMap<NoticeId, DateTime<Utc>>,
}

impl NoticeLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `now` if the notice may be shown.
    pub fn allow(&mut self, id: NoticeId, now: DateTime<Utc>) -> bool {
        let interval = Duration::milliseconds(NOTICE_INTERVAL_MS);
        match self.last_shown.get(&id) {
            Some(last) if now - *last <= interval => false,
            _ => {
                self.last_shown.insert(id, now);
                true
            }
        }
    }
}

//
// ─── GATE ──────────────────────────────────────────────────────────────────────
//

/// Everything that must hold before the exam may start.
#[derive(Debug, Clone, Default)]
pub struct PreCheck {
    pub camera_allowed: bool,
    pub fullscreen_allowed: bool,
    pub latest: AlignmentReport,
}

impl PreCheck {
    pub fn observe(&mut self, report: AlignmentReport) {
        self.latest = report;
    }

    #[must_use]
    pub fn ready_to_proceed(&self) -> bool {
        self.camera_allowed
            && self.fullscreen_allowed
            && self.latest.aligned
            && !self.latest.multiple_faces
    }
}
