//! Threshold warnings for accumulated look-away time.
//!
//! Per activation the policy walks `Idle -> MidFired -> HighFired` and never
//! back. Thresholds are checked on whole seconds, each fires at most once per
//! activation, and `reset_for` starts over when the active question changes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::model::{QuestionIndex, QuestionType};

pub const MID_THRESHOLD_SECS: u32 = 5;
pub const HIGH_THRESHOLD_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Threshold {
    Mid,
    High,
}

impl Threshold {
    #[must_use]
    pub fn secs(self) -> u32 {
        match self {
            Self::Mid => MID_THRESHOLD_SECS,
            Self::High => HIGH_THRESHOLD_SECS,
        }
    }

    /// The warning to show for this threshold, if the question type is eligible.
    ///
    /// `Unclassified` questions never warn. The mid threshold is for theoretical
    /// questions only.
    #[must_use]
    pub fn warning(self, question: QuestionIndex, question_type: QuestionType) -> Option<Warning> {
        let (severity, message) = match (self, question_type) {
            (Self::Mid, QuestionType::Theoretical) => (
                Severity::Info,
                "Please focus on the screen! (Theoretical Question)",
            ),
            (Self::High, QuestionType::Theoretical) => (
                Severity::Info,
                "High Warning! Please focus on the screen! (Theoretical Question)",
            ),
            (Self::High, QuestionType::Numerical) => (
                Severity::Error,
                "Please focus on the screen! (Numerical Question)",
            ),
            _ => return None,
        };
        Some(Warning {
            question,
            threshold: self,
            severity,
            message,
        })
    }
}

/// How loudly a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A look-away warning ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub question: QuestionIndex,
    pub threshold: Threshold,
    pub severity: Severity,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningState {
    #[default]
    Idle,
    MidFired,
    HighFired,
}

#[derive(Debug, Default)]
pub struct WarningPolicy {
    active: Option<QuestionIndex>,
    state: WarningState,
    fired: HashMap<(QuestionIndex, Threshold), DateTime<Utc>>,
}

impl WarningPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> WarningState {
        self.state
    }

    #[must_use]
    pub fn active(&self) -> Option<QuestionIndex> {
        self.active
    }

    /// Start a fresh activation for `question`.
    pub fn reset_for(&mut self, question: QuestionIndex) {
        self.fired.retain(|(q, _), _| *q != question);
        self.active = Some(question);
        self.state = WarningState::Idle;
    }

    /// Stop evaluating until the next `reset_for`.
    pub fn clear(&mut self) {
        self.active = None;
        self.state = WarningState::Idle;
    }

    /// Feed the accumulated look-away seconds for `question`.
    ///
    /// Returns the threshold crossed by this value, at most once per threshold.
    /// A value that skips straight past the high threshold fires only `High`.
    pub fn on_elapsed(
        &mut self,
        question: QuestionIndex,
        elapsed_secs: u32,
        now: DateTime<Utc>,
    ) -> Option<Threshold> {
        if self.active != Some(question) {
            return None;
        }

        let crossed = match self.state {
            WarningState::HighFired => None,
            WarningState::Idle | WarningState::MidFired if elapsed_secs >= HIGH_THRESHOLD_SECS => {
                Some(Threshold::High)
            }
            WarningState::Idle if elapsed_secs >= MID_THRESHOLD_SECS => Some(Threshold::Mid),
            _ => None,
        }?;

        self.state = match crossed {
            Threshold::Mid => WarningState::MidFired,
            Threshold::High => WarningState::HighFired,
        };
        self.fired.insert((question, crossed), now);
        Some(crossed)
    }

    /// When `threshold` last fired for `question` in its current activation.
    #[must_use]
    pub fn last_fired(&self, question: QuestionIndex, threshold: Threshold) -> Option<DateTime<Utc>> {
        self.fired.get(&(question, threshold)).copied()
    }
}
