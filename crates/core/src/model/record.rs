use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionIndex;
use crate::model::question::QuestionType;

/// Session-scoped telemetry for one question.
///
/// Every field has a value from creation; nothing is conditionally absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    question: QuestionIndex,
    question_type: QuestionType,
    look_away_secs: u32,
    selected_answer: Option<String>,
}

impl QuestionRecord {
    /// A fresh record: unclassified, no look-away time, no answer.
    #[must_use]
    pub fn new(question: QuestionIndex) -> Self {
        Self {
            question,
            question_type: QuestionType::Unclassified,
            look_away_secs: 0,
            selected_answer: None,
        }
    }

    /// Rehydrate a record from persisted storage.
    ///
    /// An empty answer string is treated as no answer.
    #[must_use]
    pub fn from_persisted(
        question: QuestionIndex,
        question_type: QuestionType,
        look_away_secs: u32,
        selected_answer: Option<String>,
    ) -> Self {
        Self {
            question,
            question_type,
            look_away_secs,
            selected_answer: selected_answer.filter(|a| !a.is_empty()),
        }
    }

    #[must_use]
    pub fn question(&self) -> QuestionIndex {
        self.question
    }

    #[must_use]
    pub fn question_type(&self) -> QuestionType {
        self.question_type
    }

    #[must_use]
    pub fn look_away_secs(&self) -> u32 {
        self.look_away_secs
    }

    #[must_use]
    pub fn selected_answer(&self) -> Option<&str> {
        self.selected_answer.as_deref()
    }

    #[must_use]
    pub fn is_attempted(&self) -> bool {
        self.selected_answer.as_deref().is_some_and(|a| !a.is_empty())
    }

    /// Set the type if it is still unclassified.
    ///
    /// Returns `true` if the write happened. Assigning `Unclassified` is a no-op.
    pub fn assign_type(&mut self, question_type: QuestionType) -> bool {
        if self.question_type.is_classified() || !question_type.is_classified() {
            return false;
        }
        self.question_type = question_type;
        true
    }

    /// Add look-away seconds. Saturates instead of wrapping.
    pub fn add_look_away(&mut self, secs: u32) {
        self.look_away_secs = self.look_away_secs.saturating_add(secs);
    }

    /// Record the chosen option; the last write wins.
    pub fn select_answer(&mut self, option: impl Into<String>) {
        let option = option.into();
        self.selected_answer = if option.is_empty() { None } else { Some(option) };
    }
}
