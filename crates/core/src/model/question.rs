use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::QuestionIndex;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("option {0} is blank")]
    BlankOption(usize),

    #[error("correct option {0:?} is not one of the options")]
    CorrectOptionMissing(String),
}

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

/// Semantic category of a question, as labeled by the question classifier.
///
/// Starts as `Unclassified` and moves at most once to a concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuestionType {
    #[default]
    Unclassified,
    Theoretical,
    Numerical,
}

impl QuestionType {
    /// Parses a classifier label. Returns `None` for labels this exam does not know.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Theoretical" => Some(Self::Theoretical),
            "Numerical" => Some(Self::Numerical),
            _ => None,
        }
    }

    /// The label used by the classifier and the persisted record layout.
    ///
    /// `Unclassified` maps to the empty string.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Unclassified => "",
            Self::Theoretical => "Theoretical",
            Self::Numerical => "Numerical",
        }
    }

    #[must_use]
    pub fn is_classified(self) -> bool {
        !matches!(self, Self::Unclassified)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclassified => f.write_str("Unclassified"),
            other => f.write_str(other.label()),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    index: QuestionIndex,
    text: String,
    options: Vec<String>,
    correct_option: String,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, fewer than two options are
    /// given, an option is blank, or the correct option is not among the options.
    pub fn new(
        index: QuestionIndex,
        text: impl Into<String>,
        options: Vec<String>,
        correct_option: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        let correct_option = correct_option.into();

        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        if let Some(pos) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::BlankOption(pos));
        }
        if !options.contains(&correct_option) {
            return Err(QuestionError::CorrectOptionMissing(correct_option));
        }

        Ok(Self {
            index,
            text,
            options,
            correct_option,
        })
    }

    #[must_use]
    pub fn index(&self) -> QuestionIndex {
        self.index
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.correct_option
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }

    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_option == answer
    }
}
