use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::catalog::QuestionCatalog;
use crate::model::ids::QuestionIndex;
use crate::model::question::QuestionType;
use crate::model::record::QuestionRecord;

/// Per-question line of an exam summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOutcome {
    pub question: QuestionIndex,
    pub question_type: QuestionType,
    pub look_away_secs: u32,
    pub selected_answer: Option<String>,
    pub correct: bool,
}

/// Immutable end-of-exam snapshot handed to analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamSummary {
    total_questions: u32,
    attempted: u32,
    unattempted: u32,
    score: u32,
    total_look_away_secs: u64,
    completed_at: DateTime<Utc>,
    outcomes: Vec<QuestionOutcome>,
}

impl ExamSummary {
    /// Build a summary from the catalog and the session's records.
    ///
    /// Questions without a record count as unattempted with zero look-away.
    /// Records for indices outside the catalog still contribute look-away time
    /// so the total always equals the sum over stored records.
    #[must_use]
    pub fn compute(
        catalog: &QuestionCatalog,
        records: &BTreeMap<QuestionIndex, QuestionRecord>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let mut attempted = 0_u32;
        let mut score = 0_u32;
        let mut outcomes = Vec::with_capacity(catalog.len());

        for question in catalog.iter() {
            let record = records.get(&question.index());
            let answer = record.and_then(QuestionRecord::selected_answer);
            let is_attempted = record.is_some_and(QuestionRecord::is_attempted);
            let correct = answer.is_some_and(|a| question.is_correct(a));

            if is_attempted {
                attempted = attempted.saturating_add(1);
            }
            if correct {
                score = score.saturating_add(1);
            }

            outcomes.push(QuestionOutcome {
                question: question.index(),
                question_type: record.map_or(QuestionType::Unclassified, |r| r.question_type()),
                look_away_secs: record.map_or(0, QuestionRecord::look_away_secs),
                selected_answer: answer.map(str::to_owned),
                correct,
            });
        }

        let total_look_away_secs = records
            .values()
            .map(|r| u64::from(r.look_away_secs()))
            .sum();
        let total_questions = u32::try_from(catalog.len()).unwrap_or(u32::MAX);

        Self {
            total_questions,
            attempted,
            unattempted: total_questions.saturating_sub(attempted),
            score,
            total_look_away_secs,
            completed_at,
            outcomes,
        }
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn attempted(&self) -> u32 {
        self.attempted
    }

    #[must_use]
    pub fn unattempted(&self) -> u32 {
        self.unattempted
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_look_away_secs(&self) -> u64 {
        self.total_look_away_secs
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn outcomes(&self) -> &[QuestionOutcome] {
        &self.outcomes
    }
}
