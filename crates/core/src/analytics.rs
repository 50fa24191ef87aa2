//! Chart-ready rows for the post-exam analytics view.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{QuestionIndex, QuestionRecord, QuestionType};

/// Lower bound of the plotted look-away axis, in seconds.
pub const CHART_MIN_SECS: u32 = 1;
/// Upper bound of the plotted look-away axis, in seconds.
pub const CHART_MAX_SECS: u32 = 15;

/// One x-axis point: look-away time split into per-type series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookAwayChartRow {
    pub label: String,
    pub question: QuestionIndex,
    pub question_type: QuestionType,
    pub theoretical_secs: u32,
    pub numerical_secs: u32,
}

/// Build one row per stored record, ordered by question.
///
/// Look-away time is clamped into the plotted range; the row's value goes to the
/// series of its type, unclassified questions plot zero in both.
#[must_use]
pub fn chart_rows(records: &BTreeMap<QuestionIndex, QuestionRecord>) -> Vec<LookAwayChartRow> {
    records
        .values()
        .map(|record| {
            let secs = record
                .look_away_secs()
                .clamp(CHART_MIN_SECS, CHART_MAX_SECS);
            let (theoretical_secs, numerical_secs) = match record.question_type() {
                QuestionType::Theoretical => (secs, 0),
                QuestionType::Numerical => (0, secs),
                QuestionType::Unclassified => (0, 0),
            };
            LookAwayChartRow {
                label: format!("Q{}", u64::from(record.question().value()) + 1),
                question: record.question(),
                question_type: record.question_type(),
                theoretical_secs,
                numerical_secs,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: u32, ty: QuestionType, secs: u32) -> (QuestionIndex, QuestionRecord) {
        let idx = QuestionIndex::new(index);
        (idx, QuestionRecord::from_persisted(idx, ty, secs, None))
    }

    #[test]
    fn rows_are_clamped_and_split_by_type() {
        let records: BTreeMap<_, _> = [
            record(0, QuestionType::Theoretical, 0),
            record(1, QuestionType::Numerical, 40),
            record(2, QuestionType::Unclassified, 7),
        ]
        .into_iter()
        .collect();

        let rows = chart_rows(&records);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].label, "Q1");
        assert_eq!(rows[0].theoretical_secs, 1);
        assert_eq!(rows[1].numerical_secs, 15);
        assert_eq!(rows[1].theoretical_secs, 0);
        assert_eq!((rows[2].theoretical_secs, rows[2].numerical_secs), (0, 0));
    }

    #[test]
    fn no_records_no_rows() {
        assert!(chart_rows(&BTreeMap::new()).is_empty());
    }
}
