use async_trait::async_trait;
use proctor_core::analytics::{LookAwayChartRow, chart_rows};
use proctor_core::model::{ExamSessionId, ExamSummary};
use serde::Serialize;
use storage::repository::RecordSet;
use tokio::sync::mpsc;

/// Everything the analytics view needs once an attempt is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamReport {
    pub session: ExamSessionId,
    pub summary: ExamSummary,
    pub chart: Vec<LookAwayChartRow>,
}

impl ExamReport {
    #[must_use]
    pub fn new(session: ExamSessionId, summary: ExamSummary, records: &RecordSet) -> Self {
        Self {
            session,
            summary,
            chart: chart_rows(records),
        }
    }
}

/// Receives the final report of a confirmed attempt.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn publish(&self, report: ExamReport);
}

/// Forwards reports to a channel read by the analytics view.
#[derive(Debug, Clone)]
pub struct ChannelAnalyticsSink {
    tx: mpsc::UnboundedSender<ExamReport>,
}

impl ChannelAnalyticsSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExamReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AnalyticsSink for ChannelAnalyticsSink {
    async fn publish(&self, report: ExamReport) {
        tracing::info!(
            session = %report.session,
            score = report.summary.score(),
            total_look_away_secs = report.summary.total_look_away_secs(),
            "exam report published"
        );
        if self.tx.send(report).is_err() {
            tracing::warn!("analytics receiver dropped");
        }
    }
}
