use std::sync::Arc;

use proctor_core::model::{ExamSessionId, QuestionIndex, QuestionRecord, QuestionType};
use storage::repository::{ExamRecordRepository, RecordSet, StorageError};
use tokio::sync::Mutex;

/// Per-attempt question records with write-through persistence.
///
/// The in-memory set is authoritative. Every mutation persists the whole set
/// while still holding the lock, so snapshots reach the repository in mutation
/// order. A failed write is logged and the next mutation retries it.
pub struct ExamSessionStore {
    session: ExamSessionId,
    repo: Arc<dyn ExamRecordRepository>,
    records: Mutex<RecordSet>,
}

impl ExamSessionStore {
    #[must_use]
    pub fn new(session: ExamSessionId, repo: Arc<dyn ExamRecordRepository>) -> Self {
        Self {
            session,
            repo,
            records: Mutex::new(RecordSet::new()),
        }
    }

    #[must_use]
    pub fn session(&self) -> ExamSessionId {
        self.session
    }

    /// Replace the in-memory set with what the repository holds for this session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored records cannot be read.
    pub async fn load(&self) -> Result<usize, StorageError> {
        let loaded = self.repo.load_records(self.session).await?;
        let mut records = self.records.lock().await;
        *records = loaded;
        tracing::debug!(session = %self.session, count = records.len(), "records loaded");
        Ok(records.len())
    }

    /// Forget every record of this attempt, in memory and in the repository.
    pub async fn reset(&self) {
        let mut records = self.records.lock().await;
        records.clear();
        if let Err(err) = self.repo.clear_records(self.session).await {
            tracing::warn!(session = %self.session, error = %err, "failed to clear records");
        }
    }

    /// The record for `question`, created empty if absent.
    pub async fn get(&self, question: QuestionIndex) -> QuestionRecord {
        self.mutate(question, |record| record.clone()).await
    }

    /// Store the selected option. An empty option clears the answer.
    pub async fn record_answer(&self, question: QuestionIndex, option: &str) {
        self.mutate(question, |record| record.select_answer(option))
            .await;
    }

    /// Add look-away seconds to `question`. Returns the new total.
    pub async fn checkpoint_look_away(&self, question: QuestionIndex, secs: u32) -> u32 {
        self.mutate(question, |record| {
            record.add_look_away(secs);
            record.look_away_secs()
        })
        .await
    }

    /// Set the type of `question` unless it is already classified.
    ///
    /// Returns the type the record holds afterwards.
    pub async fn assign_type(
        &self,
        question: QuestionIndex,
        question_type: QuestionType,
    ) -> QuestionType {
        self.mutate(question, |record| {
            record.assign_type(question_type);
            record.question_type()
        })
        .await
    }

    /// Type of `question` without creating a record.
    pub async fn question_type(&self, question: QuestionIndex) -> QuestionType {
        self.records
            .lock()
            .await
            .get(&question)
            .map_or(QuestionType::Unclassified, QuestionRecord::question_type)
    }

    /// Snapshot of all records.
    pub async fn records(&self) -> RecordSet {
        self.records.lock().await.clone()
    }

    async fn mutate<R>(
        &self,
        question: QuestionIndex,
        apply: impl FnOnce(&mut QuestionRecord) -> R,
    ) -> R {
        let mut records = self.records.lock().await;
        let record = records
            .entry(question)
            .or_insert_with(|| QuestionRecord::new(question));
        let out = apply(record);
        if let Err(err) = self.repo.save_records(self.session, &records).await {
            tracing::warn!(session = %self.session, error = %err, "failed to persist records");
        }
        out
    }
}
