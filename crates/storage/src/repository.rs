use async_trait::async_trait;
use proctor_core::model::{ExamSessionId, QuestionIndex, QuestionRecord, QuestionType};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// All question records of one exam attempt, ordered by question.
pub type RecordSet = BTreeMap<QuestionIndex, QuestionRecord>;

/// Persisted shape of a question record.
///
/// Field names follow the durable layout shared with the analytics view:
/// `{questionid, type, lookawaytime, selectedAnswer}`. An unclassified type and a
/// missing answer are stored as empty strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecordRow {
    pub questionid: u32,
    #[serde(rename = "type", default)]
    pub question_type: String,
    #[serde(default, deserialize_with = "de_seconds")]
    pub lookawaytime: u32,
    #[serde(rename = "selectedAnswer", default)]
    pub selected_answer: String,
}

impl QuestionRecordRow {
    #[must_use]
    pub fn from_record(record: &QuestionRecord) -> Self {
        Self {
            questionid: record.question().value(),
            question_type: record.question_type().label().to_owned(),
            lookawaytime: record.look_away_secs(),
            selected_answer: record.selected_answer().unwrap_or_default().to_owned(),
        }
    }

    /// Convert the row back into a domain record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for an unknown type label.
    pub fn into_record(self) -> Result<QuestionRecord, StorageError> {
        let question_type = if self.question_type.is_empty() {
            QuestionType::Unclassified
        } else {
            QuestionType::from_label(&self.question_type).ok_or_else(|| {
                StorageError::Serialization(format!("invalid type: {}", self.question_type))
            })?
        };
        Ok(QuestionRecord::from_persisted(
            QuestionIndex::new(self.questionid),
            question_type,
            self.lookawaytime,
            Some(self.selected_answer),
        ))
    }
}

// Older snapshots stored fractional seconds.
fn de_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() || raw < 0.0 {
        return Err(de::Error::custom(format!("invalid lookawaytime: {raw}")));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let secs = raw.round().min(f64::from(u32::MAX)) as u32;
    Ok(secs)
}

/// Encode a record set as a JSON object keyed by question index.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails.
pub fn encode_records(records: &RecordSet) -> Result<String, StorageError> {
    let rows: BTreeMap<String, QuestionRecordRow> = records
        .iter()
        .map(|(index, record)| (index.to_string(), QuestionRecordRow::from_record(record)))
        .collect();
    serde_json::to_string(&rows).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Decode a record set written by `encode_records`.
///
/// Keys that are not question indices are skipped.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON, an unknown type, or
/// a key that disagrees with its row's `questionid`.
pub fn decode_records(raw: &str) -> Result<RecordSet, StorageError> {
    let rows: BTreeMap<String, serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;

    let mut out = RecordSet::new();
    for (key, value) in rows {
        let Ok(index) = key.parse::<QuestionIndex>() else {
            continue;
        };
        let row: QuestionRecordRow = serde_json::from_value(value)
            .map_err(|e| StorageError::Serialization(format!("record {key}: {e}")))?;
        if row.questionid != index.value() {
            return Err(StorageError::Serialization(format!(
                "record {key} has questionid {}",
                row.questionid
            )));
        }
        out.insert(index, row.into_record()?);
    }
    Ok(out)
}

/// Durable per-attempt record set.
#[async_trait]
pub trait ExamRecordRepository: Send + Sync {
    /// Load the records of a session. Missing sessions load as empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored data cannot be read or decoded.
    async fn load_records(&self, session: ExamSessionId) -> Result<RecordSet, StorageError>;

    /// Replace the stored records of a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be stored.
    async fn save_records(
        &self,
        session: ExamSessionId,
        records: &RecordSet,
    ) -> Result<(), StorageError>;

    /// Remove every record of a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn clear_records(&self, session: ExamSessionId) -> Result<(), StorageError>;
}

/// Durable lockdown (exam-mode) flag.
#[async_trait]
pub trait ExamModeRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be read.
    async fn exam_mode(&self) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the flag cannot be stored.
    async fn set_exam_mode(&self, active: bool) -> Result<(), StorageError>;
}

/// In-memory repository for tests and prototyping.
///
/// Stores the encoded JSON so the persisted layout is exercised end to end.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<Mutex<HashMap<ExamSessionId, String>>>,
    exam_mode: Arc<Mutex<bool>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored JSON for a session, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn raw_records(&self, session: ExamSessionId) -> Result<Option<String>, StorageError> {
        let guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&session).cloned())
    }
}

#[async_trait]
impl ExamRecordRepository for InMemoryRepository {
    async fn load_records(&self, session: ExamSessionId) -> Result<RecordSet, StorageError> {
        match self.raw_records(session)? {
            Some(raw) => decode_records(&raw),
            None => Ok(RecordSet::new()),
        }
    }

    async fn save_records(
        &self,
        session: ExamSessionId,
        records: &RecordSet,
    ) -> Result<(), StorageError> {
        let encoded = encode_records(records)?;
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(session, encoded);
        Ok(())
    }

    async fn clear_records(&self, session: ExamSessionId) -> Result<(), StorageError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&session);
        Ok(())
    }
}

#[async_trait]
impl ExamModeRepository for InMemoryRepository {
    async fn exam_mode(&self) -> Result<bool, StorageError> {
        let guard = self
            .exam_mode
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(*guard)
    }

    async fn set_exam_mode(&self, active: bool) -> Result<(), StorageError> {
        let mut guard = self
            .exam_mode
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = active;
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub records: Arc<dyn ExamRecordRepository>,
    pub exam_mode: Arc<dyn ExamModeRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let records: Arc<dyn ExamRecordRepository> = Arc::new(repo.clone());
        let exam_mode: Arc<dyn ExamModeRepository> = Arc::new(repo);
        Self { records, exam_mode }
    }
}
