use async_trait::async_trait;
use chrono::Utc;
use proctor_core::model::ExamSessionId;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{
    ExamModeRepository, ExamRecordRepository, RecordSet, StorageError, decode_records,
    encode_records,
};

const EXAM_MODE_KEY: &str = "exam_mode";

fn records_key(session: ExamSessionId) -> String {
    format!("records:{session}")
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl SqliteRepository {
    async fn get_value(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM exam_state WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|row| {
            row.try_get::<String, _>("value")
                .map_err(|e| StorageError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn put_value(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO exam_state (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}

#[async_trait]
impl ExamRecordRepository for SqliteRepository {
    async fn load_records(&self, session: ExamSessionId) -> Result<RecordSet, StorageError> {
        match self.get_value(&records_key(session)).await? {
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
        self.put_value(&records_key(session), &encoded).await
    }

    async fn clear_records(&self, session: ExamSessionId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM exam_state WHERE key = ?1")
            .bind(records_key(session))
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}

#[async_trait]
impl ExamModeRepository for SqliteRepository {
    async fn exam_mode(&self) -> Result<bool, StorageError> {
        match self.get_value(EXAM_MODE_KEY).await?.as_deref() {
            None | Some("false") => Ok(false),
            Some("true") => Ok(true),
            Some(other) => Err(StorageError::Serialization(format!(
                "invalid exam_mode: {other}"
            ))),
        }
    }

    async fn set_exam_mode(&self, active: bool) -> Result<(), StorageError> {
        self.put_value(EXAM_MODE_KEY, if active { "true" } else { "false" })
            .await
    }
}
