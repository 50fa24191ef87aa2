use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use proctor_core::model::{QuestionCatalog, QuestionIndex, QuestionType};

use crate::classifier::QuestionTypeClassifier;
use crate::error::ClassifierError;
use crate::notify::{Notification, Notifier};
use crate::store::ExamSessionStore;

/// Looks up a question's type, classifying it at most once per attempt.
///
/// A stored type is returned as is. Otherwise the classifier is asked and a
/// successful answer is written to the record, so later calls never reach the
/// classifier. Failures leave the record unclassified and the next threshold
/// crossing tries again.
pub struct QuestionTypeResolver {
    catalog: Arc<QuestionCatalog>,
    store: Arc<ExamSessionStore>,
    classifier: Arc<dyn QuestionTypeClassifier>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    calls: AtomicUsize,
}

impl QuestionTypeResolver {
    #[must_use]
    pub fn new(
        catalog: Arc<QuestionCatalog>,
        store: Arc<ExamSessionStore>,
        classifier: Arc<dyn QuestionTypeClassifier>,
        notifier: Arc<dyn Notifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            classifier,
            notifier,
            timeout,
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times the classifier has been called.
    #[must_use]
    pub fn classification_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub async fn resolve(&self, question: QuestionIndex) -> QuestionType {
        let stored = self.store.question_type(question).await;
        if stored.is_classified() {
            return stored;
        }

        let Some(entry) = self.catalog.get(question) else {
            tracing::warn!(%question, "cannot classify question outside the catalog");
            return QuestionType::Unclassified;
        };

        self.calls.fetch_add(1, Ordering::Relaxed);
        let verdict = tokio::time::timeout(
            self.timeout,
            self.classifier.classify_question(entry.text()),
        )
        .await
        .unwrap_or(Err(ClassifierError::Timeout));

        match verdict {
            Ok(question_type) => {
                let stored = self.store.assign_type(question, question_type).await;
                tracing::info!(%question, question_type = %stored, "question classified");
                stored
            }
            Err(err) => {
                tracing::warn!(%question, error = %err, "question classification failed");
                if err.is_unexpected_response() {
                    self.notifier.notify(Notification::classifier_response());
                }
                QuestionType::Unclassified
            }
        }
    }
}
