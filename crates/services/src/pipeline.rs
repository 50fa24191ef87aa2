//! Look-away bookkeeping shared by the sampler and the controller.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use proctor_core::Clock;
use proctor_core::attention::{
    Activation, AttentionSample, Checkpoint, LookAwayAccumulator, SAMPLE_QUANTUM_SECS,
    SampleOutcome,
};
use proctor_core::model::QuestionIndex;
use proctor_core::warning::{Threshold, WarningPolicy, WarningState};

use crate::notify::{Notification, Notifier};
use crate::resolver::QuestionTypeResolver;
use crate::store::ExamSessionStore;

#[derive(Debug, Default)]
struct Tracker {
    accumulator: LookAwayAccumulator,
    policy: WarningPolicy,
}

/// Turns attention samples into look-away time and warnings.
///
/// Counter and warning state sit behind one synchronous lock that is never held
/// across an await. Store writes, classification and notifications happen after
/// the lock is released. Threshold warnings surface one at a time, in the
/// order their thresholds were crossed.
pub struct AttentionPipeline {
    clock: Clock,
    tracker: Mutex<Tracker>,
    warnings: tokio::sync::Mutex<()>,
    store: Arc<ExamSessionStore>,
    resolver: Arc<QuestionTypeResolver>,
    notifier: Arc<dyn Notifier>,
}

impl AttentionPipeline {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: Arc<ExamSessionStore>,
        resolver: Arc<QuestionTypeResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            tracker: Mutex::new(Tracker::default()),
            warnings: tokio::sync::Mutex::new(()),
            store,
            resolver,
            notifier,
        }
    }

    fn tracker(&self) -> MutexGuard<'_, Tracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn activation(&self) -> Option<Activation> {
        self.tracker().accumulator.activation()
    }

    /// Look-away seconds counted for the live activation.
    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.tracker().accumulator.elapsed_secs()
    }

    #[must_use]
    pub fn warning_state(&self) -> WarningState {
        self.tracker().policy.state()
    }

    #[must_use]
    pub fn resolver(&self) -> &QuestionTypeResolver {
        &self.resolver
    }

    /// Make `question` the active question.
    ///
    /// The outgoing question's counter is written to the store before this
    /// returns.
    pub async fn activate(&self, question: QuestionIndex) -> Activation {
        let (activation, checkpoint) = {
            let mut tracker = self.tracker();
            let swapped = tracker.accumulator.activate(question);
            tracker.policy.reset_for(question);
            swapped
        };
        self.flush(checkpoint).await;
        tracing::debug!(%question, epoch = activation.epoch(), "question activated");
        activation
    }

    /// End the live activation and store its counter.
    pub async fn suspend(&self) {
        let checkpoint = {
            let mut tracker = self.tracker();
            tracker.policy.clear();
            tracker.accumulator.suspend()
        };
        self.flush(checkpoint).await;
    }

    /// Integrate one attention sample.
    pub async fn ingest(&self, sample: AttentionSample) {
        let now = self.clock.now();
        let (outcome, crossed) = {
            let mut tracker = self.tracker();
            let outcome = tracker.accumulator.record(&sample);
            let crossed = match outcome {
                SampleOutcome::Counted {
                    question,
                    elapsed_secs,
                } => tracker.policy.on_elapsed(question, elapsed_secs, now),
                _ => None,
            };
            (outcome, crossed)
        };

        match outcome {
            SampleOutcome::Stale {
                question,
                look_away: true,
            } => {
                tracing::debug!(%question, "late look-away sample credited to its question");
                self.store
                    .checkpoint_look_away(question, SAMPLE_QUANTUM_SECS)
                    .await;
            }
            SampleOutcome::Counted { question, .. } => {
                if let Some(threshold) = crossed {
                    self.warn(sample.activation, question, threshold).await;
                }
            }
            SampleOutcome::Stale { .. } | SampleOutcome::Attentive { .. } => {}
        }
    }

    async fn warn(&self, activation: Activation, question: QuestionIndex, threshold: Threshold) {
        // Held while the type resolves so a slow mid warning still lands before high.
        let _in_order = self.warnings.lock().await;
        let question_type = self.resolver.resolve(question).await;
        let Some(warning) = threshold.warning(question, question_type) else {
            tracing::debug!(%question, ?threshold, %question_type, "no warning for this type");
            return;
        };
        // The candidate may have moved on while the type was being resolved.
        if self.activation() != Some(activation) {
            tracing::debug!(%question, ?threshold, "warning dropped after navigation");
            return;
        }
        tracing::info!(%question, ?threshold, %question_type, "look-away warning");
        self.notifier.notify(warning.into());
    }

    async fn flush(&self, checkpoint: Option<Checkpoint>) {
        if let Some(Checkpoint {
            question,
            look_away_secs,
        }) = checkpoint
        {
            let total = self
                .store
                .checkpoint_look_away(question, look_away_secs)
                .await;
            tracing::debug!(%question, look_away_secs, total, "look-away checkpointed");
        }
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::QuestionTypeClassifier;
    use crate::error::ClassifierError;
    use async_trait::async_trait;
    use proctor_core::model::{ExamSessionId, QuestionCatalog, QuestionType};
    use proctor_core::warning::Severity;
    use std::time::Duration;
    use storage::repository::InMemoryRepository;

    struct Fixed(QuestionType);

    #[async_trait]
    impl QuestionTypeClassifier for Fixed {
        async fn classify_question(&self, _: &str) -> Result<QuestionType, ClassifierError> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<Notification>>);

    impl Notifier for Collect {
        fn notify(&self, notification: Notification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    /// Takes six seconds to classify the first question it sees.
    #[derive(Default)]
    struct SlowFirst(std::sync::atomic::AtomicUsize);

    #[async_trait]
    impl QuestionTypeClassifier for SlowFirst {
        async fn classify_question(&self, _: &str) -> Result<QuestionType, ClassifierError> {
            if self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(6)).await;
            }
            Ok(QuestionType::Theoretical)
        }
    }

    fn pipeline(
        question_type: QuestionType,
    ) -> (AttentionPipeline, Arc<ExamSessionStore>, Arc<Collect>) {
        with_classifier(Arc::new(Fixed(question_type)), Duration::from_secs(3))
    }

    fn with_classifier(
        classifier: Arc<dyn QuestionTypeClassifier>,
        timeout: Duration,
    ) -> (AttentionPipeline, Arc<ExamSessionStore>, Arc<Collect>) {
        let store = Arc::new(ExamSessionStore::new(
            ExamSessionId::generate(),
            Arc::new(InMemoryRepository::new()),
        ));
        let notes = Arc::new(Collect::default());
        let resolver = Arc::new(QuestionTypeResolver::new(
            Arc::new(QuestionCatalog::default_exam()),
            Arc::clone(&store),
            classifier,
            notes.clone(),
            timeout,
        ));
        let pipeline = AttentionPipeline::new(
            proctor_core::time::fixed_clock(),
            Arc::clone(&store),
            resolver,
            notes.clone(),
        );
        (pipeline, store, notes)
    }

    fn sample(activation: Activation, look_away: bool) -> AttentionSample {
        AttentionSample {
            activation,
            look_away,
            captured_at: proctor_core::time::fixed_now(),
        }
    }

    #[tokio::test]
    async fn theoretical_question_warns_at_five_and_ten() {
        let (pipeline, _, notes) = pipeline(QuestionType::Theoretical);
        let active = pipeline.activate(QuestionIndex::new(0)).await;

        for _ in 0..11 {
            pipeline.ingest(sample(active, true)).await;
        }

        let notes = notes.0.lock().unwrap();
        let messages: Vec<_> = notes.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "Please focus on the screen! (Theoretical Question)",
                "High Warning! Please focus on the screen! (Theoretical Question)",
            ]
        );
        assert!(notes.iter().all(|n| n.severity == Severity::Info));
        assert_eq!(pipeline.elapsed_secs(), 11);
        assert_eq!(pipeline.warning_state(), WarningState::HighFired);
    }

    #[tokio::test]
    async fn numerical_question_warns_only_at_ten() {
        let (pipeline, _, notes) = pipeline(QuestionType::Numerical);
        let active = pipeline.activate(QuestionIndex::new(2)).await;

        for _ in 0..10 {
            pipeline.ingest(sample(active, true)).await;
        }

        let notes = notes.0.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Error);
        assert_eq!(
            notes[0].message,
            "Please focus on the screen! (Numerical Question)"
        );
        assert_eq!(pipeline.resolver().classification_calls(), 1);
    }

    #[tokio::test]
    async fn attentive_samples_add_nothing() {
        let (pipeline, store, notes) = pipeline(QuestionType::Theoretical);
        let active = pipeline.activate(QuestionIndex::new(0)).await;
        for _ in 0..20 {
            pipeline.ingest(sample(active, false)).await;
        }
        pipeline.suspend().await;

        assert!(notes.0.lock().unwrap().is_empty());
        assert_eq!(store.get(QuestionIndex::new(0)).await.look_away_secs(), 0);
        assert_eq!(pipeline.resolver().classification_calls(), 0);
    }

    #[tokio::test]
    async fn activation_checkpoints_the_outgoing_question() {
        let (pipeline, store, _) = pipeline(QuestionType::Theoretical);
        let first = pipeline.activate(QuestionIndex::new(0)).await;
        for _ in 0..3 {
            pipeline.ingest(sample(first, true)).await;
        }

        let second = pipeline.activate(QuestionIndex::new(1)).await;
        assert_eq!(store.get(QuestionIndex::new(0)).await.look_away_secs(), 3);
        assert_eq!(pipeline.elapsed_secs(), 0);

        // A sample captured before navigation lands after it.
        pipeline.ingest(sample(first, true)).await;
        pipeline.ingest(sample(second, true)).await;
        assert_eq!(store.get(QuestionIndex::new(0)).await.look_away_secs(), 4);
        assert_eq!(pipeline.elapsed_secs(), 1);
    }

    #[tokio::test]
    async fn revisiting_restarts_the_counter_but_keeps_stored_time() {
        let (pipeline, store, notes) = pipeline(QuestionType::Theoretical);
        let q = QuestionIndex::new(0);

        let first = pipeline.activate(q).await;
        for _ in 0..4 {
            pipeline.ingest(sample(first, true)).await;
        }
        pipeline.activate(QuestionIndex::new(1)).await;
        let again = pipeline.activate(q).await;
        for _ in 0..4 {
            pipeline.ingest(sample(again, true)).await;
        }
        pipeline.suspend().await;

        assert_eq!(store.get(q).await.look_away_secs(), 8);
        assert!(notes.0.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_mid_warning_still_precedes_high() {
        let (pipeline, _, notes) =
            with_classifier(Arc::new(SlowFirst::default()), Duration::from_secs(10));
        let pipeline = Arc::new(pipeline);
        let active = pipeline.activate(QuestionIndex::new(0)).await;
        for _ in 0..4 {
            pipeline.ingest(sample(active, true)).await;
        }

        let mid = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.ingest(sample(active, true)).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        for _ in 0..5 {
            pipeline.ingest(sample(active, true)).await;
        }
        mid.await.unwrap();

        let notes = notes.0.lock().unwrap();
        let messages: Vec<_> = notes.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "Please focus on the screen! (Theoretical Question)",
                "High Warning! Please focus on the screen! (Theoretical Question)",
            ]
        );
    }
}
