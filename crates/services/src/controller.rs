//! Exam lifecycle: navigation, answering, submission and lockdown.

use std::sync::Arc;

use proctor_core::Clock;
use proctor_core::model::{ExamSessionId, ExamSummary, Question, QuestionCatalog, QuestionIndex};
use storage::repository::Storage;
use tokio::sync::watch;

use crate::analytics::{AnalyticsSink, ExamReport};
use crate::camera::FrameSource;
use crate::classifier::{AttentionClassifier, QuestionTypeClassifier};
use crate::config::ProctorConfig;
use crate::error::{CameraError, ExamError, PresentationError};
use crate::notify::{Notification, Notifier};
use crate::pipeline::AttentionPipeline;
use crate::presentation::{Lockdown, Presentation};
use crate::resolver::QuestionTypeResolver;
use crate::sampler::AttentionSampler;
use crate::store::ExamSessionStore;

/// Where the attempt is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamPhase {
    NotStarted,
    Active(QuestionIndex),
    ReviewingSummary(ExamSummary),
    Finalized,
}

/// Whether an operation changed the phase or the active question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved,
    Unchanged,
}

/// Collaborators the controller needs.
#[derive(Clone)]
pub struct ExamDeps {
    pub catalog: Arc<QuestionCatalog>,
    pub storage: Storage,
    pub lockdown: Lockdown,
    pub attention: Arc<dyn AttentionClassifier>,
    pub question_types: Arc<dyn QuestionTypeClassifier>,
    pub camera: Arc<dyn FrameSource>,
    pub presentation: Arc<dyn Presentation>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub notifier: Arc<dyn Notifier>,
}

/// Runs one exam attempt.
pub struct ExamController {
    clock: Clock,
    session: ExamSessionId,
    catalog: Arc<QuestionCatalog>,
    store: Arc<ExamSessionStore>,
    pipeline: Arc<AttentionPipeline>,
    sampler: AttentionSampler,
    lockdown: Lockdown,
    camera: Arc<dyn FrameSource>,
    presentation: Arc<dyn Presentation>,
    analytics: Arc<dyn AnalyticsSink>,
    notifier: Arc<dyn Notifier>,
    phase: ExamPhase,
}

impl ExamController {
    #[must_use]
    pub fn new(
        config: &ProctorConfig,
        clock: Clock,
        session: ExamSessionId,
        deps: ExamDeps,
    ) -> Self {
        let store = Arc::new(ExamSessionStore::new(session, deps.storage.records));
        let resolver = Arc::new(QuestionTypeResolver::new(
            Arc::clone(&deps.catalog),
            Arc::clone(&store),
            deps.question_types,
            Arc::clone(&deps.notifier),
            config.request_timeout,
        ));
        let pipeline = Arc::new(AttentionPipeline::new(
            clock,
            Arc::clone(&store),
            resolver,
            Arc::clone(&deps.notifier),
        ));
        let sampler = AttentionSampler::new(
            clock,
            Arc::clone(&pipeline),
            Arc::clone(&deps.camera),
            deps.attention,
            config.sample_interval,
            config.request_timeout,
        );

        Self {
            clock,
            session,
            catalog: deps.catalog,
            store,
            pipeline,
            sampler,
            lockdown: deps.lockdown,
            camera: deps.camera,
            presentation: deps.presentation,
            analytics: deps.analytics,
            notifier: deps.notifier,
            phase: ExamPhase::NotStarted,
        }
    }

    //
    // ─── QUERIES ────────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn session(&self) -> ExamSessionId {
        self.session
    }

    #[must_use]
    pub fn phase(&self) -> &ExamPhase {
        &self.phase
    }

    #[must_use]
    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn store(&self) -> &ExamSessionStore {
        &self.store
    }

    #[must_use]
    pub fn pipeline(&self) -> &AttentionPipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn is_sampling(&self) -> bool {
        self.sampler.is_running()
    }

    #[must_use]
    pub fn lockdown(&self) -> &Lockdown {
        &self.lockdown
    }

    #[must_use]
    pub fn subscribe_lockdown(&self) -> watch::Receiver<bool> {
        self.lockdown.subscribe()
    }

    #[must_use]
    pub fn active_question(&self) -> Option<&Question> {
        match self.phase {
            ExamPhase::Active(index) => self.catalog.get(index),
            _ => None,
        }
    }

    //
    // ─── LIFECYCLE ──────────────────────────────────────────────────────────────
    //

    /// Begin a fresh attempt at the first question.
    ///
    /// Clears any records left from an earlier run of this session, acquires the
    /// camera, starts sampling and requests lockdown. A refused lockdown is
    /// reported but does not stop the attempt. Calling `start` on a running
    /// attempt does nothing.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Camera` if the camera cannot be acquired.
    pub async fn start(&mut self) -> Result<Transition, ExamError> {
        if !matches!(self.phase, ExamPhase::NotStarted) {
            return Ok(Transition::Unchanged);
        }
        self.acquire_camera().await?;
        self.store.reset().await;
        self.begin(self.catalog.first_index()).await;
        tracing::info!(session = %self.session, questions = self.catalog.len(), "exam started");

        if let Err(err) = self.enter_lockdown().await {
            tracing::warn!(error = %err, "exam started without lockdown");
        }
        Ok(Transition::Moved)
    }

    /// Pick up an attempt after a reload, keeping its stored records.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::UnknownQuestion` for an index outside the catalog,
    /// `ExamError::Storage` if the records cannot be read and `ExamError::Camera`
    /// if the camera cannot be acquired.
    pub async fn resume(&mut self, at: QuestionIndex) -> Result<Transition, ExamError> {
        if !matches!(self.phase, ExamPhase::NotStarted) {
            return Ok(Transition::Unchanged);
        }
        if !self.catalog.contains(at) {
            return Err(ExamError::UnknownQuestion(at));
        }
        let restored = self.store.load().await?;
        self.acquire_camera().await?;
        self.begin(at).await;
        tracing::info!(session = %self.session, %at, restored, "exam resumed");
        Ok(Transition::Moved)
    }

    /// Move to the next question. No-op at the last question.
    pub async fn next(&mut self) -> Transition {
        let ExamPhase::Active(current) = self.phase else {
            return Transition::Unchanged;
        };
        match current.next().filter(|i| self.catalog.contains(*i)) {
            Some(target) => self.go_to(target).await,
            None => Transition::Unchanged,
        }
    }

    /// Move to the previous question. No-op at the first question.
    pub async fn prev(&mut self) -> Transition {
        let ExamPhase::Active(current) = self.phase else {
            return Transition::Unchanged;
        };
        match current.prev() {
            Some(target) => self.go_to(target).await,
            None => Transition::Unchanged,
        }
    }

    /// Record an option for the active question. Options the question does
    /// not offer are ignored; an empty option clears the answer.
    pub async fn select_answer(&mut self, option: &str) -> Transition {
        let ExamPhase::Active(current) = self.phase else {
            return Transition::Unchanged;
        };
        let Some(question) = self.catalog.get(current) else {
            return Transition::Unchanged;
        };
        if !option.is_empty() && !question.has_option(option) {
            tracing::warn!(question = %current, option, "ignoring unknown option");
            return Transition::Unchanged;
        }
        self.store.record_answer(current, option).await;
        Transition::Moved
    }

    /// Finish the attempt from the last question and show the summary.
    ///
    /// Sampling stops first, then the last question's look-away is stored, so
    /// the summary includes every counted sample.
    pub async fn submit(&mut self) -> Transition {
        let ExamPhase::Active(current) = self.phase else {
            return Transition::Unchanged;
        };
        if current != self.catalog.last_index() {
            tracing::debug!(question = %current, "submit ignored before the last question");
            return Transition::Unchanged;
        }

        self.sampler.stop().await;
        self.pipeline.suspend().await;
        let records = self.store.records().await;
        let summary = ExamSummary::compute(&self.catalog, &records, self.clock.now());
        tracing::info!(
            session = %self.session,
            score = summary.score(),
            attempted = summary.attempted(),
            total_look_away_secs = summary.total_look_away_secs(),
            "exam submitted"
        );
        self.phase = ExamPhase::ReviewingSummary(summary);
        Transition::Moved
    }

    /// Leave the summary and return to the last question.
    pub async fn cancel_review(&mut self) -> Transition {
        if !matches!(self.phase, ExamPhase::ReviewingSummary(_)) {
            return Transition::Unchanged;
        }
        self.begin(self.catalog.last_index()).await;
        tracing::info!(session = %self.session, "summary dismissed");
        Transition::Moved
    }

    /// Accept the summary. Ends lockdown, releases the camera and publishes the
    /// report.
    pub async fn confirm(&mut self) -> Option<ExamReport> {
        let summary = match std::mem::replace(&mut self.phase, ExamPhase::Finalized) {
            ExamPhase::ReviewingSummary(summary) => summary,
            other => {
                self.phase = other;
                return None;
            }
        };

        self.lockdown.set(false).await;
        self.sampler.stop().await;
        self.camera.release();
        if let Err(err) = self.presentation.exit_fullscreen().await {
            tracing::warn!(error = %err, "failed to leave fullscreen");
        }

        let records = self.store.records().await;
        let report = ExamReport::new(self.session, summary, &records);
        self.analytics.publish(report.clone()).await;
        tracing::info!(session = %self.session, "exam finalized");
        Some(report)
    }

    /// Stop sampling and store pending look-away time, e.g. when the exam view
    /// goes away. The attempt can be picked up again with `resume`.
    pub async fn shutdown(&mut self) {
        self.sampler.stop().await;
        self.pipeline.suspend().await;
        self.camera.release();
        if matches!(self.phase, ExamPhase::Active(_) | ExamPhase::ReviewingSummary(_)) {
            self.phase = ExamPhase::NotStarted;
        }
    }

    //
    // ─── LOCKDOWN ───────────────────────────────────────────────────────────────
    //

    /// Request fullscreen and turn lockdown on.
    ///
    /// # Errors
    ///
    /// Returns `PresentationError` if fullscreen is refused. The request may be
    /// retried.
    pub async fn enter_lockdown(&mut self) -> Result<(), PresentationError> {
        match self.presentation.enter_fullscreen().await {
            Ok(()) => {
                self.lockdown.set(true).await;
                Ok(())
            }
            Err(err) => {
                if matches!(err, PresentationError::PermissionDenied) {
                    self.notifier.notify(Notification::fullscreen_denied());
                }
                Err(err)
            }
        }
    }

    /// Turn lockdown off and leave fullscreen.
    pub async fn exit_lockdown(&mut self) {
        self.lockdown.set(false).await;
        if let Err(err) = self.presentation.exit_fullscreen().await {
            tracing::warn!(error = %err, "failed to leave fullscreen");
        }
    }

    /// React to fullscreen changes made outside the controller.
    ///
    /// Leaving fullscreen during the attempt drops lockdown and warns the
    /// candidate. Sampling continues.
    pub async fn on_fullscreen_changed(&mut self, fullscreen: bool) {
        let in_exam = matches!(
            self.phase,
            ExamPhase::Active(_) | ExamPhase::ReviewingSummary(_)
        );
        if fullscreen {
            if in_exam {
                self.lockdown.set(true).await;
            }
            return;
        }
        if self.lockdown.set(false).await && in_exam {
            tracing::warn!(session = %self.session, "fullscreen exited during exam");
            self.notifier.notify(Notification::fullscreen_exited());
        }
    }

    //
    // ─── INTERNALS ──────────────────────────────────────────────────────────────
    //

    async fn acquire_camera(&self) -> Result<(), CameraError> {
        if let Err(err) = self.camera.acquire().await {
            tracing::warn!(error = %err, "camera unavailable");
            self.notifier.notify(match err {
                CameraError::PermissionDenied => Notification::camera_denied(),
                _ => Notification::camera_unavailable(),
            });
            return Err(err);
        }
        Ok(())
    }

    async fn begin(&mut self, at: QuestionIndex) {
        self.pipeline.activate(at).await;
        self.store.get(at).await;
        self.sampler.start();
        self.phase = ExamPhase::Active(at);
    }

    async fn go_to(&mut self, target: QuestionIndex) -> Transition {
        self.pipeline.activate(target).await;
        self.store.get(target).await;
        tracing::debug!(question = %target, "navigated");
        self.phase = ExamPhase::Active(target);
        Transition::Moved
    }
}

impl Drop for ExamController {
    fn drop(&mut self) {
        self.camera.release();
    }
}
