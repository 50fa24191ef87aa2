#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use proctor_core::model::{ExamSessionId, QuestionCatalog, QuestionType};
use proctor_core::time::fixed_clock;
use services::{
    AnalyticsSink, AttentionClassifier, CameraError, ChannelAnalyticsSink, ClassifierError,
    ExamController, ExamDeps, ExamReport, Frame, FrameSource, Lockdown, Notification, Notifier,
    Presentation, PresentationError, ProctorConfig, QuestionTypeClassifier,
};
use storage::repository::{InMemoryRepository, Storage};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Attention classifier whose verdict the test flips.
#[derive(Default)]
pub struct Gaze {
    looking_away: AtomicBool,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl Gaze {
    pub fn look_away(&self, away: bool) {
        self.looking_away.store(away, Ordering::SeqCst);
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttentionClassifier for Gaze {
    async fn classify_frame(&self, _frame: &Frame) -> Result<bool, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClassifierError::Timeout);
        }
        Ok(self.looking_away.load(Ordering::SeqCst))
    }
}

/// Question-type classifier answering from a table keyed by question text.
#[derive(Default)]
pub struct Types {
    table: Mutex<HashMap<String, QuestionType>>,
    failing: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

impl Types {
    pub fn answer(&self, text: &str, question_type: QuestionType) {
        self.table
            .lock()
            .unwrap()
            .insert(text.to_string(), question_type);
    }

    pub fn forget(&self, text: &str) {
        self.table.lock().unwrap().remove(text);
    }

    pub fn fail_for(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionTypeClassifier for Types {
    async fn classify_question(&self, question: &str) -> Result<QuestionType, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(question) {
            return Err(ClassifierError::HttpStatus(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        let known = self.table.lock().unwrap().get(question).copied();
        known.ok_or_else(|| ClassifierError::UnexpectedResponse(format!("no type for {question}")))
    }
}

#[derive(Default)]
pub struct Camera {
    denied: AtomicBool,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Camera {
    pub fn deny(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for Camera {
    async fn acquire(&self) -> Result<(), CameraError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(CameraError::PermissionDenied);
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn capture(&self) -> Result<Frame, CameraError> {
        Ok(Frame::jpeg(vec![0xff, 0xd8, 0xff, 0xd9]))
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct Screen {
    denied: AtomicBool,
    exit_fails: AtomicBool,
    fullscreen: AtomicBool,
}

impl Screen {
    pub fn deny(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    pub fn fail_exit(&self, fails: bool) {
        self.exit_fails.store(fails, Ordering::SeqCst);
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Presentation for Screen {
    async fn enter_fullscreen(&self) -> Result<(), PresentationError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(PresentationError::PermissionDenied);
        }
        self.fullscreen.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn exit_fullscreen(&self) -> Result<(), PresentationError> {
        if self.exit_fails.load(Ordering::SeqCst) {
            return Err(PresentationError::Failed("document not active".into()));
        }
        self.fullscreen.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct Notes(Mutex<Vec<Notification>>);

impl Notes {
    pub fn all(&self) -> Vec<Notification> {
        self.0.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.all().into_iter().map(|n| n.message).collect()
    }
}

impl Notifier for Notes {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

pub const CAPITAL: &str = "What is the capital of India?";
pub const BROWSER: &str = "Which language runs in a web browser?";
pub const SQUARE: &str = "What is the square root of 1600?";

/// Three-question catalog with answers `New Delhi`, `JavaScript` and `40`.
pub fn three_questions() -> QuestionCatalog {
    let capital: &[&str] = &["New Delhi", "Mumbai", "Kolkata"];
    let browser: &[&str] = &["X", "Python", "JavaScript"];
    let square: &[&str] = &["20", "40", "80"];
    QuestionCatalog::from_rows([
        (CAPITAL, capital, "New Delhi"),
        (BROWSER, browser, "JavaScript"),
        (SQUARE, square, "40"),
    ])
    .unwrap()
}

pub fn config() -> ProctorConfig {
    ProctorConfig {
        sample_interval: Duration::from_secs(1),
        request_timeout: Duration::from_secs(3),
        ..ProctorConfig::default()
    }
}

pub struct Harness {
    pub controller: ExamController,
    pub gaze: Arc<Gaze>,
    pub types: Arc<Types>,
    pub camera: Arc<Camera>,
    pub screen: Arc<Screen>,
    pub notes: Arc<Notes>,
    pub reports: mpsc::UnboundedReceiver<ExamReport>,
    pub repo: Option<InMemoryRepository>,
}

pub async fn harness() -> Harness {
    let repo = InMemoryRepository::new();
    let storage = Storage {
        records: Arc::new(repo.clone()),
        exam_mode: Arc::new(repo.clone()),
    };
    let mut harness = build(storage, ExamSessionId::generate(), config()).await;
    harness.repo = Some(repo);
    harness
}

/// Route pipeline logs to the test output. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn build(storage: Storage, session: ExamSessionId, config: ProctorConfig) -> Harness {
    init_tracing();
    let gaze = Arc::new(Gaze::default());
    let types = Arc::new(Types::default());
    types.answer(CAPITAL, QuestionType::Theoretical);
    types.answer(BROWSER, QuestionType::Theoretical);
    types.answer(SQUARE, QuestionType::Numerical);
    let camera = Arc::new(Camera::default());
    let screen = Arc::new(Screen::default());
    let notes = Arc::new(Notes::default());
    let (analytics, reports) = ChannelAnalyticsSink::new();
    let analytics: Arc<dyn AnalyticsSink> = Arc::new(analytics);

    let lockdown = Lockdown::restore(Arc::clone(&storage.exam_mode)).await;
    let deps = ExamDeps {
        catalog: Arc::new(three_questions()),
        storage,
        lockdown,
        attention: gaze.clone(),
        question_types: types.clone(),
        camera: camera.clone(),
        presentation: screen.clone(),
        analytics,
        notifier: notes.clone(),
    };
    let controller = ExamController::new(&config, fixed_clock(), session, deps);

    Harness {
        controller,
        gaze,
        types,
        camera,
        screen,
        notes,
        reports,
        repo: None,
    }
}

/// Let `secs` whole sampling ticks elapse.
pub async fn ticks(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Move half a tick off the sampling grid so sleeps never race a tick.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(500)).await;
}
