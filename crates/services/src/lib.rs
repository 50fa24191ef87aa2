#![forbid(unsafe_code)]

pub mod analytics;
pub mod camera;
pub mod classifier;
pub mod config;
pub mod controller;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod precheck;
pub mod presentation;
pub mod resolver;
pub mod sampler;
pub mod store;

pub use proctor_core::Clock;

pub use analytics::{AnalyticsSink, ChannelAnalyticsSink, ExamReport};
pub use camera::{Frame, FrameSource};
pub use classifier::{AttentionClassifier, HttpClassifier, QuestionTypeClassifier};
pub use config::ProctorConfig;
pub use controller::{ExamController, ExamDeps, ExamPhase, Transition};
pub use error::{CameraError, ClassifierError, ExamError, PresentationError};
pub use notify::{ChannelNotifier, Notification, NotificationKind, Notifier};
pub use pipeline::AttentionPipeline;
pub use precheck::PreCheckService;
pub use presentation::{Lockdown, Presentation};
pub use resolver::QuestionTypeResolver;
pub use sampler::AttentionSampler;
pub use store::ExamSessionStore;
