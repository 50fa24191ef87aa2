//! Periodic attention sampling.
//!
//! One background loop ticks at the sample interval and spawns a task per tick
//! that captures a frame, asks the attention classifier for a verdict and feeds
//! the pipeline. Ticks never wait for each other, so a slow classifier cannot
//! stall sampling. Stopping the loop aborts every in-flight tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use proctor_core::Clock;
use proctor_core::attention::AttentionSample;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self as tokio_time, Instant, MissedTickBehavior};

use crate::camera::FrameSource;
use crate::classifier::AttentionClassifier;
use crate::error::{CameraError, ClassifierError};
use crate::notify::Notification;
use crate::pipeline::AttentionPipeline;

struct Tick {
    clock: Clock,
    pipeline: Arc<AttentionPipeline>,
    camera: Arc<dyn FrameSource>,
    classifier: Arc<dyn AttentionClassifier>,
    timeout: Duration,
    camera_reported: AtomicBool,
    response_reported: AtomicBool,
}

enum TickError {
    Camera(CameraError),
    Classifier(ClassifierError),
}

impl Tick {
    async fn sample_once(&self) {
        let Some(activation) = self.pipeline.activation() else {
            return;
        };
        let captured_at = self.clock.now();

        let verdict = tokio_time::timeout(self.timeout, self.observe())
            .await
            .unwrap_or(Err(TickError::Classifier(ClassifierError::Timeout)));

        match verdict {
            Ok(look_away) => {
                self.pipeline
                    .ingest(AttentionSample {
                        activation,
                        look_away,
                        captured_at,
                    })
                    .await;
            }
            Err(TickError::Camera(err)) => {
                tracing::debug!(error = %err, "frame capture failed; tick skipped");
                if matches!(err, CameraError::PermissionDenied)
                    && !self.camera_reported.swap(true, Ordering::Relaxed)
                {
                    self.pipeline.notify(Notification::camera_denied());
                }
            }
            Err(TickError::Classifier(err)) => {
                tracing::debug!(error = %err, "attention classification failed; tick skipped");
                if err.is_unexpected_response()
                    && !self.response_reported.swap(true, Ordering::Relaxed)
                {
                    self.pipeline.notify(Notification::classifier_response());
                }
            }
        }
    }

    async fn observe(&self) -> Result<bool, TickError> {
        let frame = self.camera.capture().await.map_err(TickError::Camera)?;
        self.classifier
            .classify_frame(&frame)
            .await
            .map_err(TickError::Classifier)
    }
}

struct Running {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the sampling loop. `start` and `stop` are idempotent.
pub struct AttentionSampler {
    tick: Arc<Tick>,
    interval: Duration,
    running: Option<Running>,
}

impl AttentionSampler {
    #[must_use]
    pub fn new(
        clock: Clock,
        pipeline: Arc<AttentionPipeline>,
        camera: Arc<dyn FrameSource>,
        classifier: Arc<dyn AttentionClassifier>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            tick: Arc::new(Tick {
                clock,
                pipeline,
                camera,
                classifier,
                timeout,
                camera_reported: AtomicBool::new(false),
                response_reported: AtomicBool::new(false),
            }),
            interval,
            running: None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start the loop. Returns `false` if it was already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.running.is_some() {
            return false;
        }
        // Each run reports a denied camera or a malformed verdict once.
        self.tick.camera_reported.store(false, Ordering::Relaxed);
        self.tick.response_reported.store(false, Ordering::Relaxed);
        let (shutdown, signal) = oneshot::channel();
        let handle = tokio::spawn(run(Arc::clone(&self.tick), self.interval, signal));
        self.running = Some(Running { shutdown, handle });
        tracing::info!(interval = ?self.interval, "attention sampler started");
        true
    }

    /// Stop the loop and wait until no tick can reach the pipeline any more.
    /// Returns `false` if it was not running.
    pub async fn stop(&mut self) -> bool {
        let Some(Running { shutdown, handle }) = self.running.take() else {
            return false;
        };
        let _ = shutdown.send(());
        match handle.await {
            Err(err) if err.is_panic() => {
                tracing::error!(error = %err, "attention sampler panicked");
            }
            _ => {}
        }
        tracing::info!("attention sampler stopped");
        true
    }
}

impl Drop for AttentionSampler {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
        }
    }
}

async fn run(tick: Arc<Tick>, period: Duration, mut shutdown: oneshot::Receiver<()>) {
    let mut ticker = tokio_time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    if err.is_panic() {
                        tracing::error!(error = %err, "attention tick panicked");
                    }
                }
            }
            _ = ticker.tick() => {
                let tick = Arc::clone(&tick);
                in_flight.spawn(async move { tick.sample_once().await });
            }
        }
    }

    in_flight.shutdown().await;
}
