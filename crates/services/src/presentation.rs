use std::sync::Arc;

use async_trait::async_trait;
use storage::repository::ExamModeRepository;
use tokio::sync::watch;

use crate::error::PresentationError;

/// Fullscreen collaborator owned by the host.
#[async_trait]
pub trait Presentation: Send + Sync {
    /// # Errors
    ///
    /// Returns `PresentationError::PermissionDenied` when the request is refused.
    async fn enter_fullscreen(&self) -> Result<(), PresentationError>;

    /// # Errors
    ///
    /// Returns `PresentationError` when fullscreen cannot be left.
    async fn exit_fullscreen(&self) -> Result<(), PresentationError>;
}

/// Durable lockdown flag with change notifications.
///
/// The flag survives reloads through the exam-mode repository. Persistence
/// failures are logged and the in-memory value stays authoritative.
#[derive(Clone)]
pub struct Lockdown {
    tx: Arc<watch::Sender<bool>>,
    repo: Arc<dyn ExamModeRepository>,
}

impl Lockdown {
    /// Restore the flag from storage, defaulting to off if it cannot be read.
    pub async fn restore(repo: Arc<dyn ExamModeRepository>) -> Self {
        let initial = match repo.exam_mode().await {
            Ok(active) => active,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read exam mode; assuming off");
                false
            }
        };
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx: Arc::new(tx),
            repo,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Set the flag. Returns `true` if the value changed.
    pub async fn set(&self, active: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == active {
                false
            } else {
                *current = active;
                true
            }
        });
        if changed {
            tracing::info!(active, "lockdown changed");
            if let Err(err) = self.repo.set_exam_mode(active).await {
                tracing::warn!(error = %err, active, "failed to persist exam mode");
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn restores_and_persists_the_flag() {
        let repo = InMemoryRepository::new();
        repo.set_exam_mode(true).await.unwrap();

        let lockdown = Lockdown::restore(Arc::new(repo.clone())).await;
        assert!(lockdown.is_active());

        let mut rx = lockdown.subscribe();
        assert!(lockdown.set(false).await);
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
        assert!(!repo.exam_mode().await.unwrap());

        assert!(!lockdown.set(false).await);
        assert!(!rx.has_changed().unwrap());
    }
}
