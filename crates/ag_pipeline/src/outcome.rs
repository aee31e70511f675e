use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

/// Result of one background article write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PersistenceOutcome {
    Saved { article_id: String },
    Failed { article_id: String, error: String },
}

impl PersistenceOutcome {
    pub fn article_id(&self) -> &str {
        match self {
            PersistenceOutcome::Saved { article_id } | PersistenceOutcome::Failed { article_id, .. } => article_id,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, PersistenceOutcome::Saved { .. })
    }
}

/// Receives persistence outcomes. The user flow never waits on or sees these.
pub trait OutcomeSink: Send + Sync {
    fn report(&self, outcome: &PersistenceOutcome);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub saved: u64,
    pub failed: u64,
}

/// Logs every outcome and keeps running totals.
#[derive(Debug, Default)]
pub struct TracingOutcomeSink {
    saved: AtomicU64,
    failed: AtomicU64,
}

impl TracingOutcomeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts {
            saved: self.saved.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

impl OutcomeSink for TracingOutcomeSink {
    fn report(&self, outcome: &PersistenceOutcome) {
        match outcome {
            PersistenceOutcome::Saved { article_id } => {
                self.saved.fetch_add(1, Ordering::Relaxed);
                tracing::info!(article_id = %article_id, "article persisted");
            }
            PersistenceOutcome::Failed { article_id, error } => {
                let failed = self.failed.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::error!(article_id = %article_id, error = %error, failed_total = failed, "article persistence failed");
            }
        }
    }
}
