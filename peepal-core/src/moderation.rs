//! Report counting: `Active -> Reported(n) -> Deleted`.

use std::sync::Arc;

use crate::model::{EntityKind, ReportReceipt};
use crate::ports::{PortError, ReportCounter, ReportOutcome};

/// Applies reports to one kind of record and deletes it at the threshold.
///
/// The increment, comparison and deletion happen in a single
/// [`ReportCounter::increment_or_delete`] call, so concurrent reports are never lost.
/// Reports are not deduplicated per reporter.
pub struct ModerationGate {
    counter: Arc<dyn ReportCounter>,
    threshold: u32,
}

impl ModerationGate {
    /// Gate over `counter` deleting records once `threshold` reports are reached.
    #[must_use]
    pub fn new(counter: Arc<dyn ReportCounter>, threshold: u32) -> Self {
        Self {
            counter,
            threshold: threshold.max(1),
        }
    }

    /// Kind of record moderated by this gate.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.counter.kind()
    }

    /// Reports needed for deletion.
    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Count one report against `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] when the record does not exist (including
    /// after it was deleted), or the storage error.
    pub async fn report(&self, id: &str) -> Result<ReportReceipt, PortError> {
        let kind = self.kind();
        match self.counter.increment_or_delete(id, self.threshold).await? {
            None => {
                tracing::debug!(%kind, id, "report for missing record");
                Err(PortError::NotFound(kind, id.to_owned()))
            }
            Some(ReportOutcome::Deleted) => {
                tracing::info!(%kind, id, threshold = self.threshold, "deleted after reaching report threshold");
                Ok(ReportReceipt {
                    message: format!("{kind} reported and deleted after reaching threshold"),
                    deleted: true,
                })
            }
            Some(ReportOutcome::Counted(reports)) => {
                tracing::info!(%kind, id, reports, "reported");
                Ok(ReportReceipt {
                    message: format!("{kind} reported"),
                    deleted: false,
                })
            }
        }
    }
}
