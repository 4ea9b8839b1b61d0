//! Bundle of the storage and provider ports a [`crate::service::PeepalService`] runs against.

use std::sync::Arc;

use crate::model::EntityKind;
use crate::ports::{DirectionsPort, PortError, ReportCounter, TokenPort, ToiletStore};

/// Ports implementing the collaborators of the core.
pub struct Backend {
    /// Point-indexed toilet storage.
    pub toilets: Arc<dyn ToiletStore>,
    /// Report counter over toilets.
    pub toilet_reports: Arc<dyn ReportCounter>,
    /// Report counter over reviews.
    pub review_reports: Arc<dyn ReportCounter>,
    /// Walking directions provider.
    pub directions: Arc<dyn DirectionsPort>,
    /// Token endpoint of the directions provider.
    pub tokens: Arc<dyn TokenPort>,
}

impl Backend {
    /// Check that each counter moderates the kind of record its slot expects.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Internal`] naming the misplaced counter.
    pub fn validated(self) -> Result<Self, PortError> {
        for (slot, counter, expected) in [
            ("toilet_reports", &self.toilet_reports, EntityKind::Toilet),
            ("review_reports", &self.review_reports, EntityKind::Review),
        ] {
            let actual = counter.kind();
            if actual != expected {
                return Err(PortError::Internal(format!(
                    "{slot} counts {actual} records, expected {expected}"
                )));
            }
        }
        Ok(self)
    }
}
