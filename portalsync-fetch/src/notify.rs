//! Log-backed notifier.

use async_trait::async_trait;
use portalsync_core::{ArtifactRecord, CoreError, Notifier, VendorKind};
use tracing::{info, warn};

/// Notifier that reports events through `tracing`.
///
/// Used when no other delivery channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn new_artifacts(
        &self,
        vendor: VendorKind,
        records: &[ArtifactRecord],
    ) -> Result<(), CoreError> {
        for record in records {
            info!(
                vendor = %vendor,
                category = %record.category,
                version = %record.version,
                file = %record.file_name,
                size = record.file_size,
                "New artifact downloaded"
            );
        }
        Ok(())
    }

    async fn login_failure(&self, vendor: VendorKind, reason: &str) -> Result<(), CoreError> {
        warn!(vendor = %vendor, reason = %reason, "Login failed");
        Ok(())
    }
}
