//! JSON-file artifact store.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/global_metadata.json
//! <root>/<vendor>/<vendor>_metadata.json
//! <root>/<vendor>/<downloaded artifacts>
//! ```

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use portalsync_core::{AggregateState, ArtifactStore, CoreError, VendorKind, VendorState};

use crate::error::StoreError;
use crate::persistence::{load_json_or_default, save_json};

/// File name of the aggregate state.
pub const AGGREGATE_FILE: &str = "global_metadata.json";

/// Returns the metadata file name of a vendor.
pub fn vendor_metadata_file(vendor: VendorKind) -> String {
    format!("{}_metadata.json", vendor.cli_name())
}

/// [`ArtifactStore`] backed by JSON files.
///
/// Vendor files have a single writer each (that vendor's loop). The
/// aggregate is shared, so its read-modify-write runs under one lock.
#[derive(Debug)]
pub struct JsonArtifactStore {
    root: PathBuf,
    aggregate_lock: Mutex<()>,
}

impl JsonArtifactStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            aggregate_lock: Mutex::new(()),
        }
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a vendor's artifacts and metadata.
    pub fn vendor_dir(&self, vendor: VendorKind) -> PathBuf {
        self.root.join(vendor.cli_name())
    }

    /// Path of a vendor's metadata file.
    pub fn vendor_state_path(&self, vendor: VendorKind) -> PathBuf {
        self.vendor_dir(vendor).join(vendor_metadata_file(vendor))
    }

    /// Path of the aggregate file.
    pub fn aggregate_path(&self) -> PathBuf {
        self.root.join(AGGREGATE_FILE)
    }

    async fn write_aggregate(
        &self,
        vendor: VendorKind,
        state: &VendorState,
    ) -> Result<(), StoreError> {
        let _guard = self.aggregate_lock.lock().await;

        let path = self.aggregate_path();
        let mut aggregate: AggregateState = load_json_or_default(&path).await;
        aggregate.apply(vendor, state, Utc::now());
        save_json(&path, &aggregate).await
    }
}

#[async_trait]
impl ArtifactStore for JsonArtifactStore {
    async fn load_vendor_state(&self, vendor: VendorKind) -> VendorState {
        load_json_or_default(&self.vendor_state_path(vendor)).await
    }

    #[instrument(skip_all, fields(vendor = %vendor))]
    async fn save_vendor_state(
        &self,
        vendor: VendorKind,
        state: &VendorState,
    ) -> Result<(), CoreError> {
        save_json(&self.vendor_state_path(vendor), state).await?;
        debug!(artifacts = state.artifacts.len(), "Vendor state saved");
        Ok(())
    }

    async fn load_aggregate_state(&self) -> AggregateState {
        load_json_or_default(&self.aggregate_path()).await
    }

    #[instrument(skip_all, fields(vendor = %vendor))]
    async fn update_aggregate(
        &self,
        vendor: VendorKind,
        state: &VendorState,
    ) -> Result<(), CoreError> {
        self.write_aggregate(vendor, state).await?;
        debug!("Aggregate state updated");
        Ok(())
    }
}
