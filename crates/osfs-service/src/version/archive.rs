//! Cold-storage archive backfill.

use tracing::{debug, info, warn};

use osfs_core::result::AppResult;
use osfs_core::types::VersionId;

use super::service::VersionService;

impl VersionService {
    /// Copy `archive`/`vault` pointers onto a version from an earlier
    /// version anywhere in the system with the same sha256 that already
    /// has them.
    ///
    /// Returns whether a match was applied. A version that already has
    /// archive info, or has no sha256, is left alone.
    pub async fn find_matching_archive(&self, version_id: VersionId) -> AppResult<bool> {
        let mut version = self.get_version_record(version_id).await?;
        if version.has_archive() {
            return Ok(false);
        }
        let Some(sha256) = version.sha256.clone() else {
            return Ok(false);
        };

        let Some(source) = self
            .store()
            .find_archived_by_sha256(&sha256, &version)
            .await?
        else {
            debug!(version_id = %version_id, "No archived version with matching content");
            return Ok(false);
        };
        let Some(info) = source.archive_info() else {
            return Ok(false);
        };

        version.update_metadata(&info);
        self.store().update_version_metadata(&version).await?;
        info!(
            version_id = %version_id,
            source_id = %source.id,
            "Backfilled archive info from matching version"
        );
        Ok(true)
    }

    /// Try [`Self::find_matching_archive`] on up to `batch` versions that
    /// lack archive info. Failures on single versions are logged and skipped.
    pub async fn archive_sweep(&self, batch: u64) -> AppResult<usize> {
        let pending = self.store().find_unarchived_versions(batch).await?;
        let mut matched = 0;
        for version in pending {
            match self.find_matching_archive(version.id).await {
                Ok(true) => matched += 1,
                Ok(false) => {}
                Err(e) => warn!(version_id = %version.id, error = %e, "Archive match failed"),
            }
        }
        Ok(matched)
    }
}
