//! Check-out / check-in transitions.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use osfs_core::error::AppError;
use osfs_core::result::AppResult;
use osfs_core::types::{ContainerId, NodeId, UserId};
use osfs_database::store::Store;
use osfs_entity::audit::AuditAction;
use osfs_entity::node::FileNode;

use crate::audit::AuditTrail;
use crate::context::RequestContext;
use crate::tasks::{BackgroundTask, BackgroundTasks};
use crate::tree::TreeService;

/// Manages the per-file checkout lock.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    /// Persistence.
    store: Arc<dyn Store>,
    /// Node lookups.
    tree: Arc<TreeService>,
    /// Audit entries for every transition.
    audit: AuditTrail,
    /// Deferred release sweeps.
    tasks: Arc<dyn BackgroundTasks>,
}

impl CheckoutService {
    /// Creates a new checkout service.
    pub fn new(
        store: Arc<dyn Store>,
        tree: Arc<TreeService>,
        audit: AuditTrail,
        tasks: Arc<dyn BackgroundTasks>,
    ) -> Self {
        Self {
            store,
            tree,
            audit,
            tasks,
        }
    }

    /// Move a file between `free` and `checked_out_by(user)`.
    ///
    /// `Some(user)` checks the file out to `user`; `None` checks it in.
    /// Asking for the state the file is already in fails with `Duplicate`,
    /// checking out a file held by someone else fails with `CheckedOut`,
    /// and only the holder, an admin or the system may check a file in.
    /// A free file may be checked out to any user by any actor.
    pub async fn check_in_or_out(
        &self,
        ctx: &RequestContext,
        file_id: NodeId,
        target: Option<UserId>,
    ) -> AppResult<FileNode> {
        let file = self.tree.get_file(file_id).await?;

        let action = match (file.checkout, target) {
            (Some(holder), Some(user)) if holder == user => {
                let mut err = AppError::duplicate(format!(
                    "File {file_id} is already checked out by {user}"
                ))
                .for_node(file_id);
                err.detail.user_id = Some(holder.into());
                return Err(err);
            }
            (Some(holder), Some(_)) => {
                return Err(AppError::checked_out(file_id, Some(holder.into())));
            }
            (None, None) => {
                return Err(
                    AppError::duplicate(format!("File {file_id} is not checked out")).for_node(file_id)
                );
            }
            (None, Some(_)) => AuditAction::CheckedOut,
            (Some(holder), None) => {
                if !ctx.is(holder) && !ctx.can_override_checkout() {
                    let mut err = AppError::authorization(format!(
                        "File {file_id} is checked out by another user"
                    ))
                    .for_node(file_id);
                    err.detail.user_id = Some(holder.into());
                    return Err(err);
                }
                AuditAction::CheckedIn
            }
        };

        let mut updated = file.clone();
        updated.checkout = target;
        updated.modified_at = ctx.request_time;
        let updated = self.store.update_node(&updated).await?;

        info!(
            file_id = %file_id,
            action = %action,
            user_id = ?ctx.user_id,
            "Checkout transition"
        );
        self.audit
            .record(
                ctx,
                action,
                &updated,
                json!({ "checkout": target, "previous": file.checkout }),
            )
            .await;
        Ok(updated)
    }

    /// Files `user` currently holds, optionally within one container.
    pub async fn checked_out_by(
        &self,
        user: UserId,
        container: Option<ContainerId>,
    ) -> AppResult<Vec<FileNode>> {
        self.store.find_checked_out_by(user, container).await
    }

    /// Check in every file `user` holds in scope. Files that fail to
    /// update are logged and skipped; running the sweep again converges.
    /// Returns the number of files released.
    pub async fn release_user_checkouts(
        &self,
        user: UserId,
        container: Option<ContainerId>,
    ) -> AppResult<usize> {
        let ctx = RequestContext::system();
        let held = self.store.find_checked_out_by(user, container).await?;

        let mut released = 0;
        for file in held {
            let mut updated = file.clone();
            updated.checkout = None;
            updated.modified_at = ctx.request_time;
            match self.store.update_node(&updated).await {
                Ok(updated) => {
                    released += 1;
                    self.audit
                        .record(
                            &ctx,
                            AuditAction::CheckedIn,
                            &updated,
                            json!({ "checkout": null, "previous": user, "forced": true }),
                        )
                        .await;
                }
                Err(e) => warn!(
                    file_id = %file.id,
                    user_id = %user,
                    error = %e,
                    "Failed to release checkout"
                ),
            }
        }

        info!(user_id = %user, container_id = ?container, released, "Released checkouts");
        Ok(released)
    }

    /// Queue [`Self::release_user_checkouts`] for a user leaving a
    /// container (or the system, when `container` is `None`). Never fails.
    pub async fn schedule_release(&self, user: UserId, container: Option<ContainerId>) {
        let task = BackgroundTask::ReleaseCheckouts {
            user_id: user,
            container_id: container,
        };
        if let Err(e) = self.tasks.dispatch(task).await {
            warn!(user_id = %user, error = %e, "Failed to queue checkout release");
        }
    }
}
