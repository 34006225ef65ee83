//! Duplicate unifier
//!
//! Folds active accounts sharing a normalized phone into one elected master
//! and tombstones the rest. A group whose writes fail is logged and skipped;
//! the run ends with a force-clean pull so the local cache drops the victims.

use std::sync::Arc;

use chrono::Utc;
use loyalty_core::reconcile::{group_by_phone, unify_group};
use loyalty_core::{AccountRecord, RemoteStore, RepoResult, SyncEvent, UnifiedGroup};
use tracing::{error, info, instrument};

use super::error::{SyncError, SyncResult};
use super::sync::{PullOptions, SyncEngine};
use crate::dto::UnifyReport;

pub struct DuplicateUnifier {
    remote: Arc<dyn RemoteStore>,
    engine: Arc<SyncEngine>,
}

impl DuplicateUnifier {
    pub fn new(remote: Arc<dyn RemoteStore>, engine: Arc<SyncEngine>) -> Self {
        Self { remote, engine }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> SyncResult<UnifyReport> {
        let records = self.remote.fetch_accounts().await.map_err(SyncError::Remote)?;
        let groups = group_by_phone(records.iter().filter_map(AccountRecord::as_active));

        let now = Utc::now();
        let mut report = UnifyReport::default();

        for (phone, members) in &groups {
            let Some(group) = unify_group(members, now) else {
                continue;
            };

            match self.apply(&group).await {
                Ok(()) => {
                    info!(
                        phone = %phone.as_str(),
                        master = %group.master.email,
                        folded = group.tombstones.len(),
                        "Duplicate group unified"
                    );
                    report.groups_merged += 1;
                    report.records_deleted += group.tombstones.len();
                }
                Err(e) => {
                    error!(phone = %phone.as_str(), error = %e, "Skipping duplicate group");
                    report.groups_failed += 1;
                }
            }
        }

        if report.groups_merged > 0 {
            self.engine
                .bus()
                .publish(SyncEvent::accounts_unified(report.groups_merged, report.records_deleted));
        }

        self.engine.pull(PullOptions::force_clean()).await?;

        info!(
            groups_merged = report.groups_merged,
            records_deleted = report.records_deleted,
            groups_failed = report.groups_failed,
            "Unification finished"
        );
        Ok(report)
    }

    /// Master first, then one tombstone per victim
    async fn apply(&self, group: &UnifiedGroup) -> RepoResult<()> {
        self.remote
            .upsert_accounts(std::slice::from_ref(&group.master))
            .await?;
        for tombstone in &group.tombstones {
            self.remote.upsert_tombstone(tombstone).await?;
        }
        Ok(())
    }
}
