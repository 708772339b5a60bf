use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use super::model::{GroupedMembers, MemberTreeNode};

/// Read cache for the aggregated member views. Any member or position write
/// must call [`MemberCache::invalidate`].
///
/// Entries are keyed by the epoch that was current when the reader started
/// computing. A view computed before an invalidation lands under an old
/// epoch and is never served.
#[derive(Clone)]
pub struct MemberCache {
    epoch: Arc<AtomicU64>,
    grouped: Cache<(u64, Option<i32>), GroupedMembers>,
    tree: Cache<(u64, Option<String>), Vec<MemberTreeNode>>,
}

impl MemberCache {
    pub fn new() -> Self {
        Self {
            epoch: Arc::new(AtomicU64::new(0)),
            grouped: Cache::builder()
                .time_to_live(Duration::from_secs(10 * 60))
                .max_capacity(50)
                .build(),
            tree: Cache::builder()
                .time_to_live(Duration::from_secs(10 * 60))
                .max_capacity(50)
                .build(),
        }
    }

    /// Read before computing a view, and pass to the matching `store_*`.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub async fn grouped(&self, generation: Option<i32>) -> Option<GroupedMembers> {
        self.grouped.get(&(self.epoch(), generation)).await
    }

    pub async fn store_grouped(&self, epoch: u64, generation: Option<i32>, grouped: GroupedMembers) {
        if epoch != self.epoch() {
            log::debug!("Dropping grouped members computed before invalidation");
            return;
        }
        self.grouped.insert((epoch, generation), grouped).await;
    }

    pub async fn tree(&self, root: Option<String>) -> Option<Vec<MemberTreeNode>> {
        self.tree.get(&(self.epoch(), root)).await
    }

    pub async fn store_tree(&self, epoch: u64, root: Option<String>, tree: Vec<MemberTreeNode>) {
        if epoch != self.epoch() {
            log::debug!("Dropping member tree computed before invalidation");
            return;
        }
        self.tree.insert((epoch, root), tree).await;
    }

    pub fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.grouped.invalidate_all();
        self.tree.invalidate_all();
        log::debug!("Member cache invalidated");
    }
}

impl Default for MemberCache {
    fn default() -> Self {
        Self::new()
    }
}
