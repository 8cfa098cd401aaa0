//! MutationCoordinator - optimistic create/update/delete with exact rollback.
//!
//! Every mutation runs the same protocol:
//!
//! 1. validate locally (nothing is sent or touched on failure)
//! 2. snapshot every cached list, cancel in-flight list fetches and mark
//!    their keys stale, apply the optimistic op to every cached list,
//!    register the pending mutation
//! 3. call the remote operation
//! 4. on success re-apply the op and reconcile the cache with the server
//!    record; on failure restore the snapshot and replay the ops of later
//!    outstanding mutations
//!
//! Step 2 and the settle half of step 4 each run under the pending-set lock,
//! so no reader sees a mutation half-applied.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::MutationError;
use super::pending::{MutationKind, OptimisticOp, PendingMutation, PendingSet};
use crate::api::{ApiError, CatalogApi};
use crate::model::{
    is_unpersisted, DeletedItem, Item, ItemDraft, ItemId, ItemPatch, ListResult, ValidationError,
};
use crate::query::{all_lists, CacheEvent, QueryCache, QueryKey};
use crate::session::AuthGate;

/// What to do with cached lists once a create is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateReconcile {
    /// Swap in the server record, then mark every list stale so the next
    /// read fetches server-computed fields (rating, ordering, totals).
    #[default]
    Invalidate,
    /// Swap in the server record and keep the lists as they are.
    KeepOptimistic,
}

pub struct MutationCoordinator<A> {
    api: Arc<A>,
    cache: QueryCache,
    pending: Arc<Mutex<PendingSet>>,
    gate: AuthGate,
    reconcile: CreateReconcile,
}

impl<A> Clone for MutationCoordinator<A> {
    fn clone(&self) -> Self {
        MutationCoordinator {
            api: Arc::clone(&self.api),
            cache: self.cache.clone(),
            pending: Arc::clone(&self.pending),
            gate: self.gate.clone(),
            reconcile: self.reconcile,
        }
    }
}

impl<A: CatalogApi> MutationCoordinator<A> {
    pub fn new(api: Arc<A>, cache: QueryCache) -> Self {
        MutationCoordinator {
            api,
            cache,
            pending: Arc::new(Mutex::new(PendingSet::default())),
            gate: AuthGate::new(),
            reconcile: CreateReconcile::default(),
        }
    }

    pub fn with_gate(mut self, gate: AuthGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_reconcile(mut self, reconcile: CreateReconcile) -> Self {
        self.reconcile = reconcile;
        self
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// Outstanding mutations, oldest first.
    pub fn pending(&self) -> Vec<PendingMutation> {
        self.pending.lock().iter().cloned().collect()
    }

    pub fn is_pending(&self, id: ItemId) -> bool {
        self.pending.lock().is_busy(id)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Create a record. A synthesized row with a placeholder id is shown on
    /// top of every cached list until the server answers.
    pub async fn create(&self, draft: ItemDraft) -> Result<Item, MutationError> {
        draft.validate()?;
        let (seq, placeholder) = self.begin(MutationKind::Create, |pending| {
            OptimisticOp::Prepend(Item::synthesize(pending.allocate_placeholder(), &draft))
        })?;

        match self.api.create_item(&draft).await {
            Ok(item) => {
                let created = item.clone();
                self.confirm(seq, move |list| {
                    // A list fetched after the server saved the record
                    // already carries it.
                    if list.contains(created.id) {
                        list.remove(placeholder);
                    } else {
                        list.replace(placeholder, &created);
                    }
                })?;
                if self.reconcile == CreateReconcile::Invalidate {
                    self.cache.invalidate(&all_lists);
                }
                info!(id = item.id, placeholder, "create confirmed");
                Ok(item)
            }
            Err(err) => Err(self.fail(seq, err)),
        }
    }

    /// Submit a partial update. The patch must name at least one field.
    pub async fn update(&self, id: ItemId, patch: ItemPatch) -> Result<Item, MutationError> {
        if is_unpersisted(id) {
            return Err(ValidationError::UnpersistedId(id).into());
        }
        if patch.is_empty() {
            return Err(ValidationError::NothingToUpdate(id).into());
        }
        patch.validate()?;
        let op = OptimisticOp::Merge {
            id,
            patch: patch.clone(),
        };
        let (seq, _) = self.begin(MutationKind::Update, |_| op)?;

        match self.api.update_item(id, &patch).await {
            Ok(item) => {
                let confirmed = item.clone();
                self.confirm(seq, move |list| {
                    list.replace(id, &confirmed);
                })?;
                info!(id, fields = ?patch.fields(), "update confirmed");
                Ok(item)
            }
            Err(err) => Err(self.fail(seq, err)),
        }
    }

    /// Diff an edited row against its last confirmed values and submit only
    /// the fields that changed.
    pub async fn update_changed(
        &self,
        id: ItemId,
        new: &ItemDraft,
        old: &ItemDraft,
    ) -> Result<Item, MutationError> {
        self.update(id, ItemPatch::diff(new, old)).await
    }

    pub async fn delete(&self, id: ItemId) -> Result<DeletedItem, MutationError> {
        if is_unpersisted(id) {
            return Err(ValidationError::UnpersistedId(id).into());
        }
        let (seq, _) = self.begin(MutationKind::Delete, |_| OptimisticOp::Remove(id))?;

        match self.api.delete_item(id).await {
            Ok(deleted) => {
                self.confirm(seq, |_| {})?;
                info!(id, "delete confirmed");
                Ok(deleted)
            }
            Err(err) => Err(self.fail(seq, err)),
        }
    }

    /// React to a rejected session: roll back every outstanding mutation
    /// (newest first), suspend the cache and run the gate's handlers.
    /// Returns the number of mutations aborted. Safe to call repeatedly.
    pub fn handle_unauthorized(&self) -> usize {
        let (aborted, events) = {
            let mut pending = self.pending.lock();
            let aborted = pending.drain();
            let events: Vec<CacheEvent> = aborted
                .iter()
                .rev()
                .filter_map(|mutation| self.cache.restore_deferred(&mutation.snapshot))
                .collect();
            (aborted, events)
        };
        self.cache.notify(events);
        if !aborted.is_empty() {
            warn!(count = aborted.len(), "rolled back outstanding mutations after unauthorized response");
        }
        self.cache.suspend();
        self.gate.trip();
        aborted.len()
    }

    /// Lift the suspension after re-authentication.
    pub fn resume(&self) {
        self.gate.reset();
        self.cache.resume();
    }

    // ========================================================================
    // Protocol steps
    // ========================================================================

    fn begin<F>(&self, kind: MutationKind, make_op: F) -> Result<(u64, ItemId), MutationError>
    where
        F: FnOnce(&mut PendingSet) -> OptimisticOp,
    {
        if self.cache.is_suspended() {
            return Err(MutationError::Suspended);
        }
        let (seq, target, events) = {
            let mut pending = self.pending.lock();
            let op = make_op(&mut *pending);
            let target = op.target();
            if pending.is_busy(target) {
                return Err(MutationError::Busy(target));
            }
            let snapshot = self.cache.snapshot(&all_lists);
            let (fenced, cancelled) = self.cache.cancel_deferred(&all_lists);
            let (_, stale) = self
                .cache
                .invalidate_deferred(&|key: &QueryKey| fenced.contains(key));
            let (_, patched) = self.cache.patch_deferred(&all_lists, |list| op.apply(list));
            let seq = pending.insert(kind, op, snapshot);
            let events: Vec<CacheEvent> =
                cancelled.into_iter().chain(stale).chain(patched).collect();
            (seq, target, events)
        };
        self.cache.notify(events);
        debug!(seq, %kind, id = target, "optimistic change applied");
        Ok((seq, target))
    }

    /// Settle a successful mutation: re-apply its op and run `reconcile` over
    /// the live lists, and fold the confirmed change into the snapshots of
    /// the mutations still outstanding, so a later rollback keeps it.
    ///
    /// Lists fetched while the mutation was in flight may predate the
    /// server applying it; the op is idempotent and lands on them again.
    fn confirm<F>(&self, seq: u64, reconcile: F) -> Result<(), MutationError>
    where
        F: Fn(&mut ListResult),
    {
        let events = {
            let mut pending = self.pending.lock();
            let Some(done) = pending.take(seq) else {
                debug!(seq, "dropping result of aborted mutation");
                return Err(MutationError::Aborted);
            };
            for other in pending.iter_mut() {
                if other.seq < done.seq {
                    other.snapshot.patch(|list| {
                        done.op.apply(list);
                        reconcile(list);
                    });
                } else {
                    other.snapshot.patch(&reconcile);
                }
            }
            let (_, patched) = self.cache.patch_deferred(&all_lists, |list| {
                done.op.apply(list);
                reconcile(list);
            });
            patched
        };
        self.cache.notify(events);
        Ok(())
    }

    /// Settle a failed mutation and pick the error to report. A rejected
    /// credential is reported as such even if a transport hook already
    /// aborted the mutation.
    fn fail(&self, seq: u64, err: ApiError) -> MutationError {
        let rolled_back = self.roll_back(seq);
        if err.is_unauthorized() {
            self.handle_unauthorized();
        }
        if rolled_back || err.is_unauthorized() {
            MutationError::Api(err)
        } else {
            MutationError::Aborted
        }
    }

    /// Restore the snapshot taken before mutation `seq`, then replay every
    /// later outstanding mutation on top and recapture its snapshot.
    fn roll_back(&self, seq: u64) -> bool {
        let (failed, events) = {
            let mut pending = self.pending.lock();
            let Some(failed) = pending.take(seq) else {
                return false;
            };
            let mut events: Vec<CacheEvent> = Vec::new();
            events.extend(self.cache.restore_deferred(&failed.snapshot));
            for later in pending.iter_mut().filter(|other| other.seq > seq) {
                later.snapshot = self.cache.snapshot(&all_lists);
                let (_, patched) = self.cache.patch_deferred(&all_lists, |list| later.op.apply(list));
                events.extend(patched);
            }
            (failed, events)
        };
        self.cache.notify(events);
        warn!(seq, kind = %failed.kind, id = failed.target, "mutation failed, rolled back");
        true
    }
}
