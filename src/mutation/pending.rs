use std::fmt;

use crate::model::{Item, ItemId, ItemPatch, ListResult, NEW_ROW_ID};
use crate::query::CacheSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The optimistic change a mutation makes to every cached list.
///
/// Applying an op twice has the same effect as applying it once, so it can
/// be replayed over a restored snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimisticOp {
    /// Show a synthesized record on top of the list.
    Prepend(Item),
    /// Merge changed fields into a row.
    Merge { id: ItemId, patch: ItemPatch },
    /// Drop a row.
    Remove(ItemId),
}

impl OptimisticOp {
    pub fn target(&self) -> ItemId {
        match self {
            OptimisticOp::Prepend(item) => item.id,
            OptimisticOp::Merge { id, .. } => *id,
            OptimisticOp::Remove(id) => *id,
        }
    }

    pub fn apply(&self, list: &mut ListResult) {
        match self {
            OptimisticOp::Prepend(item) => {
                if !list.contains(item.id) {
                    list.prepend(item.clone());
                }
            }
            OptimisticOp::Merge { id, patch } => {
                list.merge(*id, patch);
            }
            OptimisticOp::Remove(id) => {
                list.remove(*id);
            }
        }
    }
}

/// A submitted mutation whose remote call has not settled.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMutation {
    pub seq: u64,
    pub kind: MutationKind,
    /// The record id, or the placeholder id of an optimistic create.
    pub target: ItemId,
    pub op: OptimisticOp,
    /// List data as it was right before `op` was applied.
    pub snapshot: CacheSnapshot,
}

/// Outstanding mutations in submission order.
#[derive(Debug)]
pub(crate) struct PendingSet {
    next_seq: u64,
    next_placeholder: ItemId,
    entries: Vec<PendingMutation>,
}

impl Default for PendingSet {
    fn default() -> Self {
        PendingSet {
            next_seq: 1,
            next_placeholder: NEW_ROW_ID - 1,
            entries: Vec::new(),
        }
    }
}

impl PendingSet {
    /// Ids for optimistic creates count down from just below the new-row
    /// sentinel, so they never meet a server id or the sentinel.
    pub(crate) fn allocate_placeholder(&mut self) -> ItemId {
        let id = self.next_placeholder;
        self.next_placeholder -= 1;
        id
    }

    pub(crate) fn is_busy(&self, id: ItemId) -> bool {
        self.entries.iter().any(|pending| pending.target == id)
    }

    pub(crate) fn insert(
        &mut self,
        kind: MutationKind,
        op: OptimisticOp,
        snapshot: CacheSnapshot,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(PendingMutation {
            seq,
            kind,
            target: op.target(),
            op,
            snapshot,
        });
        seq
    }

    /// Remove and return the mutation, or `None` if it was already aborted.
    pub(crate) fn take(&mut self, seq: u64) -> Option<PendingMutation> {
        let index = self.entries.iter().position(|pending| pending.seq == seq)?;
        Some(self.entries.remove(index))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &PendingMutation> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut PendingMutation> {
        self.entries.iter_mut()
    }

    pub(crate) fn drain(&mut self) -> Vec<PendingMutation> {
        std::mem::take(&mut self.entries)
    }
}
