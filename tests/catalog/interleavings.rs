//! Random interleavings of optimistic mutations with random outcomes.
//!
//! Whatever the order in which mutations begin and settle, the cached list
//! must end up holding exactly what the server holds, and a run where every
//! mutation fails must leave the cache exactly as it was.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use catalog_sync::{
    ApiError, CacheEntry, CatalogApi, DeletedItem, InMemoryCatalogApi, Item, ItemDraft, ItemId,
    ItemPatch, ListResult, MutationCoordinator, QueryCache, QueryKey,
};
use proptest::prelude::*;
use tokio::task::LocalSet;
use tokio::time::sleep;

use crate::support::seed;

/// Per-record latency and verdict, keyed by `sku:<sku>` or `id:<id>`.
type Script = HashMap<String, (Duration, bool)>;

/// Wraps the in-memory collection, answering each write after its
/// scripted latency and rejecting the ones scripted to fail.
struct ScriptedApi {
    inner: InMemoryCatalogApi,
    script: Script,
}

impl ScriptedApi {
    async fn gate(&self, tag: String) -> Result<(), ApiError> {
        let (latency, succeeds) = self.script.get(&tag).copied().unwrap_or_default();
        sleep(latency).await;
        if succeeds {
            Ok(())
        } else {
            Err(ApiError::Network(format!("{tag} rejected")))
        }
    }
}

impl CatalogApi for ScriptedApi {
    async fn fetch_list(&self, key: &QueryKey) -> Result<ListResult, ApiError> {
        self.inner.fetch_list(key).await
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, ApiError> {
        self.gate(format!("sku:{}", draft.sku)).await?;
        self.inner.create_item(draft).await
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> Result<Item, ApiError> {
        self.gate(format!("id:{id}")).await?;
        self.inner.update_item(id, patch).await
    }

    async fn delete_item(&self, id: ItemId) -> Result<DeletedItem, ApiError> {
        self.gate(format!("id:{id}")).await?;
        self.inner.delete_item(id).await
    }
}

#[derive(Debug, Clone)]
enum Write {
    Create(ItemDraft),
    Update(ItemId, ItemPatch),
    Delete(ItemId),
}

impl Write {
    fn tag(&self) -> String {
        match self {
            Write::Create(draft) => format!("sku:{}", draft.sku),
            Write::Update(id, _) | Write::Delete(id) => format!("id:{id}"),
        }
    }
}

#[derive(Debug, Clone)]
struct Step {
    write: Write,
    start: Duration,
    latency: Duration,
    succeeds: bool,
}

/// Up to eight writes. Updates and deletes each take a distinct seeded id,
/// so none is turned away as busy; once the ids run out the rest are
/// creates.
fn steps() -> impl Strategy<Value = Vec<Step>> {
    let raw = prop::collection::vec((0u8..3, 0u64..100, 1u64..100, any::<bool>()), 1..8);
    let ids = Just(seed().iter().map(|item| item.id).collect::<Vec<_>>()).prop_shuffle();
    (raw, ids).prop_map(|(raw, mut ids)| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (kind, start, latency, succeeds))| {
                let write = match (kind, ids.pop()) {
                    (1, Some(id)) => Write::Update(
                        id,
                        ItemPatch {
                            price: Some(100.0 + i as f64),
                            stock: Some(i as u32),
                            ..ItemPatch::default()
                        },
                    ),
                    (2, Some(id)) => Write::Delete(id),
                    _ => Write::Create(ItemDraft::new(
                        format!("New {i}"),
                        format!("N-{i}"),
                        1.0 + i as f64,
                    )),
                };
                Step {
                    write,
                    start: Duration::from_millis(start),
                    latency: Duration::from_millis(latency),
                    succeeds,
                }
            })
            .collect()
    })
}

fn all_items() -> QueryKey {
    QueryKey::new().with_limit(100)
}

struct Run {
    before: Vec<CacheEntry>,
    after: Vec<CacheEntry>,
    cached: ListResult,
    server: Vec<Item>,
    pending: usize,
}

async fn play(steps: Vec<Step>) -> Run {
    let script: Script = steps
        .iter()
        .map(|step| (step.write.tag(), (step.latency, step.succeeds)))
        .collect();
    let api = Arc::new(ScriptedApi {
        inner: InMemoryCatalogApi::with_items(seed()),
        script,
    });
    let cache = QueryCache::new();
    for key in [all_items(), QueryKey::new().with_search("phone").with_limit(100)] {
        let fetch = Arc::clone(&api);
        cache
            .request(&key, |key| async move { fetch.fetch_list(&key).await })
            .await
            .unwrap();
    }
    let coordinator = MutationCoordinator::new(Arc::clone(&api), cache);
    let before = coordinator.cache().entries();

    let handles: Vec<_> = steps
        .into_iter()
        .map(|step| {
            let coordinator = coordinator.clone();
            tokio::task::spawn_local(async move {
                sleep(step.start).await;
                let settled = match step.write {
                    Write::Create(draft) => coordinator.create(draft).await.map(drop),
                    Write::Update(id, patch) => coordinator.update(id, patch).await.map(drop),
                    Write::Delete(id) => coordinator.delete(id).await.map(drop),
                };
                assert_eq!(settled.is_ok(), step.succeeds, "{:?}", settled);
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    Run {
        before,
        after: coordinator.cache().entries(),
        cached: coordinator.cache().data(&all_items()).unwrap(),
        server: api.inner.items(),
        pending: coordinator.pending().len(),
    }
}

fn run(steps: Vec<Step>) -> Run {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();
    LocalSet::new().block_on(&runtime, play(steps))
}

fn by_id(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by_key(|item| item.id);
    items
}

proptest! {
    #[test]
    fn cache_converges_on_server_state(steps in steps()) {
        let run = run(steps);
        prop_assert_eq!(run.pending, 0);
        prop_assert_eq!(run.cached.total, run.server.len() as u64);
        prop_assert_eq!(by_id(run.cached.items), by_id(run.server));
    }

    #[test]
    fn failures_alone_restore_every_entry(steps in steps()) {
        let steps = steps
            .into_iter()
            .map(|step| Step { succeeds: false, ..step })
            .collect();
        let run = run(steps);
        prop_assert_eq!(run.pending, 0);
        prop_assert_eq!(run.after, run.before);
        prop_assert_eq!(by_id(run.server), by_id(seed()));
    }
}
