//! Query cache behavior through the public API.

use std::sync::Arc;

use catalog_sync::{
    ApiError, CatalogApi, FetchStatus, ListResult, Operation, QueryCache, QueryError, QueryKey,
    SortField, SortOrder,
};
use tokio::sync::oneshot;

use crate::support::{api, item, loaded};

#[tokio::test]
async fn concurrent_identical_requests_fetch_once() {
    let api = Arc::new(api());
    let cache = QueryCache::new();
    let key = QueryKey::new().with_limit(100);
    let fetch = |key: QueryKey| {
        let api = Arc::clone(&api);
        async move { api.fetch_list(&key).await }
    };

    let (a, b) = tokio::join!(cache.request(&key, fetch), cache.request(&key, fetch));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(api.calls(Operation::FetchList), 1);
}

#[tokio::test]
async fn later_issued_fetch_wins() {
    let cache = QueryCache::new();
    let key = QueryKey::new().with_search("lamp");
    let (release_a, gate_a) = oneshot::channel::<ListResult>();
    let (release_b, gate_b) = oneshot::channel::<ListResult>();

    let fetch_a = cache.refetch(&key, |_| async move {
        gate_a.await.map_err(|_| ApiError::Network("closed".into()))
    });
    let fetch_b = cache.refetch(&key, |_| async move {
        gate_b.await.map_err(|_| ApiError::Network("closed".into()))
    });
    let server = async {
        release_b
            .send(ListResult::new(vec![item(1, "Lamp v2", "L-1", 35.0, 1)], 1))
            .unwrap();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        release_a
            .send(ListResult::new(vec![item(1, "Lamp v1", "L-1", 30.0, 1)], 1))
            .unwrap();
    };

    let (a, b, ()) = tokio::join!(fetch_a, fetch_b, server);
    assert_eq!(a, Err(QueryError::Cancelled));
    assert_eq!(b.unwrap().items[0].title, "Lamp v2");

    tokio::task::yield_now().await;
    let entry = cache.get(&key).unwrap();
    assert_eq!(entry.data.unwrap().items[0].title, "Lamp v2");
    assert_eq!(entry.status, FetchStatus::Idle);
}

#[tokio::test]
async fn revisiting_a_query_is_served_from_cache() {
    let catalog = loaded(api()).await;
    assert_eq!(catalog.api().calls(Operation::FetchList), 1);

    let phones = catalog.search("phone").await.unwrap();
    assert_eq!(phones.total, 2);
    let by_price = catalog.sort(SortField::Price, SortOrder::Desc).await.unwrap();
    assert_eq!(by_price.items[0].title, "Phone");
    assert_eq!(catalog.api().calls(Operation::FetchList), 3);

    catalog.unsort().await.unwrap();
    catalog.search("").await.unwrap();
    assert_eq!(catalog.state().total, 5);
    assert_eq!(catalog.api().calls(Operation::FetchList), 3);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_rows_visible() {
    let catalog = loaded(api()).await;
    catalog
        .api()
        .fail_next(Operation::FetchList, ApiError::Network("502 Bad Gateway".into()));

    let err = catalog.refresh().await.unwrap_err();
    assert_eq!(err, QueryError::Api(ApiError::Network("502 Bad Gateway".into())));

    let state = catalog.state();
    assert_eq!(state.rows.len(), 5);
    assert_eq!(state.error, Some(err));
    assert!(!state.loading);

    catalog.refresh().await.unwrap();
    assert_eq!(catalog.state().error, None);
}
