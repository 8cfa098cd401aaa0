//! REST transport tests.
//!
//! Starts an axum stub of the catalog service and talks to it through
//! `HttpCatalogApi`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use catalog_sync::{
    ApiError, Catalog, CatalogApi, DeletedItem, HttpCatalogApi, Item, ItemDraft, ItemPatch,
    QueryError, QueryKey,
};

use crate::support::seed;

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Clone)]
struct Stub {
    items: Arc<Mutex<Vec<Item>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Stub {
    fn new() -> Self {
        Stub {
            items: Arc::new(Mutex::new(seed())),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

fn authorize(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    match headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()) {
        Some("Bearer secret") => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Token Expired!" })),
        )),
    }
}

fn not_found(id: i64) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("Product with id '{id}' not found") })),
    )
}

async fn list(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    authorize(&headers)?;
    stub.queries.lock().unwrap().push(params.clone());
    let needle = params.get("q").map(|q| q.to_lowercase());
    let limit: usize = params
        .get("limit")
        .and_then(|limit| limit.parse().ok())
        .unwrap_or(30);
    let matched: Vec<Item> = stub
        .items
        .lock()
        .unwrap()
        .iter()
        .filter(|item| match &needle {
            Some(needle) => item.title.to_lowercase().contains(needle),
            None => true,
        })
        .cloned()
        .collect();
    let total = matched.len();
    let page: Vec<Item> = matched.into_iter().take(limit).collect();
    Ok(Json(json!({
        "products": page,
        "total": total,
        "skip": 0,
        "limit": limit,
    })))
}

async fn add(State(stub): State<Stub>, headers: HeaderMap, Json(draft): Json<ItemDraft>) -> Reply {
    authorize(&headers)?;
    let mut items = stub.items.lock().unwrap();
    let id = items.iter().map(|item| item.id).max().unwrap_or(0) + 1;
    let item = Item::synthesize(id, &draft);
    items.push(item.clone());
    Ok(Json(json!(item)))
}

async fn update(
    State(stub): State<Stub>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(patch): Json<ItemPatch>,
) -> Reply {
    authorize(&headers)?;
    let mut items = stub.items.lock().unwrap();
    let item = items
        .iter_mut()
        .find(|item| item.id == id)
        .ok_or_else(|| not_found(id))?;
    patch.apply(item);
    Ok(Json(json!(item)))
}

async fn remove(State(stub): State<Stub>, headers: HeaderMap, Path(id): Path<i64>) -> Reply {
    authorize(&headers)?;
    let mut items = stub.items.lock().unwrap();
    let index = items
        .iter()
        .position(|item| item.id == id)
        .ok_or_else(|| not_found(id))?;
    let mut body = json!(items.remove(index));
    body["isDeleted"] = json!(true);
    Ok(Json(body))
}

/// Bind to port 0 and return the actual address.
async fn start_server(stub: Stub) -> String {
    let app = Router::new()
        .route("/products", get(list))
        .route("/products/search", get(list))
        .route("/products/add", post(add))
        .route("/products/:id", put(update).delete(remove))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetch_sends_query_params_and_bearer() {
    let stub = Stub::new();
    let base = start_server(stub.clone()).await;
    let api = HttpCatalogApi::new(format!("{base}/")).with_token("secret");

    let list = api
        .fetch_list(&QueryKey::new().with_limit(3))
        .await
        .unwrap();
    assert_eq!(list.total, 5);
    assert_eq!(list.items.len(), 3);
    assert_eq!(list.items[0].title, "Desk Lamp");

    let queries = stub.queries.lock().unwrap();
    assert_eq!(queries[0].get("limit").map(String::as_str), Some("3"));
    assert!(!queries[0].contains_key("q"));
}

#[tokio::test]
async fn search_terms_use_the_search_route() {
    let stub = Stub::new();
    let base = start_server(stub.clone()).await;
    let api = HttpCatalogApi::new(base).with_token("secret");

    let list = api
        .fetch_list(&QueryKey::new().with_search("phone").with_limit(100))
        .await
        .unwrap();
    assert_eq!(list.total, 2);
    assert!(list.items.iter().all(|item| item.title.starts_with("Phone")));
    assert_eq!(
        stub.queries.lock().unwrap()[0].get("q").map(String::as_str),
        Some("phone")
    );
}

#[tokio::test]
async fn writes_round_trip() {
    let base = start_server(Stub::new()).await;
    let api = HttpCatalogApi::new(base).with_token("secret");

    let created = api
        .create_item(&ItemDraft::new("Widget", "W-1", 9.99))
        .await
        .unwrap();
    assert_eq!(created.id, 6);
    assert_eq!(created.sku, "W-1");

    let patch = ItemPatch {
        price: Some(12.5),
        ..ItemPatch::default()
    };
    let updated = api.update_item(created.id, &patch).await.unwrap();
    assert_eq!(updated.price, 12.5);
    assert_eq!(updated.title, "Widget");

    let deleted: DeletedItem = api.delete_item(created.id).await.unwrap();
    assert!(deleted.is_deleted);
    assert_eq!(deleted.item.id, 6);

    let err = api.delete_item(created.id).await.unwrap_err();
    assert_eq!(err, ApiError::Network("Product with id '6' not found".into()));
}

#[tokio::test]
async fn rejected_credential_runs_hook() {
    let base = start_server(Stub::new()).await;
    let rejected = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&rejected);
    let api = HttpCatalogApi::new(base)
        .with_token("stale")
        .with_unauthorized_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let err = api.fetch_list(&QueryKey::new()).await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized("Token Expired!".into()));
    assert_eq!(rejected.load(Ordering::SeqCst), 1);

    api.set_token(Some("secret".into()));
    api.fetch_list(&QueryKey::new()).await.unwrap();
    assert_eq!(rejected.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn catalog_suspends_on_rejected_session() {
    let base = start_server(Stub::new()).await;
    let catalog = Catalog::new(HttpCatalogApi::new(base).with_token("stale"));
    let prompts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&prompts);
    catalog.on_unauthorized(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let err = catalog.load().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(catalog.state().suspended);
    assert_eq!(prompts.load(Ordering::SeqCst), 1);
    assert_eq!(catalog.load().await.unwrap_err(), QueryError::Suspended);

    catalog.api().set_token(Some("secret".into()));
    catalog.reauthenticated();
    let list = catalog.load().await.unwrap();
    assert_eq!(list.total, 5);
    assert!(!catalog.state().suspended);
}
