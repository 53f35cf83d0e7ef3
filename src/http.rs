//! JSON API over the catalog

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, put}, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use validator::Validate;

use crate::domain::aggregates::{CategoryError, CategoryManager, ProductQuery};
use crate::domain::category_tree::{CategoryForest, ParentOption, ProductCounts, TreeError};
use crate::domain::events::CategoryEvent;
use crate::domain::resolve_breadcrumb_path;
use crate::domain::value_objects::MaxLevels;
use crate::domain::CategoryTreeBuilder;
use crate::store::CatalogStore;
use crate::{CategoryId, CategoryRecord, Product, StoreError};

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub builder: CategoryTreeBuilder,
    pub max_levels: MaxLevels,
    pub nats: Option<async_nats::Client>,
    /// Serialises load-mutate-save cycles on the category list.
    write_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, builder: CategoryTreeBuilder, max_levels: MaxLevels) -> Self {
        Self { store, builder, max_levels, nats: None, write_lock: Arc::new(Mutex::new(())) }
    }

    pub fn with_nats(mut self, nats: Option<async_nats::Client>) -> Self {
        self.nats = nats;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-catalog"})) }))
        .route("/api/v1/categories", get(list_categories).post(create_category))
        .route("/api/v1/categories/:id", put(update_category).delete(delete_category).get(get_category))
        .route("/api/v1/categories/:id/breadcrumb", get(breadcrumb))
        .route("/api/v1/category-tree", get(category_tree))
        .route("/api/v1/category-parent-options", get(parent_options))
        .route("/api/v1/products", get(list_products))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

fn store_error(e: StoreError) -> ApiError {
    tracing::error!(error = %e, "catalog store failure");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn tree_error(e: TreeError) -> ApiError {
    tracing::warn!(error = %e, "category data integrity violation");
    (StatusCode::CONFLICT, e.to_string())
}

fn category_error(e: CategoryError) -> ApiError {
    let status = match &e {
        CategoryError::NotFound(_) => StatusCode::NOT_FOUND,
        CategoryError::ParentNotFound(_) | CategoryError::InvalidName(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CategoryError::HasChildren(_) | CategoryError::InvalidParent { .. } | CategoryError::DepthExceeded { .. } | CategoryError::IdSpaceExhausted => StatusCode::CONFLICT,
        CategoryError::Tree(t) => return tree_error(t.clone()),
    };
    (status, e.to_string())
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<CategoryRecord>>, ApiError> {
    Ok(Json(s.store.load_categories().await.map_err(store_error)?))
}

async fn get_category(State(s): State<AppState>, Path(id): Path<CategoryId>) -> Result<Json<CategoryRecord>, ApiError> {
    let categories = s.store.load_categories().await.map_err(store_error)?;
    categories.into_iter().find(|c| c.id == id).map(Json).ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))
}

async fn create_category(State(s): State<AppState>, Json(r): Json<CategoryRequest>) -> Result<(StatusCode, Json<CategoryRecord>), ApiError> {
    r.validate().map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let c = mutate(&s, |m| m.create(&r.name, r.parent_id).cloned()).await?;
    Ok((StatusCode::CREATED, Json(c)))
}

async fn update_category(State(s): State<AppState>, Path(id): Path<CategoryId>, Json(r): Json<CategoryRequest>) -> Result<Json<CategoryRecord>, ApiError> {
    r.validate().map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let c = mutate(&s, |m| m.update(id, &r.name, r.parent_id).cloned()).await?;
    Ok(Json(c))
}

async fn delete_category(State(s): State<AppState>, Path(id): Path<CategoryId>) -> Result<StatusCode, ApiError> {
    mutate(&s, |m| m.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn breadcrumb(State(s): State<AppState>, Path(id): Path<CategoryId>) -> Result<Json<Vec<CategoryRecord>>, ApiError> {
    let categories = s.store.load_categories().await.map_err(store_error)?;
    Ok(Json(resolve_breadcrumb_path(&categories, id).map_err(tree_error)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TreeParams { pub with_counts: Option<bool> }

async fn category_tree(State(s): State<AppState>, Query(p): Query<TreeParams>) -> Result<Json<CategoryForest>, ApiError> {
    let categories = s.store.load_categories().await.map_err(store_error)?;
    let mut forest = s.builder.build(&categories).map_err(tree_error)?;
    if p.with_counts.unwrap_or(false) {
        let products = s.store.load_products().await.map_err(store_error)?;
        forest.annotate_product_counts(&ProductCounts::from_products(&products));
    }
    Ok(Json(forest))
}

#[derive(Debug, Default, Deserialize)]
pub struct ParentOptionParams { pub exclude: Option<CategoryId> }

async fn parent_options(State(s): State<AppState>, Query(p): Query<ParentOptionParams>) -> Result<Json<Vec<ParentOption>>, ApiError> {
    let categories = s.store.load_categories().await.map_err(store_error)?;
    let forest = s.builder.build(&categories).map_err(tree_error)?;
    Ok(Json(forest.parent_options(s.max_levels, p.exclude)))
}

// =============================================================================
// Products
// =============================================================================

async fn list_products(State(s): State<AppState>, Query(q): Query<ProductQuery>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = s.store.load_products().await.map_err(store_error)?;
    Ok(Json(q.apply(&products).into_iter().cloned().collect()))
}

// =============================================================================
// Mutation plumbing
// =============================================================================

/// Loads the list, applies `f`, saves, then publishes the raised events.
/// The whole tree is rebuilt from the new list before anything is saved.
async fn mutate<T>(s: &AppState, f: impl FnOnce(&mut CategoryManager) -> Result<T, CategoryError>) -> Result<T, ApiError> {
    let guard = s.write_lock.lock().await;
    let records = s.store.load_categories().await.map_err(store_error)?;
    let mut manager = CategoryManager::load(records, s.builder, s.max_levels).map_err(category_error)?;
    let out = f(&mut manager).map_err(category_error)?;
    s.store.save_categories(manager.records()).await.map_err(store_error)?;
    drop(guard);
    publish(s, manager.take_events()).await;
    Ok(out)
}

async fn publish(s: &AppState, events: Vec<CategoryEvent>) {
    let Some(nats) = &s.nats else { return };
    for event in events {
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => { tracing::warn!(error = %e, "failed to encode category event"); continue; }
        };
        if let Err(e) = nats.publish(event.subject(), payload.into()).await {
            tracing::warn!(error = %e, category_id = event.category_id(), "failed to publish category event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrphanPolicy;
    use crate::store::InMemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    fn product(id: i64, name: &str, price: i64, category_id: CategoryId) -> Product {
        Product {
            id, name: name.into(), description: String::new(), price: Decimal::new(price, 0),
            discount_percentage: Decimal::ZERO, category_id, image_url: String::new(), featured: false,
            stock_quantity: 1, created_at: None,
        }
    }

    fn state_with(categories: Vec<CategoryRecord>, policy: OrphanPolicy) -> AppState {
        let products = vec![product(1, "Case", 20, 3), product(2, "Phone", 300, 2), product(3, "Cable", 5, 3)];
        let store = Arc::new(InMemoryStore::new(categories, products));
        AppState::new(store, CategoryTreeBuilder::new(policy), MaxLevels::default())
    }

    fn seeded() -> AppState {
        state_with(
            vec![
                CategoryRecord::new(1, "Electronics", None).unwrap(),
                CategoryRecord::new(2, "Phones", Some(1)).unwrap(),
                CategoryRecord::new(3, "Accessories", Some(2)).unwrap(),
            ],
            OrphanPolicy::Promote,
        )
    }

    async fn send(state: &AppState, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => { req = req.header("content-type", "application/json"); Body::from(json.to_string()) }
            None => Body::empty(),
        };
        let resp = router(state.clone()).oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())) };
        (status, json)
    }

    #[tokio::test]
    async fn test_tree_with_counts() {
        let state = seeded();
        let (status, body) = send(&state, "GET", "/api/v1/category-tree?with_counts=true", None).await;
        assert_eq!(status, StatusCode::OK);
        let root = &body["roots"][0];
        assert_eq!(root["id"], 1);
        assert_eq!(root["product_count"], 0);
        assert_eq!(root["children"][0]["level"], 1);
        assert_eq!(root["children"][0]["product_count"], 1);
        assert_eq!(root["children"][0]["children"][0]["product_count"], 2);
    }

    #[tokio::test]
    async fn test_breadcrumb_endpoint() {
        let state = seeded();
        let (status, body) = send(&state, "GET", "/api/v1/categories/3/breadcrumb", None).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body.as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap().to_string()).collect();
        assert_eq!(names, vec!["Electronics", "Phones", "Accessories"]);
        let (_, body) = send(&state, "GET", "/api/v1/categories/99/breadcrumb", None).await;
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_create_when_ids_exhausted_conflicts() {
        let state = state_with(vec![CategoryRecord::new(i64::MAX, "Everything", None).unwrap()], OrphanPolicy::Promote);
        let (status, _) = send(&state, "POST", "/api/v1/categories", Some(serde_json::json!({"name": "More"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (_, body) = send(&state, "GET", "/api/v1/category-tree", None).await;
        assert_eq!(body["roots"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_create_update_delete_flow() {
        let state = seeded();
        let (status, body) = send(&state, "POST", "/api/v1/categories", Some(serde_json::json!({"name": "Smart Watches", "parent_id": 1}))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 4);
        assert_eq!(body["slug"], "smart-watches");

        let (status, _) = send(&state, "POST", "/api/v1/categories", Some(serde_json::json!({"name": "Cables", "parent_id": 3}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&state, "PUT", "/api/v1/categories/4", Some(serde_json::json!({"name": "Wearables", "parent_id": null}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slug"], "wearables");

        let (status, _) = send(&state, "DELETE", "/api/v1/categories/2", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(&state, "DELETE", "/api/v1/categories/4", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, "GET", "/api/v1/categories/4", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(state.store.load_categories().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_create_validates_name() {
        let state = seeded();
        let (status, _) = send(&state, "POST", "/api/v1/categories", Some(serde_json::json!({"name": ""}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = send(&state, "POST", "/api/v1/categories", Some(serde_json::json!({"name": "Toys", "parent_id": 50}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_parent_options_endpoint() {
        let state = seeded();
        let (_, body) = send(&state, "GET", "/api/v1/category-parent-options", None).await;
        let ids: Vec<_> = body.as_array().unwrap().iter().map(|o| o["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2]);
        let (_, body) = send(&state, "GET", "/api/v1/category-parent-options?exclude=2", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_integrity_errors_are_conflicts() {
        let state = state_with(
            vec![CategoryRecord::new(1, "A", Some(2)).unwrap(), CategoryRecord::new(2, "B", Some(1)).unwrap()],
            OrphanPolicy::Promote,
        );
        let (status, _) = send(&state, "GET", "/api/v1/category-tree", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(&state, "GET", "/api/v1/categories/1/breadcrumb", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_orphans_follow_policy() {
        let categories = vec![CategoryRecord::new(1, "Electronics", None).unwrap(), CategoryRecord::new(5, "Orphan", Some(99)).unwrap()];
        let (_, body) = send(&state_with(categories.clone(), OrphanPolicy::Promote), "GET", "/api/v1/category-tree", None).await;
        assert_eq!(body["roots"].as_array().unwrap().len(), 2);
        assert_eq!(body["warnings"][0]["kind"], "dangling_parent");

        let (_, body) = send(&state_with(categories, OrphanPolicy::Drop), "GET", "/api/v1/category-tree", None).await;
        assert_eq!(body["roots"].as_array().unwrap().len(), 1);
        assert_eq!(body["dropped"][0]["id"], 5);
    }

    #[tokio::test]
    async fn test_product_listing() {
        let state = seeded();
        let (status, body) = send(&state, "GET", "/api/v1/products?category=3&sort=price-low", None).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<_> = body.as_array().unwrap().iter().map(|p| p["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1]);
        let (_, body) = send(&state, "GET", "/api/v1/products?search=phone", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
