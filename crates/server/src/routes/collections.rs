//! CRUD handlers over the three storefront collections.
//!
//! Input checks (required names, unique category slugs, category deletion
//! guard, product stock status) and category product counts live here; the
//! collections themselves persist whatever they are given.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use common::types::OpResult;
use models::{
    category::slugify, errors::ModelError, product::stock_status, Category, CollectionType, Fields,
    Product, Record, RecordId,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use service::Collection;
use tracing::warn;

use crate::errors::ApiError;
use crate::startup::AppState;

/// Bind `$c` to the collection for `$kind` and evaluate `$body` with it.
macro_rules! dispatch {
    ($state:expr, $kind:expr, $c:ident => $body:expr) => {
        match $kind {
            CollectionType::Products => {
                let $c = &$state.collections.products;
                $body
            }
            CollectionType::Categories => {
                let $c = &$state.collections.categories;
                $body
            }
            CollectionType::Customers => {
                let $c = &$state.collections.customers;
                $body
            }
        }
    };
}

fn parse_kind(raw: &str) -> Result<CollectionType, ApiError> {
    raw.parse().map_err(|e: ModelError| ApiError::not_found(e.to_string()))
}

fn to_json<T: Serialize>(v: &T) -> Result<Value, ApiError> {
    serde_json::to_value(v).map_err(|e| ApiError::internal(e.to_string()))
}

fn decode<T: DeserializeOwned>(v: Value) -> Result<T, ApiError> {
    serde_json::from_value(v).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn finish(ok: bool) -> Result<Json<OpResult>, ApiError> {
    if ok {
        Ok(Json(OpResult { ok }))
    } else {
        Err(ApiError::operation_failed())
    }
}

/// Products and categories both feed the category product counts.
fn affects_counts(kind: CollectionType) -> bool {
    matches!(kind, CollectionType::Products | CollectionType::Categories)
}

async fn reconcile_counts(state: &AppState) {
    if !state.collections.reconcile_product_counts().await {
        warn!("failed to persist category product counts");
    }
}

fn new_record_id() -> RecordId {
    RecordId::Num(Utc::now().timestamp_millis())
}

/// Find the record a path segment refers to. Numeric segments also match
/// string ids with the same text.
async fn resolve<R: Record>(c: &Collection<R>, kind: CollectionType, raw: &str) -> Result<R, ApiError> {
    let parsed = RecordId::parse(raw);
    if let Some(r) = c.find(&parsed).await {
        return Ok(r);
    }
    let text = RecordId::Text(raw.to_string());
    if parsed != text {
        if let Some(r) = c.find(&text).await {
            return Ok(r);
        }
    }
    Err(ApiError::not_found(format!("{kind} record {raw} not found")))
}

pub async fn list(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    let body = dispatch!(state, kind, c => to_json(&c.snapshot().await)?);
    Ok(Json(body))
}

pub async fn refresh(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    dispatch!(state, kind, c => c.refresh().await);
    if affects_counts(kind) {
        reconcile_counts(&state).await;
    }
    let body = dispatch!(state, kind, c => to_json(&c.snapshot().await)?);
    Ok(Json(body))
}

/// Replace the whole collection.
pub async fn replace(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(items): Json<Vec<Value>>,
) -> Result<Json<OpResult>, ApiError> {
    let kind = parse_kind(&kind)?;
    let ok = dispatch!(state, kind, c => c.save_data(decode(Value::Array(items))?).await);
    if affects_counts(kind) {
        reconcile_counts(&state).await;
    }
    finish(ok)
}

pub async fn add(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<OpResult>, ApiError> {
    let kind = parse_kind(&kind)?;
    let Value::Object(mut fields) = body else {
        return Err(ApiError::bad_request("record must be a JSON object"));
    };
    if fields.get("id").map_or(true, Value::is_null) {
        fields.insert("id".into(), to_json(&new_record_id())?);
    }
    match kind {
        CollectionType::Products => add_product(&state, fields).await,
        CollectionType::Categories => add_category(&state, fields).await,
        CollectionType::Customers => {
            let customers = &state.collections.customers;
            finish(customers.add_item(decode(Value::Object(fields))?).await)
        }
    }
}

async fn add_product(state: &AppState, fields: Fields) -> Result<Json<OpResult>, ApiError> {
    let mut product: Product = decode(Value::Object(fields))?;
    if product.name().trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    let stock = product.stock();
    product.set_status(stock_status(stock));

    let products = &state.collections.products;
    if products.find(product.id()).await.is_some() {
        return Err(ApiError::conflict(format!("product {} already exists", product.id())));
    }
    let ok = products.add_item(product).await;
    reconcile_counts(state).await;
    finish(ok)
}

async fn add_category(state: &AppState, mut fields: Fields) -> Result<Json<OpResult>, ApiError> {
    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    let slug = match fields.get("slug").and_then(Value::as_str).map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => slugify(&name),
    };
    if slug.is_empty() {
        return Err(ApiError::bad_request("a slug cannot be derived from this name"));
    }

    let categories = &state.collections.categories;
    if categories.data().await.iter().any(|c| c.slug() == slug) {
        return Err(ApiError::conflict("a category with this slug already exists"));
    }
    fields.insert("slug".into(), Value::String(slug));
    fields.insert("productCount".into(), Value::from(0));

    let category: Category = decode(Value::Object(fields))?;
    let ok = categories.add_item(category).await;
    reconcile_counts(state).await;
    finish(ok)
}

pub async fn update(
    State(state): State<AppState>,
    Path((kind, raw_id)): Path<(String, String)>,
    Json(mut partial): Json<Fields>,
) -> Result<Json<OpResult>, ApiError> {
    let kind = parse_kind(&kind)?;
    let ok = dispatch!(state, kind, c => {
        let id = resolve(c, kind, &raw_id).await?.id().clone();
        prepare_patch(&state, kind, &id, &mut partial).await?;
        c.update_item(&id, &partial).await
    });
    if affects_counts(kind) {
        reconcile_counts(&state).await;
    }
    finish(ok)
}

async fn prepare_patch(
    state: &AppState,
    kind: CollectionType,
    id: &RecordId,
    partial: &mut Fields,
) -> Result<(), ApiError> {
    match kind {
        CollectionType::Products => {
            if let Some(stock) = partial.get("stock").and_then(Value::as_i64) {
                if !partial.contains_key("status") {
                    partial.insert("status".into(), Value::from(stock_status(stock)));
                }
            }
            Ok(())
        }
        CollectionType::Categories => normalize_category_slug(state, id, partial).await,
        CollectionType::Customers => Ok(()),
    }
}

/// A blank slug is re-derived from the (new or current) name; the result
/// must not collide with another category.
async fn normalize_category_slug(state: &AppState, id: &RecordId, partial: &mut Fields) -> Result<(), ApiError> {
    let Some(raw) = partial.get("slug") else {
        return Ok(());
    };
    let requested = raw.as_str().map(str::trim).unwrap_or_default().to_string();
    let categories = state.collections.categories.data().await;
    let slug = if requested.is_empty() {
        let name = partial
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| categories.iter().find(|c| c.id() == id).map(|c| c.name().to_string()))
            .unwrap_or_default();
        slugify(&name)
    } else {
        requested
    };
    if slug.is_empty() {
        return Err(ApiError::bad_request("slug cannot be empty"));
    }
    if categories.iter().any(|c| c.slug() == slug && c.id() != id) {
        return Err(ApiError::conflict("a category with this slug already exists"));
    }
    partial.insert("slug".into(), Value::String(slug));
    Ok(())
}

pub async fn remove(
    State(state): State<AppState>,
    Path((kind, raw_id)): Path<(String, String)>,
) -> Result<Json<OpResult>, ApiError> {
    let kind = parse_kind(&kind)?;
    match kind {
        CollectionType::Products => {
            let products = &state.collections.products;
            let product = resolve(products, kind, &raw_id).await?;
            let ok = products.delete_item(product.id()).await;
            reconcile_counts(&state).await;
            finish(ok)
        }
        CollectionType::Categories => {
            let categories = &state.collections.categories;
            let category = resolve(categories, kind, &raw_id).await?;
            if category.product_count() > 0 {
                return Err(ApiError::conflict(format!(
                    "this category has {} watches; reassign them before deleting",
                    category.product_count()
                )));
            }
            finish(categories.delete_item(category.id()).await)
        }
        CollectionType::Customers => {
            let customers = &state.collections.customers;
            let customer = resolve(customers, kind, &raw_id).await?;
            finish(customers.delete_item(customer.id()).await)
        }
    }
}
