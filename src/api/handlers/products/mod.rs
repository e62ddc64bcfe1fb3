//! Product CRUD over the session-scoped database connection.
//!
//! Every handler follows the same discipline: resolve the session cookie,
//! open a pool from the decoded credentials, do the work, close the pool.
//! The pool never outlives the request.

mod form;
mod storage;
mod types;

pub(crate) use types::Product;

use axum::{
    extract::{Extension, FromRequest, Multipart, Path, Request},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;

use super::{internal_error, require_session};
use crate::{db, session::SessionKey};

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "product not found"})),
    )
        .into_response()
}

async fn read_form(request: Request) -> Result<form::ProductForm, Response> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|_| form::bad_request("expected a multipart form"))?;

    form::parse(&mut multipart).await
}

#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "All products, newest first"),
        (status = 401, description = "No valid session")
    ),
    tag = "products",
)]
/// List all products.
pub async fn list(headers: HeaderMap, key: Extension<Arc<SessionKey>>) -> Response {
    let credentials = match require_session(&headers, &key) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };

    let pool = match db::pool(&credentials).await {
        Ok(pool) => pool,
        Err(err) => return internal_error(&err),
    };

    let result = storage::list_products(&pool).await;
    pool.close().await;

    match result {
        Ok(products) => (StatusCode::OK, Json(json!({ "products": products }))).into_response(),
        Err(err) => internal_error(&err),
    }
}

#[utoipa::path(
    post,
    path = "/api/products",
    responses(
        (status = 201, description = "Product created", body = Product),
        (status = 400, description = "Invalid form data or oversized image"),
        (status = 401, description = "No valid session")
    ),
    tag = "products",
)]
/// Create a product from a multipart form, optional image included.
pub async fn create(
    headers: HeaderMap,
    key: Extension<Arc<SessionKey>>,
    request: Request,
) -> Response {
    // The session gate comes first: an unauthenticated request gets the same
    // 401 no matter what its body looks like.
    let credentials = match require_session(&headers, &key) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };

    // Validate the form before paying for a connection.
    let product_form = match read_form(request).await {
        Ok(product_form) => product_form,
        Err(response) => return response,
    };

    let pool = match db::pool(&credentials).await {
        Ok(pool) => pool,
        Err(err) => return internal_error(&err),
    };

    let result = storage::insert_product(&pool, &product_form).await;
    pool.close().await;

    match result {
        Ok(product) => (StatusCode::CREATED, Json(json!({ "product": product }))).into_response(),
        Err(err) => internal_error(&err),
    }
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product updated", body = Product),
        (status = 400, description = "Invalid form data or oversized image"),
        (status = 401, description = "No valid session"),
        (status = 404, description = "Unknown product id")
    ),
    tag = "products",
)]
/// Update a product. `keepImage=true` preserves the stored image when no new
/// one is uploaded; otherwise a missing image clears it.
pub async fn update(
    headers: HeaderMap,
    key: Extension<Arc<SessionKey>>,
    Path(id): Path<i32>,
    request: Request,
) -> Response {
    let credentials = match require_session(&headers, &key) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };

    let product_form = match read_form(request).await {
        Ok(product_form) => product_form,
        Err(response) => return response,
    };

    let pool = match db::pool(&credentials).await {
        Ok(pool) => pool,
        Err(err) => return internal_error(&err),
    };

    let result = storage::update_product(&pool, id, &product_form).await;
    pool.close().await;

    match result {
        Ok(Some(product)) => (StatusCode::OK, Json(json!({ "product": product }))).into_response(),
        Ok(None) => not_found(),
        Err(err) => internal_error(&err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 401, description = "No valid session"),
        (status = 404, description = "Unknown product id")
    ),
    tag = "products",
)]
/// Delete a product.
pub async fn remove(
    headers: HeaderMap,
    key: Extension<Arc<SessionKey>>,
    Path(id): Path<i32>,
) -> Response {
    let credentials = match require_session(&headers, &key) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };

    let pool = match db::pool(&credentials).await {
        Ok(pool) => pool,
        Err(err) => return internal_error(&err),
    };

    let result = storage::delete_product(&pool, id).await;
    pool.close().await;

    match result {
        Ok(true) => (StatusCode::OK, Json(json!({"success": true}))).into_response(),
        Ok(false) => not_found(),
        Err(err) => internal_error(&err),
    }
}

#[utoipa::path(
    post,
    path = "/api/products/init-table",
    responses(
        (status = 200, description = "Table exists or was created"),
        (status = 401, description = "No valid session")
    ),
    tag = "products",
)]
/// Create the `products` table when missing.
pub async fn init_table(headers: HeaderMap, key: Extension<Arc<SessionKey>>) -> Response {
    let credentials = match require_session(&headers, &key) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };

    let pool = match db::pool(&credentials).await {
        Ok(pool) => pool,
        Err(err) => return internal_error(&err),
    };

    let result = db::ensure_products_table(&pool).await;
    pool.close().await;

    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"success": true, "message": "products table ready"})),
        )
            .into_response(),
        Err(err) => internal_error(&err),
    }
}

#[utoipa::path(
    post,
    path = "/api/products/migrate-status",
    responses(
        (status = 200, description = "Status column present"),
        (status = 401, description = "No valid session")
    ),
    tag = "products",
)]
/// Add the `status` column to tables created before it existed.
pub async fn migrate_status(headers: HeaderMap, key: Extension<Arc<SessionKey>>) -> Response {
    let credentials = match require_session(&headers, &key) {
        Ok(credentials) => credentials,
        Err(response) => return response,
    };

    let pool = match db::pool(&credentials).await {
        Ok(pool) => pool,
        Err(err) => return internal_error(&err),
    };

    let result = db::migrate_status_column(&pool).await;
    pool.close().await;

    match result {
        Ok(added) => {
            let message = if added {
                "status column added"
            } else {
                "status column already exists"
            };
            (
                StatusCode::OK,
                Json(json!({"success": true, "message": message})),
            )
                .into_response()
        }
        Err(err) => internal_error(&err),
    }
}
