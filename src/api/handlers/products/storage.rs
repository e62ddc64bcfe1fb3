//! SQL for the `products` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::Instrument;

use super::form::ProductForm;
use super::types::Product;

pub(super) async fn list_products(pool: &PgPool) -> Result<Vec<Product>> {
    let query = r"
        SELECT id, name, description, price, stock, status, image,
               created_at::text AS created_at, updated_at::text AS updated_at
        FROM products
        ORDER BY created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list products")?;

    Ok(rows.iter().map(Product::from_row).collect())
}

pub(super) async fn insert_product(pool: &PgPool, form: &ProductForm) -> Result<Product> {
    let query = r"
        INSERT INTO products (name, description, price, stock, status, image)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, name, description, price, stock, status, image,
                  created_at::text AS created_at, updated_at::text AS updated_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(&form.name)
        .bind(form.description.as_deref())
        .bind(form.price)
        .bind(form.stock)
        .bind(&form.status)
        .bind(form.image.as_deref())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert product")?;

    Ok(Product::from_row(&row))
}

/// Update a product. `None` when the id does not exist.
///
/// Image semantics follow the upload form: a new image replaces the blob,
/// `keep_image` preserves it, and neither clears it.
pub(super) async fn update_product(
    pool: &PgPool,
    id: i32,
    form: &ProductForm,
) -> Result<Option<Product>> {
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE"
    );

    let row = if let Some(image) = form.image.as_deref() {
        let query = r"
            UPDATE products
            SET name = $1, description = $2, price = $3, stock = $4, status = $5,
                image = $6, updated_at = CURRENT_TIMESTAMP
            WHERE id = $7
            RETURNING id, name, description, price, stock, status, image,
                      created_at::text AS created_at, updated_at::text AS updated_at
        ";
        sqlx::query(query)
            .bind(&form.name)
            .bind(form.description.as_deref())
            .bind(form.price)
            .bind(form.stock)
            .bind(&form.status)
            .bind(image)
            .bind(id)
            .fetch_optional(pool)
            .instrument(span)
            .await
    } else if form.keep_image {
        let query = r"
            UPDATE products
            SET name = $1, description = $2, price = $3, stock = $4, status = $5,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $6
            RETURNING id, name, description, price, stock, status, image,
                      created_at::text AS created_at, updated_at::text AS updated_at
        ";
        sqlx::query(query)
            .bind(&form.name)
            .bind(form.description.as_deref())
            .bind(form.price)
            .bind(form.stock)
            .bind(&form.status)
            .bind(id)
            .fetch_optional(pool)
            .instrument(span)
            .await
    } else {
        let query = r"
            UPDATE products
            SET name = $1, description = $2, price = $3, stock = $4, status = $5,
                image = NULL, updated_at = CURRENT_TIMESTAMP
            WHERE id = $6
            RETURNING id, name, description, price, stock, status, image,
                      created_at::text AS created_at, updated_at::text AS updated_at
        ";
        sqlx::query(query)
            .bind(&form.name)
            .bind(form.description.as_deref())
            .bind(form.price)
            .bind(form.stock)
            .bind(&form.status)
            .bind(id)
            .fetch_optional(pool)
            .instrument(span)
            .await
    }
    .context("failed to update product")?;

    Ok(row.as_ref().map(Product::from_row))
}

/// Delete a product. `false` when the id does not exist.
pub(super) async fn delete_product(pool: &PgPool, id: i32) -> Result<bool> {
    let query = "DELETE FROM products WHERE id = $1 RETURNING id";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to delete product")?;

    Ok(row.is_some())
}
