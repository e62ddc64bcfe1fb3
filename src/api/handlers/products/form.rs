//! Multipart form parsing for product create/update.

use axum::extract::multipart::{Field, Multipart};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use rust_decimal::Decimal;
use serde_json::json;

pub(super) const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const DEFAULT_STATUS: &str = "activo";

#[derive(Debug)]
pub(super) struct ProductForm {
    pub(super) name: String,
    pub(super) description: Option<String>,
    pub(super) price: Decimal,
    pub(super) stock: i32,
    pub(super) status: String,
    pub(super) image: Option<Vec<u8>>,
    // Update only: keep the stored blob when no new image is uploaded.
    pub(super) keep_image: bool,
}

pub(super) fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}

/// Read the multipart body into a validated form.
///
/// Unknown fields are ignored; an empty image part counts as "no image", the
/// way browsers submit an untouched file input.
pub(super) async fn parse(multipart: &mut Multipart) -> Result<ProductForm, Response> {
    let mut name = None;
    let mut description = None;
    let mut price = None;
    let mut stock = None;
    let mut status = None;
    let mut image = None;
    let mut keep_image = false;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return Err(bad_request("invalid multipart body")),
        };

        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };

        match field_name.as_str() {
            "name" => name = Some(read_text(field).await?),
            "description" => description = Some(read_text(field).await?),
            "price" => {
                let text = read_text(field).await?;
                price = Some(
                    text.trim()
                        .parse::<Decimal>()
                        .map_err(|_| bad_request("invalid price"))?,
                );
            }
            "stock" => {
                let text = read_text(field).await?;
                stock = Some(
                    text.trim()
                        .parse::<i32>()
                        .map_err(|_| bad_request("invalid stock"))?,
                );
            }
            "status" => status = Some(read_text(field).await?),
            "keepImage" => keep_image = read_text(field).await? == "true",
            "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| bad_request("failed to read image"))?;
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(bad_request("image too large (max 5MB)"));
                }
                if !bytes.is_empty() {
                    image = Some(bytes.to_vec());
                }
            }
            _ => {}
        }
    }

    let Some(name) = name.filter(|name| !name.trim().is_empty()) else {
        return Err(bad_request("name is required"));
    };

    Ok(ProductForm {
        name,
        description: description.filter(|description| !description.is_empty()),
        price: price.ok_or_else(|| bad_request("price is required"))?,
        stock: stock.ok_or_else(|| bad_request("stock is required"))?,
        status: status
            .filter(|status| !status.is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        image,
        keep_image,
    })
}

async fn read_text(field: Field<'_>) -> Result<String, Response> {
    field
        .text()
        .await
        .map_err(|_| bad_request("invalid form field"))
}
