use base64ct::{Base64, Encoding};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use utoipa::ToSchema;

/// One row of the `products` table, as returned to the client.
#[derive(Debug, Serialize, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub stock: i32,
    pub status: String,
    /// Stored blob rendered as a `data:image/jpeg;base64,` URL.
    pub image: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Product {
    pub(super) fn from_row(row: &PgRow) -> Self {
        let image: Option<Vec<u8>> = row.get("image");

        Self {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            price: row.get("price"),
            stock: row.get("stock"),
            status: row.get("status"),
            image: image.as_deref().map(data_url),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

fn data_url(bytes: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", Base64::encode_string(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_encoding() {
        assert_eq!(data_url(b"abc"), "data:image/jpeg;base64,YWJj");
        assert_eq!(data_url(b""), "data:image/jpeg;base64,");
    }
}
