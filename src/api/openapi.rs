use crate::api::handlers::{
    auth::{self, LoginRequest, SessionResponse},
    health::{self, Health},
    products::{self, Product},
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "almacen",
        description = "Inventory management over your own PostgreSQL"
    ),
    paths(
        health::health,
        auth::login,
        auth::session,
        auth::logout,
        products::list,
        products::create,
        products::update,
        products::remove,
        products::init_table,
        products::migrate_status
    ),
    components(schemas(Health, LoginRequest, SessionResponse, Product)),
    tags(
        (name = "health", description = "Service probes"),
        (name = "auth", description = "Credential-bearing encrypted sessions"),
        (name = "products", description = "Inventory CRUD")
    )
)]
pub struct ApiDoc;
