use axum::{
    Router,
    routing::get,
};
use sqlx::PgPool;

use catalog_cell::router::{admin_catalog_routes, directory_routes};
use scheduling_cell::router::{admin_scheduling_routes, reservation_routes};

pub fn create_router(pool: PgPool) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Booking API is running!" }))
        .route("/health", get(|| async { "ok" }))
        .nest(
            "/api/v1",
            reservation_routes(pool.clone()).merge(directory_routes(pool.clone())),
        )
        .nest(
            "/api/v1/admin",
            admin_scheduling_routes(pool.clone()).merge(admin_catalog_routes(pool)),
        )
}
