// libs/scheduling-cell/src/router.rs
use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;

use crate::handlers;

pub fn reservation_routes(pool: PgPool) -> Router {
    Router::new()
        .route("/availability", get(handlers::list_availability))
        .route("/reservations", post(handlers::create_reservation))
        .route(
            "/reservations/{reservation_id}/cancel",
            post(handlers::cancel_reservation),
        )
        .route(
            "/patients/{patient_id}/reservations",
            get(handlers::list_patient_reservations),
        )
        .with_state(pool)
}

pub fn admin_scheduling_routes(pool: PgPool) -> Router {
    Router::new()
        .route("/reservations", get(handlers::list_reservations))
        .route(
            "/reservations/{reservation_id}/status",
            patch(handlers::update_reservation_status),
        )
        .route("/stats", get(handlers::get_stats))
        .route(
            "/grid-slots",
            get(handlers::list_grid_slots).put(handlers::replace_grid_slots),
        )
        .with_state(pool)
}
