// libs/catalog-cell/src/router.rs
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use crate::handlers;

pub fn admin_catalog_routes(pool: PgPool) -> Router {
    Router::new()
        .route(
            "/doctors",
            get(handlers::list_doctors).post(handlers::create_doctor),
        )
        .route(
            "/doctors/{doctor_id}",
            axum::routing::patch(handlers::update_doctor).delete(handlers::delete_doctor),
        )
        .route(
            "/treatments",
            get(handlers::list_treatments).post(handlers::create_treatment),
        )
        .route(
            "/treatments/{treatment_id}",
            axum::routing::patch(handlers::update_treatment).delete(handlers::delete_treatment),
        )
        .with_state(pool)
}

pub fn directory_routes(pool: PgPool) -> Router {
    Router::new()
        .route("/patients", post(handlers::register_patient))
        .route("/patients/{patient_id}", get(handlers::get_patient))
        .route("/directory/doctors", get(handlers::directory_doctors))
        .route("/directory/treatments", get(handlers::directory_treatments))
        .with_state(pool)
}
