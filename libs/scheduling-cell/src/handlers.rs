// libs/scheduling-cell/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    AvailabilityWindow, CancelReservationRequest, CreateReservationRequest, GridSlot,
    ReplaceGridRequest, Reservation, ReservationFilter, ReservationStatus, StatsReport,
    UpdateStatusRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::booking::BookingService;
use crate::services::grid::GridService;
use crate::services::lifecycle::LifecycleService;
use crate::services::stats::StatsService;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQueryParams {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct ReservationQueryParams {
    pub doctor_id: Option<Uuid>,
    pub status: Option<ReservationStatus>,
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// PATIENT-FACING HANDLERS
// ==============================================================================

pub async fn list_availability(
    State(pool): State<PgPool>,
    Query(params): Query<AvailabilityQueryParams>,
) -> Result<Json<Vec<AvailabilityWindow>>, AppError> {
    let availability = AvailabilityService::new(pool)
        .list_availability(params.doctor_id, params.date)
        .await?;
    Ok(Json(availability))
}

pub async fn create_reservation(
    State(pool): State<PgPool>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation = BookingService::new(pool).create_reservation(request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

pub async fn cancel_reservation(
    State(pool): State<PgPool>,
    Path(reservation_id): Path<Uuid>,
    Json(request): Json<CancelReservationRequest>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = BookingService::new(pool)
        .cancel_reservation(reservation_id, request.patient_id)
        .await?;
    Ok(Json(reservation))
}

pub async fn list_patient_reservations(
    State(pool): State<PgPool>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let reservations = BookingService::new(pool)
        .list_patient_reservations(patient_id)
        .await?;
    Ok(Json(reservations))
}

// ==============================================================================
// ADMIN HANDLERS
// ==============================================================================

pub async fn list_reservations(
    State(pool): State<PgPool>,
    Query(params): Query<ReservationQueryParams>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let filter = ReservationFilter {
        doctor_id: params.doctor_id,
        status: params.status,
        date: params.date,
    };
    let reservations = LifecycleService::new(pool).list_reservations(filter).await?;
    Ok(Json(reservations))
}

pub async fn update_reservation_status(
    State(pool): State<PgPool>,
    Path(reservation_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = LifecycleService::new(pool)
        .update_status(reservation_id, request.status)
        .await?;
    Ok(Json(reservation))
}

pub async fn get_stats(State(pool): State<PgPool>) -> Result<Json<StatsReport>, AppError> {
    let report = StatsService::new(pool).compute_stats().await?;
    Ok(Json(report))
}

pub async fn list_grid_slots(State(pool): State<PgPool>) -> Result<Json<Vec<GridSlot>>, AppError> {
    let slots = GridService::new(pool).list_slots().await?;
    Ok(Json(slots))
}

pub async fn replace_grid_slots(
    State(pool): State<PgPool>,
    Json(request): Json<ReplaceGridRequest>,
) -> Result<Json<Vec<GridSlot>>, AppError> {
    let slots = GridService::new(pool).replace_slots(request.slots).await?;
    Ok(Json(slots))
}
