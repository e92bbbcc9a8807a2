// libs/catalog-cell/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    CreateDoctorRequest, CreatePatientRequest, CreateTreatmentRequest, Doctor, DoctorPatch,
    Patient, Treatment, TreatmentPatch,
};
use crate::services::catalog::CatalogService;
use crate::services::directory::DirectoryService;

#[derive(Debug, Deserialize)]
pub struct DirectoryQueryParams {
    pub department: Option<String>,
}

// ==============================================================================
// ADMIN CATALOG HANDLERS
// ==============================================================================

pub async fn list_doctors(State(pool): State<PgPool>) -> Result<Json<Vec<Doctor>>, AppError> {
    let doctors = CatalogService::new(pool).list_doctors().await?;
    Ok(Json(doctors))
}

pub async fn create_doctor(
    State(pool): State<PgPool>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Doctor>), AppError> {
    let doctor = CatalogService::new(pool).create_doctor(request).await?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

pub async fn update_doctor(
    State(pool): State<PgPool>,
    Path(doctor_id): Path<Uuid>,
    Json(patch): Json<DoctorPatch>,
) -> Result<Json<Doctor>, AppError> {
    let doctor = CatalogService::new(pool).update_doctor(doctor_id, patch).await?;
    Ok(Json(doctor))
}

pub async fn delete_doctor(
    State(pool): State<PgPool>,
    Path(doctor_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    CatalogService::new(pool).delete_doctor(doctor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_treatments(State(pool): State<PgPool>) -> Result<Json<Vec<Treatment>>, AppError> {
    let treatments = CatalogService::new(pool).list_treatments().await?;
    Ok(Json(treatments))
}

pub async fn create_treatment(
    State(pool): State<PgPool>,
    Json(request): Json<CreateTreatmentRequest>,
) -> Result<(StatusCode, Json<Treatment>), AppError> {
    let treatment = CatalogService::new(pool).create_treatment(request).await?;
    Ok((StatusCode::CREATED, Json(treatment)))
}

pub async fn update_treatment(
    State(pool): State<PgPool>,
    Path(treatment_id): Path<Uuid>,
    Json(patch): Json<TreatmentPatch>,
) -> Result<Json<Treatment>, AppError> {
    let treatment = CatalogService::new(pool)
        .update_treatment(treatment_id, patch)
        .await?;
    Ok(Json(treatment))
}

pub async fn delete_treatment(
    State(pool): State<PgPool>,
    Path(treatment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    CatalogService::new(pool).delete_treatment(treatment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// PATIENT-FACING HANDLERS
// ==============================================================================

pub async fn register_patient(
    State(pool): State<PgPool>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Patient>), AppError> {
    let patient = CatalogService::new(pool).create_patient(request).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn get_patient(
    State(pool): State<PgPool>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Patient>, AppError> {
    let patient = CatalogService::new(pool).get_patient(patient_id).await?;
    Ok(Json(patient))
}

pub async fn directory_doctors(
    State(pool): State<PgPool>,
    Query(params): Query<DirectoryQueryParams>,
) -> Result<Json<Vec<Doctor>>, AppError> {
    let doctors = DirectoryService::new(pool)
        .list_active_doctors(params.department.as_deref())
        .await?;
    Ok(Json(doctors))
}

pub async fn directory_treatments(
    State(pool): State<PgPool>,
) -> Result<Json<Vec<Treatment>>, AppError> {
    let treatments = DirectoryService::new(pool).list_active_treatments().await?;
    Ok(Json(treatments))
}
