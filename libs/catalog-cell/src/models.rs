// libs/catalog-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// CATALOG ENTITIES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub department: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Treatment {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price: f64,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub department: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Partial update for a doctor. A missing field leaves the stored value
/// untouched; no field here is nullable in the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorPatch {
    pub name: Option<String>,
    pub department: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTreatmentRequest {
    pub name: String,
    pub duration_minutes: i32,
    pub price: f64,
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Partial update for a treatment. `description` is nullable in the store,
/// so it is double-wrapped: absent = keep, `null` = clear, value = replace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreatmentPatch {
    pub name: Option<String>,
    pub duration_minutes: Option<i32>,
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    pub phone: String,
}

fn default_active() -> bool {
    true
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Treatment not found")]
    TreatmentNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("{0} with the same unique value already exists")]
    DuplicateEntry(&'static str),

    #[error("Treatment duration must be a positive multiple of 30 minutes")]
    InvalidTreatmentDuration,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::Database(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::DoctorNotFound
            | CatalogError::TreatmentNotFound
            | CatalogError::PatientNotFound => AppError::NotFound(err.to_string()),
            CatalogError::DuplicateEntry(_) => AppError::Conflict(err.to_string()),
            CatalogError::InvalidTreatmentDuration => AppError::ValidationError(err.to_string()),
            CatalogError::Database(msg) => AppError::Database(msg),
        }
    }
}
