// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

/// A fixed 30-minute facility window with a concurrent-occupancy limit.
/// Read-only to the booking engine; replaced in bulk by the grid admin op.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GridSlot {
    pub id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub treatment_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub visit_type: VisitType,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "reservation_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "PENDING"),
            ReservationStatus::Confirmed => write!(f, "CONFIRMED"),
            ReservationStatus::Completed => write!(f, "COMPLETED"),
            ReservationStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Derived from the patient's completed-reservation history, never supplied
/// by the caller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "visit_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitType {
    First,
    FollowUp,
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitType::First => write!(f, "FIRST"),
            VisitType::FollowUp => write!(f, "FOLLOW_UP"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub treatment_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelReservationRequest {
    pub patient_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSpec {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceGridRequest {
    pub slots: Vec<SlotSpec>,
}

/// A still-bookable start time and the tightest capacity across the grid
/// windows it would occupy. Advisory only; the allocator re-checks under lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub remaining_capacity: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationFilter {
    pub doctor_id: Option<Uuid>,
    pub status: Option<ReservationStatus>,
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// STATS MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: ReservationStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotCount {
    pub slot_label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRatio {
    pub first: i64,
    pub follow_up: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub by_status: Vec<StatusCount>,
    pub by_date: Vec<DateCount>,
    pub by_slot: Vec<SlotCount>,
    pub visit_ratio: VisitRatio,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Which grid-slot validation rule a candidate window broke. One kind per
/// rule so callers can surface a precise cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSpecViolation {
    Capacity,
    Range,
    Alignment,
    OperatingHours,
    LunchWindow,
}

impl fmt::Display for SlotSpecViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotSpecViolation::Capacity => {
                write!(f, "slot capacity must be a positive integer")
            }
            SlotSpecViolation::Range => {
                write!(f, "each grid slot must span exactly 30 minutes")
            }
            SlotSpecViolation::Alignment => {
                write!(f, "slot boundaries must align to 15-minute increments")
            }
            SlotSpecViolation::OperatingHours => {
                write!(f, "slots must fall within operating hours (09:00-18:00)")
            }
            SlotSpecViolation::LunchWindow => {
                write!(f, "slots cannot overlap the lunch break (12:00-13:00)")
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("Invalid slot specification: {0}")]
    InvalidSlotSpec(SlotSpecViolation),

    #[error("At least one grid slot is required")]
    EmptyGrid,

    #[error("Reservation duration must be a positive multiple of 30 minutes")]
    InvalidDuration,

    #[error("Reservation must start on a 15-minute boundary")]
    MisalignedStart,

    #[error("Requested time is outside operating hours")]
    OutsideOperatingHours,

    #[error("Doctor is already booked for this period")]
    DoctorAlreadyBooked,

    #[error("Capacity exceeded for the selected slot")]
    CapacityExceeded,

    #[error("Cannot transition reservation from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Reservation not found")]
    ReservationNotFound,

    #[error("Reservation not found for patient")]
    NotFoundForPatient,

    #[error("Completed reservations cannot be cancelled")]
    CannotCancelCompleted,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor is not accepting reservations")]
    DoctorInactive,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Treatment not found")]
    TreatmentNotFound,

    #[error("Treatment is not currently offered")]
    TreatmentInactive,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for SchedulingError {
    fn from(err: sqlx::Error) -> Self {
        SchedulingError::Database(err.to_string())
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::InvalidSlotSpec(_)
            | SchedulingError::EmptyGrid
            | SchedulingError::InvalidDuration
            | SchedulingError::MisalignedStart => AppError::ValidationError(err.to_string()),
            SchedulingError::ReservationNotFound
            | SchedulingError::DoctorNotFound
            | SchedulingError::PatientNotFound
            | SchedulingError::TreatmentNotFound => AppError::NotFound(err.to_string()),
            SchedulingError::OutsideOperatingHours
            | SchedulingError::DoctorAlreadyBooked
            | SchedulingError::CapacityExceeded
            | SchedulingError::InvalidTransition { .. }
            | SchedulingError::NotFoundForPatient
            | SchedulingError::CannotCancelCompleted
            | SchedulingError::DoctorInactive
            | SchedulingError::TreatmentInactive => AppError::Conflict(err.to_string()),
            SchedulingError::Database(msg) => AppError::Database(msg),
        }
    }
}
