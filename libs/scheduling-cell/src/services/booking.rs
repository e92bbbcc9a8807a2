// libs/scheduling-cell/src/services/booking.rs
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    CreateReservationRequest, GridSlot, Reservation, ReservationStatus, SchedulingError, VisitType,
};
use crate::services::slot_rules::{expand_reservation, slot_keys, validate_alignment};

/// Transactional reservation allocator. Every create runs inside one
/// database transaction with row locks taken before the overlap and
/// capacity checks, so among concurrent requests contending for the same
/// doctor or the same (grid slot, date) bucket at most one wins per free
/// unit. Any error rolls the whole transaction back.
pub struct BookingService {
    pool: PgPool,
}

impl BookingService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_reservation(
        &self,
        request: CreateReservationRequest,
    ) -> Result<Reservation, SchedulingError> {
        validate_alignment(request.start_at)?;

        let mut tx = self.pool.begin().await?;

        self.verify_patient_exists(&mut tx, request.patient_id).await?;
        let duration_minutes = self.load_treatment_duration(&mut tx, request.treatment_id).await?;

        let windows = expand_reservation(request.start_at, duration_minutes)?;
        let grid = self.resolve_grid_slots(&mut tx, &windows).await?;

        // Locking the doctor row serializes every booking attempt for this
        // doctor; a plain row lock on overlapping reservations would leave a
        // phantom window when none exist yet.
        self.lock_doctor(&mut tx, request.doctor_id).await?;

        let first = windows.first().ok_or(SchedulingError::InvalidDuration)?;
        let last = windows.last().ok_or(SchedulingError::InvalidDuration)?;
        let (span_start, span_end) = (first.0, last.1);

        let overlapping = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM reservations \
             WHERE doctor_id = $1 AND status <> 'CANCELLED' \
               AND start_at < $2 AND end_at > $3 \
             FOR UPDATE",
        )
        .bind(request.doctor_id)
        .bind(span_end)
        .bind(span_start)
        .fetch_all(&mut *tx)
        .await?;
        if !overlapping.is_empty() {
            warn!(
                "Doctor {} already booked between {} and {}",
                request.doctor_id, span_start, span_end
            );
            return Err(SchedulingError::DoctorAlreadyBooked);
        }

        let slot_date = span_start.date_naive();
        for slot in &grid {
            self.check_slot_capacity(&mut tx, slot, slot_date).await?;
        }

        let visit_type = self.determine_visit_type(&mut tx, request.patient_id).await?;

        let reservation = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations \
             (id, patient_id, doctor_id, treatment_id, start_at, end_at, status, visit_type, memo) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(request.patient_id)
        .bind(request.doctor_id)
        .bind(request.treatment_id)
        .bind(span_start)
        .bind(span_end)
        .bind(ReservationStatus::Pending)
        .bind(visit_type)
        .bind(&request.memo)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_doctor_start_violation)?;

        for slot in &grid {
            sqlx::query(
                "INSERT INTO reservation_slots (reservation_id, grid_slot_id, slot_date) \
                 VALUES ($1, $2, $3)",
            )
            .bind(reservation.id)
            .bind(slot.id)
            .bind(slot_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Reservation {} created for patient {} with doctor {} ({} - {})",
            reservation.id, reservation.patient_id, reservation.doctor_id, span_start, span_end
        );
        Ok(reservation)
    }

    /// Cancellation keeps the occupancy rows; capacity queries exclude
    /// CANCELLED reservations, so the freed slots become bookable again.
    pub async fn cancel_reservation(
        &self,
        reservation_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Reservation, SchedulingError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 AND patient_id = $2 FOR UPDATE",
        )
        .bind(reservation_id)
        .bind(patient_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(SchedulingError::NotFoundForPatient)?;

        if current.status == ReservationStatus::Completed {
            return Err(SchedulingError::CannotCancelCompleted);
        }

        let cancelled = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'CANCELLED', updated_at = now() \
             WHERE id = $1 RETURNING *",
        )
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Reservation {} cancelled by patient {}", reservation_id, patient_id);
        Ok(cancelled)
    }

    pub async fn list_patient_reservations(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Reservation>, SchedulingError> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE patient_id = $1 ORDER BY start_at DESC",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    async fn verify_patient_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patient_id: Uuid,
    ) -> Result<(), SchedulingError> {
        sqlx::query_as::<_, (Uuid,)>("SELECT id FROM patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(SchedulingError::PatientNotFound)?;
        Ok(())
    }

    async fn load_treatment_duration(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        treatment_id: Uuid,
    ) -> Result<i32, SchedulingError> {
        let (duration_minutes, is_active) = sqlx::query_as::<_, (i32, bool)>(
            "SELECT duration_minutes, is_active FROM treatments WHERE id = $1",
        )
        .bind(treatment_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(SchedulingError::TreatmentNotFound)?;

        if !is_active {
            return Err(SchedulingError::TreatmentInactive);
        }
        Ok(duration_minutes)
    }

    /// Every expanded window must resolve to a grid slot by its time-of-day
    /// key. A miss means the requested time falls outside the facility's
    /// operating grid — including :15/:45 anchors, whose generated keys can
    /// never match the :00/:30 grid.
    async fn resolve_grid_slots(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        windows: &[(DateTime<Utc>, DateTime<Utc>)],
    ) -> Result<Vec<GridSlot>, SchedulingError> {
        let mut grid = Vec::with_capacity(windows.len());
        for (key_start, key_end) in slot_keys(windows) {
            let slot = sqlx::query_as::<_, GridSlot>(
                "SELECT * FROM grid_slots WHERE start_time = $1 AND end_time = $2",
            )
            .bind(key_start)
            .bind(key_end)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(SchedulingError::OutsideOperatingHours)?;
            grid.push(slot);
        }
        Ok(grid)
    }

    async fn lock_doctor(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        doctor_id: Uuid,
    ) -> Result<(), SchedulingError> {
        let (is_active,) = sqlx::query_as::<_, (bool,)>(
            "SELECT is_active FROM doctors WHERE id = $1 FOR UPDATE",
        )
        .bind(doctor_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(SchedulingError::DoctorNotFound)?;

        if !is_active {
            return Err(SchedulingError::DoctorInactive);
        }
        Ok(())
    }

    async fn check_slot_capacity(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        slot: &GridSlot,
        slot_date: chrono::NaiveDate,
    ) -> Result<(), SchedulingError> {
        // The grid-slot row lock serializes the capacity bucket: counting
        // occupancy rows alone cannot exclude a concurrent first insert.
        sqlx::query("SELECT id FROM grid_slots WHERE id = $1 FOR UPDATE")
            .bind(slot.id)
            .execute(&mut **tx)
            .await?;

        let occupied: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservation_slots rs \
             JOIN reservations r ON r.id = rs.reservation_id \
             WHERE rs.grid_slot_id = $1 AND rs.slot_date = $2 AND r.status <> 'CANCELLED'",
        )
        .bind(slot.id)
        .bind(slot_date)
        .fetch_one(&mut **tx)
        .await?;

        if occupied >= i64::from(slot.capacity) {
            debug!(
                "Grid slot {} at capacity ({}/{}) on {}",
                slot.id, occupied, slot.capacity, slot_date
            );
            return Err(SchedulingError::CapacityExceeded);
        }
        Ok(())
    }

    async fn determine_visit_type(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        patient_id: Uuid,
    ) -> Result<VisitType, SchedulingError> {
        let completed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservations WHERE patient_id = $1 AND status = 'COMPLETED'",
        )
        .bind(patient_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(if completed > 0 {
            VisitType::FollowUp
        } else {
            VisitType::First
        })
    }
}

/// The (doctor_id, start_at) unique constraint is a backstop behind the
/// doctor-row lock; surface it as the same conflict callers already handle.
fn map_doctor_start_violation(err: sqlx::Error) -> SchedulingError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            SchedulingError::DoctorAlreadyBooked
        }
        _ => SchedulingError::Database(err.to_string()),
    }
}
