// libs/scheduling-cell/src/services/lifecycle.rs
use sqlx::{PgPool, QueryBuilder};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Reservation, ReservationFilter, ReservationStatus, SchedulingError};

/// Allowed next statuses for each current status. COMPLETED and CANCELLED
/// are terminal.
pub fn allowed_transitions(status: ReservationStatus) -> &'static [ReservationStatus] {
    match status {
        ReservationStatus::Pending => &[ReservationStatus::Confirmed, ReservationStatus::Cancelled],
        ReservationStatus::Confirmed => {
            &[ReservationStatus::Completed, ReservationStatus::Cancelled]
        }
        ReservationStatus::Completed | ReservationStatus::Cancelled => &[],
    }
}

pub fn validate_transition(
    from: ReservationStatus,
    to: ReservationStatus,
) -> Result<(), SchedulingError> {
    if !allowed_transitions(from).contains(&to) {
        warn!("Invalid status transition attempted: {} -> {}", from, to);
        return Err(SchedulingError::InvalidTransition { from, to });
    }
    Ok(())
}

/// Administrative authority over the reservation lifecycle.
pub struct LifecycleService {
    pool: PgPool,
}

impl LifecycleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn update_status(
        &self,
        reservation_id: Uuid,
        new_status: ReservationStatus,
    ) -> Result<Reservation, SchedulingError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 FOR UPDATE",
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(SchedulingError::ReservationNotFound)?;

        validate_transition(current.status, new_status)?;

        let updated = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(reservation_id)
        .bind(new_status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Reservation {} transitioned {} -> {}",
            reservation_id, current.status, new_status
        );
        Ok(updated)
    }

    pub async fn list_reservations(
        &self,
        filter: ReservationFilter,
    ) -> Result<Vec<Reservation>, SchedulingError> {
        let mut builder: QueryBuilder<sqlx::Postgres> =
            QueryBuilder::new("SELECT * FROM reservations WHERE 1 = 1");

        if let Some(doctor_id) = filter.doctor_id {
            builder.push(" AND doctor_id = ").push_bind(doctor_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(date) = filter.date {
            builder
                .push(" AND (start_at AT TIME ZONE 'UTC')::date = ")
                .push_bind(date);
        }
        builder.push(" ORDER BY start_at ASC");

        let reservations = builder
            .build_query_as::<Reservation>()
            .fetch_all(&self.pool)
            .await?;
        Ok(reservations)
    }
}
