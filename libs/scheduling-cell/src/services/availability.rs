// libs/scheduling-cell/src/services/availability.rs
use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::{AvailabilityWindow, GridSlot, SchedulingError};
use crate::services::slot_rules::{
    expand_reservation, slot_keys, RESERVATION_STEP_MINUTES, SLOT_MINUTES,
};

/// Read-only availability view for one doctor on one date. Takes no locks;
/// the result may be stale by the time a create request runs, and the
/// allocator re-checks everything under lock before committing.
pub struct AvailabilityService {
    pool: PgPool,
}

impl AvailabilityService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_availability(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<AvailabilityWindow>, SchedulingError> {
        debug!("Computing availability for doctor {} on {}", doctor_id, date);

        let slots =
            sqlx::query_as::<_, GridSlot>("SELECT * FROM grid_slots ORDER BY start_time ASC")
                .fetch_all(&self.pool)
                .await?;
        if slots.is_empty() {
            return Ok(Vec::new());
        }

        let counts = sqlx::query_as::<_, (Uuid, i64)>(
            "SELECT rs.grid_slot_id, COUNT(*) \
             FROM reservation_slots rs \
             JOIN reservations r ON r.id = rs.reservation_id \
             WHERE rs.slot_date = $1 AND r.status <> 'CANCELLED' \
             GROUP BY rs.grid_slot_id",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        let occupancy: HashMap<Uuid, i64> = counts.into_iter().collect();

        let day_start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = day_start + Duration::days(1);
        let booked = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
            "SELECT start_at, end_at FROM reservations \
             WHERE doctor_id = $1 AND status <> 'CANCELLED' \
               AND start_at < $2 AND end_at > $3",
        )
        .bind(doctor_id)
        .bind(day_end)
        .bind(day_start)
        .fetch_all(&self.pool)
        .await?;

        Ok(compute_availability(date, &slots, &occupancy, &booked))
    }
}

/// Walk the operating day in 15-minute steps and emit every candidate start
/// whose 30-minute reference window is fully covered by grid slots with
/// remaining capacity and free of doctor overlap. The day is bounded, so a
/// linear scan is fine.
pub fn compute_availability(
    date: NaiveDate,
    slots: &[GridSlot],
    occupancy: &HashMap<Uuid, i64>,
    booked: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<AvailabilityWindow> {
    let (Some(first), Some(last)) = (slots.first(), slots.last()) else {
        return Vec::new();
    };

    let slot_map: HashMap<(NaiveTime, NaiveTime), &GridSlot> = slots
        .iter()
        .map(|slot| ((slot.start_time, slot.end_time), slot))
        .collect();

    let mut cursor = date.and_time(first.start_time).and_utc();
    let close_boundary = date.and_time(last.end_time).and_utc() - Duration::minutes(SLOT_MINUTES);

    let mut availability = Vec::new();
    while cursor <= close_boundary {
        if let Some(window) = feasible_window(cursor, &slot_map, occupancy, booked) {
            availability.push(window);
        }
        cursor += Duration::minutes(RESERVATION_STEP_MINUTES);
    }
    availability
}

fn feasible_window(
    cursor: DateTime<Utc>,
    slot_map: &HashMap<(NaiveTime, NaiveTime), &GridSlot>,
    occupancy: &HashMap<Uuid, i64>,
    booked: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Option<AvailabilityWindow> {
    // Reference duration for the public availability view is a single slot.
    let windows = expand_reservation(cursor, SLOT_MINUTES as i32).ok()?;

    let mut min_remaining: Option<i64> = None;
    for key in slot_keys(&windows) {
        let slot = slot_map.get(&key)?;
        let occupied = occupancy.get(&slot.id).copied().unwrap_or(0);
        let remaining = i64::from(slot.capacity) - occupied;
        if remaining <= 0 {
            return None;
        }
        min_remaining = Some(match min_remaining {
            Some(current) => current.min(remaining),
            None => remaining,
        });
    }

    let start_at = windows.first()?.0;
    let end_at = windows.last()?.1;
    if booked
        .iter()
        .any(|(booked_start, booked_end)| *booked_start < end_at && start_at < *booked_end)
    {
        return None;
    }

    Some(AvailabilityWindow {
        start_at,
        end_at,
        remaining_capacity: min_remaining.unwrap_or(0) as i32,
    })
}
