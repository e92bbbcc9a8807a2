// libs/scheduling-cell/src/services/stats.rs
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;

use crate::models::{
    DateCount, ReservationStatus, SchedulingError, SlotCount, StatsReport, StatusCount, VisitRatio,
    VisitType,
};

/// Read-only grouped counts over existing reservations for reporting.
pub struct StatsService {
    pool: PgPool,
}

impl StatsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn compute_stats(&self) -> Result<StatsReport, SchedulingError> {
        let status_rows = sqlx::query_as::<_, (ReservationStatus, i64)>(
            "SELECT status, COUNT(*) FROM reservations GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let date_rows = sqlx::query_as::<_, (NaiveDate, i64)>(
            "SELECT (start_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) \
             FROM reservations GROUP BY day ORDER BY day",
        )
        .fetch_all(&self.pool)
        .await?;

        let slot_rows = sqlx::query_as::<_, (NaiveTime, NaiveTime, i64)>(
            "SELECT gs.start_time, gs.end_time, COUNT(rs.reservation_id) \
             FROM reservation_slots rs \
             JOIN grid_slots gs ON gs.id = rs.grid_slot_id \
             GROUP BY gs.id, gs.start_time, gs.end_time \
             ORDER BY gs.start_time",
        )
        .fetch_all(&self.pool)
        .await?;

        let visit_rows = sqlx::query_as::<_, (VisitType, i64)>(
            "SELECT visit_type, COUNT(*) FROM reservations GROUP BY visit_type",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(StatsReport {
            by_status: status_rows
                .into_iter()
                .map(|(status, count)| StatusCount { status, count })
                .collect(),
            by_date: date_rows
                .into_iter()
                .map(|(date, count)| DateCount { date, count })
                .collect(),
            by_slot: slot_rows
                .into_iter()
                .map(|(start, end, count)| SlotCount {
                    slot_label: slot_label(start, end),
                    count,
                })
                .collect(),
            visit_ratio: fold_visit_ratio(&visit_rows),
        })
    }
}

pub fn slot_label(start_time: NaiveTime, end_time: NaiveTime) -> String {
    format!(
        "{}-{}",
        start_time.format("%H:%M"),
        end_time.format("%H:%M")
    )
}

/// Visit types with no rows still report a zero, so the ratio shape is
/// stable for consumers.
pub fn fold_visit_ratio(rows: &[(VisitType, i64)]) -> VisitRatio {
    let mut ratio = VisitRatio::default();
    for (visit_type, count) in rows {
        match visit_type {
            VisitType::First => ratio.first = *count,
            VisitType::FollowUp => ratio.follow_up = *count,
        }
    }
    ratio
}
