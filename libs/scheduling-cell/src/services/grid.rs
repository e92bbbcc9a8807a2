// libs/scheduling-cell/src/services/grid.rs
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{GridSlot, SchedulingError, SlotSpec};
use crate::services::slot_rules::validate_grid_specs;

/// Administrative ownership of the facility time grid. Replacement is
/// all-or-nothing: every candidate window is validated before the existing
/// grid is touched, then the whole set swaps inside one transaction.
pub struct GridService {
    pool: PgPool,
}

impl GridService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_slots(&self) -> Result<Vec<GridSlot>, SchedulingError> {
        let slots =
            sqlx::query_as::<_, GridSlot>("SELECT * FROM grid_slots ORDER BY start_time ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(slots)
    }

    pub async fn replace_slots(&self, specs: Vec<SlotSpec>) -> Result<Vec<GridSlot>, SchedulingError> {
        debug!("Validating {} candidate grid slots", specs.len());
        validate_grid_specs(&specs)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM grid_slots").execute(&mut *tx).await?;

        let mut slots = Vec::with_capacity(specs.len());
        for spec in &specs {
            let slot = sqlx::query_as::<_, GridSlot>(
                "INSERT INTO grid_slots (id, start_time, end_time, capacity) \
                 VALUES ($1, $2, $3, $4) RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(spec.start_time)
            .bind(spec.end_time)
            .bind(spec.capacity)
            .fetch_one(&mut *tx)
            .await?;
            slots.push(slot);
        }

        tx.commit().await?;

        slots.sort_by_key(|slot| slot.start_time);
        info!("Grid replaced with {} slots", slots.len());
        Ok(slots)
    }
}
