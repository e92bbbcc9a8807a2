// libs/catalog-cell/src/services/directory.rs
use sqlx::PgPool;

use crate::models::{CatalogError, Doctor, Treatment};

/// Patient-facing read-only views of the catalog. Only active entries are
/// visible here; inactive doctors and treatments stay bookable in history
/// but disappear from the directory.
pub struct DirectoryService {
    pool: PgPool,
}

impl DirectoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_active_doctors(
        &self,
        department: Option<&str>,
    ) -> Result<Vec<Doctor>, CatalogError> {
        let doctors = match department {
            Some(department) => {
                sqlx::query_as::<_, Doctor>(
                    "SELECT * FROM doctors WHERE is_active AND department = $1 ORDER BY name ASC",
                )
                .bind(department)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Doctor>(
                    "SELECT * FROM doctors WHERE is_active ORDER BY name ASC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(doctors)
    }

    pub async fn list_active_treatments(&self) -> Result<Vec<Treatment>, CatalogError> {
        let treatments = sqlx::query_as::<_, Treatment>(
            "SELECT * FROM treatments WHERE is_active ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(treatments)
    }
}
