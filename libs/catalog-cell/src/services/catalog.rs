// libs/catalog-cell/src/services/catalog.rs
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    CatalogError, CreateDoctorRequest, CreatePatientRequest, CreateTreatmentRequest, Doctor,
    DoctorPatch, Patient, Treatment, TreatmentPatch,
};

/// Administrative CRUD over doctors, treatments and patients. None of these
/// operations carry a concurrency hazard; uniqueness is delegated to the
/// store's constraints.
pub struct CatalogService {
    pool: PgPool,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==========================================================================
    // DOCTORS
    // ==========================================================================

    pub async fn list_doctors(&self) -> Result<Vec<Doctor>, CatalogError> {
        let doctors = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(doctors)
    }

    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, CatalogError> {
        debug!("Creating doctor {}", request.name);

        let doctor = sqlx::query_as::<_, Doctor>(
            "INSERT INTO doctors (id, name, department, is_active) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.department)
        .bind(request.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Doctor"))?;

        info!("Doctor {} created", doctor.id);
        Ok(doctor)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        patch: DoctorPatch,
    ) -> Result<Doctor, CatalogError> {
        let current = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = $1")
            .bind(doctor_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CatalogError::DoctorNotFound)?;

        let name = patch.name.unwrap_or(current.name);
        let department = patch.department.unwrap_or(current.department);
        let is_active = patch.is_active.unwrap_or(current.is_active);

        let doctor = sqlx::query_as::<_, Doctor>(
            "UPDATE doctors SET name = $2, department = $3, is_active = $4, updated_at = now() \
             WHERE id = $1 RETURNING *",
        )
        .bind(doctor_id)
        .bind(&name)
        .bind(&department)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Doctor"))?;

        Ok(doctor)
    }

    pub async fn delete_doctor(&self, doctor_id: Uuid) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM doctors WHERE id = $1")
            .bind(doctor_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::DoctorNotFound);
        }
        info!("Doctor {} deleted", doctor_id);
        Ok(())
    }

    // ==========================================================================
    // TREATMENTS
    // ==========================================================================

    pub async fn list_treatments(&self) -> Result<Vec<Treatment>, CatalogError> {
        let treatments =
            sqlx::query_as::<_, Treatment>("SELECT * FROM treatments ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(treatments)
    }

    pub async fn create_treatment(
        &self,
        request: CreateTreatmentRequest,
    ) -> Result<Treatment, CatalogError> {
        validate_treatment_duration(request.duration_minutes)?;

        let treatment = sqlx::query_as::<_, Treatment>(
            "INSERT INTO treatments (id, name, duration_minutes, price, description, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(request.duration_minutes)
        .bind(request.price)
        .bind(&request.description)
        .bind(request.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Treatment"))?;

        info!("Treatment {} created", treatment.id);
        Ok(treatment)
    }

    pub async fn update_treatment(
        &self,
        treatment_id: Uuid,
        patch: TreatmentPatch,
    ) -> Result<Treatment, CatalogError> {
        let current = sqlx::query_as::<_, Treatment>("SELECT * FROM treatments WHERE id = $1")
            .bind(treatment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CatalogError::TreatmentNotFound)?;

        if let Some(duration) = patch.duration_minutes {
            validate_treatment_duration(duration)?;
        }

        let name = patch.name.unwrap_or(current.name);
        let duration_minutes = patch.duration_minutes.unwrap_or(current.duration_minutes);
        let price = patch.price.unwrap_or(current.price);
        // Absent keeps the stored value, explicit null clears it.
        let description = match patch.description {
            Some(value) => value,
            None => current.description,
        };
        let is_active = patch.is_active.unwrap_or(current.is_active);

        let treatment = sqlx::query_as::<_, Treatment>(
            "UPDATE treatments SET name = $2, duration_minutes = $3, price = $4, \
             description = $5, is_active = $6, updated_at = now() \
             WHERE id = $1 RETURNING *",
        )
        .bind(treatment_id)
        .bind(&name)
        .bind(duration_minutes)
        .bind(price)
        .bind(&description)
        .bind(is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Treatment"))?;

        Ok(treatment)
    }

    pub async fn delete_treatment(&self, treatment_id: Uuid) -> Result<(), CatalogError> {
        let result = sqlx::query("DELETE FROM treatments WHERE id = $1")
            .bind(treatment_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::TreatmentNotFound);
        }
        info!("Treatment {} deleted", treatment_id);
        Ok(())
    }

    // ==========================================================================
    // PATIENTS
    // ==========================================================================

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
    ) -> Result<Patient, CatalogError> {
        let patient = sqlx::query_as::<_, Patient>(
            "INSERT INTO patients (id, name, phone) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.phone)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Patient"))?;

        info!("Patient {} created", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, CatalogError> {
        sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
            .bind(patient_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CatalogError::PatientNotFound)
    }
}

fn validate_treatment_duration(duration_minutes: i32) -> Result<(), CatalogError> {
    if duration_minutes <= 0 || duration_minutes % 30 != 0 {
        return Err(CatalogError::InvalidTreatmentDuration);
    }
    Ok(())
}

fn map_unique_violation(err: sqlx::Error, entity: &'static str) -> CatalogError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CatalogError::DuplicateEntry(entity)
        }
        _ => CatalogError::Database(err.to_string()),
    }
}
