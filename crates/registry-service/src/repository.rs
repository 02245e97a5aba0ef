//! Postgres-backed lookups for devices, patients, and threshold profiles
//! (spec §3 Registry entities, §4.6 read interface).

use std::time::Instant;

use sqlx::PgPool;

use crate::error::RegistryError;
use crate::metrics::record_db_query;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeviceRow {
    pub device_id: String,
    pub device_type: String,
    pub patient_id: Option<String>,
    pub status: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PatientRow {
    pub patient_id: String,
    pub age: i32,
    pub sex: String,
    pub medical_conditions: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ThresholdProfileRow {
    pub patient_id: String,
    pub device_id: Option<String>,
    pub heart_rate_min: f64,
    pub heart_rate_max: f64,
    pub bp_systolic_min: f64,
    pub bp_systolic_max: f64,
    pub bp_diastolic_min: f64,
    pub bp_diastolic_max: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub oxygen_saturation_min: f64,
    pub oxygen_saturation_max: f64,
    pub respiratory_rate_min: f64,
    pub respiratory_rate_max: f64,
}

/// Fetch a device by id.
///
/// # Errors
///
/// Returns [`RegistryError::Database`] on a query failure.
pub async fn get_device(pool: &PgPool, device_id: &str) -> Result<Option<DeviceRow>, RegistryError> {
    let start = Instant::now();
    let result = sqlx::query_as::<_, DeviceRow>(
        r#"
        SELECT device_id, device_type, patient_id, status, metadata
        FROM devices
        WHERE device_id = $1
        "#,
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await;
    record_db_query("select", "devices", result.is_ok(), start.elapsed());
    Ok(result?)
}

/// Fetch a patient by id.
///
/// # Errors
///
/// Returns [`RegistryError::Database`] on a query failure.
pub async fn get_patient(pool: &PgPool, patient_id: &str) -> Result<Option<PatientRow>, RegistryError> {
    let start = Instant::now();
    let result = sqlx::query_as::<_, PatientRow>(
        r#"
        SELECT patient_id, age, sex, medical_conditions, medications, allergies
        FROM patients
        WHERE patient_id = $1
        "#,
    )
    .bind(patient_id)
    .fetch_optional(pool)
    .await;
    record_db_query("select", "patients", result.is_ok(), start.elapsed());
    Ok(result?)
}

/// Fetch a threshold profile, preferring a device-specific row over the
/// patient-default row when `device_id` is supplied and a match exists
/// (spec §4.6 fallback rule).
///
/// # Errors
///
/// Returns [`RegistryError::Database`] on a query failure.
pub async fn get_threshold_profile(
    pool: &PgPool,
    patient_id: &str,
    device_id: Option<&str>,
) -> Result<Option<ThresholdProfileRow>, RegistryError> {
    if let Some(device_id) = device_id {
        let start = Instant::now();
        let result = sqlx::query_as::<_, ThresholdProfileRow>(
            r#"
            SELECT patient_id, device_id, heart_rate_min, heart_rate_max,
                   bp_systolic_min, bp_systolic_max, bp_diastolic_min, bp_diastolic_max,
                   temperature_min, temperature_max,
                   oxygen_saturation_min, oxygen_saturation_max,
                   respiratory_rate_min, respiratory_rate_max
            FROM threshold_profiles
            WHERE patient_id = $1 AND device_id = $2
            "#,
        )
        .bind(patient_id)
        .bind(device_id)
        .fetch_optional(pool)
        .await;
        record_db_query("select", "threshold_profiles", result.is_ok(), start.elapsed());
        if let Some(row) = result? {
            return Ok(Some(row));
        }
    }

    let start = Instant::now();
    let result = sqlx::query_as::<_, ThresholdProfileRow>(
        r#"
        SELECT patient_id, device_id, heart_rate_min, heart_rate_max,
               bp_systolic_min, bp_systolic_max, bp_diastolic_min, bp_diastolic_max,
               temperature_min, temperature_max,
               oxygen_saturation_min, oxygen_saturation_max,
               respiratory_rate_min, respiratory_rate_max
        FROM threshold_profiles
        WHERE patient_id = $1 AND device_id IS NULL
        "#,
    )
    .bind(patient_id)
    .fetch_optional(pool)
    .await;
    record_db_query("select", "threshold_profiles", result.is_ok(), start.elapsed());
    Ok(result?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    async fn device_specific_threshold_overrides_patient_default(pool: PgPool) {
        sqlx::query(
            "INSERT INTO patients (patient_id, age, sex, medical_conditions, medications, allergies)
             VALUES ('P1', 42, 'female', '{}', '{}', '{}')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO threshold_profiles
                (patient_id, device_id, heart_rate_min, heart_rate_max,
                 bp_systolic_min, bp_systolic_max, bp_diastolic_min, bp_diastolic_max,
                 temperature_min, temperature_max, oxygen_saturation_min, oxygen_saturation_max,
                 respiratory_rate_min, respiratory_rate_max)
             VALUES
                ('P1', NULL, 60, 100, 90, 120, 60, 80, 36.0, 37.5, 95, 100, 12, 20),
                ('P1', 'D1', 50, 110, 90, 120, 60, 80, 36.0, 37.5, 92, 100, 12, 20)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let device_specific = get_threshold_profile(&pool, "P1", Some("D1")).await.unwrap().unwrap();
        assert_eq!(device_specific.device_id.as_deref(), Some("D1"));
        assert!((device_specific.oxygen_saturation_min - 92.0).abs() < f64::EPSILON);

        let default = get_threshold_profile(&pool, "P1", Some("D2")).await.unwrap().unwrap();
        assert_eq!(default.device_id, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn missing_device_returns_none(pool: PgPool) {
        let result = get_device(&pool, "unknown").await.unwrap();
        assert!(result.is_none());
    }
}
