//! Data Access Layer
//!
//! Postgres-backed `AppointmentRepository`. Queries are checked at runtime so
//! the crate builds without a live database.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use receptionist_core::{
    appointments::{
        Appointment, AppointmentFilter, AppointmentRepository, AppointmentStatus, NewAppointment,
    },
    error::RepositoryError,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const COLUMNS: &str = "id, business_id, customer_name, customer_phone, service, starts_at, \
                       duration_minutes, status, notes, created_at";

#[derive(FromRow, Debug)]
struct AppointmentRow {
    id: Uuid,
    business_id: String,
    customer_name: String,
    customer_phone: String,
    service: String,
    starts_at: NaiveDateTime,
    duration_minutes: i32,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = anyhow::Error;

    fn try_from(row: AppointmentRow) -> Result<Self> {
        Ok(Appointment {
            id: row.id,
            business_id: row.business_id,
            customer_name: row.customer_name,
            customer_phone: row.customer_phone,
            service: row.service,
            starts_at: row.starts_at,
            duration_minutes: u32::try_from(row.duration_minutes)
                .with_context(|| format!("Negative duration on appointment {}", row.id))?,
            status: row.status.parse::<AppointmentStatus>().map_err(|e| anyhow!(e))?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

fn backend(err: impl Into<anyhow::Error>) -> RepositoryError {
    RepositoryError::Backend(err.into())
}

/// A wrapper around the `PgPool` implementing appointment storage.
#[derive(Clone)]
pub struct PgAppointmentRepository {
    pool: PgPool,
}

impl PgAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AppointmentRepository for PgAppointmentRepository {
    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError> {
        let appointment = appointment.into_appointment();
        let duration = i32::try_from(appointment.duration_minutes).map_err(backend)?;
        let row: AppointmentRow = sqlx::query_as(&format!(
            "INSERT INTO appointments ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        ))
        .bind(appointment.id)
        .bind(&appointment.business_id)
        .bind(&appointment.customer_name)
        .bind(&appointment.customer_phone)
        .bind(&appointment.service)
        .bind(appointment.starts_at)
        .bind(duration)
        .bind(appointment.status.as_str())
        .bind(&appointment.notes)
        .bind(appointment.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        row.try_into().map_err(RepositoryError::Backend)
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError> {
        let rows: Vec<AppointmentRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM appointments \
             WHERE business_id = $1 \
               AND ($2::date IS NULL OR starts_at::date = $2) \
               AND ($3::text IS NULL OR customer_phone = $3) \
               AND ($4::text IS NULL OR status = $4) \
             ORDER BY starts_at ASC"
        ))
        .bind(&filter.business_id)
        .bind(filter.date)
        .bind(filter.customer_phone.as_deref())
        .bind(filter.status.map(AppointmentStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|row| Appointment::try_from(row).map_err(RepositoryError::Backend))
            .collect()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, RepositoryError> {
        let row: Option<AppointmentRow> = sqlx::query_as(&format!(
            "UPDATE appointments SET status = $1 WHERE id = $2 RETURNING {COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(RepositoryError::NotFound(id))?
            .try_into()
            .map_err(RepositoryError::Backend)
    }
}

/// Parses the `date` query parameter of the appointment listing.
pub fn parse_query_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
