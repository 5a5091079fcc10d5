//! Appointment storage.
//!
//! The tool service talks to an `AppointmentRepository`; the API crate
//! provides a Postgres implementation and this module ships an in-memory one
//! used for demos and tests.

use crate::error::RepositoryError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("unknown appointment status '{other}'")),
        }
    }
}

/// A booked appointment. `starts_at` is wall-clock time at the business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub business_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub service: String,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn ends_at(&self) -> NaiveDateTime {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_active(&self) -> bool {
        self.status == AppointmentStatus::Confirmed
    }
}

/// Fields supplied when booking.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub business_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub service: String,
    pub starts_at: NaiveDateTime,
    pub duration_minutes: u32,
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn into_appointment(self) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            business_id: self.business_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            service: self.service,
            starts_at: self.starts_at,
            duration_minutes: self.duration_minutes,
            status: AppointmentStatus::Confirmed,
            notes: self.notes,
            created_at: Utc::now(),
        }
    }
}

/// Query over one business's appointments. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub business_id: String,
    pub date: Option<NaiveDate>,
    pub customer_phone: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn for_business(business_id: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            ..Default::default()
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.customer_phone = Some(phone.into());
        self
    }

    pub fn status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        appointment.business_id == self.business_id
            && self
                .date
                .is_none_or(|d| appointment.starts_at.date() == d)
            && self
                .customer_phone
                .as_deref()
                .is_none_or(|p| appointment.customer_phone == p)
            && self.status.is_none_or(|s| appointment.status == s)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError>;

    /// Matching appointments ordered by start time.
    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryAppointmentRepository {
    appointments: RwLock<Vec<Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn create(&self, appointment: NewAppointment) -> Result<Appointment, RepositoryError> {
        let appointment = appointment.into_appointment();
        self.appointments.write().await.push(appointment.clone());
        Ok(appointment)
    }

    async fn list(&self, filter: AppointmentFilter) -> Result<Vec<Appointment>, RepositoryError> {
        let mut found: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        found.sort_by_key(|a| a.starts_at);
        Ok(found)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, RepositoryError> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RepositoryError::NotFound(id))?;
        appointment.status = status;
        Ok(appointment.clone())
    }
}
