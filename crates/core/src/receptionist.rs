//! Receptionist Service
//!
//! Executes the four receptionist tools against a business catalog, an
//! appointment repository and a notifier. This is the backend side of the
//! tool execution endpoint; the realtime crate can also call it in-process.

use crate::{
    appointments::{
        Appointment, AppointmentFilter, AppointmentRepository, AppointmentStatus, NewAppointment,
    },
    business::{BusinessCatalog, BusinessContext, weekday_name},
    error::ToolError,
    notifier::{NotificationKind, Notifier},
    scheduling::{
        Availability, Clock, SystemClock, format_slot, parse_date, parse_date_time,
        service_duration,
    },
    tools::{
        AvailabilityResult, BookAppointmentArgs, BookingResult, BusinessInfoResult,
        CancelAppointmentArgs, CancellationResult, CheckAvailabilityArgs, GetBusinessInfoArgs,
        InfoType, ToolName,
    },
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

const BOOKING_ALTERNATIVES: usize = 3;

pub struct ReceptionistService {
    catalog: Arc<BusinessCatalog>,
    repository: Arc<dyn AppointmentRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    /// Serializes the availability re-check and the insert of a booking.
    booking_lock: Mutex<()>,
}

impl ReceptionistService {
    pub fn new(
        catalog: Arc<BusinessCatalog>,
        repository: Arc<dyn AppointmentRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            repository,
            notifier,
            clock: Arc::new(SystemClock),
            booking_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &BusinessCatalog {
        &self.catalog
    }

    pub fn repository(&self) -> &Arc<dyn AppointmentRepository> {
        &self.repository
    }

    /// Runs a tool and returns its JSON result.
    #[instrument(skip_all, fields(persona = ?persona, tool = function_name))]
    pub async fn execute(
        &self,
        persona: Option<&str>,
        function_name: &str,
        args: Value,
    ) -> Result<Value, ToolError> {
        let tool: ToolName = function_name
            .parse()
            .map_err(ToolError::UnknownTool)?;
        let (_, business) = self
            .catalog
            .resolve(persona)
            .ok_or_else(|| ToolError::UnknownPersona(persona.unwrap_or_default().to_string()))?;

        info!(tool = %tool, business = %business.id, "Executing tool");

        match tool {
            ToolName::CheckAvailability => {
                let args: CheckAvailabilityArgs = parse_args(tool, args)?;
                to_value(self.check_availability(&business, args).await?)
            }
            ToolName::BookAppointment => {
                let args: BookAppointmentArgs = parse_args(tool, args)?;
                to_value(self.book_appointment(&business, args).await?)
            }
            ToolName::CancelAppointment => {
                let args: CancelAppointmentArgs = parse_args(tool, args)?;
                to_value(self.cancel_appointment(&business, args).await?)
            }
            ToolName::GetBusinessInfo => {
                let args: GetBusinessInfoArgs = parse_args(tool, args)?;
                to_value(business_info(&business, args.info_type))
            }
        }
    }

    /// Like `execute`, but failures become an `{error}` payload.
    pub async fn execute_or_error(
        &self,
        persona: Option<&str>,
        function_name: &str,
        args: Value,
    ) -> Value {
        match self.execute(persona, function_name, args).await {
            Ok(result) => result,
            Err(e) => {
                warn!(function_name, error = %e, "Tool execution failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    async fn booked_on(
        &self,
        business: &BusinessContext,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, ToolError> {
        Ok(self
            .repository
            .list(
                AppointmentFilter::for_business(&business.id)
                    .on(date)
                    .status(AppointmentStatus::Confirmed),
            )
            .await?)
    }

    pub async fn availability(
        &self,
        business: &BusinessContext,
        date: NaiveDate,
        service: Option<&str>,
    ) -> Result<Availability, ToolError> {
        let booked = self.booked_on(business, date).await?;
        Ok(Availability::compute(business, date, service, &booked))
    }

    pub async fn check_availability(
        &self,
        business: &BusinessContext,
        args: CheckAvailabilityArgs,
    ) -> Result<AvailabilityResult, ToolError> {
        let date = parse_date(args.date.as_deref(), self.clock.as_ref())?;
        let availability = self
            .availability(business, date, args.service.as_deref())
            .await?;
        Ok(AvailabilityResult {
            slots: availability.slot_labels(),
            message: availability.message(),
        })
    }

    pub async fn book_appointment(
        &self,
        business: &BusinessContext,
        args: BookAppointmentArgs,
    ) -> Result<BookingResult, ToolError> {
        let starts_at = parse_date_time(&args.date_time)?;
        let requested = format_slot(starts_at.time());

        let _guard = self.booking_lock.lock().await;

        let availability = self
            .availability(business, starts_at.date(), Some(args.service.as_str()))
            .await?;
        if !availability.contains(starts_at.time()) {
            info!(business = %business.id, %starts_at, "Requested slot is no longer free");
            let alternatives: Vec<String> = availability
                .slot_labels()
                .into_iter()
                .take(BOOKING_ALTERNATIVES)
                .collect();
            let message = if alternatives.is_empty() {
                format!(
                    "Sorry, {requested} is no longer available. {}",
                    availability.message()
                )
            } else {
                format!(
                    "Sorry, {requested} is no longer available. Available slots: {}",
                    alternatives.join(", ")
                )
            };
            return Ok(BookingResult {
                success: false,
                appointment_id: None,
                message,
            });
        }

        let service = business
            .find_service(&args.service)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| args.service.trim().to_string());
        let appointment = self
            .repository
            .create(NewAppointment {
                business_id: business.id.clone(),
                customer_name: args.customer_name.trim().to_string(),
                customer_phone: args.customer_phone.trim().to_string(),
                duration_minutes: service_duration(business, Some(service.as_str())),
                service,
                starts_at,
                notes: args.notes.filter(|n| !n.trim().is_empty()),
            })
            .await?;
        drop(_guard);

        info!(business = %business.id, appointment_id = %appointment.id, "Appointment booked");
        self.send_notification(business, NotificationKind::NewBooking, &appointment)
            .await;

        Ok(BookingResult {
            success: true,
            appointment_id: Some(appointment.id.to_string()),
            message: format!(
                "Appointment confirmed for {} on {} at {} for {}",
                appointment.customer_name,
                appointment.starts_at.format("%A, %B %-d"),
                requested,
                appointment.service
            ),
        })
    }

    pub async fn cancel_appointment(
        &self,
        business: &BusinessContext,
        args: CancelAppointmentArgs,
    ) -> Result<CancellationResult, ToolError> {
        let active = self
            .repository
            .list(
                AppointmentFilter::for_business(&business.id)
                    .phone(args.customer_phone.trim())
                    .status(AppointmentStatus::Confirmed),
            )
            .await?;

        let target = match args
            .appointment_date_time
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(when) => match parse_date_time(when) {
                Ok(at) => active.into_iter().find(|a| a.starts_at == at),
                Err(_) => {
                    let day = parse_date(Some(when), self.clock.as_ref())?;
                    active.into_iter().find(|a| a.starts_at.date() == day)
                }
            },
            None => {
                let now: NaiveDateTime = self.clock.now();
                active.into_iter().find(|a| a.starts_at >= now)
            }
        };

        let Some(target) = target else {
            return Ok(CancellationResult {
                success: false,
                message: "No matching appointment found".to_string(),
            });
        };

        let cancelled = self
            .repository
            .update_status(target.id, AppointmentStatus::Cancelled)
            .await?;
        info!(business = %business.id, appointment_id = %cancelled.id, "Appointment cancelled");
        self.send_notification(business, NotificationKind::Cancellation, &cancelled)
            .await;

        Ok(CancellationResult {
            success: true,
            message: "Appointment cancelled successfully. We hope to see you again soon!"
                .to_string(),
        })
    }

    async fn send_notification(
        &self,
        business: &BusinessContext,
        kind: NotificationKind,
        appointment: &Appointment,
    ) {
        let Some(chat_id) = business.telegram_chat_id.as_deref() else {
            return;
        };
        if let Err(e) = self.notifier.notify(chat_id, kind, appointment).await {
            warn!(business = %business.id, error = %e, "Failed to send notification");
        }
    }
}

/// Natural-language business metadata.
pub fn business_info(business: &BusinessContext, info_type: InfoType) -> BusinessInfoResult {
    let info = match info_type {
        InfoType::Hours => {
            let hours = business
                .opening_hours
                .iter()
                .map(|(day, h)| {
                    if h.is_open {
                        format!(
                            "{}: {} - {}",
                            weekday_name(day),
                            h.open.format("%H:%M"),
                            h.close.format("%H:%M")
                        )
                    } else {
                        format!("{}: Closed", weekday_name(day))
                    }
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("Our business hours are: {hours}")
        }
        InfoType::Services => {
            let names = business
                .services
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("We offer: {names}")
        }
        InfoType::Prices => {
            let prices = business
                .services
                .iter()
                .map(|s| format!("{}: ₹{}", s.name, s.price))
                .collect::<Vec<_>>()
                .join(", ");
            format!("Our prices: {prices}")
        }
        InfoType::Location => match &business.address {
            Some(address) => format!("We are located at: {address}"),
            None => "Location information is not available".to_string(),
        },
    };
    BusinessInfoResult { info }
}

fn parse_args<T: DeserializeOwned>(tool: ToolName, args: Value) -> Result<T, ToolError> {
    // Some clients send the arguments as an encoded JSON string.
    let args = match args {
        Value::String(raw) => serde_json::from_str(&raw).map_err(|e| invalid(tool, e))?,
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| invalid(tool, e))
}

fn invalid(tool: ToolName, e: serde_json::Error) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    }
}

fn to_value<T: Serialize>(result: T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(result)?)
}
