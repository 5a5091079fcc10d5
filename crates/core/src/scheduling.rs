//! Slot availability.
//!
//! Candidates start every `SLOT_STEP_MINUTES` from opening time and must end by
//! closing time. A candidate is dropped when its half-open interval
//! `[start, start + duration)` intersects an active appointment.

use crate::{
    appointments::Appointment,
    business::{BusinessContext, DayHours, weekday_name},
    error::ToolError,
};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};

pub const SLOT_STEP_MINUTES: i64 = 30;
pub const DEFAULT_DURATION_MINUTES: u32 = 30;
const MESSAGE_PREVIEW: usize = 5;

/// Source of "now" at the business.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Local wall-clock time of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Parses a tool `date` argument. Missing dates mean tomorrow.
pub fn parse_date(input: Option<&str>, clock: &dyn Clock) -> Result<NaiveDate, ToolError> {
    let raw = input.map(str::trim).unwrap_or_default();
    let lowered = raw.to_ascii_lowercase();

    if raw.is_empty() || lowered.contains("tomorrow") {
        return Ok(clock.today() + Duration::days(1));
    }
    if lowered.contains("today") {
        return Ok(clock.today());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| parse_date_time(raw).map(|dt| dt.date()))
        .map_err(|_| ToolError::InvalidDate(raw.to_string()))
}

/// Parses an ISO 8601 date-time. Offsets are dropped; the wall-clock part is
/// taken as business-local time.
pub fn parse_date_time(input: &str) -> Result<NaiveDateTime, ToolError> {
    let raw = input.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .ok_or_else(|| ToolError::InvalidDateTime(raw.to_string()))
}

/// `9:00 AM`, `7:30 PM`.
pub fn format_slot(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

fn overlaps(
    start: NaiveDateTime,
    end: NaiveDateTime,
    other_start: NaiveDateTime,
    other_end: NaiveDateTime,
) -> bool {
    start < other_end && other_start < end
}

/// Free slot start times for one day, in chronological order.
pub fn free_slots(
    hours: &DayHours,
    date: NaiveDate,
    duration_minutes: u32,
    booked: &[Appointment],
) -> Vec<NaiveTime> {
    if !hours.is_open {
        return Vec::new();
    }

    let duration = Duration::minutes(i64::from(duration_minutes.max(1)));
    let close = date.and_time(hours.close);
    let mut start = date.and_time(hours.open);
    let mut slots = Vec::new();

    while start + duration <= close {
        let end = start + duration;
        let taken = booked
            .iter()
            .filter(|a| a.is_active())
            .any(|a| overlaps(start, end, a.starts_at, a.ends_at()));
        if !taken {
            slots.push(start.time());
        }
        start += Duration::minutes(SLOT_STEP_MINUTES);
    }

    slots
}

/// Availability for one business and date.
#[derive(Debug, Clone, PartialEq)]
pub struct Availability {
    pub date: NaiveDate,
    pub is_open: bool,
    pub slots: Vec<NaiveTime>,
}

impl Availability {
    pub fn compute(
        business: &BusinessContext,
        date: NaiveDate,
        service: Option<&str>,
        booked: &[Appointment],
    ) -> Self {
        let hours = business.opening_hours.for_weekday(date.weekday());
        let duration = service_duration(business, service);
        Self {
            date,
            is_open: hours.is_open,
            slots: free_slots(hours, date, duration, booked),
        }
    }

    pub fn slot_labels(&self) -> Vec<String> {
        self.slots.iter().copied().map(format_slot).collect()
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.slots.contains(&time)
    }

    pub fn message(&self) -> String {
        if !self.is_open {
            return format!(
                "Sorry, we are closed on {}",
                weekday_name(self.date.weekday())
            );
        }
        if self.slots.is_empty() {
            return "Sorry, no slots available for this date".to_string();
        }

        let labels = self.slot_labels();
        let preview = labels
            .iter()
            .take(MESSAGE_PREVIEW)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if labels.len() > MESSAGE_PREVIEW {
            format!("Available slots: {preview} and more")
        } else {
            format!("Available slots: {preview}")
        }
    }
}

/// Duration of a named service, defaulting to 30 minutes.
pub fn service_duration(business: &BusinessContext, service: Option<&str>) -> u32 {
    service
        .and_then(|name| business.find_service(name))
        .map(|s| s.duration_minutes)
        .unwrap_or(DEFAULT_DURATION_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        appointments::{AppointmentStatus, NewAppointment},
        business::BusinessCatalog,
    };

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn booked(start: &str, minutes: u32) -> Appointment {
        NewAppointment {
            business_id: "salon-001".to_string(),
            customer_name: "Test".to_string(),
            customer_phone: "+91000".to_string(),
            service: "Haircut".to_string(),
            starts_at: NaiveDateTime::parse_from_str(start, "%Y-%m-%dT%H:%M").unwrap(),
            duration_minutes: minutes,
            notes: None,
        }
        .into_appointment()
    }

    #[test]
    fn test_open_day_without_bookings_fills_the_day() {
        let barber = BusinessCatalog::demo().get("barber").unwrap();
        let availability = Availability::compute(&barber, date("2024-06-10"), Some("Haircut"), &[]);
        let labels = availability.slot_labels();

        assert_eq!(labels.first().unwrap(), "9:00 AM");
        assert_eq!(labels[1], "9:30 AM");
        assert_eq!(labels.last().unwrap(), "7:30 PM");
        assert_eq!(labels.len(), 22);
        assert_eq!(
            availability.message(),
            "Available slots: 9:00 AM, 9:30 AM, 10:00 AM, 10:30 AM, 11:00 AM and more"
        );
    }

    #[test]
    fn test_adjacent_booking_does_not_block_neighbours() {
        let barber = BusinessCatalog::demo().get("barber").unwrap();
        let existing = vec![booked("2024-06-10T10:00", 30)];
        let availability =
            Availability::compute(&barber, date("2024-06-10"), Some("Haircut"), &existing);

        assert!(availability.contains(time("09:30")));
        assert!(!availability.contains(time("10:00")));
        assert!(availability.contains(time("10:30")));
    }

    #[test]
    fn test_longer_service_is_blocked_by_later_booking() {
        let barber = BusinessCatalog::demo().get("barber").unwrap();
        let existing = vec![booked("2024-06-10T10:00", 30)];
        // Hair Color takes 60 minutes.
        let availability =
            Availability::compute(&barber, date("2024-06-10"), Some("hair color"), &existing);

        assert!(availability.contains(time("09:00")));
        assert!(!availability.contains(time("09:30")));
        assert!(!availability.contains(time("10:00")));
        assert!(availability.contains(time("10:30")));
        assert_eq!(availability.slots.last().copied(), Some(time("19:00")));
    }

    #[test]
    fn test_slots_respect_close_and_never_overlap() {
        let catalog = BusinessCatalog::demo();
        let existing = vec![
            booked("2024-06-12T11:15", 45),
            booked("2024-06-12T16:00", 60),
        ];
        for (_, business) in catalog.iter() {
            for service in &business.services {
                let hours = business.opening_hours.for_weekday(date("2024-06-12").weekday());
                let availability = Availability::compute(
                    business,
                    date("2024-06-12"),
                    Some(&service.name),
                    &existing,
                );
                let span = Duration::minutes(i64::from(service.duration_minutes));
                for slot in &availability.slots {
                    let start = date("2024-06-12").and_time(*slot);
                    assert!(start + span <= date("2024-06-12").and_time(hours.close));
                    for a in &existing {
                        assert!(!(start < a.ends_at() && a.starts_at < start + span));
                    }
                }
            }
        }
    }

    #[test]
    fn test_closed_day_returns_empty_with_closure_message() {
        let dentist = BusinessCatalog::demo().get("dentist").unwrap();
        // 2024-06-16 is a Sunday.
        let availability = Availability::compute(&dentist, date("2024-06-16"), None, &[]);
        assert!(availability.slots.is_empty());
        assert!(!availability.is_open);
        assert_eq!(availability.message(), "Sorry, we are closed on Sunday");
    }

    #[test]
    fn test_cancelled_appointments_do_not_block() {
        let barber = BusinessCatalog::demo().get("barber").unwrap();
        let mut cancelled = booked("2024-06-10T10:00", 30);
        cancelled.status = AppointmentStatus::Cancelled;
        let availability =
            Availability::compute(&barber, date("2024-06-10"), None, &[cancelled]);
        assert!(availability.contains(time("10:00")));
    }

    #[test]
    fn test_availability_is_idempotent() {
        let barber = BusinessCatalog::demo().get("barber").unwrap();
        let existing = vec![booked("2024-06-10T13:00", 60)];
        let first = Availability::compute(&barber, date("2024-06-10"), Some("Facial"), &existing);
        let second = Availability::compute(&barber, date("2024-06-10"), Some("Facial"), &existing);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fully_booked_day_message() {
        let hours = DayHours::open(time("09:00"), time("10:00"));
        let existing = vec![booked("2024-06-10T09:00", 60)];
        assert!(free_slots(&hours, date("2024-06-10"), 30, &existing).is_empty());

        let availability = Availability {
            date: date("2024-06-10"),
            is_open: true,
            slots: Vec::new(),
        };
        assert_eq!(availability.message(), "Sorry, no slots available for this date");
    }

    #[test]
    fn test_unknown_service_defaults_to_thirty_minutes() {
        let barber = BusinessCatalog::demo().get("barber").unwrap();
        assert_eq!(service_duration(&barber, Some("Tattoo")), 30);
        assert_eq!(service_duration(&barber, None), 30);
        assert_eq!(service_duration(&barber, Some("  FACIAL ")), 45);
    }

    #[test]
    fn test_parse_relative_and_absolute_dates() {
        let clock = FixedClock(
            NaiveDateTime::parse_from_str("2024-06-10T08:00", "%Y-%m-%dT%H:%M").unwrap(),
        );
        assert_eq!(parse_date(Some("today"), &clock).unwrap(), date("2024-06-10"));
        assert_eq!(parse_date(Some("Tomorrow"), &clock).unwrap(), date("2024-06-11"));
        assert_eq!(parse_date(None, &clock).unwrap(), date("2024-06-11"));
        assert_eq!(parse_date(Some("2024-07-01"), &clock).unwrap(), date("2024-07-01"));
        assert!(matches!(
            parse_date(Some("next blue moon"), &clock),
            Err(ToolError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_parse_date_time_variants() {
        let expected =
            NaiveDateTime::parse_from_str("2024-06-10T14:30", "%Y-%m-%dT%H:%M").unwrap();
        assert_eq!(parse_date_time("2024-06-10T14:30").unwrap(), expected);
        assert_eq!(parse_date_time("2024-06-10T14:30:00").unwrap(), expected);
        assert_eq!(parse_date_time("2024-06-10 14:30").unwrap(), expected);
        assert_eq!(parse_date_time("2024-06-10T14:30:00+05:30").unwrap(), expected);
        assert!(parse_date_time("half past two").is_err());
    }

    #[test]
    fn test_format_slot_uses_twelve_hour_clock() {
        assert_eq!(format_slot(time("09:00")), "9:00 AM");
        assert_eq!(format_slot(time("12:30")), "12:30 PM");
        assert_eq!(format_slot(time("19:30")), "7:30 PM");
    }
}
