//! Business Context
//!
//! The immutable configuration that parameterizes one receptionist: who the
//! agent is, which services the business sells, and when it is open. A
//! `BusinessContext` is owned by the backend and shared read-only (behind an
//! `Arc`) with every session that speaks for that business.

use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, sync::Arc};

/// The persona the AI agent adopts on the phone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentPersona {
    pub name: String,
    /// Language code: `en`, `hi` or `hi-en` (Hinglish).
    pub language: String,
    pub tone: String,
    pub greeting: String,
}

/// A bookable service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
    /// Price in rupees.
    pub price: u32,
    pub description: String,
}

/// Opening hours for a single weekday.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayHours {
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
    pub is_open: bool,
}

impl DayHours {
    pub fn open(open: NaiveTime, close: NaiveTime) -> Self {
        Self {
            open,
            close,
            is_open: true,
        }
    }

    pub fn closed() -> Self {
        Self {
            open: NaiveTime::MIN,
            close: NaiveTime::MIN,
            is_open: false,
        }
    }
}

/// Weekly opening hours, one entry per weekday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningHours {
    pub monday: DayHours,
    pub tuesday: DayHours,
    pub wednesday: DayHours,
    pub thursday: DayHours,
    pub friday: DayHours,
    pub saturday: DayHours,
    pub sunday: DayHours,
}

impl OpeningHours {
    /// Same hours every day of the week.
    pub fn uniform(hours: DayHours) -> Self {
        Self {
            monday: hours,
            tuesday: hours,
            wednesday: hours,
            thursday: hours,
            friday: hours,
            saturday: hours,
            sunday: hours,
        }
    }

    pub fn for_weekday(&self, day: Weekday) -> &DayHours {
        match day {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Iterates Monday through Sunday.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &DayHours)> {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .map(move |day| (day, self.for_weekday(day)))
    }
}

/// Full English name of a weekday, e.g. `Monday`.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Immutable snapshot of everything the agent needs to know about a business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessContext {
    pub id: String,
    pub name: String,
    /// Business category, e.g. `salon`, `clinic`, `gym`.
    #[serde(alias = "type")]
    pub category: String,
    #[serde(alias = "agentPersona")]
    pub persona: AgentPersona,
    pub services: Vec<Service>,
    pub opening_hours: OpeningHours,
    #[serde(default)]
    pub address: Option<String>,
    /// Telegram chat that receives booking notifications.
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

impl BusinessContext {
    /// Case-insensitive lookup of a service by name.
    pub fn find_service(&self, name: &str) -> Option<&Service> {
        let wanted = name.trim();
        self.services
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(wanted))
    }
}

/// Persona identifiers mapped to their businesses.
#[derive(Debug, Clone, Default)]
pub struct BusinessCatalog {
    businesses: BTreeMap<String, Arc<BusinessContext>>,
}

impl BusinessCatalog {
    /// Persona used when a request does not name one.
    pub const DEFAULT_PERSONA: &'static str = "barber";

    pub fn new(businesses: impl IntoIterator<Item = (String, BusinessContext)>) -> Self {
        Self {
            businesses: businesses
                .into_iter()
                .map(|(persona, business)| (persona, Arc::new(business)))
                .collect(),
        }
    }

    /// Loads a catalog from a JSON object of `persona -> BusinessContext`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read business catalog {}", path.display()))?;
        let businesses: BTreeMap<String, BusinessContext> =
            serde_json::from_str(&raw).context("Business catalog is not valid JSON")?;
        Ok(Self::new(businesses))
    }

    /// Resolves a persona, falling back to the default persona when none is given.
    pub fn resolve(&self, persona: Option<&str>) -> Option<(&str, Arc<BusinessContext>)> {
        let key = persona
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(Self::DEFAULT_PERSONA);
        self.businesses
            .get_key_value(key)
            .map(|(k, v)| (k.as_str(), Arc::clone(v)))
    }

    pub fn get(&self, persona: &str) -> Option<Arc<BusinessContext>> {
        self.businesses.get(persona).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<BusinessContext>)> {
        self.businesses.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.businesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.businesses.is_empty()
    }

    /// The built-in demo businesses.
    pub fn demo() -> Self {
        Self::new(demo_businesses())
    }
}

/// Picks the provider voice for a persona.
///
/// Hindi and Hinglish personas get the warmer voices; English personas are
/// matched to their tone.
pub fn select_voice(persona_id: &str, business: &BusinessContext) -> &'static str {
    match business.persona.language.as_str() {
        "hi" | "hi-en" => {
            if persona_id == "gym" {
                "echo"
            } else {
                "shimmer"
            }
        }
        _ => match persona_id {
            "dentist" => "sage",
            "spa" => "coral",
            "gym" => "ash",
            _ => "shimmer",
        },
    }
}

fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn service(name: &str, duration_minutes: u32, price: u32, description: &str) -> Service {
    Service {
        name: name.to_string(),
        duration_minutes,
        price,
        description: description.to_string(),
    }
}

fn persona(name: &str, language: &str, tone: &str, greeting: &str) -> AgentPersona {
    AgentPersona {
        name: name.to_string(),
        language: language.to_string(),
        tone: tone.to_string(),
        greeting: greeting.to_string(),
    }
}

fn weekdays(weekday: DayHours, friday: DayHours, saturday: DayHours, sunday: DayHours) -> OpeningHours {
    OpeningHours {
        monday: weekday,
        tuesday: weekday,
        wednesday: weekday,
        thursday: weekday,
        friday,
        saturday,
        sunday,
    }
}

fn demo_businesses() -> Vec<(String, BusinessContext)> {
    vec![
        (
            "barber".to_string(),
            BusinessContext {
                id: "demo-barber".to_string(),
                name: "Raj's Premium Salon".to_string(),
                category: "salon".to_string(),
                persona: persona(
                    "Priya",
                    "hi-en",
                    "friendly",
                    "Namaste! Raj Salon me aapka swagat hai. Main Priya hoon, aapki kya help kar sakti hoon?",
                ),
                services: vec![
                    service("Haircut", 30, 300, "Professional haircut"),
                    service("Beard Trim", 15, 150, "Beard shaping"),
                    service("Hair Color", 60, 800, "Full coloring"),
                    service("Facial", 45, 500, "Deep cleansing facial"),
                    service("Head Massage", 20, 200, "Relaxing massage"),
                ],
                opening_hours: weekdays(
                    DayHours::open(t(9, 0), t(20, 0)),
                    DayHours::open(t(9, 0), t(21, 0)),
                    DayHours::open(t(10, 0), t(22, 0)),
                    DayHours::open(t(10, 0), t(18, 0)),
                ),
                address: Some("123 MG Road, Bangalore. Near Metro Station.".to_string()),
                telegram_chat_id: None,
            },
        ),
        (
            "dentist".to_string(),
            BusinessContext {
                id: "demo-dentist".to_string(),
                name: "Smile Dental Clinic".to_string(),
                category: "clinic".to_string(),
                persona: persona(
                    "Dr. Sharma",
                    "en",
                    "professional",
                    "Hello! Thank you for calling Smile Dental Clinic. I am Dr. Sharma. How may I help you today?",
                ),
                services: vec![
                    service("Checkup", 30, 500, "Dental examination"),
                    service("Cleaning", 45, 800, "Professional cleaning"),
                    service("Filling", 60, 1500, "Cavity filling"),
                    service("Root Canal", 90, 5000, "Root canal treatment"),
                    service("Whitening", 60, 3000, "Teeth whitening"),
                ],
                opening_hours: weekdays(
                    DayHours::open(t(9, 0), t(18, 0)),
                    DayHours::open(t(9, 0), t(18, 0)),
                    DayHours::open(t(10, 0), t(14, 0)),
                    DayHours::closed(),
                ),
                address: Some("45 Linking Road, Bandra West, Mumbai".to_string()),
                telegram_chat_id: None,
            },
        ),
        (
            "gym".to_string(),
            BusinessContext {
                id: "demo-gym".to_string(),
                name: "FitZone Gym".to_string(),
                category: "gym".to_string(),
                persona: persona(
                    "Coach Rahul",
                    "hi-en",
                    "energetic",
                    "Hey! FitZone Gym mein welcome! Main Coach Rahul. Ready ho fitness journey start karne ke liye?",
                ),
                services: vec![
                    service("Personal Training", 60, 1000, "One-on-one training"),
                    service("Group Class", 45, 300, "Group fitness"),
                    service("Yoga", 60, 400, "Guided yoga"),
                    service("Assessment", 30, 500, "Body analysis"),
                    service("Diet Plan", 45, 800, "Nutrition planning"),
                ],
                opening_hours: weekdays(
                    DayHours::open(t(5, 0), t(22, 0)),
                    DayHours::open(t(5, 0), t(22, 0)),
                    DayHours::open(t(6, 0), t(20, 0)),
                    DayHours::open(t(7, 0), t(18, 0)),
                ),
                address: Some("Sector 18, Noida".to_string()),
                telegram_chat_id: None,
            },
        ),
        (
            "spa".to_string(),
            BusinessContext {
                id: "demo-spa".to_string(),
                name: "Serenity Wellness Spa".to_string(),
                category: "spa".to_string(),
                persona: persona(
                    "Maya",
                    "en",
                    "calm",
                    "Welcome to Serenity Spa. I am Maya. How may I help you relax today?",
                ),
                services: vec![
                    service("Swedish Massage", 60, 2000, "Full body relaxation"),
                    service("Deep Tissue", 75, 2500, "Intensive therapy"),
                    service("Aromatherapy", 90, 3000, "Essential oils"),
                    service("Hot Stone", 75, 2800, "Heated stone massage"),
                    service("Facial", 60, 1500, "Rejuvenating facial"),
                ],
                opening_hours: weekdays(
                    DayHours::open(t(10, 0), t(20, 0)),
                    DayHours::open(t(10, 0), t(21, 0)),
                    DayHours::open(t(9, 0), t(21, 0)),
                    DayHours::open(t(10, 0), t(18, 0)),
                ),
                address: Some("Koregaon Park, Pune".to_string()),
                telegram_chat_id: None,
            },
        ),
        (
            "electrician".to_string(),
            BusinessContext {
                id: "demo-electrician".to_string(),
                name: "Quick Fix Electricals".to_string(),
                category: "service".to_string(),
                persona: persona(
                    "Ramesh",
                    "hi-en",
                    "helpful",
                    "Hello! Quick Fix Electricals mein aapka swagat hai. Bijli ki koi problem hai?",
                ),
                services: vec![
                    service("Home Visit", 60, 300, "Inspection and repairs"),
                    service("Wiring", 120, 800, "Electrical wiring"),
                    service("Fan Installation", 45, 400, "Fan fitting"),
                    service("AC Service", 90, 600, "AC maintenance"),
                    service("Emergency", 60, 500, "Urgent repairs"),
                ],
                opening_hours: weekdays(
                    DayHours::open(t(8, 0), t(20, 0)),
                    DayHours::open(t(8, 0), t(20, 0)),
                    DayHours::open(t(9, 0), t(18, 0)),
                    DayHours::open(t(10, 0), t(14, 0)),
                ),
                address: Some("Karol Bagh, New Delhi".to_string()),
                telegram_chat_id: None,
            },
        ),
    ]
}

/// Serde helpers for `HH:MM` wall-clock times.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|e| D::Error::custom(format!("invalid time '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_catalog_contains_all_personas() {
        let catalog = BusinessCatalog::demo();
        assert_eq!(catalog.len(), 5);
        for persona in ["barber", "dentist", "gym", "spa", "electrician"] {
            assert!(catalog.get(persona).is_some(), "missing {}", persona);
        }
    }

    #[test]
    fn test_resolve_defaults_to_barber() {
        let catalog = BusinessCatalog::demo();
        let (persona, business) = catalog.resolve(None).unwrap();
        assert_eq!(persona, "barber");
        assert_eq!(business.id, "demo-barber");

        let (persona, _) = catalog.resolve(Some("  ")).unwrap();
        assert_eq!(persona, "barber");
        assert!(catalog.resolve(Some("plumber")).is_none());
    }

    #[test]
    fn test_find_service_is_case_insensitive() {
        let business = BusinessCatalog::demo().get("barber").unwrap();
        assert_eq!(business.find_service("haircut").unwrap().duration_minutes, 30);
        assert_eq!(business.find_service(" BEARD TRIM ").unwrap().price, 150);
        assert!(business.find_service("Manicure").is_none());
    }

    #[test]
    fn test_opening_hours_iterates_monday_first() {
        let business = BusinessCatalog::demo().get("dentist").unwrap();
        let days: Vec<_> = business.opening_hours.iter().map(|(d, _)| d).collect();
        assert_eq!(days.first(), Some(&Weekday::Mon));
        assert_eq!(days.last(), Some(&Weekday::Sun));
        assert!(!business.opening_hours.for_weekday(Weekday::Sun).is_open);
    }

    #[test]
    fn test_business_json_uses_original_field_names() {
        let json = r#"{
            "id": "b1",
            "name": "Test Salon",
            "type": "salon",
            "agentPersona": {"name": "Asha", "language": "en", "tone": "warm", "greeting": "Hi"},
            "services": [{"name": "Haircut", "duration": 30, "price": 300, "description": "Cut"}],
            "openingHours": {
                "monday": {"open": "09:00", "close": "20:00", "isOpen": true},
                "tuesday": {"open": "09:00", "close": "20:00", "isOpen": true},
                "wednesday": {"open": "09:00", "close": "20:00", "isOpen": true},
                "thursday": {"open": "09:00", "close": "20:00", "isOpen": true},
                "friday": {"open": "09:00", "close": "20:00", "isOpen": true},
                "saturday": {"open": "10:00", "close": "14:00", "isOpen": true},
                "sunday": {"open": "00:00", "close": "00:00", "isOpen": false}
            }
        }"#;

        let business: BusinessContext = serde_json::from_str(json).unwrap();
        assert_eq!(business.category, "salon");
        assert_eq!(business.persona.name, "Asha");
        assert_eq!(business.services[0].duration_minutes, 30);
        assert_eq!(business.opening_hours.saturday.close, t(14, 0));
        assert!(business.address.is_none());

        let out = serde_json::to_value(&business).unwrap();
        assert_eq!(out["openingHours"]["monday"]["open"], "09:00");
        assert_eq!(out["openingHours"]["sunday"]["isOpen"], false);
    }

    #[test]
    fn test_select_voice() {
        let catalog = BusinessCatalog::demo();
        assert_eq!(select_voice("barber", &catalog.get("barber").unwrap()), "shimmer");
        assert_eq!(select_voice("gym", &catalog.get("gym").unwrap()), "echo");
        assert_eq!(select_voice("dentist", &catalog.get("dentist").unwrap()), "sage");
        assert_eq!(select_voice("spa", &catalog.get("spa").unwrap()), "coral");
    }
}
