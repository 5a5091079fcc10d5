//! System prompt rendering.
//!
//! Turns a `BusinessContext` into the natural-language instruction block the
//! realtime model receives as `instructions`. The output is deterministic for a
//! given context.

use crate::business::{BusinessContext, weekday_name};
use std::fmt::Write;

fn language_description(code: &str) -> &'static str {
    match code {
        "hi-en" => "Hindi and English mix (Hinglish)",
        "hi" => "Hindi",
        _ => "English",
    }
}

/// Renders the services section, one line per service.
pub fn services_block(business: &BusinessContext) -> String {
    business
        .services
        .iter()
        .map(|s| {
            format!(
                "- {}: ₹{} ({} minutes) - {}",
                s.name, s.price, s.duration_minutes, s.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders the opening hours section, Monday through Sunday.
pub fn hours_block(business: &BusinessContext) -> String {
    business
        .opening_hours
        .iter()
        .map(|(day, hours)| {
            if hours.is_open {
                format!(
                    "- {}: {} - {}",
                    weekday_name(day),
                    hours.open.format("%H:%M"),
                    hours.close.format("%H:%M")
                )
            } else {
                format!("- {}: Closed", weekday_name(day))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the full behavioral instructions for the receptionist agent.
pub fn system_prompt(business: &BusinessContext) -> String {
    let persona = &business.persona;
    let mut prompt = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(
        prompt,
        "You are {}, the virtual receptionist for {}, a {} business.",
        persona.name, business.name, business.category
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "YOUR PERSONALITY:");
    let _ = writeln!(prompt, "- Warm, helpful, and {}", persona.tone);
    let _ = writeln!(
        prompt,
        "- Speak naturally in {}",
        language_description(&persona.language)
    );
    let _ = writeln!(prompt, "- Use Indian cultural context (Namaste, Ji, etc.)");
    let _ = writeln!(prompt, "- Be patient and understanding");
    let _ = writeln!(prompt, "- Keep responses SHORT - under 25 words");
    let _ = writeln!(prompt, "- Ask ONE question at a time");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "YOUR GREETING:");
    let _ = writeln!(prompt, "\"{}\"", persona.greeting);
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "YOUR RESPONSIBILITIES:");
    let _ = writeln!(prompt, "1. Greet the caller warmly");
    let _ = writeln!(
        prompt,
        "2. Understand their need (booking, inquiry, reschedule, cancel)"
    );
    let _ = writeln!(prompt, "3. For bookings:");
    let _ = writeln!(prompt, "   - Ask for the preferred date and time");
    let _ = writeln!(prompt, "   - Use the check_availability function to verify");
    let _ = writeln!(prompt, "   - If the slot is unavailable, suggest alternatives");
    let _ = writeln!(prompt, "   - Collect: name, phone number, service type");
    let _ = writeln!(prompt, "   - ALWAYS confirm all details before booking");
    let _ = writeln!(prompt, "   - Use the book_appointment function to finalize");
    let _ = writeln!(prompt, "4. For inquiries:");
    let _ = writeln!(prompt, "   - Use the get_business_info function");
    let _ = writeln!(prompt, "   - Mention prices when asked");
    let _ = writeln!(prompt, "5. For cancellations:");
    let _ = writeln!(prompt, "   - Ask for the phone number");
    let _ = writeln!(prompt, "   - Use the cancel_appointment function");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "SERVICES WE OFFER:");
    let _ = writeln!(prompt, "{}", services_block(business));
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "BUSINESS HOURS:");
    let _ = writeln!(prompt, "{}", hours_block(business));
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "CONVERSATION RULES:");
    let _ = writeln!(prompt, "- Never book outside business hours");
    let _ = writeln!(prompt, "- Always confirm the customer's phone number");
    let _ = writeln!(prompt, "- Repeat appointment details before confirming");
    let _ = writeln!(prompt, "- If unsure, politely ask the caller to repeat");
    let _ = writeln!(prompt, "- Stay polite even if the caller is rude");
    let _ = write!(prompt, "- End calls with a warm goodbye");

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::BusinessCatalog;

    #[test]
    fn test_prompt_mentions_persona_and_business() {
        let business = BusinessCatalog::demo().get("barber").unwrap();
        let prompt = system_prompt(&business);

        assert!(prompt.starts_with("You are Priya, the virtual receptionist for Raj's Premium Salon"));
        assert!(prompt.contains("Hindi and English mix (Hinglish)"));
        assert!(prompt.contains(&business.persona.greeting));
        assert!(prompt.contains("Ask ONE question at a time"));
        assert!(prompt.contains("ALWAYS confirm all details before booking"));
    }

    #[test]
    fn test_prompt_lists_services_and_hours() {
        let business = BusinessCatalog::demo().get("dentist").unwrap();
        let prompt = system_prompt(&business);

        assert!(prompt.contains("- Root Canal: ₹5000 (90 minutes) - Root canal treatment"));
        assert!(prompt.contains("- Monday: 09:00 - 18:00"));
        assert!(prompt.contains("- Sunday: Closed"));
        assert!(prompt.contains("Speak naturally in English"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let business = BusinessCatalog::demo().get("gym").unwrap();
        assert_eq!(system_prompt(&business), system_prompt(&business));
    }
}
