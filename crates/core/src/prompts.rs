use serde_json::Value;

use crate::models::TravelDetails;

const NOT_SPECIFIED: &str = "not specified";

/// System message for the extraction call.
pub const EXTRACTION_ROLE: &str =
    "You are a travel assistant who pulls structured trip details out of a traveller's request.";

/// System message for the planning call.
pub const PLANNING_ROLE: &str = "You are an expert travel planner.";

/// System message for the narration call.
pub const NARRATION_ROLE: &str =
    "You are an enthusiastic travel agent who turns structured plans into trips people want to take.";

pub fn normalize_query(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn extraction_prompt(query: &str) -> String {
    format!(
        "Read the traveller's request and pull out the trip details.\n\
\n\
Fields:\n\
- source (required): where the whole journey starts.\n\
- destination (required): where the whole journey ends.\n\
- total_travelling_days (optional integer): total days available, including the way back.\n\
- prefer_transport_medium (optional): one of \"train\", \"bus\", \"flight\", \"car\".\n\
- other_suggestions (optional): any other wishes, e.g. food, stays, adventure or hiking spots.\n\
Use null for any optional field the request does not mention.\n\
\n\
Example: \"I want to travel from Delhi to Goa for 7 days by flight\" gives source \"Delhi\", \
destination \"Goa\", total_travelling_days 7 and prefer_transport_medium \"flight\".\n\
\n\
Request:\n\
{query}\n"
    )
}

pub fn planning_prompt(details: &TravelDetails) -> String {
    let days = details
        .total_travelling_days
        .map(|days| days.to_string())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());
    let transport = details
        .prefer_transport_medium
        .map(|medium| medium.as_str())
        .unwrap_or(NOT_SPECIFIED);
    let suggestions = details
        .other_suggestions
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(NOT_SPECIFIED);

    let mut prompt = format!(
        "Build a practical, day-by-day travel plan from the details below.\n\
\n\
Cover:\n\
- the best route from source to destination, split into legs through intermediate cities where it makes sense;\n\
- where to stay (hotels, homestays, resorts);\n\
- must-visit attractions, cultural experiences and hidden gems, ranked best first for every city;\n\
- food worth trying (street food, restaurants, local specialties);\n\
- travel time and the right transport for each leg.\n\
When the number of days is not specified, choose a sensible trip length yourself.\n\
\n\
Source: {source}\n\
Destination: {destination}\n\
Total travelling days: {days}\n\
Preferred transport: {transport}\n\
Other wishes: {suggestions}\n",
        source = details.source,
        destination = details.destination,
    );

    if !details.extra.is_empty() {
        prompt.push_str("Additional details: ");
        prompt.push_str(&Value::Object(details.extra.clone()).to_string());
        prompt.push('\n');
    }

    prompt
}

pub fn narration_prompt(plan: &Value) -> String {
    let rendered = serde_json::to_string_pretty(plan).unwrap_or_else(|_| plan.to_string());

    format!(
        "Turn the structured travel plan below into a trip \
the traveller can follow.\n\
\n\
- Split it into days (Day 1, Day 2, ...) with morning, afternoon, evening and the night stay, \
matching the length of the trip.\n\
- Keep the formatting clean and add a few emoji for fun.\n\
- Work through the plan city by city and add fun facts about the best places listed.\n\
\n\
Plan:\n\
{rendered}\n\
\n\
Write it as one continuous, engaging narration of the journey.\n"
    )
}
