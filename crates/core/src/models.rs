use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::validate::ValidationError;

/// Fields the model returned beyond the declared schema. Kept verbatim so they
/// survive into later chain steps.
pub type ExtraFields = Map<String, Value>;

/// Extra-field key holding a transport preference that maps to no known medium.
pub const REQUESTED_TRANSPORT_KEY: &str = "requested_transport";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TransportMedium {
    Train,
    Bus,
    Flight,
    Car,
}

impl TransportMedium {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "train" | "rail" | "railway" => Some(Self::Train),
            "bus" | "coach" => Some(Self::Bus),
            "flight" | "plane" | "airplane" | "aeroplane" | "air" | "fly" => Some(Self::Flight),
            "car" | "road" | "drive" | "self-drive" | "taxi" => Some(Self::Car),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Bus => "bus",
            Self::Flight => "flight",
            Self::Car => "car",
        }
    }
}

impl TryFrom<String> for TransportMedium {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(ValidationError::UnknownTransport(value))
    }
}

/// Extracted details for the travel plan.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct TravelDetails {
    /// The starting point of the entire journey
    pub source: String,
    /// The final destination of the entire journey
    pub destination: String,
    /// Total number of days the user has for the trip, including the return to the source
    pub total_travelling_days: Option<u32>,
    /// Preferred way of travelling; one of train, bus, flight or car
    pub prefer_transport_medium: Option<TransportMedium>,
    /// Other wishes such as places to eat or stay, adventure or hiking spots
    pub other_suggestions: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Wire shape of [`TravelDetails`]. The transport preference stays free text
/// here; anything that is not a known medium moves to the extra fields.
#[derive(Deserialize)]
struct RawTravelDetails {
    source: String,
    destination: String,
    #[serde(default, deserialize_with = "day_count")]
    total_travelling_days: Option<u32>,
    #[serde(default)]
    prefer_transport_medium: Option<String>,
    #[serde(default)]
    other_suggestions: Option<String>,
    #[serde(flatten)]
    extra: ExtraFields,
}

impl<'de> Deserialize<'de> for TravelDetails {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawTravelDetails::deserialize(deserializer)?;
        let mut extra = raw.extra;

        let prefer_transport_medium = match raw.prefer_transport_medium {
            Some(value) if !value.trim().is_empty() => {
                let medium = TransportMedium::parse(&value);
                if medium.is_none() {
                    extra.insert(REQUESTED_TRANSPORT_KEY.to_string(), Value::String(value));
                }
                medium
            }
            _ => None,
        };

        Ok(Self {
            source: raw.source,
            destination: raw.destination,
            total_travelling_days: raw.total_travelling_days,
            prefer_transport_medium,
            other_suggestions: raw.other_suggestions,
            extra,
        })
    }
}

/// Accepts whole numbers written as floats (`7.0`), which models emit often.
fn day_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(days) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if days.fract() != 0.0 || days < 0.0 || days > f64::from(u32::MAX) {
        return Err(serde::de::Error::custom(format!(
            "total_travelling_days must be a whole number of days, got {days}"
        )));
    }
    Ok(Some(days as u32))
}

/// A tourist attraction or notable place in a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Place {
    /// Name of the place to visit
    pub name: String,
    /// Short description of the place and why it is recommended
    pub description: String,
    /// Rating of the place on a 0-5 scale
    pub rating: f64,
    /// Suggested time to spend at the place, in hours
    pub recommended_visit_duration_hours: Option<f64>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// One leg of the journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CityPlan {
    /// Starting location of this leg
    pub source: String,
    /// Destination city of this leg
    pub destination: String,
    /// Distance covered from source to destination, in kilometers
    pub total_kilometer: f64,
    /// Planned departure time from the source (ISO 8601)
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    #[schemars(with = "DateTime<FixedOffset>")]
    pub departure_time: DateTime<FixedOffset>,
    /// Planned arrival time at the destination (ISO 8601)
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    #[schemars(with = "DateTime<FixedOffset>")]
    pub arrival_time: DateTime<FixedOffset>,
    /// Estimated travel duration for this leg, in hours
    pub estimated_duration_hours: Option<f64>,
    /// Special notes about this leg, e.g. overnight bus
    pub notes: Option<String>,
    /// Top places to visit in the destination city, best first
    #[serde(default)]
    pub best_places: Vec<Place>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// The overall structured travel plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TravelPlan {
    /// The starting point of the entire journey
    pub source: String,
    /// The final destination of the entire journey
    pub destination: String,
    /// Total distance of the trip, in kilometers
    pub total_distance: f64,
    /// Start of the overall journey (ISO 8601)
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    #[schemars(with = "DateTime<FixedOffset>")]
    pub start_date: DateTime<FixedOffset>,
    /// End of the overall journey (ISO 8601)
    #[serde(deserialize_with = "crate::timestamp::deserialize")]
    #[schemars(with = "DateTime<FixedOffset>")]
    pub end_date: DateTime<FixedOffset>,
    /// Breakdown of the trip leg by leg
    pub city_wise_plan: Vec<CityPlan>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl TravelPlan {
    pub fn leg_count(&self) -> usize {
        self.city_wise_plan.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub message: String,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            message: "Server is healthy".to_string(),
        }
    }
}
