use thiserror::Error;

use crate::models::{CityPlan, Place, TravelDetails, TravelPlan};

pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("`{field}` must not be empty")]
    EmptyField { field: String },

    #[error("`{field}` is {value}, expected a value between {min} and {max}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown transport medium `{0}`, expected train, bus, flight or car")]
    UnknownTransport(String),
}

/// Range and presence checks applied to model output before it is passed on.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for TravelDetails {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("source", &self.source)?;
        require_text("destination", &self.destination)
    }
}

impl Validate for TravelPlan {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("source", &self.source)?;
        require_text("destination", &self.destination)?;
        require_non_negative("total_distance", self.total_distance)?;

        for (idx, leg) in self.city_wise_plan.iter().enumerate() {
            validate_leg(&format!("city_wise_plan[{idx}]"), leg)?;
        }
        Ok(())
    }
}

impl Validate for Place {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_place("", self)
    }
}

fn validate_leg(prefix: &str, leg: &CityPlan) -> Result<(), ValidationError> {
    require_text(&join(prefix, "source"), &leg.source)?;
    require_text(&join(prefix, "destination"), &leg.destination)?;
    require_non_negative(&join(prefix, "total_kilometer"), leg.total_kilometer)?;
    if let Some(hours) = leg.estimated_duration_hours {
        require_non_negative(&join(prefix, "estimated_duration_hours"), hours)?;
    }

    for (idx, place) in leg.best_places.iter().enumerate() {
        validate_place(&join(prefix, &format!("best_places[{idx}]")), place)?;
    }
    Ok(())
}

fn validate_place(prefix: &str, place: &Place) -> Result<(), ValidationError> {
    require_range(&join(prefix, "rating"), place.rating, 0.0, MAX_RATING)?;
    if let Some(hours) = place.recommended_visit_duration_hours {
        require_non_negative(&join(prefix, "recommended_visit_duration_hours"), hours)?;
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn require_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    require_range(field, value, 0.0, f64::INFINITY)
}

fn require_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails both comparisons, so it is rejected too.
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}
