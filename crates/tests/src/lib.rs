//! Fixtures shared by the HTTP integration tests.

use std::sync::Arc;

use axum::Router;
use serde_json::{json, Value};
use voyage_agents::scripted::ScriptedModel;
use voyage_api::{build_router, ApiState};

pub const TEST_ORIGIN: &str = "http://localhost:5173";

pub fn router_with(model: Arc<ScriptedModel>) -> Router {
    build_router(ApiState::new(model, TEST_ORIGIN).expect("test origin is valid"))
}

pub fn delhi_goa_details() -> Value {
    json!({
        "source": "Delhi",
        "destination": "Goa",
        "total_travelling_days": 7,
        "prefer_transport_medium": "flight",
        "other_suggestions": null
    })
}

/// A two-leg plan with one extra field per level.
pub fn delhi_goa_plan() -> Value {
    json!({
        "source": "Delhi",
        "destination": "Goa",
        "total_distance": 1950.5,
        "start_date": "2025-01-10T07:00:00+05:30",
        "end_date": "2025-01-16T21:00:00+05:30",
        "season": "winter",
        "city_wise_plan": [
            {
                "source": "Delhi",
                "destination": "Mumbai",
                "total_kilometer": 1150.0,
                "departure_time": "2025-01-10T07:00:00+05:30",
                "arrival_time": "2025-01-10T09:10:00+05:30",
                "estimated_duration_hours": 2.2,
                "notes": "Morning flight",
                "stay": "Colaba homestay",
                "best_places": [
                    {
                        "name": "Gateway of India",
                        "description": "Harbour-front arch",
                        "rating": 4.6,
                        "best_time": "sunset"
                    }
                ]
            },
            {
                "source": "Mumbai",
                "destination": "Goa",
                "total_kilometer": 800.5,
                "departure_time": "2025-01-12T06:00:00+05:30",
                "arrival_time": "2025-01-12T07:15:00+05:30",
                "best_places": [
                    {
                        "name": "Fort Aguada",
                        "description": "Portuguese fort with a lighthouse",
                        "rating": 4.4,
                        "recommended_visit_duration_hours": 1.5
                    }
                ]
            }
        ]
    })
}
