use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;
use voyage_agents::scripted::ScriptedModel;
use voyage_agents::OutputFormat;
use voyage_tests::{delhi_goa_details, delhi_goa_plan, router_with, TEST_ORIGIN};

fn query_request(query: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/agent/query")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "query": query }).to_string()))
        .unwrap()
}

fn full_chain_model() -> ScriptedModel {
    ScriptedModel::new()
        .reply_json(delhi_goa_details())
        .reply_json(delhi_goa_plan())
        .stream_fragments([
            "Day 1 ✈️ Fly Delhi → Mumbai. ",
            "Evening at the Gateway of India. ",
            "Day 3 🏖️ On to Goa.",
        ])
}

#[tokio::test]
async fn health_is_fixed_regardless_of_model_state() {
    let app = router_with(Arc::new(ScriptedModel::new()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed, json!({ "message": "Server is healthy" }));
}

#[tokio::test]
async fn query_streams_plain_text_narration() {
    let model = Arc::new(full_chain_model());
    let app = router_with(model.clone());

    let response = app
        .oneshot(query_request(
            "I want to travel from Delhi to Goa for 7 days by flight",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        String::from_utf8(body.to_vec()).unwrap(),
        "Day 1 ✈️ Fly Delhi → Mumbai. Evening at the Gateway of India. Day 3 🏖️ On to Goa."
    );

    let requests = model.requests();
    assert_eq!(requests.len(), 3);
    assert!(matches!(requests[0].format, OutputFormat::Json { .. }));
    assert!(requests[1].prompt.contains("Total travelling days: 7"));
    assert!(requests[1].prompt.contains("Preferred transport: flight"));
    assert_eq!(requests[2].format, OutputFormat::Text);
}

#[tokio::test]
async fn extra_plan_fields_reach_the_narration() {
    let model = Arc::new(full_chain_model());

    let response = router_with(model.clone())
        .oneshot(query_request("Delhi to Goa via Mumbai"))
        .await
        .unwrap();
    to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let narration = &model.requests()[2].prompt;
    assert!(narration.contains("\"season\": \"winter\""));
    assert!(narration.contains("Colaba homestay"));
    assert!(narration.contains("\"best_time\": \"sunset\""));
}

#[tokio::test]
async fn missing_travelling_days_still_plans() {
    let model = Arc::new(
        ScriptedModel::new()
            .reply_json(json!({ "source": "New Delhi", "destination": "Manali", "prefer_transport_medium": "bus" }))
            .reply_json(delhi_goa_plan())
            .stream_fragments(["Day 1 🚌 Overnight bus to Manali."]),
    );

    let response = router_with(model.clone())
        .oneshot(query_request("Bus trip from New Delhi to Manali"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(!body.is_empty());
    assert!(model.requests()[1]
        .prompt
        .contains("Total travelling days: not specified"));
}

#[tokio::test]
async fn extraction_failure_is_a_bare_server_error() {
    let model = Arc::new(ScriptedModel::new().fail("model overloaded"));

    let response = router_with(model.clone())
        .oneshot(query_request("Delhi to Goa"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn out_of_range_rating_stops_before_narration() {
    let mut plan = delhi_goa_plan();
    plan["city_wise_plan"][1]["best_places"][0]["rating"] = json!(9.5);
    let model = Arc::new(
        ScriptedModel::new()
            .reply_json(delhi_goa_details())
            .reply_json(plan)
            .stream_fragments(["never sent"]),
    );

    let response = router_with(model.clone())
        .oneshot(query_request("Delhi to Goa"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(model.call_count(), 2);
}

#[tokio::test]
async fn broken_narration_truncates_the_body() {
    let model = Arc::new(
        ScriptedModel::new()
            .reply_json(delhi_goa_details())
            .reply_json(delhi_goa_plan())
            .stream_then_fail(["Day 1 ✈️ "], "connection reset"),
    );

    let response = router_with(model)
        .oneshot(query_request("Delhi to Goa"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn body_without_query_is_rejected() {
    let model = Arc::new(ScriptedModel::new());
    let request = Request::builder()
        .method("POST")
        .uri("/agent/query")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": "Delhi to Goa" }).to_string()))
        .unwrap();

    let response = router_with(model.clone()).oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn repeated_queries_rerun_the_whole_chain() {
    let model = Arc::new(
        full_chain_model()
            .reply_json(delhi_goa_details())
            .reply_json(delhi_goa_plan())
            .stream_fragments(["Day 1 again."]),
    );
    let app = router_with(model.clone());

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(query_request("Delhi to Goa"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        to_bytes(response.into_body(), usize::MAX).await.unwrap();
    }

    assert_eq!(model.call_count(), 6);
}

#[tokio::test]
async fn cors_allows_only_the_configured_origin() {
    let app = router_with(Arc::new(ScriptedModel::new()));
    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/agent/query")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app.clone().oneshot(preflight(TEST_ORIGIN)).await.unwrap();
    assert_eq!(
        allowed
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some(TEST_ORIGIN)
    );

    let other = app
        .oneshot(preflight("https://elsewhere.example.com"))
        .await
        .unwrap();
    assert!(other
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn loosely_formatted_model_output_still_plans() {
    let mut plan = delhi_goa_plan();
    plan["start_date"] = json!("2025-01-10 07:00");
    plan["city_wise_plan"][0]["departure_time"] = json!("2025-01-10T07:00+05:30");
    plan["city_wise_plan"][0]["arrival_time"] = json!("2025-01-10T09:10Z");
    let model = Arc::new(
        ScriptedModel::new()
            .reply_json(json!({
                "source": "Delhi",
                "destination": "Goa",
                "total_travelling_days": 7.0,
                "prefer_transport_medium": "aeroplane"
            }))
            .reply_json(plan)
            .stream_fragments(["Day 1 ✈️ Off to Mumbai."]),
    );

    let response = router_with(model.clone())
        .oneshot(query_request("Delhi to Goa, a week, flying"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let planning = &model.requests()[1].prompt;
    assert!(planning.contains("Total travelling days: 7"));
    assert!(planning.contains("Preferred transport: flight"));
}
