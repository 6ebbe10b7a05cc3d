use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use delivery_lifecycle::api::rest::router;
use delivery_lifecycle::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(1024, 10)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn as_actor(mut request: Request<Body>, id: Uuid, role: &str) -> Request<Body> {
    let headers = request.headers_mut();
    headers.insert("x-actor-id", id.to_string().parse().unwrap());
    headers.insert("x-actor-role", role.parse().unwrap());
    request
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn accra_delivery(order_id: &str, delivery_type: &str) -> Value {
    json!({
        "order_id": order_id,
        "store_location": { "lat": 5.6, "lng": -0.2 },
        "customer_location": { "lat": 5.65, "lng": -0.19 },
        "delivery_type": delivery_type,
        "customer_info": { "name": "Ama", "phone": "+233200000009", "address": "12 Ring Rd" }
    })
}

async fn create_delivery(app: &axum::Router, order_id: &str) -> Value {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/deliveries",
            accra_delivery(order_id, "standard"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await
}

async fn register_rider(app: &axum::Router, email: &str, phone: &str) -> Uuid {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/riders",
            json!({ "name": "Kofi", "email": email, "phone": phone }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["deliveries"], 0);
    assert_eq!(body["riders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    create_delivery(&app, "ORD-M").await;

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("deliveries_created_total 1"));
    assert!(body.contains("status_transitions_total"));
}

#[tokio::test]
async fn rejected_operations_are_counted_by_reason() {
    let app = setup();
    create_delivery(&app, "ORD-M").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/deliveries",
            accra_delivery("ORD-M", "standard"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app.oneshot(get_request("/metrics")).await.unwrap();
    let body = body_string(res).await;
    assert!(body.contains(r#"rejected_operations_total{reason="duplicate_order"} 1"#));
    assert!(!body.contains("rejected_transitions_total"));
}

#[tokio::test]
async fn deactivated_rider_cannot_accept() {
    let app = setup();
    let rider_id = register_rider(&app, "kofi@example.com", "+233200000001").await;
    let delivery = create_delivery(&app, "ORD-D").await;
    let id = delivery["id"].as_str().unwrap();
    let accept = |rider: Uuid| {
        as_actor(
            json_request("POST", &format!("/riders/deliveries/{id}/accept"), json!({})),
            rider,
            "rider",
        )
    };

    let res = app.clone().oneshot(accept(Uuid::new_v4())).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(as_actor(
            json_request("PUT", &format!("/admin/riders/{rider_id}/deactivate"), json!({})),
            rider_id,
            "rider",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .clone()
        .oneshot(as_actor(
            json_request("PUT", &format!("/admin/riders/{rider_id}/deactivate"), json!({})),
            Uuid::new_v4(),
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["is_active"], false);

    let res = app.clone().oneshot(accept(rider_id)).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .oneshot(as_actor(
            json_request(
                "PUT",
                &format!("/admin/riders/{}/deactivate", Uuid::new_v4()),
                json!({}),
            ),
            Uuid::new_v4(),
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn fee_quote_matches_worked_example() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/deliveries/fee",
            json!({
                "store_location": { "lat": 5.6, "lng": -0.2 },
                "customer_location": { "lat": 5.65, "lng": -0.19 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["fee"], 9.5);
    assert_eq!(body["base_price"], 5.0);
    assert_eq!(body["distance_charge"], 4.5);

    let res = app
        .oneshot(json_request(
            "POST",
            "/deliveries/fee",
            json!({
                "store_location": { "lat": 5.6, "lng": -0.2 },
                "customer_location": { "lat": 5.65, "lng": -0.19 },
                "delivery_type": "express"
            }),
        ))
        .await
        .unwrap();
    let body = body_json(res).await;
    assert_eq!(body["fee"], 11.4);
    assert_eq!(body["express_surcharge"], 1.9);
}

#[tokio::test]
async fn fee_quote_rejects_out_of_range_coordinates() {
    let app = setup();
    let res = app
        .oneshot(json_request(
            "POST",
            "/deliveries/fee",
            json!({
                "store_location": { "lat": 95.0, "lng": 0.0 },
                "customer_location": { "lat": 5.65, "lng": -0.19 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_delivery_returns_pending() {
    let app = setup();
    let body = create_delivery(&app, "ORD-1").await;

    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["delivery_type"], "standard");
    assert_eq!(body["fee"], 9.5);
    assert!(body["rider_id"].is_null());
    assert_eq!(body["tracking_number"].as_str().unwrap().len(), 10);
    assert_eq!(body["customer_info"]["name"], "Ama");
}

#[tokio::test]
async fn duplicate_order_returns_409() {
    let app = setup();
    create_delivery(&app, "ORD-1").await;

    let res = app
        .oneshot(json_request(
            "POST",
            "/deliveries",
            accra_delivery("ORD-1", "express"),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn blank_contact_field_returns_400() {
    let app = setup();
    let mut payload = accra_delivery("ORD-1", "standard");
    payload["customer_info"]["address"] = json!(" ");

    let res = app
        .oneshot(json_request("POST", "/deliveries", payload))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn track_unknown_number_returns_404() {
    let app = setup();
    let res = app
        .oneshot(get_request("/deliveries/track/UNKNOWN123"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rider_routes_require_rider_identity() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(get_request("/riders/deliveries"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .clone()
        .oneshot(as_actor(
            get_request("/riders/deliveries"),
            Uuid::new_v4(),
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .oneshot(as_actor(
            get_request("/admin/deliveries"),
            Uuid::new_v4(),
            "rider",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_rider_rejects_duplicates() {
    let app = setup();
    let rider = json!({
        "name": "Kofi",
        "email": "kofi@example.com",
        "phone": "+233200000001",
        "vehicle_type": "motorcycle"
    });

    let res = app
        .clone()
        .oneshot(json_request("POST", "/riders", rider.clone()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["vehicle_type"], "motorcycle");
    assert_eq!(body["is_active"], true);

    let res = app
        .oneshot(json_request("POST", "/riders", rider))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn status_update_rejects_non_rider_statuses() {
    let app = setup();
    let delivery = create_delivery(&app, "ORD-1").await;
    let id = delivery["id"].as_str().unwrap();

    let res = app
        .oneshot(as_actor(
            json_request(
                "PUT",
                &format!("/riders/deliveries/{id}/status"),
                json!({ "status": "ACCEPTED" }),
            ),
            Uuid::new_v4(),
            "rider",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_delivery_flow() {
    let app = setup();
    let rider_id = register_rider(&app, "kofi@example.com", "+233200000001").await;
    let other_rider = register_rider(&app, "ama@example.com", "+233200000002").await;

    let delivery = create_delivery(&app, "ORD-FLOW").await;
    let id = delivery["id"].as_str().unwrap().to_string();
    let tracking = delivery["tracking_number"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(as_actor(
            get_request("/riders/deliveries"),
            rider_id,
            "rider",
        ))
        .await
        .unwrap();
    let available = body_json(res).await;
    assert_eq!(available.as_array().unwrap().len(), 1);

    let res = app
        .clone()
        .oneshot(as_actor(
            json_request("POST", &format!("/riders/deliveries/{id}/accept"), json!({})),
            rider_id,
            "rider",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let accepted = body_json(res).await;
    assert_eq!(accepted["status"], "ACCEPTED");
    assert_eq!(accepted["rider_id"], rider_id.to_string());

    let res = app
        .clone()
        .oneshot(as_actor(
            json_request("POST", &format!("/riders/deliveries/{id}/accept"), json!({})),
            other_rider,
            "rider",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(as_actor(
            json_request(
                "PUT",
                &format!("/riders/deliveries/{id}/status"),
                json!({ "status": "IN_TRANSIT" }),
            ),
            rider_id,
            "rider",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    for status in ["PICKED_UP", "IN_TRANSIT", "DELIVERED"] {
        let res = app
            .clone()
            .oneshot(as_actor(
                json_request(
                    "PUT",
                    &format!("/riders/deliveries/{id}/status"),
                    json!({
                        "status": status,
                        "notes": format!("now {status}"),
                        "location": { "lat": 5.62, "lng": -0.195 }
                    }),
                ),
                rider_id,
                "rider",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{status}");
    }

    let res = app
        .clone()
        .oneshot(as_actor(
            json_request("DELETE", &format!("/deliveries/{id}"), json!({})),
            Uuid::new_v4(),
            "system",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(get_request(&format!(
            "/deliveries/track/{}",
            tracking.to_lowercase()
        )))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let tracked = body_json(res).await;
    assert_eq!(tracked["delivery"]["status"], "DELIVERED");
    assert!(!tracked["delivery"]["actual_delivery_time"].is_null());
    assert_eq!(tracked["rider"]["name"], "Kofi");
    let history: Vec<&str> = tracked["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        history,
        vec!["PENDING", "ACCEPTED", "PICKED_UP", "IN_TRANSIT", "DELIVERED"]
    );
    assert_eq!(tracked["history"][0]["updated_by"]["role"], "system");
    assert_eq!(tracked["history"][2]["notes"], "now PICKED_UP");

    let res = app
        .clone()
        .oneshot(as_actor(
            get_request("/riders/my-deliveries"),
            rider_id,
            "rider",
        ))
        .await
        .unwrap();
    let mine = body_json(res).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let res = app
        .clone()
        .oneshot(as_actor(
            get_request(&format!("/admin/deliveries?status=DELIVERED&rider_id={rider_id}")),
            Uuid::new_v4(),
            "admin",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let listed = body_json(res).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["rider"]["email"], "kofi@example.com");

    let res = app
        .oneshot(as_actor(
            get_request(&format!("/admin/deliveries/{id}/history")),
            Uuid::new_v4(),
            "admin",
        ))
        .await
        .unwrap();
    let history = body_json(res).await;
    assert_eq!(history.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn cancel_pending_delivery() {
    let app = setup();
    let delivery = create_delivery(&app, "ORD-C").await;
    let id = delivery["id"].as_str().unwrap();

    let res = app
        .clone()
        .oneshot(json_request("DELETE", &format!("/deliveries/{id}"), json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .clone()
        .oneshot(as_actor(
            json_request("DELETE", &format!("/deliveries/{id}"), json!({})),
            Uuid::new_v4(),
            "system",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["status"], "CANCELLED");

    let res = app
        .oneshot(as_actor(
            get_request("/admin/deliveries?status=PENDING"),
            Uuid::new_v4(),
            "admin",
        ))
        .await
        .unwrap();
    let listed = body_json(res).await;
    assert_eq!(listed.as_array().unwrap().len(), 0);
}
