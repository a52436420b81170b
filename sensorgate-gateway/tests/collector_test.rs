use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use sensorgate_gateway::errors::CollectorError;
use sensorgate_gateway::models::HttpRecord;
use sensorgate_gateway::services::{COLLECTOR_PATH, Collector, CollectorIdentity, HttpCollector};
use serde_json::{Value, json};

mod common;
use common::mock_app::serve;

#[derive(Clone, Default)]
struct Received {
    requests: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

async fn accept(State(received): State<Received>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
    received.requests.lock().unwrap().push((headers, body));
    StatusCode::CREATED
}

async fn collector_server() -> (String, Received) {
    let received = Received::default();
    let router = Router::new()
        .route(COLLECTOR_PATH, post(accept))
        .route("/broken/sensor/data/write", post(|| async { StatusCode::UNAUTHORIZED }))
        .with_state(received.clone());

    (format!("http://{}", serve(router).await), received)
}

fn identity(endpoint: String) -> CollectorIdentity {
    CollectorIdentity {
        endpoint,
        sensor_id: "greenhouse-1".into(),
        api_key: "s3cret".into(),
    }
}

fn records() -> Vec<HttpRecord> {
    vec![
        HttpRecord {
            time: "2024-05-01 14:00:00".into(),
            sensor_id: "greenhouse-1".into(),
            pin: 4,
            sensor_type: "DHT22",
            data_type: "Temperature",
            value: "22.50".into(),
            unit: "°C",
        },
        HttpRecord {
            time: "2024-05-01 14:00:00".into(),
            sensor_id: "greenhouse-1".into(),
            pin: 4,
            sensor_type: "DHT22",
            data_type: "Humidity",
            value: "45.00".into(),
            unit: "%",
        },
    ]
}

#[tokio::test]
async fn test_submit_batch() {
    let (base, received) = collector_server().await;
    let collector = HttpCollector::new(Duration::from_secs(5));

    // A trailing slash on the endpoint must not double up in the path.
    let status = collector.submit(&identity(format!("{base}/")), &records()).await.unwrap();

    assert_eq!(status, 201);

    let requests = received.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (headers, body) = &requests[0];
    assert_eq!(headers["x-sensor-id"], "greenhouse-1");
    assert_eq!(headers["x-sensor-api-key"], "s3cret");
    assert_eq!(
        body,
        &json!([
            {
                "time": "2024-05-01 14:00:00",
                "sensor_id": "greenhouse-1",
                "pin": 4,
                "sensor_type": "DHT22",
                "data_type": "Temperature",
                "value": "22.50",
                "unit": "°C"
            },
            {
                "time": "2024-05-01 14:00:00",
                "sensor_id": "greenhouse-1",
                "pin": 4,
                "sensor_type": "DHT22",
                "data_type": "Humidity",
                "value": "45.00",
                "unit": "%"
            }
        ])
    );
}

#[tokio::test]
async fn test_rejected_batch_reports_status() {
    let (base, received) = collector_server().await;
    let collector = HttpCollector::new(Duration::from_secs(5));

    let result = collector.submit(&identity(format!("{base}/broken")), &records()).await;

    assert!(matches!(result, Err(CollectorError::Status(401))));
    assert!(received.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_endpoint() {
    let collector = HttpCollector::new(Duration::from_secs(5));

    let result = collector.submit(&identity("  ".into()), &records()).await;

    assert!(matches!(result, Err(CollectorError::NoEndpoint)));
}
