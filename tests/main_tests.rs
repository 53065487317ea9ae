mod common;

use std::net::SocketAddr;
use std::time::Duration;

use tokio::task::JoinHandle;

#[tokio::test]
async fn test_main_server_startup() {
    let (app, _db) = common::test_app(common::test_settings()).await;

    // Bind before spawning so the request below cannot race the listener
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_task: JoinHandle<()> = tokio::spawn(async move {
        tracing::info!("Test server running on http://{}", addr);
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let health = client.get(format!("http://{}/health", addr)).send().await;
    let search = client
        .post(format!("http://{}/api/v2/search/spending_by_award/", addr))
        .json(&serde_json::json!({
            "fields": ["Award ID"],
            "filters": {"award_type_codes": ["A", "B"]}
        }))
        .send()
        .await;

    let health = health.expect("Failed to connect to test server");
    assert!(health.status().is_success());
    assert_eq!(health.text().await.unwrap(), "Service is healthy");

    let search = search.unwrap();
    assert!(search.status().is_success());
    let body: serde_json::Value = search.json().await.unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), 2);

    server_task.abort();
}
