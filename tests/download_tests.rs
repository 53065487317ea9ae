mod common;

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use axum::http::StatusCode;
use common::{get_json, job_count, post_json, test_app, test_settings};
use fedspend::entities::{download_job, DownloadJob};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde_json::{json, Value};

/// Rows (header excluded) of `name` inside the archive at `path`.
fn csv_rows(path: &Path, name: &str) -> Vec<csv::StringRecord> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let entry = archive.by_name(name).unwrap();
    let rows = csv::Reader::from_reader(entry)
        .records()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

fn csv_headers(path: &Path, name: &str) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let entry = archive.by_name(name).unwrap();
    let headers = csv::Reader::from_reader(entry)
        .headers()
        .unwrap()
        .iter()
        .map(String::from)
        .collect();
    headers
}

fn file_name(body: &Value) -> String {
    body["file_name"].as_str().unwrap().to_string()
}

/// Staging archives left behind in `dir`.
fn staging_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".part"))
        .collect()
}

const WRITE_FAILURE: &str = "An exception was raised while attempting to write the CSV";

#[tokio::test]
async fn test_award_download_writes_both_prime_files() {
    let settings = test_settings();
    let dir = settings.csv_local_path.clone();
    let (app, db) = test_app(settings).await;

    let (status, body) = post_json(&app, "/api/v2/download/awards/", json!({"filters": {}})).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "finished");
    assert_eq!(body["total_rows"], 4);
    assert!(body["message"].is_null());
    let name = file_name(&body);
    assert!(name.starts_with("awards_") && name.ends_with(".zip"));
    assert_eq!(job_count(&db).await, 1);

    let archive = dir.join(&name);
    assert!(archive.exists());
    assert_eq!(csv_rows(&archive, "contracts_prime_awards.csv").len(), 2);
    assert_eq!(csv_rows(&archive, "assistance_prime_awards.csv").len(), 2);
    // staging file renamed away
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);

    let status_uri = format!("/api/v2/download/status/?file_name={}", name);
    let (status, polled) = get_json(&app, &status_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(polled["status"], "finished");
    assert_eq!(polled["total_rows"], 4);
    assert_eq!(polled["total_size"], body["total_size"]);
    assert_eq!(polled["url"], archive.display().to_string());
}

#[tokio::test]
async fn test_requested_columns_shape_the_files() {
    let settings = test_settings();
    let dir = settings.csv_local_path.clone();
    let (app, _db) = test_app(settings).await;

    let (status, body) = post_json(
        &app,
        "/api/v2/download/awards/",
        json!({
            "filters": {"award_type_codes": ["A", "B"]},
            "columns": ["recipient_name", "award_id_piid"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["total_columns"], 2);
    let archive = dir.join(file_name(&body));
    assert_eq!(
        csv_headers(&archive, "contracts_prime_awards.csv"),
        vec!["recipient_name", "award_id_piid"]
    );
    let rows = csv_rows(&archive, "contracts_prime_awards.csv");
    assert_eq!(&rows[0][0], "ACME CORP");
    assert_eq!(&rows[0][1], "CONT-1");
    assert!(csv_rows(&archive, "assistance_prime_awards.csv").is_empty());
}

#[tokio::test]
async fn test_unknown_columns_are_rejected_without_a_job() {
    let (app, db) = test_app(test_settings()).await;

    let (status, body) = post_json(
        &app,
        "/api/v2/download/awards/",
        json!({"filters": {}, "columns": ["recipient_name", "bogus_column"]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], r#"Unknown columns: ["bogus_column"]"#);
    assert_eq!(job_count(&db).await, 0);
}

#[tokio::test]
async fn test_download_row_cap_truncates_and_says_so() {
    let mut settings = test_settings();
    settings.max_download_limit = 3;
    let dir = settings.csv_local_path.clone();
    let (app, _db) = test_app(settings).await;

    let (status, body) = post_json(&app, "/api/v2/download/awards/", json!({"filters": {}})).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "finished");
    assert_eq!(body["total_rows"], 3);
    assert!(body["message"].as_str().unwrap().contains("truncated"));

    let archive = dir.join(file_name(&body));
    let written = csv_rows(&archive, "contracts_prime_awards.csv").len()
        + csv_rows(&archive, "assistance_prime_awards.csv").len();
    assert_eq!(written, 3);
}

#[tokio::test]
async fn test_download_at_exactly_the_cap_is_not_truncated() {
    let mut settings = test_settings();
    settings.max_download_limit = 4;
    let (app, _db) = test_app(settings).await;

    let (_, body) = post_json(&app, "/api/v2/download/awards/", json!({"filters": {}})).await;

    assert_eq!(body["total_rows"], 4);
    assert!(body["message"].is_null());
}

#[tokio::test]
async fn test_transaction_download_limit_applies_per_file() {
    let mut settings = test_settings();
    settings.max_download_limit = 10;
    let dir = settings.csv_local_path.clone();
    let (app, _db) = test_app(settings).await;

    let (status, body) = post_json(
        &app,
        "/api/v2/download/transactions/",
        json!({"filters": {}, "limit": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["total_rows"], 2);
    let archive = dir.join(file_name(&body));
    assert_eq!(csv_rows(&archive, "contracts_prime_transactions.csv").len(), 1);
    assert_eq!(csv_rows(&archive, "assistance_prime_transactions.csv").len(), 1);

    let (status, body) = post_json(
        &app,
        "/api/v2/download/transactions/",
        json!({"filters": {}, "limit": 11}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Requested limit 11 beyond max supported (10)");
}

#[tokio::test]
async fn test_subaward_download_follows_the_filtered_primes() {
    let settings = test_settings();
    let dir = settings.csv_local_path.clone();
    let (app, _db) = test_app(settings).await;

    let (status, body) = post_json(
        &app,
        "/api/v2/download/subawards/",
        json!({"filters": {"award_type_codes": ["A"]}}),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["total_rows"], 2);
    let archive = dir.join(file_name(&body));
    assert_eq!(csv_rows(&archive, "contracts_prime_awards.csv").len(), 1);
    assert_eq!(csv_rows(&archive, "contracts_subawards.csv").len(), 1);
    assert!(csv_rows(&archive, "assistance_subawards.csv").is_empty());
}

#[tokio::test]
async fn test_status_requires_a_known_file_name() {
    let (app, _db) = test_app(test_settings()).await;

    let (status, body) = get_json(&app, "/api/v2/download/status/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing one or more required query parameters: file_name");

    let (status, body) = get_json(&app, "/api/v2/download/status/?file_name=nope.zip").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Download job with file name nope.zip not found");
}

#[tokio::test]
async fn test_transaction_count_compares_against_the_cap() {
    let (app, _db) = test_app(test_settings()).await;
    let (status, body) = post_json(&app, "/api/v2/download/count/", json!({"filters": {}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"transaction_rows_gt_limit": false}));

    // filters default to an empty object
    let (status, body) = post_json(&app, "/api/v2/download/count/", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"transaction_rows_gt_limit": false}));

    let mut settings = test_settings();
    settings.max_download_limit = 2;
    let (app, _db) = test_app(settings).await;
    let (_, body) = post_json(&app, "/api/v2/download/count/", json!({"filters": {}})).await;
    assert_eq!(body, json!({"transaction_rows_gt_limit": true}));
}

#[tokio::test]
async fn test_background_download_finishes_after_the_response() {
    let mut settings = test_settings();
    settings.download_inline = false;
    let (app, db) = test_app(settings).await;

    let (status, body) = post_json(&app, "/api/v2/download/awards/", json!({"filters": {}})).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "ready");
    let name = file_name(&body);

    let mut job = None;
    for _ in 0..100 {
        let found = DownloadJob::find()
            .filter(download_job::Column::FileName.eq(name.as_str()))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        if common::finished(&found) {
            job = Some(found);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let job = job.expect("download never finished");
    assert_eq!(job.job_status.name(), "finished");
    assert_eq!(job.number_of_rows, Some(4));

    let (_, polled) = get_json(&app, &format!("/api/v2/download/status/?file_name={}", name)).await;
    assert_eq!(polled["status"], "finished");
}

#[tokio::test]
async fn test_download_past_its_deadline_fails_and_cleans_up() {
    let mut settings = test_settings();
    settings.download_timeout_minutes = 0;
    settings.download_batch_size = 1;
    let dir = settings.csv_local_path.clone();
    let (app, db) = test_app(settings).await;
    // one query per row keeps the writer busy well past a zero deadline
    db.execute_unprepared(
        "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < 2000) \
         INSERT INTO universal_transaction_view \
         (transaction_id, award_id, type, is_fpds, piid, federal_action_obligation) \
         SELECT 5000 + i, 1, 'A', 1, 'CONT-1', 1.0 FROM n",
    )
    .await
    .unwrap();

    let (status, body) =
        post_json(&app, "/api/v2/download/transactions/", json!({"filters": {}})).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["message"], "Stream exceeded time of 0 minutes.");
    assert!(body["total_size"].is_null());
    assert!(staging_files(&dir).is_empty());
    assert!(!dir.join(file_name(&body)).exists());
}

#[tokio::test]
async fn test_unwritable_download_directory_fails_the_job() {
    let blocker = common::temp_dir().join("not_a_dir");
    std::fs::write(&blocker, b"x").unwrap();
    let mut settings = test_settings();
    settings.csv_local_path = blocker.clone();
    let (app, db) = test_app(settings).await;

    let (status, body) = post_json(&app, "/api/v2/download/awards/", json!({"filters": {}})).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["message"], WRITE_FAILURE);
    assert!(body["total_size"].is_null());
    assert_eq!(std::fs::read(&blocker).unwrap(), b"x");
    assert!(staging_files(blocker.parent().unwrap()).is_empty());

    let job = DownloadJob::find().one(&db).await.unwrap().unwrap();
    assert_eq!(job.job_status.name(), "failed");
    assert_eq!(job.file_size, None);
}

#[tokio::test]
async fn test_write_failure_carries_the_cause_in_debug_mode() {
    let blocker = common::temp_dir().join("not_a_dir");
    std::fs::write(&blocker, b"x").unwrap();
    let mut settings = test_settings();
    settings.csv_local_path = blocker;
    settings.debug = true;
    let (app, _db) = test_app(settings).await;

    let (_, body) = post_json(&app, "/api/v2/download/awards/", json!({"filters": {}})).await;

    assert_eq!(body["status"], "failed");
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with(&format!("{}: ", WRITE_FAILURE)), "{}", message);
    assert!(message.len() > WRITE_FAILURE.len() + 2);
}
