#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fedspend::config::Settings;
use fedspend::download::FileStore;
use fedspend::entities::{
    award_view, download_job, subaward_view, transaction_view, AwardView, DownloadJob,
    SubawardView, TransactionView,
};
use fedspend::{create_app, AppState};
use http_body_util::BodyExt;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityTrait, Schema,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// For initializing tracing once
static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt::try_init();
    });
}

/// Fresh in-memory database holding the three views and the job table.
pub async fn memory_db() -> DatabaseConnection {
    setup();
    let mut options = ConnectOptions::new("sqlite::memory:");
    // every pooled connection would otherwise get its own empty database
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();

    let schema = Schema::new(DbBackend::Sqlite);
    let backend = db.get_database_backend();
    for statement in [
        schema.create_table_from_entity(AwardView),
        schema.create_table_from_entity(TransactionView),
        schema.create_table_from_entity(SubawardView),
        schema.create_table_from_entity(DownloadJob),
    ] {
        db.execute(backend.build(&statement)).await.unwrap();
    }
    db
}

pub fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fedspend-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Settings for tests: downloads run before the response is sent and land in a temp dir.
pub fn test_settings() -> Settings {
    Settings {
        database_url: "sqlite::memory:".to_string(),
        download_inline: true,
        download_batch_size: 2,
        csv_local_path: temp_dir(),
        ..Default::default()
    }
}

pub async fn test_app(settings: Settings) -> (Router, DatabaseConnection) {
    let db = memory_db().await;
    seed(&db).await;
    let store = FileStore::local(settings.csv_local_path.clone());
    let app = create_app(AppState::new(db.clone(), settings, store));
    (app, db)
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    read_json(app.clone().oneshot(request).await.unwrap()).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    read_json(app.clone().oneshot(request).await.unwrap()).await
}

fn award(value: Value) -> award_view::ActiveModel {
    let model: award_view::Model = serde_json::from_value(value).unwrap();
    model.into()
}

fn transaction(value: Value) -> transaction_view::ActiveModel {
    let model: transaction_view::Model = serde_json::from_value(value).unwrap();
    model.into()
}

fn subaward(value: Value) -> subaward_view::ActiveModel {
    let model: subaward_view::Model = serde_json::from_value(value).unwrap();
    model.into()
}

/// Two contracts (DOD, Virginia), a grant and a loan (Education, Maryland),
/// three transactions and two subawards.
pub async fn seed(db: &DatabaseConnection) {
    let awards = vec![
        award(json!({
            "award_id": 1, "category": "contract", "type": "A", "type_description": "BPA CALL",
            "is_fpds": true, "piid": "CONT-1", "recipient_id": 10, "recipient_name": "ACME CORP",
            "recipient_unique_id": "123456789", "action_date": "2020-01-15", "fiscal_year": 2020,
            "total_obligation": 1000.0, "awarding_toptier_agency_name": "Department of Defense",
            "awarding_toptier_agency_abbreviation": "DOD", "naics_code": "541511", "psc_code": "D302",
            "pop_country_code": "USA", "pop_state_code": "VA", "pop_county_code": "059",
            "pop_county_name": "FAIRFAX", "pop_congressional_code": "11",
            "recipient_location_country_code": "USA", "recipient_location_state_code": "VA"
        })),
        award(json!({
            "award_id": 2, "category": "contract", "type": "B", "type_description": "PURCHASE ORDER",
            "is_fpds": true, "piid": "CONT-2", "recipient_id": 11, "recipient_name": "BETA LLC",
            "action_date": "2020-02-01", "fiscal_year": 2020, "total_obligation": 500.0,
            "awarding_toptier_agency_name": "Department of Defense",
            "awarding_toptier_agency_abbreviation": "DOD", "naics_code": "541511", "psc_code": "R425",
            "pop_country_code": "USA", "pop_state_code": "VA", "pop_county_code": "59",
            "pop_congressional_code": "8",
            "recipient_location_country_code": "USA", "recipient_location_state_code": "VA"
        })),
        award(json!({
            "award_id": 3, "category": "grant", "type": "02", "type_description": "BLOCK GRANT",
            "is_fpds": false, "fain": "GRANT-3", "recipient_id": 12,
            "recipient_name": "STATE UNIVERSITY", "action_date": "2020-03-01", "fiscal_year": 2020,
            "total_obligation": 250.0, "awarding_toptier_agency_name": "Department of Education",
            "awarding_toptier_agency_abbreviation": "ED", "cfda_number": "84.063",
            "cfda_title": "Federal Pell Grant Program", "cfda_popular_name": "Pell Grants",
            "pop_country_code": "USA", "pop_state_code": "MD", "pop_county_code": "031",
            "pop_county_name": "MONTGOMERY", "pop_congressional_code": "08",
            "recipient_location_country_code": "USA", "recipient_location_state_code": "MD"
        })),
        award(json!({
            "award_id": 4, "category": "loans", "type": "07", "type_description": "DIRECT LOAN",
            "is_fpds": false, "fain": "LOAN-4", "recipient_id": 13, "recipient_name": "JANE DOE",
            "action_date": "2020-04-01", "fiscal_year": 2020, "total_obligation": 10000.0,
            "face_value_loan_guarantee": 10000.0, "original_loan_subsidy_cost": 40.0,
            "awarding_toptier_agency_name": "Department of Education",
            "awarding_toptier_agency_abbreviation": "ED", "cfda_number": "84.268",
            "cfda_title": "Federal Direct Student Loans", "cfda_popular_name": "Direct Loans",
            "pop_country_code": "USA", "pop_state_code": "MD", "pop_county_code": "031",
            "pop_county_name": "MONTGOMERY", "pop_congressional_code": "08",
            "recipient_location_country_code": "USA", "recipient_location_state_code": "MD"
        })),
    ];
    AwardView::insert_many(awards).exec(db).await.unwrap();

    let transactions = vec![
        transaction(json!({
            "transaction_id": 100, "award_id": 1, "modification_number": "0", "type": "A",
            "is_fpds": true, "piid": "CONT-1", "recipient_name": "ACME CORP",
            "action_date": "2020-01-15", "fiscal_year": 2020, "federal_action_obligation": 600.0,
            "awarding_toptier_agency_name": "Department of Defense"
        })),
        transaction(json!({
            "transaction_id": 101, "award_id": 1, "modification_number": "1", "type": "A",
            "is_fpds": true, "piid": "CONT-1", "recipient_name": "ACME CORP",
            "action_date": "2020-02-15", "fiscal_year": 2020, "federal_action_obligation": 400.0,
            "awarding_toptier_agency_name": "Department of Defense"
        })),
        transaction(json!({
            "transaction_id": 102, "award_id": 3, "modification_number": "0", "type": "02",
            "is_fpds": false, "fain": "GRANT-3", "recipient_name": "STATE UNIVERSITY",
            "action_date": "2020-03-01", "fiscal_year": 2020, "federal_action_obligation": 250.0,
            "awarding_toptier_agency_name": "Department of Education"
        })),
    ];
    TransactionView::insert_many(transactions).exec(db).await.unwrap();

    let subawards = vec![
        subaward(json!({
            "subaward_id": 1000, "award_id": 1, "subaward_number": "SUB-1", "amount": 100.0,
            "action_date": "2020-02-01", "recipient_name": "SUBCO", "prime_award_piid": "CONT-1"
        })),
        subaward(json!({
            "subaward_id": 1001, "award_id": 3, "subaward_number": "SUB-2", "amount": 50.0,
            "action_date": "2020-03-10", "recipient_name": "LAB INC", "prime_award_fain": "GRANT-3"
        })),
    ];
    SubawardView::insert_many(subawards).exec(db).await.unwrap();
}

pub async fn job_count(db: &DatabaseConnection) -> usize {
    DownloadJob::find().all(db).await.unwrap().len()
}

pub fn all_type_codes() -> Value {
    json!(["A", "B", "C", "D", "02", "03", "04", "05", "06", "10", "07", "08", "09", "11"])
}

pub fn finished(job: &download_job::Model) -> bool {
    job.job_status.is_terminal()
}
