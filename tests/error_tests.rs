use axum::{
    http::StatusCode,
    response::IntoResponse,
};
use fedspend::error::AppError;
use http_body_util::BodyExt;
use serde_json::Value;

async fn body_of(error: AppError) -> (StatusCode, Value) {
    let response = error.into_response();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body_bytes).unwrap())
}

#[test]
fn test_app_error_display() {
    let error = AppError::InvalidParameter("Invalid value for order: up".to_string());
    assert_eq!(error.to_string(), "Invalid value for order: up");

    let error = AppError::NotFound("Download job with file name x.zip not found".to_string());
    assert_eq!(error.to_string(), "Download job with file name x.zip not found");

    let error = AppError::DatabaseError("no such table".to_string());
    assert_eq!(error.to_string(), "Database error: no such table");

    let error = AppError::StorageError("disk full".to_string());
    assert_eq!(error.to_string(), "Storage error: disk full");

    let error = AppError::InternalError("boom".to_string());
    assert_eq!(error.to_string(), "Internal Server Error: boom");
}

#[tokio::test]
async fn test_client_errors_keep_their_message() {
    let err = AppError::InvalidParameter("scope does not have a valid value".to_string());
    let (status, body) = body_of(err).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "scope does not have a valid value");

    let (status, _) = body_of(AppError::ParseError("expected value at line 1".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = body_of(AppError::NotFound("gone".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "gone");
}

#[tokio::test]
async fn test_server_errors_are_500() {
    for error in [
        AppError::DatabaseError("db".to_string()),
        AppError::StorageError("io".to_string()),
        AppError::SerializationError("json".to_string()),
        AppError::InternalError("other".to_string()),
    ] {
        let message = error.to_string();
        let (status, body) = body_of(error).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], message);
    }
}

#[test]
fn test_conversions_pick_the_right_variant() {
    let err: AppError = serde_json::from_str::<Value>("{").unwrap_err().into();
    assert!(matches!(err, AppError::SerializationError(_)));

    let err: AppError = std::io::Error::new(std::io::ErrorKind::Other, "nope").into();
    assert!(matches!(err, AppError::StorageError(_)));

    let err: AppError = sea_orm::DbErr::Custom("bad".to_string()).into();
    assert!(matches!(err, AppError::DatabaseError(_)));
}
