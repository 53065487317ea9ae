pub mod download;
pub mod spending_by_award;
pub mod spending_by_category;
pub mod spending_by_geography;

pub use download::*;
pub use spending_by_award::*;
pub use spending_by_category::*;
pub use spending_by_geography::*;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::{AppError, AppResult};

/// Unwraps a JSON body, turning axum's rejection into our 400 payload.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::ParseError(rejection.body_text()))
}

pub(crate) fn missing(name: &str) -> AppError {
    AppError::InvalidParameter(format!(
        "Missing one or more required request parameters: {}",
        name
    ))
}
