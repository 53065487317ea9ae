use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, Instrument};
use utoipa::{IntoParams, ToSchema};

use crate::download::{
    create_job, csv_sources, write_csvs, DownloadKind, DownloadRequest, FileStore,
};
use crate::entities::{download_job, DownloadJob, TransactionView};
use crate::error::{AppError, AppResult};
use crate::filters::matview_search_filter;
use crate::lookups::matview::Matview;
use crate::routes::json_body;
use crate::AppState;

/// State of a download job
#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadStatusResponse {
    /// `ready`, `running`, `finished` or `failed`
    pub status: String,
    /// Where the archive can be fetched once finished
    pub url: String,
    /// Failure reason, or a note that the results were truncated
    pub message: Option<String>,
    pub file_name: String,
    /// Archive size in kilobytes
    pub total_size: Option<f64>,
    pub total_columns: Option<i32>,
    pub total_rows: Option<i64>,
    pub seconds_elapsed: f64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DownloadStatusQuery {
    /// File name returned when the download was requested
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DownloadCountRequest {
    /// Search filters, same keys as the search endpoints
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DownloadCountResponse {
    /// Whether the filtered transactions exceed the per-download row cap
    pub transaction_rows_gt_limit: bool,
}

pub fn status_response(store: &FileStore, job: &download_job::Model) -> DownloadStatusResponse {
    DownloadStatusResponse {
        status: job.job_status.name().to_string(),
        url: store.url_for(&job.file_name),
        message: job.error_message.clone(),
        file_name: job.file_name.clone(),
        total_size: job.file_size.map(|bytes| bytes as f64 / 1000.0),
        total_columns: job.number_of_columns,
        total_rows: job.number_of_rows,
        seconds_elapsed: job.seconds_elapsed(),
    }
}

async fn start_download(
    state: &AppState,
    kind: DownloadKind,
    request: DownloadRequest,
) -> AppResult<DownloadStatusResponse> {
    let sources = csv_sources(kind, &request, state.settings.max_download_limit)?;
    let file_name = kind.file_name();
    let job = create_job(&state.db, &file_name, serde_json::to_string(&request)?).await?;
    info!(file_name, download = kind.name(), "download job created");

    let ctx = state.download_context();
    let job = if state.settings.download_inline {
        write_csvs(&ctx, job, &request.columns, sources).await?
    } else {
        let queued = job.clone();
        let slots = state.download_slots.clone();
        let columns = request.columns;
        let span = tracing::info_span!("download", file_name = %file_name);
        tokio::spawn(
            async move {
                let _permit = match slots.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!(error = %e, "download slots closed");
                        return;
                    }
                };
                if let Err(e) = write_csvs(&ctx, job, &columns, sources).await {
                    error!(error = %e, "could not record download outcome");
                }
            }
            .instrument(span),
        );
        queued
    };

    Ok(status_response(&state.store, &job))
}

/// Request a prime award download
#[utoipa::path(
    post,
    path = "/api/v2/download/awards/",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Download job accepted", body = DownloadStatusResponse),
        (status = 400, description = "Unknown columns or invalid filters")
    ),
    description = "Starts a zip download holding contracts_prime_awards.csv and assistance_prime_awards.csv for the filtered awards. Poll the status endpoint with the returned file name."
)]
#[tracing::instrument(skip(state, payload))]
pub async fn download_awards(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> AppResult<Json<DownloadStatusResponse>> {
    let request = json_body(payload)?;
    start_download(&state, DownloadKind::Awards, request).await.map(Json)
}

/// Request a prime award and subaward download
#[utoipa::path(
    post,
    path = "/api/v2/download/subawards/",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Download job accepted", body = DownloadStatusResponse),
        (status = 400, description = "Unknown columns or invalid filters")
    ),
    description = "Like the award download, plus one subaward file per prime award file holding the subawards of those awards."
)]
#[tracing::instrument(skip(state, payload))]
pub async fn download_subawards(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> AppResult<Json<DownloadStatusResponse>> {
    let request = json_body(payload)?;
    start_download(&state, DownloadKind::Subawards, request).await.map(Json)
}

/// Request a transaction download
#[utoipa::path(
    post,
    path = "/api/v2/download/transactions/",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Download job accepted", body = DownloadStatusResponse),
        (status = 400, description = "Unknown columns, invalid filters or a limit above the cap")
    ),
    description = "Starts a zip download of the filtered contract and assistance transactions. `limit` caps the rows of each file."
)]
#[tracing::instrument(skip(state, payload))]
pub async fn download_transactions(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> AppResult<Json<DownloadStatusResponse>> {
    let request = json_body(payload)?;
    start_download(&state, DownloadKind::Transactions, request).await.map(Json)
}

/// Check on a download
#[utoipa::path(
    get,
    path = "/api/v2/download/status/",
    params(DownloadStatusQuery),
    responses(
        (status = 200, description = "Current state of the job", body = DownloadStatusResponse),
        (status = 400, description = "file_name missing"),
        (status = 404, description = "No job with that file name")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn download_status(
    State(state): State<AppState>,
    Query(query): Query<DownloadStatusQuery>,
) -> AppResult<Json<DownloadStatusResponse>> {
    let file_name = query
        .file_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            AppError::InvalidParameter(
                "Missing one or more required query parameters: file_name".to_string(),
            )
        })?;

    let job = DownloadJob::find()
        .filter(download_job::Column::FileName.eq(file_name.as_str()))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Download job with file name {} not found", file_name))
        })?;

    Ok(Json(status_response(&state.store, &job)))
}

/// Check whether a transaction download would hit the row cap
#[utoipa::path(
    post,
    path = "/api/v2/download/count/",
    request_body = DownloadCountRequest,
    responses(
        (status = 200, description = "Comparison against the row cap", body = DownloadCountResponse),
        (status = 400, description = "Invalid filters")
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn download_transaction_count(
    State(state): State<AppState>,
    payload: Result<Json<DownloadCountRequest>, JsonRejection>,
) -> AppResult<Json<DownloadCountResponse>> {
    let request = json_body(payload)?;
    let filters = request.filters.unwrap_or_default();
    let (_, condition) = matview_search_filter(&filters, Matview::Transaction)?;

    let total = TransactionView::find().filter(condition).count(&state.db).await?;
    Ok(Json(DownloadCountResponse {
        transaction_rows_gt_limit: total > state.settings.max_download_limit,
    }))
}
