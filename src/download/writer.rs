use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, Iterable, PrimaryKeyToColumn, QueryOrder,
    QuerySelect, Select, Set,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::Settings;
use crate::download::{CsvSource, FileStore, SourceQuery};
use crate::entities::download_job::{self, JobStatus};
use crate::error::{AppError, AppResult};
use crate::query::model_row;

const WRITE_FAILURE: &str = "An exception was raised while attempting to write the CSV";

/// Everything a download task needs, cheap to clone into a background task.
#[derive(Debug, Clone)]
pub struct DownloadContext {
    pub db: DatabaseConnection,
    pub settings: Arc<Settings>,
    pub store: Arc<FileStore>,
}

/// Inserts the `ready` row for a new download.
pub async fn create_job(
    db: &DatabaseConnection,
    file_name: &str,
    json_request: String,
) -> AppResult<download_job::Model> {
    let now = Utc::now();
    let job = download_job::ActiveModel {
        file_name: Set(file_name.to_string()),
        job_status: Set(JobStatus::Ready),
        error_message: Set(None),
        file_size: Set(None),
        number_of_rows: Set(None),
        number_of_columns: Set(None),
        json_request: Set(Some(json_request)),
        create_date: Set(now),
        update_date: Set(now),
        ..Default::default()
    };
    Ok(job.insert(db).await?)
}

async fn update_job(
    db: &DatabaseConnection,
    job: download_job::Model,
    apply: impl FnOnce(&mut download_job::ActiveModel),
) -> AppResult<download_job::Model> {
    let mut active: download_job::ActiveModel = job.into();
    apply(&mut active);
    active.update_date = Set(Utc::now());
    Ok(active.update(db).await?)
}

/// Rows and columns written so far, shared by every file of one archive.
#[derive(Debug)]
struct Progress {
    rows: u64,
    columns: usize,
    max_rows: u64,
    truncated: bool,
}

impl Progress {
    fn new(max_rows: u64) -> Self {
        Self {
            rows: 0,
            columns: 0,
            max_rows,
            truncated: false,
        }
    }

    fn capacity(&self) -> u64 {
        self.max_rows.saturating_sub(self.rows)
    }
}

enum WriteFailure {
    Timeout(u64),
    Failed(AppError),
}

/// Writes one CSV per source into a zip archive, publishes it and records the
/// outcome on the job row. Write failures end in `failed`; only errors saving
/// the job row itself are returned.
pub async fn write_csvs(
    ctx: &DownloadContext,
    job: download_job::Model,
    columns: &[String],
    sources: Vec<CsvSource>,
) -> AppResult<download_job::Model> {
    let file_name = job.file_name.clone();
    let job = update_job(&ctx.db, job, |active| {
        active.job_status = Set(JobStatus::Running);
        active.number_of_rows = Set(Some(0));
    })
    .await?;

    let started = Instant::now();
    let minutes = ctx.settings.download_timeout_minutes;
    let staging = ctx.store.staging_path(&file_name);
    let mut progress = Progress::new(ctx.settings.max_download_limit);

    let outcome = tokio::time::timeout(Duration::from_secs(minutes * 60), async {
        let size = write_archive(ctx, &staging, columns, &sources, &mut progress).await?;
        ctx.store.persist(&staging, &file_name).await?;
        Ok::<u64, AppError>(size)
    })
    .await;
    let outcome = match outcome {
        Ok(Ok(size)) => Ok(size),
        Ok(Err(err)) => Err(WriteFailure::Failed(err)),
        Err(_) => Err(WriteFailure::Timeout(minutes)),
    };

    let rows = progress.rows as i64;
    let column_count = progress.columns as i32;
    match outcome {
        Ok(size) => {
            info!(
                file_name,
                rows,
                bytes = size,
                truncated = progress.truncated,
                seconds = started.elapsed().as_secs_f64(),
                "download finished"
            );
            let message = progress.truncated.then(|| {
                format!(
                    "Results were truncated to the first {} rows. \
                     Narrow the filters to download the remaining rows.",
                    progress.max_rows
                )
            });
            update_job(&ctx.db, job, |active| {
                active.job_status = Set(JobStatus::Finished);
                active.file_size = Set(Some(size as i64));
                active.number_of_rows = Set(Some(rows));
                active.number_of_columns = Set(Some(column_count));
                active.error_message = Set(message);
            })
            .await
        }
        Err(failure) => {
            remove_staging(&staging);
            let message = match failure {
                WriteFailure::Timeout(minutes) => {
                    error!(file_name, minutes, "download timed out");
                    format!("Stream exceeded time of {} minutes.", minutes)
                }
                WriteFailure::Failed(err) => {
                    error!(file_name, error = %err, "download failed");
                    if ctx.settings.debug {
                        format!("{}: {}", WRITE_FAILURE, err)
                    } else {
                        WRITE_FAILURE.to_string()
                    }
                }
            };
            update_job(&ctx.db, job, |active| {
                active.job_status = Set(JobStatus::Failed);
                active.number_of_rows = Set(Some(rows));
                active.number_of_columns = Set(Some(column_count));
                active.error_message = Set(Some(message));
            })
            .await
        }
    }
}

fn remove_staging(staging: &Path) {
    match std::fs::remove_file(staging) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, path = %staging.display(), "could not remove staging file"),
    }
}

async fn write_archive(
    ctx: &DownloadContext,
    staging: &Path,
    columns: &[String],
    sources: &[CsvSource],
    progress: &mut Progress,
) -> AppResult<u64> {
    if let Some(parent) = staging.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut zip = ZipWriter::new(File::create(staging)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let batch_size = ctx.settings.download_batch_size.max(1);

    for source in sources {
        let headers = source.kind.columns(columns);
        let paths: Vec<&'static str> = headers
            .iter()
            .filter_map(|name| source.kind.query_path(name))
            .collect();
        progress.columns = progress.columns.max(headers.len());

        zip.start_file(format!("{}.csv", source.kind.file_descrip()), options)?;
        let mut writer = csv::Writer::from_writer(&mut zip);
        writer.write_record(&headers)?;

        let written = match &source.query {
            SourceQuery::Award(select) => {
                let select = select.clone();
                write_rows(&ctx.db, select, &paths, source.limit, batch_size, &mut writer, progress)
                    .await?
            }
            SourceQuery::Transaction(select) => {
                let select = select.clone();
                write_rows(&ctx.db, select, &paths, source.limit, batch_size, &mut writer, progress)
                    .await?
            }
            SourceQuery::Subaward(select) => {
                let select = select.clone();
                write_rows(&ctx.db, select, &paths, source.limit, batch_size, &mut writer, progress)
                    .await?
            }
        };
        writer.flush()?;
        drop(writer);
        info!(source = source.kind.file_descrip(), rows = written, "csv written");
    }

    let file = zip.finish()?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

/// Streams `select` in primary key order, `batch_size` rows at a time.
async fn write_rows<E, W>(
    db: &DatabaseConnection,
    select: Select<E>,
    paths: &[&str],
    limit: Option<u64>,
    batch_size: u64,
    writer: &mut csv::Writer<W>,
    progress: &mut Progress,
) -> AppResult<u64>
where
    E: EntityTrait,
    E::Model: Serialize,
    W: Write,
{
    let mut select = select;
    for key in E::PrimaryKey::iter() {
        select = select.order_by_asc(key.into_column());
    }

    let mut offset = 0u64;
    let mut written = 0u64;
    loop {
        let source_left = limit.map_or(u64::MAX, |l| l.saturating_sub(written));
        if source_left == 0 {
            break;
        }
        let wanted = batch_size.min(source_left);
        let capacity = progress.capacity();
        let capped = capacity < wanted;
        // at the cap, one extra row tells whether anything was left out
        let fetch = if capped { capacity + 1 } else { wanted };

        let models = select.clone().offset(offset).limit(fetch).all(db).await?;
        let fetched = models.len() as u64;
        let keep = fetched.min(wanted).min(capacity);
        for model in models.iter().take(keep as usize) {
            let row = model_row(model)?;
            writer.write_record(paths.iter().map(|path| cell(row.get(*path))))?;
        }
        written += keep;
        progress.rows += keep;

        if capped {
            progress.truncated |= fetched > capacity;
            break;
        }
        if fetched < wanted {
            break;
        }
        offset += fetched;
    }
    Ok(written)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
