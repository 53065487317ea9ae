use std::path::{Path, PathBuf};

use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{AppError, AppResult};

/// Where finished archives end up. Both variants build the archive under `dir` first.
#[derive(Debug, Clone)]
pub enum FileStore {
    Local {
        dir: PathBuf,
    },
    S3 {
        dir: PathBuf,
        bucket: String,
        region: String,
        client: S3Client,
    },
}

impl FileStore {
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        FileStore::Local { dir: dir.into() }
    }

    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        if settings.is_local {
            return Ok(Self::local(settings.csv_local_path.clone()));
        }

        let bucket = settings
            .csv_s3_bucket_name
            .clone()
            .ok_or_else(|| {
                anyhow::anyhow!("CSV_S3_BUCKET_NAME must be set when IS_LOCAL is false")
            })?;
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &settings.csv_aws_region {
            loader = loader.region(Region::new(region.clone()));
        }
        let aws_config = loader.load().await;
        let region = aws_config
            .region()
            .map(|r| r.to_string())
            .ok_or_else(|| anyhow::anyhow!("CSV_AWS_REGION must be set when IS_LOCAL is false"))?;
        info!(%bucket, %region, "download archives will be uploaded to S3");

        Ok(FileStore::S3 {
            dir: settings.csv_local_path.clone(),
            bucket,
            region,
            client: S3Client::new(&aws_config),
        })
    }

    pub fn dir(&self) -> &Path {
        match self {
            FileStore::Local { dir } | FileStore::S3 { dir, .. } => dir,
        }
    }

    /// Scratch path the archive is written to; readers never see a partial file.
    pub fn staging_path(&self, file_name: &str) -> PathBuf {
        self.dir()
            .join(format!(".{}.{}.part", file_name, uuid::Uuid::new_v4()))
    }

    /// Moves a completed archive from `staging` to its published location.
    pub async fn persist(&self, staging: &Path, file_name: &str) -> AppResult<()> {
        match self {
            FileStore::Local { dir } => {
                tokio::fs::rename(staging, dir.join(file_name)).await?;
                debug!(file_name, "archive published locally");
            }
            FileStore::S3 {
                bucket, client, ..
            } => {
                let body = ByteStream::from_path(staging)
                    .await
                    .map_err(|e| AppError::StorageError(e.to_string()))?;
                client
                    .put_object()
                    .bucket(bucket)
                    .key(file_name)
                    .acl(ObjectCannedAcl::PublicRead)
                    .body(body)
                    .send()
                    .await
                    .map_err(|e| {
                        AppError::StorageError(format!(
                            "upload of {} failed: {}",
                            file_name,
                            aws_sdk_s3::error::DisplayErrorContext(&e)
                        ))
                    })?;
                if let Err(e) = tokio::fs::remove_file(staging).await {
                    warn!(error = %e, file_name, "could not remove local copy after upload");
                }
                info!(file_name, %bucket, "archive uploaded");
            }
        }
        Ok(())
    }

    pub fn url_for(&self, file_name: &str) -> String {
        match self {
            FileStore::Local { dir } => dir.join(file_name).display().to_string(),
            FileStore::S3 { bucket, region, .. } => {
                format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, file_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_urls_point_into_the_download_dir() {
        let store = FileStore::local("csv_downloads");
        assert_eq!(
            store.url_for("awards_1.zip"),
            Path::new("csv_downloads").join("awards_1.zip").display().to_string()
        );
    }

    #[test]
    fn staging_files_stay_next_to_the_archive() {
        let store = FileStore::local("/tmp/out");
        let staging = store.staging_path("awards_1.zip");
        assert_eq!(staging.parent(), Some(Path::new("/tmp/out")));
        let name = staging.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".awards_1.zip.") && name.ends_with(".part"));
    }

    #[tokio::test]
    async fn persisting_locally_renames_the_staging_file() {
        let dir = std::env::temp_dir().join(format!("fedspend-store-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = FileStore::local(&dir);

        let staging = store.staging_path("awards_2.zip");
        std::fs::write(&staging, b"zip bytes").unwrap();
        store.persist(&staging, "awards_2.zip").await.unwrap();

        assert!(!staging.exists());
        assert_eq!(std::fs::read(dir.join("awards_2.zip")).unwrap(), b"zip bytes");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
