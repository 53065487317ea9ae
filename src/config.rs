use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    /// Upper bound on rows written into one download, across all of its files.
    pub max_download_limit: u64,
    pub download_timeout_minutes: u64,
    pub download_batch_size: u64,
    pub download_max_concurrent: usize,
    /// Run downloads before responding instead of in a background task.
    pub download_inline: bool,
    pub csv_local_path: PathBuf,
    pub is_local: bool,
    pub csv_s3_bucket_name: Option<String>,
    pub csv_aws_region: Option<String>,
    pub debug: bool,
    pub rate_limit_per_minute: Option<u32>,
    pub worker_interval_minutes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./local_db.sqlite?mode=rwc".to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            max_download_limit: 500_000,
            download_timeout_minutes: 10,
            download_batch_size: 5_000,
            download_max_concurrent: 4,
            download_inline: false,
            csv_local_path: PathBuf::from("csv_downloads/"),
            is_local: true,
            csv_s3_bucket_name: None,
            csv_aws_region: None,
            debug: false,
            rate_limit_per_minute: None,
            worker_interval_minutes: 60,
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let defaults = Settings::default();

        let settings = Settings {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_download_limit: parse_var("MAX_DOWNLOAD_LIMIT")?
                .unwrap_or(defaults.max_download_limit),
            download_timeout_minutes: parse_var("DOWNLOAD_TIMEOUT_MIN_LIMIT")?
                .unwrap_or(defaults.download_timeout_minutes),
            download_batch_size: parse_var("DOWNLOAD_BATCH_SIZE")?
                .unwrap_or(defaults.download_batch_size),
            download_max_concurrent: parse_var("DOWNLOAD_MAX_CONCURRENT")?
                .unwrap_or(defaults.download_max_concurrent),
            download_inline: parse_flag("DOWNLOAD_INLINE").unwrap_or(defaults.download_inline),
            csv_local_path: env::var("CSV_LOCAL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.csv_local_path),
            is_local: parse_flag("IS_LOCAL").unwrap_or(defaults.is_local),
            csv_s3_bucket_name: env::var("CSV_S3_BUCKET_NAME").ok().filter(|s| !s.is_empty()),
            csv_aws_region: env::var("CSV_AWS_REGION").ok().filter(|s| !s.is_empty()),
            debug: parse_flag("DEBUG").unwrap_or(defaults.debug),
            rate_limit_per_minute: parse_var("RATE_LIMIT_PER_MINUTE")?,
            worker_interval_minutes: parse_var("WORKER_INTERVAL_MINUTES")?
                .unwrap_or(defaults.worker_interval_minutes),
        };

        if !settings.is_local && settings.csv_s3_bucket_name.is_none() {
            anyhow::bail!("CSV_S3_BUCKET_NAME must be set when IS_LOCAL is false");
        }
        if settings.download_max_concurrent == 0 {
            anyhow::bail!("DOWNLOAD_MAX_CONCURRENT must be at least 1");
        }

        Ok(settings)
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, raw, e)),
        _ => Ok(None),
    }
}

fn parse_flag(name: &str) -> Option<bool> {
    env::var(name).ok().map(|raw| {
        matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}
