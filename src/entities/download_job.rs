use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Deserialize, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "finished")]
    Finished,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl JobStatus {
    pub fn name(&self) -> &'static str {
        match self {
            JobStatus::Ready => "ready",
            JobStatus::Running => "running",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "download_job")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub download_job_id: i32,
    #[sea_orm(unique)]
    pub file_name: String,
    pub job_status: JobStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub file_size: Option<i64>,          // bytes
    pub number_of_rows: Option<i64>,
    pub number_of_columns: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub json_request: Option<String>,
    pub create_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
}

impl Model {
    /// Seconds between creation and the last update; still-open jobs measure up to now.
    pub fn seconds_elapsed(&self) -> f64 {
        let end = if self.job_status.is_terminal() {
            self.update_date
        } else {
            Utc::now()
        };
        (end - self.create_date).num_milliseconds() as f64 / 1000.0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
