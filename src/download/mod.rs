//! Bulk CSV downloads: source selection, column validation and the zip writer.

pub mod storage;
pub mod writer;

pub use storage::FileStore;
pub use writer::{create_job, write_csvs, DownloadContext};

use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect, QueryTrait, Select};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::entities::{award_view, subaward_view, transaction_view};
use crate::error::{AppError, AppResult};
use crate::filters::{matview_search_filter, subaward_filter};
use crate::lookups::download_columns::{column_table, ColumnTable, FileType, ModelType};
use crate::lookups::matview::Matview;

/// Body of the three download endpoints
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct DownloadRequest {
    /// Search filters, same keys as the search endpoints
    #[serde(default)]
    #[schema(value_type = Object)]
    pub filters: Map<String, Value>,
    /// Column names to include; empty means every column of each file
    #[serde(default)]
    pub columns: Vec<String>,
    /// Row limit per transaction file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Awards,
    Subawards,
    Transactions,
}

impl DownloadKind {
    pub fn name(self) -> &'static str {
        match self {
            DownloadKind::Awards => "awards",
            DownloadKind::Subawards => "subawards",
            DownloadKind::Transactions => "transactions",
        }
    }

    pub fn sources(self) -> &'static [SourceKind] {
        match self {
            DownloadKind::Awards => &[
                SourceKind::ContractsPrimeAwards,
                SourceKind::AssistancePrimeAwards,
            ],
            DownloadKind::Subawards => &[
                SourceKind::ContractsPrimeAwards,
                SourceKind::AssistancePrimeAwards,
                SourceKind::ContractsSubawards,
                SourceKind::AssistanceSubawards,
            ],
            DownloadKind::Transactions => &[
                SourceKind::ContractsPrimeTransactions,
                SourceKind::AssistancePrimeTransactions,
            ],
        }
    }

    /// `<name>_<UTC timestamp>.zip`
    pub fn file_name(self) -> String {
        format!("{}_{}.zip", self.name(), Utc::now().format("%Y%m%d%H%M%S%6f"))
    }
}

/// One CSV file inside a download archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    ContractsPrimeAwards,
    AssistancePrimeAwards,
    ContractsSubawards,
    AssistanceSubawards,
    ContractsPrimeTransactions,
    AssistancePrimeTransactions,
}

impl SourceKind {
    pub fn model_type(self) -> ModelType {
        match self {
            SourceKind::ContractsPrimeAwards | SourceKind::AssistancePrimeAwards => {
                ModelType::Award
            }
            SourceKind::ContractsSubawards | SourceKind::AssistanceSubawards => ModelType::Subaward,
            SourceKind::ContractsPrimeTransactions | SourceKind::AssistancePrimeTransactions => {
                ModelType::Transaction
            }
        }
    }

    pub fn file_type(self) -> FileType {
        match self {
            SourceKind::ContractsPrimeAwards
            | SourceKind::ContractsSubawards
            | SourceKind::ContractsPrimeTransactions => FileType::D1,
            _ => FileType::D2,
        }
    }

    /// File name stem inside the archive.
    pub fn file_descrip(self) -> &'static str {
        match self {
            SourceKind::ContractsPrimeAwards => "contracts_prime_awards",
            SourceKind::AssistancePrimeAwards => "assistance_prime_awards",
            SourceKind::ContractsSubawards => "contracts_subawards",
            SourceKind::AssistanceSubawards => "assistance_subawards",
            SourceKind::ContractsPrimeTransactions => "contracts_prime_transactions",
            SourceKind::AssistancePrimeTransactions => "assistance_prime_transactions",
        }
    }

    fn table(self) -> ColumnTable {
        column_table(self.model_type(), self.file_type())
    }

    pub fn query_path(self, human_name: &str) -> Option<&'static str> {
        self.table()
            .iter()
            .find(|(name, _)| *name == human_name)
            .and_then(|(_, path)| *path)
    }

    /// Header row for `requested`: every column when empty, otherwise the requested
    /// names this file knows, in request order. Names without a query path are dropped.
    pub fn columns(self, requested: &[String]) -> Vec<&'static str> {
        let table = self.table();
        let names: Vec<&'static str> = if requested.is_empty() {
            table.iter().map(|(name, _)| *name).collect()
        } else {
            requested
                .iter()
                .filter_map(|r| table.iter().find(|(name, _)| name == r).map(|(name, _)| *name))
                .collect()
        };
        names
            .into_iter()
            .filter(|name| self.query_path(name).is_some())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum SourceQuery {
    Award(Select<award_view::Entity>),
    Transaction(Select<transaction_view::Entity>),
    Subaward(Select<subaward_view::Entity>),
}

/// A file to write: what it is, the rows it holds and an optional row limit.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub kind: SourceKind,
    pub query: SourceQuery,
    pub limit: Option<u64>,
}

/// Fails with every requested column that no source of the download can produce.
pub fn verify_requested_columns_available(
    sources: &[SourceKind],
    requested: &[String],
) -> AppResult<()> {
    let known: BTreeSet<&str> = sources
        .iter()
        .flat_map(|source| source.columns(requested))
        .collect();
    let unknown: BTreeSet<&str> = requested
        .iter()
        .map(String::as_str)
        .filter(|name| !known.contains(name))
        .collect();

    if unknown.is_empty() {
        Ok(())
    } else {
        let unknown: Vec<&str> = unknown.into_iter().collect();
        Err(AppError::InvalidParameter(format!("Unknown columns: {:?}", unknown)))
    }
}

pub fn parse_limit(limit: Option<u64>, max_download_limit: u64) -> AppResult<Option<u64>> {
    match limit {
        Some(limit) if limit > max_download_limit => Err(AppError::InvalidParameter(format!(
            "Requested limit {} beyond max supported ({})",
            limit, max_download_limit
        ))),
        other => Ok(other),
    }
}

fn prime_awards(condition: &sea_orm::Condition, is_fpds: bool) -> Select<award_view::Entity> {
    award_view::Entity::find()
        .filter(condition.clone())
        .filter(award_view::Column::IsFpds.eq(is_fpds))
}

/// Validates the request and builds the filtered query of every file in the download.
pub fn csv_sources(
    kind: DownloadKind,
    request: &DownloadRequest,
    max_download_limit: u64,
) -> AppResult<Vec<CsvSource>> {
    verify_requested_columns_available(kind.sources(), &request.columns)?;

    match kind {
        DownloadKind::Awards => {
            let (_, condition) = matview_search_filter(&request.filters, Matview::Award)?;
            Ok(vec![
                CsvSource {
                    kind: SourceKind::ContractsPrimeAwards,
                    query: SourceQuery::Award(prime_awards(&condition, true)),
                    limit: None,
                },
                CsvSource {
                    kind: SourceKind::AssistancePrimeAwards,
                    query: SourceQuery::Award(prime_awards(&condition, false)),
                    limit: None,
                },
            ])
        }
        DownloadKind::Subawards => {
            let (_, condition) = matview_search_filter(&request.filters, Matview::Award)?;
            let sub_condition = subaward_filter(&request.filters)?;

            let mut sources = Vec::with_capacity(4);
            let mut linked = Vec::with_capacity(2);
            for (prime_kind, sub_kind, is_fpds) in [
                (SourceKind::ContractsPrimeAwards, SourceKind::ContractsSubawards, true),
                (SourceKind::AssistancePrimeAwards, SourceKind::AssistanceSubawards, false),
            ] {
                let primes = prime_awards(&condition, is_fpds);
                let prime_ids = primes
                    .clone()
                    .select_only()
                    .column(award_view::Column::AwardId)
                    .into_query();
                let subawards = subaward_view::Entity::find()
                    .filter(sub_condition.clone())
                    .filter(subaward_view::Column::AwardId.in_subquery(prime_ids));

                sources.push(CsvSource {
                    kind: prime_kind,
                    query: SourceQuery::Award(primes),
                    limit: None,
                });
                linked.push(CsvSource {
                    kind: sub_kind,
                    query: SourceQuery::Subaward(subawards),
                    limit: None,
                });
            }
            sources.extend(linked);
            Ok(sources)
        }
        DownloadKind::Transactions => {
            let limit = parse_limit(request.limit, max_download_limit)?;
            let (_, condition) = matview_search_filter(&request.filters, Matview::Transaction)?;
            let transactions = |is_fpds: bool| {
                transaction_view::Entity::find()
                    .filter(condition.clone())
                    .filter(transaction_view::Column::IsFpds.eq(is_fpds))
            };
            Ok(vec![
                CsvSource {
                    kind: SourceKind::ContractsPrimeTransactions,
                    query: SourceQuery::Transaction(transactions(true)),
                    limit,
                },
                CsvSource {
                    kind: SourceKind::AssistancePrimeTransactions,
                    query: SourceQuery::Transaction(transactions(false)),
                    limit,
                },
            ])
        }
    }
}
