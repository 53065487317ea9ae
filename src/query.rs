//! Small helpers shared by the search handlers: dynamic column references,
//! page arithmetic and the obligation aggregate.

use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr};
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::lookups::award_types;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Unqualified column reference by name; views are always queried alone.
pub fn column(name: &str) -> Expr {
    Expr::col(Alias::new(name.to_string()))
}

pub fn column_expr(name: &str) -> SimpleExpr {
    column(name).into()
}

/// `limit` / `page` from a request body, validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub page: u64,
}

impl PageRequest {
    pub fn new(limit: Option<u64>, page: Option<u64>) -> AppResult<Self> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let page = page.unwrap_or(1);
        if limit == 0 || limit > MAX_LIMIT {
            return Err(AppError::InvalidParameter(format!(
                "limit must be between 1 and {}; {} given",
                MAX_LIMIT, limit
            )));
        }
        if page == 0 {
            return Err(AppError::InvalidParameter("page must be at least 1".to_string()));
        }
        // offsets are bound as signed 64-bit integers
        let offset = (page - 1).checked_mul(limit).filter(|o| *o <= i64::MAX as u64);
        if offset.is_none() {
            return Err(AppError::InvalidParameter(format!("page {} is out of range", page)));
        }
        Ok(Self { limit, page })
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    /// One extra row is fetched to learn whether another page exists.
    pub fn fetch_size(&self) -> u64 {
        self.limit + 1
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct PageMetadata {
    pub page: u64,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct SimplePageMetadata {
    pub page: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    #[serde(rename = "hasNext")]
    pub has_next: bool,
    #[serde(rename = "hasPrevious")]
    pub has_previous: bool,
}

impl SimplePageMetadata {
    /// `fetched` is the row count of a `limit + 1` query.
    pub fn new(fetched: usize, page: &PageRequest) -> Self {
        let has_next = fetched as u64 > page.limit;
        let has_previous = page.page > 1;
        Self {
            page: page.page,
            next: has_next.then_some(page.page + 1),
            previous: has_previous.then_some(page.page - 1),
            has_next,
            has_previous,
        }
    }
}

/// Sum of `amount_column` for non-loan rows plus the subsidy cost of loan rows,
/// limited to the families present in `type_codes`.
pub fn obligation_sum(amount_column: &str, type_codes: &[String]) -> SimpleExpr {
    let has_loans = type_codes.iter().any(|c| award_types::is_loan(c));
    let has_non_loans = type_codes.iter().any(|c| !award_types::is_loan(c));

    let summed: SimpleExpr = match (has_loans, has_non_loans) {
        (true, false) => column_expr("original_loan_subsidy_cost"),
        (false, _) => column_expr(amount_column),
        (true, true) => Expr::case(
            column("type").is_in(award_types::loan_codes()),
            column("original_loan_subsidy_cost"),
        )
        .finally(column(amount_column))
        .into(),
    };
    Func::sum(summed).into()
}

/// A model as a column-name keyed JSON object.
pub fn model_row<M: Serialize>(model: &M) -> AppResult<Map<String, Value>> {
    match serde_json::to_value(model)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::SerializationError(format!(
            "expected a row object, got {}",
            other
        ))),
    }
}
