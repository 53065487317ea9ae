use axum::{extract::rejection::JsonRejection, extract::State, Json};
use sea_orm::{
    Condition, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm::sea_query::SimpleExpr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::entities::{AwardView, TransactionView};
use crate::error::{AppError, AppResult};
use crate::filters::matview_search_filter;
use crate::lookups::award_types::{is_contract, is_loan, is_non_loan_assistance, NO_INTERSECTION};
use crate::lookups::matview::{FieldMapping, Matview};
use crate::query::{column_expr, model_row, PageMetadata, PageRequest};
use crate::routes::{json_body, missing};
use crate::AppState;

const AWARD_ID_LABEL: &str = "Award ID";
const AWARD_ID_COLUMNS: [&str; 3] = ["piid", "fain", "uri"];

/// Request body shared by the award and transaction searches
#[derive(Debug, Deserialize, ToSchema)]
pub struct SpendingByAwardRequest {
    /// Labels of the fields to return for each row, e.g. "Award ID", "Recipient Name"
    pub fields: Option<Vec<String>>,
    /// Search filters; must include `award_type_codes`
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Map<String, Value>>,
    /// Sort direction, `asc` or `desc` (default: asc)
    pub order: Option<String>,
    /// Field label to sort by (default: the first requested field)
    pub sort: Option<String>,
    /// Rows per page, 1 to 100 (default: 10)
    pub limit: Option<u64>,
    /// Page number, starting at 1
    pub page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpendingByAwardResponse {
    pub limit: u64,
    /// One object per row: `internal_id` plus every requested field
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<Map<String, Value>>,
    pub page_metadata: PageMetadata,
}

/// Search awards
#[utoipa::path(
    post,
    path = "/api/v2/search/spending_by_award/",
    request_body = SpendingByAwardRequest,
    responses(
        (status = 200, description = "One page of matching awards", body = SpendingByAwardResponse),
        (status = 400, description = "Invalid request parameters or filters")
    ),
    description = "Returns award rows matching the filters, projected onto the requested field labels. The label to column mapping follows each award's type."
)]
#[tracing::instrument(skip(state, payload))]
pub async fn spending_by_award(
    State(state): State<AppState>,
    payload: Result<Json<SpendingByAwardRequest>, JsonRejection>,
) -> AppResult<Json<SpendingByAwardResponse>> {
    let request = json_body(payload)?;
    search(&state.db, request, Matview::Award).await.map(Json)
}

/// Search transactions
#[utoipa::path(
    post,
    path = "/api/v2/search/spending_by_transaction/",
    request_body = SpendingByAwardRequest,
    responses(
        (status = 200, description = "One page of matching transactions", body = SpendingByAwardResponse),
        (status = 400, description = "Invalid request parameters or filters")
    ),
    description = "Same contract as the award search, run against transactions. `internal_id` is the transaction id."
)]
#[tracing::instrument(skip(state, payload))]
pub async fn spending_by_transaction(
    State(state): State<AppState>,
    payload: Result<Json<SpendingByAwardRequest>, JsonRejection>,
) -> AppResult<Json<SpendingByAwardResponse>> {
    let request = json_body(payload)?;
    search(&state.db, request, Matview::Transaction).await.map(Json)
}

async fn search(
    db: &DatabaseConnection,
    request: SpendingByAwardRequest,
    view: Matview,
) -> AppResult<SpendingByAwardResponse> {
    let fields = request.fields.ok_or_else(|| missing("fields"))?;
    if fields.is_empty() {
        return Err(AppError::InvalidParameter(
            "Please provide a field in the fields request parameter.".to_string(),
        ));
    }
    let filters = request.filters.ok_or_else(|| missing("filters"))?;
    if !filters.contains_key("award_type_codes") {
        return Err(missing("filters['award_type_codes']"));
    }

    let order = match request.order.as_deref().unwrap_or("asc") {
        "asc" => Order::Asc,
        "desc" => Order::Desc,
        other => {
            return Err(AppError::InvalidParameter(format!(
                "Invalid value for order: {}",
                other
            )))
        }
    };
    let sort = request.sort.unwrap_or_else(|| fields[0].clone());
    if !fields.contains(&sort) {
        return Err(AppError::InvalidParameter(format!(
            "Sort value not found in fields: {}",
            sort
        )));
    }
    let page = PageRequest::new(request.limit, request.page)?;

    let (parsed, condition) = matview_search_filter(&filters, view)?;
    let type_codes = parsed.award_type_codes().unwrap_or_default();
    let ordering: Vec<(SimpleExpr, Order)> = sort_columns(view, type_codes, &sort)?
        .into_iter()
        .map(|col| (column_expr(col), order.clone()))
        .collect();

    let rows = match view {
        Matview::Award => fetch_page::<AwardView>(db, condition, ordering, view, &page).await?,
        Matview::Transaction => {
            fetch_page::<TransactionView>(db, condition, ordering, view, &page).await?
        }
    };
    tracing::debug!(rows = rows.len(), ?view, "search page fetched");

    let has_next = rows.len() as u64 > page.limit;
    let results = rows
        .iter()
        .take(page.limit as usize)
        .map(|row| project_row(view, row, &fields))
        .collect();

    Ok(SpendingByAwardResponse {
        limit: page.limit,
        results,
        page_metadata: PageMetadata {
            page: page.page,
            has_next,
        },
    })
}

/// Columns to order by for `sort`, picked from the mapping the requested type codes imply.
pub(crate) fn sort_columns(
    view: Matview,
    type_codes: &[String],
    sort: &str,
) -> AppResult<Vec<&'static str>> {
    if type_codes.iter().any(|c| c == NO_INTERSECTION) {
        return Ok(Vec::new());
    }
    if sort == AWARD_ID_LABEL {
        return Ok(AWARD_ID_COLUMNS.to_vec());
    }

    let mapping = if type_codes.iter().all(|c| is_contract(c)) {
        view.contracts_mapping()
    } else if type_codes.iter().all(|c| is_loan(c)) {
        view.loan_mapping()
    } else {
        view.non_loan_assistance_mapping()
    };
    mapping.get(sort).map(|col| vec![col]).ok_or_else(|| {
        AppError::InvalidParameter(format!(
            "Sort value '{}' is not available for the requested award types",
            sort
        ))
    })
}

async fn fetch_page<E>(
    db: &DatabaseConnection,
    condition: Condition,
    ordering: Vec<(SimpleExpr, Order)>,
    view: Matview,
    page: &PageRequest,
) -> AppResult<Vec<Map<String, Value>>>
where
    E: EntityTrait,
    E::Model: Serialize,
{
    let mut select = E::find().filter(condition);
    for (expr, order) in ordering {
        select = select.order_by(expr, order);
    }
    // tie-break so pages never overlap
    select = select.order_by(column_expr(view.id_column()), Order::Asc);

    let models = select
        .offset(page.offset())
        .limit(page.fetch_size())
        .all(db)
        .await?;
    models.iter().map(model_row).collect()
}

fn row_mapping(view: Matview, row: &Map<String, Value>) -> Option<&'static FieldMapping> {
    let has_piid = row.get("piid").is_some_and(|v| !v.is_null());
    match row.get("type").and_then(Value::as_str) {
        Some(code) if is_loan(code) => Some(view.loan_mapping()),
        Some(code) if is_non_loan_assistance(code) => Some(view.non_loan_assistance_mapping()),
        Some(code) if is_contract(code) => Some(view.contracts_mapping()),
        None if has_piid => Some(view.contracts_mapping()),
        _ => None,
    }
}

pub(crate) fn project_row(
    view: Matview,
    row: &Map<String, Value>,
    fields: &[String],
) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(
        "internal_id".to_string(),
        row.get(view.id_column()).cloned().unwrap_or(Value::Null),
    );

    if let Some(mapping) = row_mapping(view, row) {
        for field in fields {
            let value = mapping
                .get(field)
                .and_then(|col| row.get(col))
                .cloned()
                .unwrap_or(Value::Null);
            out.insert(field.clone(), value);
        }
    }

    if fields.iter().any(|f| f == AWARD_ID_LABEL) {
        let award_id = AWARD_ID_COLUMNS
            .iter()
            .filter_map(|col| row.get(*col))
            .find(|v| !v.is_null());
        if let Some(award_id) = award_id {
            out.insert(AWARD_ID_LABEL.to_string(), award_id.clone());
        }
    }
    out
}
