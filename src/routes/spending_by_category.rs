use axum::{extract::rejection::JsonRejection, extract::State, Json};
use sea_orm::sea_query::{Alias, Expr, SimpleExpr};
use sea_orm::{
    Condition, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::entities::AwardView;
use crate::error::{AppError, AppResult};
use crate::filters::matview_search_filter;
use crate::lookups::award_types;
use crate::lookups::matview::Matview;
use crate::query::{column, column_expr, obligation_sum, PageRequest, SimplePageMetadata};
use crate::routes::{json_body, missing};
use crate::AppState;

const AMOUNT_ALIAS: &str = "aggregated_amount";
const MAX_GROUP_COLUMNS: usize = 3;

/// A view column to group by and the name it is reported under.
#[derive(Debug, Clone, Copy)]
struct GroupColumn {
    column: &'static str,
    output: &'static str,
    /// Integer column; selected as text and reported as a number.
    numeric: bool,
}

const fn text(column: &'static str, output: &'static str) -> GroupColumn {
    GroupColumn { column, output, numeric: false }
}

/// Grouping and null exclusion for one category/scope pair.
#[derive(Debug)]
struct CategoryQuery {
    groups: &'static [GroupColumn],
    not_null: Option<&'static str>,
}

const AWARDING_AGENCY: CategoryQuery = CategoryQuery {
    groups: &[
        text("awarding_toptier_agency_name", "agency_name"),
        text("awarding_toptier_agency_abbreviation", "agency_abbreviation"),
    ],
    not_null: Some("awarding_toptier_agency_name"),
};

const AWARDING_SUBAGENCY: CategoryQuery = CategoryQuery {
    groups: &[
        text("awarding_subtier_agency_name", "agency_name"),
        text("awarding_subtier_agency_abbreviation", "agency_abbreviation"),
    ],
    not_null: Some("awarding_subtier_agency_name"),
};

const FUNDING_AGENCY: CategoryQuery = CategoryQuery {
    groups: &[
        text("funding_toptier_agency_name", "agency_name"),
        text("funding_toptier_agency_abbreviation", "agency_abbreviation"),
    ],
    not_null: Some("funding_toptier_agency_name"),
};

const FUNDING_SUBAGENCY: CategoryQuery = CategoryQuery {
    groups: &[
        text("funding_subtier_agency_name", "agency_name"),
        text("funding_subtier_agency_abbreviation", "agency_abbreviation"),
    ],
    not_null: Some("funding_subtier_agency_name"),
};

const RECIPIENT_DUNS: CategoryQuery = CategoryQuery {
    groups: &[
        GroupColumn { column: "recipient_id", output: "legal_entity_id", numeric: true },
        text("recipient_name", "recipient_name"),
    ],
    not_null: None,
};

const RECIPIENT_PARENT_DUNS: CategoryQuery = CategoryQuery {
    groups: &[
        text("recipient_name", "recipient_name"),
        text("parent_recipient_unique_id", "parent_recipient_unique_id"),
    ],
    not_null: Some("parent_recipient_unique_id"),
};

const CFDA_PROGRAMS: CategoryQuery = CategoryQuery {
    groups: &[
        text("cfda_number", "cfda_program_number"),
        text("cfda_popular_name", "popular_name"),
        text("cfda_title", "program_title"),
    ],
    not_null: Some("cfda_number"),
};

const INDUSTRY_PSC: CategoryQuery = CategoryQuery {
    groups: &[text("psc_code", "psc_code")],
    not_null: Some("psc_code"),
};

const INDUSTRY_NAICS: CategoryQuery = CategoryQuery {
    groups: &[
        text("naics_code", "naics_code"),
        text("naics_description", "naics_description"),
    ],
    not_null: Some("naics_code"),
};

/// Request body for the category breakdown
#[derive(Debug, Deserialize, ToSchema)]
pub struct SpendingByCategoryRequest {
    /// One of `awarding_agency`, `funding_agency`, `recipient`, `cfda_programs`, `industry_codes`
    pub category: Option<String>,
    /// Depends on the category: `agency`/`subagency`, `duns`/`parent_duns` or `psc`/`naics`
    pub scope: Option<String>,
    /// Search filters
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Map<String, Value>>,
    /// Rows per page, 1 to 100 (default: 10)
    pub limit: Option<u64>,
    /// Page number, starting at 1
    pub page: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpendingByCategoryResponse {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub limit: u64,
    /// Grouping columns plus `aggregated_amount`, largest amount first
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<Map<String, Value>>,
    pub page_metadata: SimplePageMetadata,
}

/// Aggregate award obligations by category
#[utoipa::path(
    post,
    path = "/api/v2/search/spending_by_category/",
    request_body = SpendingByCategoryRequest,
    responses(
        (status = 200, description = "Aggregated amounts per category value", body = SpendingByCategoryResponse),
        (status = 400, description = "Invalid category, scope or filters")
    ),
    description = "Groups matching awards by agency, recipient, CFDA program or industry code. Loans contribute their subsidy cost, everything else its obligation."
)]
#[tracing::instrument(skip(state, payload))]
pub async fn spending_by_category(
    State(state): State<AppState>,
    payload: Result<Json<SpendingByCategoryRequest>, JsonRejection>,
) -> AppResult<Json<SpendingByCategoryResponse>> {
    let request = json_body(payload)?;
    let category = request.category.ok_or_else(|| missing("category"))?;
    let scope = request.scope;
    let filters = request.filters.ok_or_else(|| missing("filters"))?;
    let page = PageRequest::new(request.limit, request.page)?;

    let query = category_query(&category, scope.as_deref())?;
    let (parsed, condition) = matview_search_filter(&filters, Matview::Award)?;
    let type_codes: Vec<String> = match parsed.award_type_codes() {
        Some(codes) => codes.to_vec(),
        None => award_types::all_codes().into_iter().map(String::from).collect(),
    };

    let rows = grouped_amounts(&state.db, query, condition, &type_codes, &page).await?;
    let page_metadata = SimplePageMetadata::new(rows.len(), &page);
    let results = rows.into_iter().take(page.limit as usize).collect();

    let scope = if category == "cfda_programs" { None } else { scope };
    Ok(Json(SpendingByCategoryResponse {
        category,
        scope,
        limit: page.limit,
        results,
        page_metadata,
    }))
}

fn category_query(category: &str, scope: Option<&str>) -> AppResult<&'static CategoryQuery> {
    let invalid_scope =
        || AppError::InvalidParameter("scope does not have a valid value".to_string());
    // recipient and industry scopes share one message
    let not_implemented =
        || AppError::InvalidParameter("recipient type is not yet implemented".to_string());

    match category {
        "cfda_programs" => return Ok(&CFDA_PROGRAMS),
        "awarding_agency" | "funding_agency" | "recipient" | "industry_codes" => {}
        _ => {
            return Err(AppError::InvalidParameter(
                "Category does not have a valid value".to_string(),
            ))
        }
    }

    let scope = scope.ok_or_else(|| missing("scope"))?;
    match (category, scope) {
        ("awarding_agency", "agency") => Ok(&AWARDING_AGENCY),
        ("awarding_agency", "subagency") => Ok(&AWARDING_SUBAGENCY),
        ("funding_agency", "agency") => Ok(&FUNDING_AGENCY),
        ("funding_agency", "subagency") => Ok(&FUNDING_SUBAGENCY),
        ("awarding_agency" | "funding_agency", _) => Err(invalid_scope()),
        ("recipient", "duns") => Ok(&RECIPIENT_DUNS),
        ("recipient", "parent_duns") => Ok(&RECIPIENT_PARENT_DUNS),
        ("industry_codes", "psc") => Ok(&INDUSTRY_PSC),
        ("industry_codes", "naics") => Ok(&INDUSTRY_NAICS),
        _ => Err(not_implemented()),
    }
}

type GroupedRow = (Option<String>, Option<String>, Option<String>, Option<f64>);

async fn grouped_amounts(
    db: &DatabaseConnection,
    query: &CategoryQuery,
    condition: Condition,
    type_codes: &[String],
    page: &PageRequest,
) -> AppResult<Vec<Map<String, Value>>> {
    let mut select = AwardView::find().filter(condition).select_only();
    if let Some(col) = query.not_null {
        select = select.filter(column(col).is_not_null());
    }

    for (slot, group) in slots(query.groups).enumerate() {
        let alias = format!("group_{}", slot);
        select = match group {
            Some(group) => {
                let expr: SimpleExpr = if group.numeric {
                    column(group.column).cast_as(Alias::new("TEXT"))
                } else {
                    column_expr(group.column)
                };
                select
                    .column_as(expr, alias)
                    .group_by(column_expr(group.column))
            }
            None => select.column_as(Expr::cust("NULL"), alias),
        };
    }

    let rows: Vec<GroupedRow> = select
        .column_as(obligation_sum("total_obligation", type_codes), AMOUNT_ALIAS)
        .order_by(column_expr(AMOUNT_ALIAS), Order::Desc)
        .order_by(column_expr(query.groups[0].column), Order::Asc)
        .offset(page.offset())
        .limit(page.fetch_size())
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(a, b, c, amount)| {
            let mut out = Map::new();
            for (group, value) in query.groups.iter().zip([a, b, c]) {
                out.insert(group.output.to_string(), group_value(group, value));
            }
            out.insert(AMOUNT_ALIAS.to_string(), amount.map_or(Value::Null, Value::from));
            out
        })
        .collect())
}

/// Pads `groups` to a fixed width so every query decodes into the same tuple.
fn slots(groups: &'static [GroupColumn]) -> impl Iterator<Item = Option<&'static GroupColumn>> {
    (0..MAX_GROUP_COLUMNS).map(move |i| groups.get(i))
}

fn group_value(group: &GroupColumn, value: Option<String>) -> Value {
    match value {
        Some(raw) if group.numeric => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(raw)),
        Some(raw) => Value::String(raw),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_resolve_to_their_groupings() {
        let q = category_query("awarding_agency", Some("subagency")).unwrap();
        assert_eq!(q.groups[0].column, "awarding_subtier_agency_name");

        let q = category_query("cfda_programs", None).unwrap();
        assert_eq!(q.groups.len(), 3);

        let q = category_query("recipient", Some("duns")).unwrap();
        assert!(q.groups[0].numeric);
    }

    #[test]
    fn bad_scopes_are_reported() {
        let err = category_query("funding_agency", Some("office")).unwrap_err();
        assert_eq!(err.to_string(), "scope does not have a valid value");

        let err = category_query("recipient", Some("congressional")).unwrap_err();
        assert_eq!(err.to_string(), "recipient type is not yet implemented");

        let err = category_query("industry_codes", Some("sic")).unwrap_err();
        assert_eq!(err.to_string(), "recipient type is not yet implemented");

        let err = category_query("awarding_agency", None).unwrap_err();
        assert!(err.to_string().contains("scope"));
    }

    #[test]
    fn every_grouping_fits_the_row_tuple() {
        for q in [
            &AWARDING_AGENCY,
            &AWARDING_SUBAGENCY,
            &FUNDING_AGENCY,
            &FUNDING_SUBAGENCY,
            &RECIPIENT_DUNS,
            &RECIPIENT_PARENT_DUNS,
            &CFDA_PROGRAMS,
            &INDUSTRY_PSC,
            &INDUSTRY_NAICS,
        ] {
            assert!(!q.groups.is_empty() && q.groups.len() <= MAX_GROUP_COLUMNS);
        }
    }

    #[test]
    fn numeric_groups_are_reported_as_numbers() {
        let value = group_value(&RECIPIENT_DUNS.groups[0], Some("42".to_string()));
        assert_eq!(value, Value::from(42));
    }
}
