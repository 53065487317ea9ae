use std::collections::BTreeMap;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    Condition, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::entities::AwardView;
use crate::error::AppResult;
use crate::filters::matview_search_filter;
use crate::lookups::award_types;
use crate::lookups::matview::Matview;
use crate::lookups::states;
use crate::query::{column, column_expr, obligation_sum};
use crate::routes::{json_body, missing};
use crate::AppState;

static NUMERIC_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]*(\.\d+)?$").expect("numeric code pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeoScope {
    PlaceOfPerformance,
    RecipientLocation,
}

impl GeoScope {
    fn prefix(self) -> &'static str {
        match self {
            GeoScope::PlaceOfPerformance => "pop",
            GeoScope::RecipientLocation => "recipient_location",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeoLayer {
    State,
    County,
    District,
}

impl GeoLayer {
    fn name(self) -> &'static str {
        match self {
            GeoLayer::State => "state",
            GeoLayer::County => "county",
            GeoLayer::District => "district",
        }
    }

    fn code_suffix(self) -> &'static str {
        match self {
            GeoLayer::State => "state_code",
            GeoLayer::County => "county_code",
            GeoLayer::District => "congressional_code",
        }
    }
}

/// Request body for the geography breakdown
#[derive(Debug, Deserialize, ToSchema)]
pub struct SpendingByGeographyRequest {
    /// `place_of_performance` or `recipient_location`
    pub scope: Option<GeoScope>,
    /// `state`, `county` or `district`
    pub geo_layer: Option<GeoLayer>,
    /// Shape codes to restrict the results to: state codes, or state FIPS plus county/district code
    pub geo_layer_filters: Option<Vec<String>>,
    /// Search filters
    #[schema(value_type = Option<Object>)]
    pub filters: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct GeographyResult {
    pub shape_code: String,
    pub aggregated_amount: Option<f64>,
    /// State or county name, or `ST-NN` for districts; null for unnamed counties
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpendingByGeographyResponse {
    pub scope: GeoScope,
    pub geo_layer: GeoLayer,
    pub results: Vec<GeographyResult>,
}

/// Aggregate award obligations by state, county or congressional district
#[utoipa::path(
    post,
    path = "/api/v2/search/spending_by_geography/",
    request_body = SpendingByGeographyRequest,
    responses(
        (status = 200, description = "Aggregated amounts per shape", body = SpendingByGeographyResponse),
        (status = 400, description = "Invalid scope, layer or filters")
    ),
    description = "Sums obligations of matching domestic awards per state, county or congressional district of the recipient or of the place of performance."
)]
#[tracing::instrument(skip(state, payload))]
pub async fn spending_by_geography(
    State(state): State<AppState>,
    payload: Result<Json<SpendingByGeographyRequest>, JsonRejection>,
) -> AppResult<Json<SpendingByGeographyResponse>> {
    let request = json_body(payload)?;
    let scope = request.scope.ok_or_else(|| missing("scope"))?;
    let geo_layer = request.geo_layer.ok_or_else(|| missing("geo_layer"))?;
    let filters = request.filters.unwrap_or_default();
    let layer_filters = request.geo_layer_filters.unwrap_or_default();

    let (parsed, condition) = matview_search_filter(&filters, Matview::Award)?;
    let type_codes: Vec<String> = match parsed.award_type_codes() {
        Some(codes) => codes.to_vec(),
        None => award_types::all_codes().into_iter().map(String::from).collect(),
    };

    let results = match geo_layer {
        GeoLayer::State => {
            state_amounts(&state.db, scope, condition, &type_codes, &layer_filters).await?
        }
        GeoLayer::County | GeoLayer::District => {
            let rows =
                sub_state_rows(&state.db, scope, geo_layer, condition, &type_codes, &layer_filters)
                    .await?;
            merge_sub_state_rows(geo_layer, rows, &layer_filters)
        }
    };
    tracing::debug!(results = results.len(), layer = geo_layer.name(), "geography aggregated");

    Ok(Json(SpendingByGeographyResponse {
        scope,
        geo_layer,
        results,
    }))
}

fn domestic(scope: GeoScope) -> Condition {
    Condition::all().add(column(&format!("{}_country_code", scope.prefix())).eq("USA"))
}

async fn state_amounts(
    db: &DatabaseConnection,
    scope: GeoScope,
    condition: Condition,
    type_codes: &[String],
    layer_filters: &[String],
) -> AppResult<Vec<GeographyResult>> {
    let state_col = format!("{}_state_code", scope.prefix());
    let mut select = AwardView::find()
        .filter(condition)
        .filter(domestic(scope))
        .filter(column("total_obligation").is_not_null());
    select = if layer_filters.is_empty() {
        select.filter(column(&state_col).is_not_null())
    } else {
        select.filter(column(&state_col).is_in(layer_filters.iter().cloned()))
    };

    let rows: Vec<(Option<String>, Option<f64>)> = select
        .select_only()
        .column_as(column_expr(&state_col), "shape_code")
        .column_as(obligation_sum("total_obligation", type_codes), "aggregated_amount")
        .group_by(column_expr(&state_col))
        .into_tuple()
        .all(db)
        .await?;

    let mut results: Vec<GeographyResult> = rows
        .into_iter()
        .filter_map(|(code, amount)| {
            let code = code?;
            let display_name = states::by_code(&code)
                .map(|s| states::title_case(s.name))
                .unwrap_or_else(|| "None".to_string());
            Some(GeographyResult {
                shape_code: code,
                aggregated_amount: amount,
                display_name: Some(display_name),
            })
        })
        .collect();
    results.sort_by(|a, b| a.shape_code.cmp(&b.shape_code));
    Ok(results)
}

/// One grouped (state, code, county name) row before normalisation.
#[derive(Debug, Clone, PartialEq)]
struct SubStateRow {
    state_code: String,
    code: String,
    county_name: Option<String>,
    amount: Option<f64>,
}

async fn sub_state_rows(
    db: &DatabaseConnection,
    scope: GeoScope,
    geo_layer: GeoLayer,
    condition: Condition,
    type_codes: &[String],
    layer_filters: &[String],
) -> AppResult<Vec<SubStateRow>> {
    let prefix = scope.prefix();
    let state_col = format!("{}_state_code", prefix);
    let code_col = format!("{}_{}", prefix, geo_layer.code_suffix());
    let county_name_col = format!("{}_county_name", prefix);

    let mut select = AwardView::find()
        .filter(condition)
        .filter(domestic(scope))
        .filter(column(&state_col).is_not_null())
        .filter(column(&code_col).is_not_null());

    // Shape codes lead with the state FIPS; narrow by state here and by full code after merging.
    if !layer_filters.is_empty() {
        let state_codes: Vec<&str> = layer_filters
            .iter()
            .filter_map(|shape| shape.get(..2).and_then(states::by_fips))
            .map(|s| s.code)
            .collect();
        select = select.filter(column(&state_col).is_in(state_codes));
    }

    let mut select = select
        .select_only()
        .column_as(column_expr(&state_col), "state_code")
        .column_as(column_expr(&code_col), "code")
        .group_by(column_expr(&state_col))
        .group_by(column_expr(&code_col));
    select = if geo_layer == GeoLayer::County {
        select
            .column_as(column_expr(&county_name_col), "county_name")
            .group_by(column_expr(&county_name_col))
    } else {
        select.column_as(sea_orm::sea_query::Expr::cust("NULL"), "county_name")
    };

    let rows: Vec<(String, String, Option<String>, Option<f64>)> = select
        .column_as(obligation_sum("total_obligation", type_codes), "aggregated_amount")
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(state_code, code, county_name, amount)| SubStateRow {
            state_code,
            code,
            county_name,
            amount,
        })
        .collect())
}

/// Normalises codes so `01`, `1` and `1.0` land on one shape, then sums per shape.
fn merge_sub_state_rows(
    geo_layer: GeoLayer,
    rows: Vec<SubStateRow>,
    layer_filters: &[String],
) -> Vec<GeographyResult> {
    let mut shapes: BTreeMap<String, GeographyResult> = BTreeMap::new();

    for row in rows {
        if row.code.is_empty() || !NUMERIC_CODE.is_match(&row.code) {
            continue;
        }
        let Ok(number) = row.code.parse::<f64>() else {
            continue;
        };
        let Some(state) = states::by_code(&row.state_code) else {
            tracing::warn!(state_code = %row.state_code, "unknown state code in geography rows");
            continue;
        };
        let padded = states::pad_code(geo_layer.name(), number);
        let shape_code = format!("{}{}", state.fips, padded);

        let display_name = match geo_layer {
            GeoLayer::County => row.county_name.as_deref().map(states::title_case),
            _ => Some(format!("{}-{}", state.code, padded)),
        };

        let entry = shapes.entry(shape_code.clone()).or_insert(GeographyResult {
            shape_code,
            aggregated_amount: None,
            display_name,
        });
        if entry.display_name.is_none() {
            entry.display_name = row.county_name.as_deref().map(states::title_case);
        }
        entry.aggregated_amount = match (entry.aggregated_amount, row.amount) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
    }

    shapes
        .into_values()
        .filter(|r| layer_filters.is_empty() || layer_filters.contains(&r.shape_code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(state: &str, code: &str, name: Option<&str>, amount: f64) -> SubStateRow {
        SubStateRow {
            state_code: state.to_string(),
            code: code.to_string(),
            county_name: name.map(String::from),
            amount: Some(amount),
        }
    }

    #[test]
    fn equivalent_codes_merge_into_one_shape() {
        let rows = vec![
            row("VA", "01", Some("ACCOMACK"), 10.0),
            row("VA", "1", None, 5.0),
            row("VA", "1.0", Some("ACCOMACK"), 1.0),
            row("VA", "03", Some("ALLEGHANY"), 2.0),
        ];
        let results = merge_sub_state_rows(GeoLayer::County, rows, &[]);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].shape_code, "51001");
        assert_eq!(results[0].aggregated_amount, Some(16.0));
        assert_eq!(results[0].display_name.as_deref(), Some("Accomack"));
        assert_eq!(results[1].shape_code, "51003");
    }

    #[test]
    fn non_numeric_codes_are_dropped() {
        let rows = vec![row("VA", "ZZ", None, 1.0), row("VA", "05", None, 3.0)];
        let results = merge_sub_state_rows(GeoLayer::District, rows, &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].shape_code, "5105");
        assert_eq!(results[0].display_name.as_deref(), Some("VA-05"));
    }

    #[test]
    fn layer_filters_apply_to_full_shape_codes() {
        let rows = vec![row("VA", "5", None, 1.0), row("VA", "6", None, 2.0)];
        let results = merge_sub_state_rows(GeoLayer::District, rows, &["5106".to_string()]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].shape_code, "5106");
    }

    #[test]
    fn unnamed_counties_have_no_display_name() {
        let rows = vec![
            row("VA", "7", None, 1.0),
            row("VA", "9", None, 2.0),
            row("VA", "009", Some("AMHERST"), 3.0),
        ];
        let results = merge_sub_state_rows(GeoLayer::County, rows, &[]);
        assert_eq!(results[0].shape_code, "51007");
        assert_eq!(results[0].display_name, None);
        // a later named row fills the gap
        assert_eq!(results[1].display_name.as_deref(), Some("Amherst"));
        assert_eq!(results[1].aggregated_amount, Some(5.0));
    }
}
