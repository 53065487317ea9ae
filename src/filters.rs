//! Translates the `filters` object of a search or download request into a SQL
//! [`Condition`] over one of the flat views.

use chrono::NaiveDate;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::Condition;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::lookups::matview::Matview;
use crate::query::column;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgencyType {
    Awarding,
    Funding,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgencyTier {
    Toptier,
    Subtier,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgencyFilter {
    #[serde(rename = "type")]
    pub agency_type: AgencyType,
    pub tier: AgencyTier,
    pub name: String,
}

impl AgencyFilter {
    fn column(&self) -> &'static str {
        match (self.agency_type, self.tier) {
            (AgencyType::Awarding, AgencyTier::Toptier) => "awarding_toptier_agency_name",
            (AgencyType::Awarding, AgencyTier::Subtier) => "awarding_subtier_agency_name",
            (AgencyType::Funding, AgencyTier::Toptier) => "funding_toptier_agency_name",
            (AgencyType::Funding, AgencyTier::Subtier) => "funding_subtier_agency_name",
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LocationFilter {
    pub country: String,
    pub state: Option<String>,
    pub county: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationScope {
    Domestic,
    Foreign,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AmountRange {
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

/// Parsed request filters. Empty lists mean "not filtered".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub keywords: Vec<String>,
    pub time_period: Vec<DateRange>,
    pub award_type_codes: Option<Vec<String>>,
    pub agencies: Vec<AgencyFilter>,
    pub legal_entities: Vec<i64>,
    pub recipient_search_text: Vec<String>,
    pub recipient_scope: Option<LocationScope>,
    pub recipient_locations: Vec<LocationFilter>,
    pub place_of_performance_scope: Option<LocationScope>,
    pub place_of_performance_locations: Vec<LocationFilter>,
    pub award_amounts: Vec<AmountRange>,
    pub award_ids: Vec<String>,
    pub program_numbers: Option<Vec<String>>,
    pub naics_codes: Option<Vec<String>>,
    pub psc_codes: Option<Vec<String>>,
    pub contract_pricing_type_codes: Option<Vec<String>>,
    pub set_aside_type_codes: Option<Vec<String>>,
    pub extent_competed_type_codes: Option<Vec<String>>,
}

/// Which columns a filter set is applied to.
#[derive(Debug, Clone, Copy)]
pub struct FilterTarget {
    pub date_column: &'static str,
    pub amount_column: &'static str,
    pub keyword_columns: &'static [&'static str],
    /// False for subawards: award-level filters reach them through their prime award.
    pub award_level: bool,
}

pub const AWARD_TARGET: FilterTarget = FilterTarget {
    date_column: "action_date",
    amount_column: "total_obligation",
    keyword_columns: &["recipient_name", "description", "piid", "fain", "uri"],
    award_level: true,
};

pub const TRANSACTION_TARGET: FilterTarget = FilterTarget {
    date_column: "action_date",
    amount_column: "federal_action_obligation",
    keyword_columns: &["recipient_name", "description", "piid", "fain", "uri"],
    award_level: true,
};

pub const SUBAWARD_TARGET: FilterTarget = FilterTarget {
    date_column: "action_date",
    amount_column: "amount",
    keyword_columns: &[
        "recipient_name",
        "description",
        "subaward_number",
        "prime_award_piid",
        "prime_award_fain",
    ],
    award_level: false,
};

impl From<Matview> for FilterTarget {
    fn from(view: Matview) -> Self {
        match view {
            Matview::Award => AWARD_TARGET,
            Matview::Transaction => TRANSACTION_TARGET,
        }
    }
}

fn invalid(key: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::InvalidParameter(format!("Invalid filter: {} {}", key, detail))
}

fn typed<T: serde::de::DeserializeOwned>(key: &str, value: &Value) -> AppResult<T> {
    serde_json::from_value(value.clone()).map_err(|e| invalid(key, format!("is malformed: {}", e)))
}

/// Codes are usually strings, but clients send CFDA and NAICS numbers bare too.
fn code_list(key: &str, value: &Value) -> AppResult<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(key, "must be a list."))?;
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(invalid(key, format!("contains an invalid value {}.", other))),
        })
        .collect()
}

impl SearchFilters {
    pub fn parse(filters: &Map<String, Value>) -> AppResult<Self> {
        let mut parsed = SearchFilters::default();

        for (key, value) in filters {
            if value.is_null() {
                return Err(invalid(key, "has null as its value."));
            }
            match key.as_str() {
                "keywords" => parsed.keywords = code_list(key, value)?,
                "time_period" => parsed.time_period = typed(key, value)?,
                "award_type_codes" => parsed.award_type_codes = Some(code_list(key, value)?),
                "agencies" => parsed.agencies = typed(key, value)?,
                "legal_entities" => parsed.legal_entities = typed(key, value)?,
                "recipient_search_text" => parsed.recipient_search_text = code_list(key, value)?,
                "recipient_scope" => parsed.recipient_scope = Some(typed(key, value)?),
                "recipient_locations" => parsed.recipient_locations = typed(key, value)?,
                "place_of_performance_scope" => {
                    parsed.place_of_performance_scope = Some(typed(key, value)?)
                }
                "place_of_performance_locations" => {
                    parsed.place_of_performance_locations = typed(key, value)?
                }
                "award_amounts" => parsed.award_amounts = typed(key, value)?,
                "award_ids" => parsed.award_ids = code_list(key, value)?,
                "program_numbers" => parsed.program_numbers = Some(code_list(key, value)?),
                "naics_codes" => parsed.naics_codes = Some(code_list(key, value)?),
                "psc_codes" => parsed.psc_codes = Some(code_list(key, value)?),
                "contract_pricing_type_codes" => {
                    parsed.contract_pricing_type_codes = Some(code_list(key, value)?)
                }
                "set_aside_type_codes" => {
                    parsed.set_aside_type_codes = Some(code_list(key, value)?)
                }
                "extent_competed_type_codes" => {
                    parsed.extent_competed_type_codes = Some(code_list(key, value)?)
                }
                _ => return Err(invalid(key, "does not exist.")),
            }
        }

        Ok(parsed)
    }

    pub fn award_type_codes(&self) -> Option<&[String]> {
        self.award_type_codes.as_deref()
    }

    pub fn to_condition(&self, target: FilterTarget) -> Condition {
        let mut cond = Condition::all();

        if !self.keywords.is_empty() {
            let mut any = Condition::any();
            for keyword in &self.keywords {
                for col in target.keyword_columns {
                    any = any.add(contains_ignore_case(col, keyword));
                }
            }
            cond = cond.add(any);
        }

        let date_ranges: Vec<_> = self
            .time_period
            .iter()
            .filter(|r| r.start_date.is_some() || r.end_date.is_some())
            .collect();
        if !date_ranges.is_empty() {
            let mut any = Condition::any();
            for range in date_ranges {
                let mut within = Condition::all();
                if let Some(start) = range.start_date {
                    within = within.add(column(target.date_column).gte(start));
                }
                if let Some(end) = range.end_date {
                    within = within.add(column(target.date_column).lte(end));
                }
                any = any.add(within);
            }
            cond = cond.add(any);
        }

        let amount_ranges: Vec<_> = self
            .award_amounts
            .iter()
            .filter(|r| r.lower_bound.is_some() || r.upper_bound.is_some())
            .collect();
        if !amount_ranges.is_empty() {
            let mut any = Condition::any();
            for range in amount_ranges {
                let mut within = Condition::all();
                if let Some(lower) = range.lower_bound {
                    within = within.add(column(target.amount_column).gte(lower));
                }
                if let Some(upper) = range.upper_bound {
                    within = within.add(column(target.amount_column).lte(upper));
                }
                any = any.add(within);
            }
            cond = cond.add(any);
        }

        if !self.recipient_search_text.is_empty() {
            let mut any = Condition::any();
            for text in &self.recipient_search_text {
                any = any.add(contains_ignore_case("recipient_name", text));
                if text.len() == 9 && text.chars().all(|c| c.is_ascii_digit()) {
                    any = any.add(column("recipient_unique_id").eq(text.as_str()));
                }
            }
            cond = cond.add(any);
        }

        if !target.award_level {
            return cond;
        }

        if let Some(codes) = &self.award_type_codes {
            cond = cond.add(column("type").is_in(codes.iter().map(String::as_str)));
        }

        for agency_column in [
            "awarding_toptier_agency_name",
            "awarding_subtier_agency_name",
            "funding_toptier_agency_name",
            "funding_subtier_agency_name",
        ] {
            let names: Vec<&str> = self
                .agencies
                .iter()
                .filter(|a| a.column() == agency_column)
                .map(|a| a.name.as_str())
                .collect();
            if !names.is_empty() {
                cond = cond.add(column(agency_column).is_in(names));
            }
        }

        if !self.legal_entities.is_empty() {
            cond = cond.add(column("recipient_id").is_in(self.legal_entities.iter().copied()));
        }

        if let Some(scope) = self.recipient_scope {
            cond = cond.add(scope_condition("recipient_location", scope));
        }
        if !self.recipient_locations.is_empty() {
            cond = cond.add(locations_condition("recipient_location", &self.recipient_locations));
        }
        if let Some(scope) = self.place_of_performance_scope {
            cond = cond.add(scope_condition("pop", scope));
        }
        if !self.place_of_performance_locations.is_empty() {
            cond = cond.add(locations_condition("pop", &self.place_of_performance_locations));
        }

        if !self.award_ids.is_empty() {
            let ids: Vec<&str> = self.award_ids.iter().map(String::as_str).collect();
            cond = cond.add(
                Condition::any()
                    .add(column("piid").is_in(ids.clone()))
                    .add(column("fain").is_in(ids.clone()))
                    .add(column("uri").is_in(ids)),
            );
        }

        for (codes, col) in [
            (&self.program_numbers, "cfda_number"),
            (&self.naics_codes, "naics_code"),
            (&self.psc_codes, "psc_code"),
            (&self.contract_pricing_type_codes, "type_of_contract_pricing"),
            (&self.set_aside_type_codes, "type_set_aside"),
            (&self.extent_competed_type_codes, "extent_competed"),
        ] {
            if let Some(codes) = codes {
                cond = cond.add(column(col).is_in(codes.iter().map(String::as_str)));
            }
        }

        cond
    }
}

fn contains_ignore_case(col: &str, needle: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(column(col))).like(format!("%{}%", needle.to_lowercase()))
}

fn scope_condition(prefix: &str, scope: LocationScope) -> Condition {
    let country = column(&format!("{}_country_code", prefix));
    match scope {
        LocationScope::Domestic => Condition::all().add(country.eq("USA")),
        LocationScope::Foreign => Condition::all().add(country.ne("USA")),
    }
}

/// County and district codes are stored both padded and bare.
fn code_variants(code: &str) -> Vec<String> {
    let bare = code.trim_start_matches('0');
    let mut variants = vec![code.to_string()];
    if !bare.is_empty() && bare != code {
        variants.push(bare.to_string());
    }
    variants
}

fn locations_condition(prefix: &str, locations: &[LocationFilter]) -> Condition {
    let mut any = Condition::any();
    for location in locations {
        let country = column(&format!("{}_country_code", prefix)).eq(location.country.as_str());
        let mut all = Condition::all().add(country);
        if let Some(state) = &location.state {
            all = all.add(column(&format!("{}_state_code", prefix)).eq(state.as_str()));
        }
        if let Some(county) = &location.county {
            let county_col = column(&format!("{}_county_code", prefix));
            all = all.add(county_col.is_in(code_variants(county)));
        }
        if let Some(district) = &location.district {
            let district_col = column(&format!("{}_congressional_code", prefix));
            all = all.add(district_col.is_in(code_variants(district)));
        }
        any = any.add(all);
    }
    any
}

/// Parses `filters` and builds the condition for a universal matview.
pub fn matview_search_filter(
    filters: &Map<String, Value>,
    view: Matview,
) -> AppResult<(SearchFilters, Condition)> {
    let parsed = SearchFilters::parse(filters)?;
    let condition = parsed.to_condition(view.into());
    Ok((parsed, condition))
}

/// Condition over the subaward view; award-level keys are validated but applied
/// through the prime-award subquery by the caller.
pub fn subaward_filter(filters: &Map<String, Value>) -> AppResult<Condition> {
    Ok(SearchFilters::parse(filters)?.to_condition(SUBAWARD_TARGET))
}
