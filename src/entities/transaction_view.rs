use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per transaction (FPDS or FABS action) with its award's descriptive data.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "universal_transaction_view")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub transaction_id: i64,
    pub award_id: i64,
    pub modification_number: Option<String>,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub award_type: Option<String>,
    pub type_description: Option<String>,
    pub is_fpds: bool,
    pub piid: Option<String>,
    pub fain: Option<String>,
    pub uri: Option<String>,
    pub description: Option<String>,
    pub action_date: Option<Date>,
    pub fiscal_year: Option<i32>,
    pub period_of_performance_start_date: Option<Date>,
    pub period_of_performance_current_end_date: Option<Date>,
    pub federal_action_obligation: Option<f64>,
    pub face_value_loan_guarantee: Option<f64>,
    pub original_loan_subsidy_cost: Option<f64>,
    pub recipient_id: Option<i32>,
    pub recipient_name: Option<String>,
    pub recipient_unique_id: Option<String>,
    pub parent_recipient_unique_id: Option<String>,
    pub awarding_toptier_agency_name: Option<String>,
    pub awarding_toptier_agency_abbreviation: Option<String>,
    pub awarding_subtier_agency_name: Option<String>,
    pub awarding_subtier_agency_abbreviation: Option<String>,
    pub funding_toptier_agency_name: Option<String>,
    pub funding_toptier_agency_abbreviation: Option<String>,
    pub funding_subtier_agency_name: Option<String>,
    pub funding_subtier_agency_abbreviation: Option<String>,
    pub cfda_number: Option<String>,
    pub cfda_title: Option<String>,
    pub naics_code: Option<String>,
    pub naics_description: Option<String>,
    pub psc_code: Option<String>,
    pub type_of_contract_pricing: Option<String>,
    pub type_set_aside: Option<String>,
    pub extent_competed: Option<String>,
    pub recipient_location_country_code: Option<String>,
    pub recipient_location_state_code: Option<String>,
    pub recipient_location_county_code: Option<String>,
    pub recipient_location_county_name: Option<String>,
    pub recipient_location_congressional_code: Option<String>,
    pub pop_country_code: Option<String>,
    pub pop_state_code: Option<String>,
    pub pop_county_code: Option<String>,
    pub pop_county_name: Option<String>,
    pub pop_congressional_code: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
