//! Download file column names and the view columns they are read from.
//!
//! Each table lists human names in file order. A `None` path marks a column that
//! is part of the published file layout but has no backing column yet; such
//! columns are never written.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    Award,
    Transaction,
    Subaward,
}

/// `D1` is procurement (FPDS), `D2` is financial assistance (FABS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    D1,
    D2,
}

pub type ColumnTable = &'static [(&'static str, Option<&'static str>)];

pub fn column_table(model_type: ModelType, file_type: FileType) -> ColumnTable {
    match (model_type, file_type) {
        (ModelType::Award, FileType::D1) => AWARD_D1,
        (ModelType::Award, FileType::D2) => AWARD_D2,
        (ModelType::Transaction, FileType::D1) => TRANSACTION_D1,
        (ModelType::Transaction, FileType::D2) => TRANSACTION_D2,
        (ModelType::Subaward, FileType::D1) => SUBAWARD_D1,
        (ModelType::Subaward, FileType::D2) => SUBAWARD_D2,
    }
}

const AWARD_D1: ColumnTable = &[
    ("award_id_piid", Some("piid")),
    ("awarding_agency_name", Some("awarding_toptier_agency_name")),
    ("awarding_sub_agency_name", Some("awarding_subtier_agency_name")),
    ("funding_agency_name", Some("funding_toptier_agency_name")),
    ("funding_sub_agency_name", Some("funding_subtier_agency_name")),
    ("recipient_name", Some("recipient_name")),
    ("recipient_duns", Some("recipient_unique_id")),
    ("recipient_parent_duns", Some("parent_recipient_unique_id")),
    ("award_type_code", Some("type")),
    ("award_type", Some("type_description")),
    ("award_description", Some("description")),
    ("total_obligated_amount", Some("total_obligation")),
    ("last_action_date", Some("action_date")),
    ("last_action_date_fiscal_year", Some("fiscal_year")),
    ("period_of_performance_start_date", Some("period_of_performance_start_date")),
    ("period_of_performance_current_end_date", Some("period_of_performance_current_end_date")),
    ("naics_code", Some("naics_code")),
    ("naics_description", Some("naics_description")),
    ("product_or_service_code", Some("psc_code")),
    ("type_of_contract_pricing_code", Some("type_of_contract_pricing")),
    ("type_of_set_aside_code", Some("type_set_aside")),
    ("extent_competed_code", Some("extent_competed")),
    ("recipient_country_code", Some("recipient_location_country_code")),
    ("recipient_state_code", Some("recipient_location_state_code")),
    ("recipient_county_name", Some("recipient_location_county_name")),
    ("recipient_congressional_district", Some("recipient_location_congressional_code")),
    ("primary_place_of_performance_country_code", Some("pop_country_code")),
    ("primary_place_of_performance_state_code", Some("pop_state_code")),
    ("primary_place_of_performance_county_name", Some("pop_county_name")),
    ("primary_place_of_performance_congressional_district", Some("pop_congressional_code")),
    ("highly_compensated_officer_1_name", None),
    ("highly_compensated_officer_1_amount", None),
];

const AWARD_D2: ColumnTable = &[
    ("award_id_fain", Some("fain")),
    ("award_id_uri", Some("uri")),
    ("awarding_agency_name", Some("awarding_toptier_agency_name")),
    ("awarding_sub_agency_name", Some("awarding_subtier_agency_name")),
    ("funding_agency_name", Some("funding_toptier_agency_name")),
    ("funding_sub_agency_name", Some("funding_subtier_agency_name")),
    ("recipient_name", Some("recipient_name")),
    ("recipient_duns", Some("recipient_unique_id")),
    ("recipient_parent_duns", Some("parent_recipient_unique_id")),
    ("award_type_code", Some("type")),
    ("award_type", Some("type_description")),
    ("award_description", Some("description")),
    ("total_obligated_amount", Some("total_obligation")),
    ("face_value_of_loan", Some("face_value_loan_guarantee")),
    ("original_subsidy_cost", Some("original_loan_subsidy_cost")),
    ("cfda_number", Some("cfda_number")),
    ("cfda_title", Some("cfda_title")),
    ("last_action_date", Some("action_date")),
    ("last_action_date_fiscal_year", Some("fiscal_year")),
    ("period_of_performance_start_date", Some("period_of_performance_start_date")),
    ("period_of_performance_current_end_date", Some("period_of_performance_current_end_date")),
    ("recipient_country_code", Some("recipient_location_country_code")),
    ("recipient_state_code", Some("recipient_location_state_code")),
    ("recipient_county_name", Some("recipient_location_county_name")),
    ("recipient_congressional_district", Some("recipient_location_congressional_code")),
    ("primary_place_of_performance_country_code", Some("pop_country_code")),
    ("primary_place_of_performance_state_code", Some("pop_state_code")),
    ("primary_place_of_performance_county_name", Some("pop_county_name")),
    ("primary_place_of_performance_congressional_district", Some("pop_congressional_code")),
    ("business_funds_indicator_code", None),
];

const TRANSACTION_D1: ColumnTable = &[
    ("award_id_piid", Some("piid")),
    ("modification_number", Some("modification_number")),
    ("federal_action_obligation", Some("federal_action_obligation")),
    ("action_date", Some("action_date")),
    ("action_date_fiscal_year", Some("fiscal_year")),
    ("awarding_agency_name", Some("awarding_toptier_agency_name")),
    ("awarding_sub_agency_name", Some("awarding_subtier_agency_name")),
    ("funding_agency_name", Some("funding_toptier_agency_name")),
    ("funding_sub_agency_name", Some("funding_subtier_agency_name")),
    ("recipient_name", Some("recipient_name")),
    ("recipient_duns", Some("recipient_unique_id")),
    ("recipient_parent_duns", Some("parent_recipient_unique_id")),
    ("award_type_code", Some("type")),
    ("award_type", Some("type_description")),
    ("transaction_description", Some("description")),
    ("period_of_performance_start_date", Some("period_of_performance_start_date")),
    ("period_of_performance_current_end_date", Some("period_of_performance_current_end_date")),
    ("naics_code", Some("naics_code")),
    ("naics_description", Some("naics_description")),
    ("product_or_service_code", Some("psc_code")),
    ("type_of_contract_pricing_code", Some("type_of_contract_pricing")),
    ("type_of_set_aside_code", Some("type_set_aside")),
    ("extent_competed_code", Some("extent_competed")),
    ("recipient_country_code", Some("recipient_location_country_code")),
    ("recipient_state_code", Some("recipient_location_state_code")),
    ("recipient_congressional_district", Some("recipient_location_congressional_code")),
    ("primary_place_of_performance_country_code", Some("pop_country_code")),
    ("primary_place_of_performance_state_code", Some("pop_state_code")),
    ("primary_place_of_performance_congressional_district", Some("pop_congressional_code")),
];

const TRANSACTION_D2: ColumnTable = &[
    ("award_id_fain", Some("fain")),
    ("award_id_uri", Some("uri")),
    ("modification_number", Some("modification_number")),
    ("federal_action_obligation", Some("federal_action_obligation")),
    ("face_value_of_loan", Some("face_value_loan_guarantee")),
    ("original_subsidy_cost", Some("original_loan_subsidy_cost")),
    ("action_date", Some("action_date")),
    ("action_date_fiscal_year", Some("fiscal_year")),
    ("awarding_agency_name", Some("awarding_toptier_agency_name")),
    ("awarding_sub_agency_name", Some("awarding_subtier_agency_name")),
    ("funding_agency_name", Some("funding_toptier_agency_name")),
    ("funding_sub_agency_name", Some("funding_subtier_agency_name")),
    ("recipient_name", Some("recipient_name")),
    ("recipient_duns", Some("recipient_unique_id")),
    ("recipient_parent_duns", Some("parent_recipient_unique_id")),
    ("award_type_code", Some("type")),
    ("award_type", Some("type_description")),
    ("transaction_description", Some("description")),
    ("cfda_number", Some("cfda_number")),
    ("cfda_title", Some("cfda_title")),
    ("recipient_country_code", Some("recipient_location_country_code")),
    ("recipient_state_code", Some("recipient_location_state_code")),
    ("recipient_congressional_district", Some("recipient_location_congressional_code")),
    ("primary_place_of_performance_country_code", Some("pop_country_code")),
    ("primary_place_of_performance_state_code", Some("pop_state_code")),
    ("primary_place_of_performance_congressional_district", Some("pop_congressional_code")),
    ("correction_delete_indicator", None),
];

const SUBAWARD_D1: ColumnTable = &[
    ("prime_award_piid", Some("prime_award_piid")),
    ("prime_awardee_name", Some("prime_recipient_name")),
    ("prime_award_awarding_agency_name", Some("awarding_toptier_agency_name")),
    ("prime_award_awarding_sub_agency_name", Some("awarding_subtier_agency_name")),
    ("prime_award_funding_agency_name", Some("funding_toptier_agency_name")),
    ("prime_award_naics_code", Some("naics_code")),
    ("subaward_number", Some("subaward_number")),
    ("subaward_amount", Some("amount")),
    ("subaward_action_date", Some("action_date")),
    ("subaward_action_date_fiscal_year", Some("fiscal_year")),
    ("subaward_description", Some("description")),
    ("subawardee_name", Some("recipient_name")),
    ("subawardee_duns", Some("recipient_unique_id")),
    ("subawardee_parent_duns", Some("parent_recipient_unique_id")),
    ("subawardee_country_code", Some("recipient_location_country_code")),
    ("subawardee_state_code", Some("recipient_location_state_code")),
    ("subawardee_city_name", Some("recipient_location_city_name")),
    ("subaward_primary_place_of_performance_country_code", Some("pop_country_code")),
    ("subaward_primary_place_of_performance_state_code", Some("pop_state_code")),
    ("subaward_primary_place_of_performance_city_name", Some("pop_city_name")),
];

const SUBAWARD_D2: ColumnTable = &[
    ("prime_award_fain", Some("prime_award_fain")),
    ("prime_awardee_name", Some("prime_recipient_name")),
    ("prime_award_awarding_agency_name", Some("awarding_toptier_agency_name")),
    ("prime_award_awarding_sub_agency_name", Some("awarding_subtier_agency_name")),
    ("prime_award_funding_agency_name", Some("funding_toptier_agency_name")),
    ("prime_award_cfda_number", Some("cfda_number")),
    ("subaward_number", Some("subaward_number")),
    ("subaward_amount", Some("amount")),
    ("subaward_action_date", Some("action_date")),
    ("subaward_action_date_fiscal_year", Some("fiscal_year")),
    ("subaward_description", Some("description")),
    ("subawardee_name", Some("recipient_name")),
    ("subawardee_duns", Some("recipient_unique_id")),
    ("subawardee_parent_duns", Some("parent_recipient_unique_id")),
    ("subawardee_country_code", Some("recipient_location_country_code")),
    ("subawardee_state_code", Some("recipient_location_state_code")),
    ("subawardee_city_name", Some("recipient_location_city_name")),
    ("subaward_primary_place_of_performance_country_code", Some("pop_country_code")),
    ("subaward_primary_place_of_performance_state_code", Some("pop_state_code")),
    ("subaward_primary_place_of_performance_city_name", Some("pop_city_name")),
];
