use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "subaward_view")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub subaward_id: i64,
    pub award_id: i64,                      // prime award
    pub subaward_number: Option<String>,
    pub amount: Option<f64>,
    pub action_date: Option<Date>,
    pub fiscal_year: Option<i32>,
    pub description: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_unique_id: Option<String>,
    pub parent_recipient_unique_id: Option<String>,
    pub prime_award_piid: Option<String>,
    pub prime_award_fain: Option<String>,
    pub prime_recipient_name: Option<String>,
    pub awarding_toptier_agency_name: Option<String>,
    pub awarding_subtier_agency_name: Option<String>,
    pub funding_toptier_agency_name: Option<String>,
    pub cfda_number: Option<String>,
    pub naics_code: Option<String>,
    pub recipient_location_country_code: Option<String>,
    pub recipient_location_state_code: Option<String>,
    pub recipient_location_city_name: Option<String>,
    pub pop_country_code: Option<String>,
    pub pop_state_code: Option<String>,
    pub pop_city_name: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
