//! Human-readable search field labels mapped onto matview column names.

use once_cell::sync::Lazy;

/// An ordered label → column table.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    entries: Vec<(&'static str, &'static str)>,
}

impl FieldMapping {
    fn new(entries: &[(&'static str, &'static str)]) -> Self {
        Self { entries: entries.to_vec() }
    }

    /// Union of several tables; a label keeps the column of the last table defining it.
    fn merged(parts: &[&FieldMapping]) -> Self {
        let mut entries: Vec<(&'static str, &'static str)> = Vec::new();
        for part in parts {
            for &(label, column) in &part.entries {
                match entries.iter_mut().find(|(l, _)| *l == label) {
                    Some(existing) => existing.1 = column,
                    None => entries.push((label, column)),
                }
            }
        }
        Self { entries }
    }

    pub fn get(&self, label: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, column)| *column)
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(label, _)| *label)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(_, column)| *column)
    }
}

pub static AWARD_CONTRACTS_MAPPING: Lazy<FieldMapping> = Lazy::new(|| {
    FieldMapping::new(&[
        ("Award ID", "piid"),
        ("Recipient Name", "recipient_name"),
        ("Start Date", "period_of_performance_start_date"),
        ("End Date", "period_of_performance_current_end_date"),
        ("Award Amount", "total_obligation"),
        ("Contract Award Type", "type_description"),
        ("Awarding Agency", "awarding_toptier_agency_name"),
        ("Awarding Sub Agency", "awarding_subtier_agency_name"),
        ("Funding Agency", "funding_toptier_agency_name"),
        ("Funding Sub Agency", "funding_subtier_agency_name"),
    ])
});

pub static GRANT_AWARD_MAPPING: Lazy<FieldMapping> = Lazy::new(|| {
    FieldMapping::new(&[
        ("Award ID", "fain"),
        ("Recipient Name", "recipient_name"),
        ("Start Date", "period_of_performance_start_date"),
        ("End Date", "period_of_performance_current_end_date"),
        ("Award Amount", "total_obligation"),
        ("Awarding Agency", "awarding_toptier_agency_name"),
        ("Awarding Sub Agency", "awarding_subtier_agency_name"),
        ("Award Type", "type_description"),
        ("Funding Agency", "funding_toptier_agency_name"),
        ("Funding Sub Agency", "funding_subtier_agency_name"),
    ])
});

pub static LOAN_AWARD_MAPPING: Lazy<FieldMapping> = Lazy::new(|| {
    FieldMapping::new(&[
        ("Award ID", "fain"),
        ("Recipient Name", "recipient_name"),
        ("Issued Date", "action_date"),
        ("Loan Value", "face_value_loan_guarantee"),
        ("Subsidy Cost", "original_loan_subsidy_cost"),
        ("Awarding Agency", "awarding_toptier_agency_name"),
        ("Awarding Sub Agency", "awarding_subtier_agency_name"),
        ("Funding Agency", "funding_toptier_agency_name"),
        ("Funding Sub Agency", "funding_subtier_agency_name"),
    ])
});

pub static DIRECT_PAYMENT_AWARD_MAPPING: Lazy<FieldMapping> =
    Lazy::new(|| GRANT_AWARD_MAPPING.clone());

pub static OTHER_AWARD_MAPPING: Lazy<FieldMapping> = Lazy::new(|| GRANT_AWARD_MAPPING.clone());

pub static NON_LOAN_ASSISTANCE_AWARD_MAPPING: Lazy<FieldMapping> = Lazy::new(|| {
    FieldMapping::merged(&[
        &*GRANT_AWARD_MAPPING,
        &*DIRECT_PAYMENT_AWARD_MAPPING,
        &*OTHER_AWARD_MAPPING,
    ])
});

pub static TRANSACTION_CONTRACTS_MAPPING: Lazy<FieldMapping> = Lazy::new(|| {
    FieldMapping::new(&[
        ("Award ID", "piid"),
        ("Mod", "modification_number"),
        ("Recipient Name", "recipient_name"),
        ("Action Date", "action_date"),
        ("Transaction Amount", "federal_action_obligation"),
        ("Award Type", "type_description"),
        ("Awarding Agency", "awarding_toptier_agency_name"),
        ("Awarding Sub Agency", "awarding_subtier_agency_name"),
        ("Funding Agency", "funding_toptier_agency_name"),
        ("Funding Sub Agency", "funding_subtier_agency_name"),
    ])
});

pub static GRANT_TRANSACTION_MAPPING: Lazy<FieldMapping> = Lazy::new(|| {
    FieldMapping::new(&[
        ("Award ID", "fain"),
        ("Mod", "modification_number"),
        ("Recipient Name", "recipient_name"),
        ("Action Date", "action_date"),
        ("Transaction Amount", "federal_action_obligation"),
        ("Award Type", "type_description"),
        ("Awarding Agency", "awarding_toptier_agency_name"),
        ("Awarding Sub Agency", "awarding_subtier_agency_name"),
        ("Funding Agency", "funding_toptier_agency_name"),
        ("Funding Sub Agency", "funding_subtier_agency_name"),
    ])
});

pub static LOAN_TRANSACTION_MAPPING: Lazy<FieldMapping> = Lazy::new(|| {
    FieldMapping::new(&[
        ("Award ID", "fain"),
        ("Mod", "modification_number"),
        ("Recipient Name", "recipient_name"),
        ("Action Date", "action_date"),
        ("Issued Date", "action_date"),
        ("Loan Value", "face_value_loan_guarantee"),
        ("Subsidy Cost", "original_loan_subsidy_cost"),
        ("Awarding Agency", "awarding_toptier_agency_name"),
        ("Awarding Sub Agency", "awarding_subtier_agency_name"),
        ("Funding Agency", "funding_toptier_agency_name"),
        ("Funding Sub Agency", "funding_subtier_agency_name"),
    ])
});

pub static DIRECT_PAYMENT_TRANSACTION_MAPPING: Lazy<FieldMapping> =
    Lazy::new(|| GRANT_TRANSACTION_MAPPING.clone());

pub static OTHER_TRANSACTION_MAPPING: Lazy<FieldMapping> =
    Lazy::new(|| GRANT_TRANSACTION_MAPPING.clone());

pub static NON_LOAN_ASSISTANCE_TRANSACTION_MAPPING: Lazy<FieldMapping> = Lazy::new(|| {
    FieldMapping::merged(&[
        &*GRANT_TRANSACTION_MAPPING,
        &*DIRECT_PAYMENT_TRANSACTION_MAPPING,
        &*OTHER_TRANSACTION_MAPPING,
    ])
});

/// The two universal matviews search endpoints read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matview {
    Award,
    Transaction,
}

impl Matview {
    /// Column reported as `internal_id`.
    pub fn id_column(self) -> &'static str {
        match self {
            Matview::Award => "award_id",
            Matview::Transaction => "transaction_id",
        }
    }

    pub fn contracts_mapping(self) -> &'static FieldMapping {
        match self {
            Matview::Award => &AWARD_CONTRACTS_MAPPING,
            Matview::Transaction => &TRANSACTION_CONTRACTS_MAPPING,
        }
    }

    pub fn loan_mapping(self) -> &'static FieldMapping {
        match self {
            Matview::Award => &LOAN_AWARD_MAPPING,
            Matview::Transaction => &LOAN_TRANSACTION_MAPPING,
        }
    }

    pub fn non_loan_assistance_mapping(self) -> &'static FieldMapping {
        match self {
            Matview::Award => &NON_LOAN_ASSISTANCE_AWARD_MAPPING,
            Matview::Transaction => &NON_LOAN_ASSISTANCE_TRANSACTION_MAPPING,
        }
    }
}
