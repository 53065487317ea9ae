//! Award type codes as reported by FPDS (contracts) and FABS (assistance).

pub const CONTRACT_TYPES: &[(&str, &str)] = &[
    ("A", "BPA Call"),
    ("B", "Purchase Order"),
    ("C", "Delivery Order"),
    ("D", "Definitive Contract"),
];

pub const GRANT_TYPES: &[(&str, &str)] = &[
    ("02", "Block Grant"),
    ("03", "Formula Grant"),
    ("04", "Project Grant"),
    ("05", "Cooperative Agreement"),
];

pub const DIRECT_PAYMENT_TYPES: &[(&str, &str)] = &[
    ("06", "Direct Payment for Specified Use"),
    ("10", "Direct Payment with Unrestricted Use"),
];

pub const LOAN_TYPES: &[(&str, &str)] = &[
    ("07", "Direct Loan"),
    ("08", "Guaranteed/Insured Loan"),
];

pub const OTHER_TYPES: &[(&str, &str)] = &[
    ("09", "Insurance"),
    ("11", "Other Financial Assistance"),
];

/// Sentinel sent by clients whose type selections do not overlap.
pub const NO_INTERSECTION: &str = "no intersection";

/// The family an award type code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardKind {
    Contract,
    Grant,
    DirectPayment,
    Loan,
    Other,
}

impl AwardKind {
    pub fn codes(self) -> &'static [(&'static str, &'static str)] {
        match self {
            AwardKind::Contract => CONTRACT_TYPES,
            AwardKind::Grant => GRANT_TYPES,
            AwardKind::DirectPayment => DIRECT_PAYMENT_TYPES,
            AwardKind::Loan => LOAN_TYPES,
            AwardKind::Other => OTHER_TYPES,
        }
    }

    pub fn of_code(code: &str) -> Option<AwardKind> {
        [
            AwardKind::Contract,
            AwardKind::Grant,
            AwardKind::DirectPayment,
            AwardKind::Loan,
            AwardKind::Other,
        ]
        .into_iter()
        .find(|kind| kind.codes().iter().any(|(c, _)| *c == code))
    }
}

fn contains(table: &[(&str, &str)], code: &str) -> bool {
    table.iter().any(|(c, _)| *c == code)
}

pub fn is_contract(code: &str) -> bool {
    contains(CONTRACT_TYPES, code)
}

pub fn is_loan(code: &str) -> bool {
    contains(LOAN_TYPES, code)
}

/// Grants, direct payments and other assistance.
pub fn is_non_loan_assistance(code: &str) -> bool {
    contains(GRANT_TYPES, code)
        || contains(DIRECT_PAYMENT_TYPES, code)
        || contains(OTHER_TYPES, code)
}

pub fn loan_codes() -> Vec<&'static str> {
    LOAN_TYPES.iter().map(|(c, _)| *c).collect()
}

/// Every known award type code.
pub fn all_codes() -> Vec<&'static str> {
    CONTRACT_TYPES
        .iter()
        .chain(GRANT_TYPES)
        .chain(DIRECT_PAYMENT_TYPES)
        .chain(LOAN_TYPES)
        .chain(OTHER_TYPES)
        .map(|(c, _)| *c)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_belong_to_exactly_one_family() {
        for code in all_codes() {
            let families = [is_contract(code), is_loan(code), is_non_loan_assistance(code)];
            assert_eq!(families.iter().filter(|f| **f).count(), 1, "code {code}");
        }
        assert_eq!(AwardKind::of_code("07"), Some(AwardKind::Loan));
        assert_eq!(AwardKind::of_code("10"), Some(AwardKind::DirectPayment));
        assert_eq!(AwardKind::of_code("IDV_A"), None);
    }
}
