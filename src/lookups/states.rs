//! State / territory postal codes, names and FIPS codes used by the map endpoints.

pub struct StateInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub fips: &'static str,
}

const STATES: &[StateInfo] = &[
    StateInfo { code: "AL", name: "ALABAMA", fips: "01" },
    StateInfo { code: "AK", name: "ALASKA", fips: "02" },
    StateInfo { code: "AZ", name: "ARIZONA", fips: "04" },
    StateInfo { code: "AR", name: "ARKANSAS", fips: "05" },
    StateInfo { code: "CA", name: "CALIFORNIA", fips: "06" },
    StateInfo { code: "CO", name: "COLORADO", fips: "08" },
    StateInfo { code: "CT", name: "CONNECTICUT", fips: "09" },
    StateInfo { code: "DE", name: "DELAWARE", fips: "10" },
    StateInfo { code: "DC", name: "DISTRICT OF COLUMBIA", fips: "11" },
    StateInfo { code: "FL", name: "FLORIDA", fips: "12" },
    StateInfo { code: "GA", name: "GEORGIA", fips: "13" },
    StateInfo { code: "HI", name: "HAWAII", fips: "15" },
    StateInfo { code: "ID", name: "IDAHO", fips: "16" },
    StateInfo { code: "IL", name: "ILLINOIS", fips: "17" },
    StateInfo { code: "IN", name: "INDIANA", fips: "18" },
    StateInfo { code: "IA", name: "IOWA", fips: "19" },
    StateInfo { code: "KS", name: "KANSAS", fips: "20" },
    StateInfo { code: "KY", name: "KENTUCKY", fips: "21" },
    StateInfo { code: "LA", name: "LOUISIANA", fips: "22" },
    StateInfo { code: "ME", name: "MAINE", fips: "23" },
    StateInfo { code: "MD", name: "MARYLAND", fips: "24" },
    StateInfo { code: "MA", name: "MASSACHUSETTS", fips: "25" },
    StateInfo { code: "MI", name: "MICHIGAN", fips: "26" },
    StateInfo { code: "MN", name: "MINNESOTA", fips: "27" },
    StateInfo { code: "MS", name: "MISSISSIPPI", fips: "28" },
    StateInfo { code: "MO", name: "MISSOURI", fips: "29" },
    StateInfo { code: "MT", name: "MONTANA", fips: "30" },
    StateInfo { code: "NE", name: "NEBRASKA", fips: "31" },
    StateInfo { code: "NV", name: "NEVADA", fips: "32" },
    StateInfo { code: "NH", name: "NEW HAMPSHIRE", fips: "33" },
    StateInfo { code: "NJ", name: "NEW JERSEY", fips: "34" },
    StateInfo { code: "NM", name: "NEW MEXICO", fips: "35" },
    StateInfo { code: "NY", name: "NEW YORK", fips: "36" },
    StateInfo { code: "NC", name: "NORTH CAROLINA", fips: "37" },
    StateInfo { code: "ND", name: "NORTH DAKOTA", fips: "38" },
    StateInfo { code: "OH", name: "OHIO", fips: "39" },
    StateInfo { code: "OK", name: "OKLAHOMA", fips: "40" },
    StateInfo { code: "OR", name: "OREGON", fips: "41" },
    StateInfo { code: "PA", name: "PENNSYLVANIA", fips: "42" },
    StateInfo { code: "RI", name: "RHODE ISLAND", fips: "44" },
    StateInfo { code: "SC", name: "SOUTH CAROLINA", fips: "45" },
    StateInfo { code: "SD", name: "SOUTH DAKOTA", fips: "46" },
    StateInfo { code: "TN", name: "TENNESSEE", fips: "47" },
    StateInfo { code: "TX", name: "TEXAS", fips: "48" },
    StateInfo { code: "UT", name: "UTAH", fips: "49" },
    StateInfo { code: "VT", name: "VERMONT", fips: "50" },
    StateInfo { code: "VA", name: "VIRGINIA", fips: "51" },
    StateInfo { code: "WA", name: "WASHINGTON", fips: "53" },
    StateInfo { code: "WV", name: "WEST VIRGINIA", fips: "54" },
    StateInfo { code: "WI", name: "WISCONSIN", fips: "55" },
    StateInfo { code: "WY", name: "WYOMING", fips: "56" },
    StateInfo { code: "AS", name: "AMERICAN SAMOA", fips: "60" },
    StateInfo { code: "GU", name: "GUAM", fips: "66" },
    StateInfo { code: "MP", name: "NORTHERN MARIANA ISLANDS", fips: "69" },
    StateInfo { code: "PR", name: "PUERTO RICO", fips: "72" },
    StateInfo { code: "VI", name: "VIRGIN ISLANDS", fips: "78" },
];

pub fn by_code(code: &str) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| s.code.eq_ignore_ascii_case(code))
}

pub fn by_fips(fips: &str) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| s.fips == fips)
}

/// Zero-pads a normalised county (3) or congressional district (2) code.
pub fn pad_code(geo_layer: &str, code: f64) -> String {
    let code = code as u64;
    match geo_layer {
        "county" => format!("{:03}", code),
        _ => format!("{:02}", code),
    }
}

/// "NEW YORK" -> "New York", "prince george's" -> "Prince George's"
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = ch != '\'';
        }
    }
    out
}
