//! Applicant-PII Formatter (C9).
//!
//! Grounded field-for-field on `applicant_pii_processor.py`: six fixed-length
//! blocks built from field-or-default accessors (spec §9 Design Note -- a
//! missing node yields `""`, never a catch-all swallowed exception), each
//! space-padded or right-truncated to its declared length.

use engine_core::model::{Address, ApplicantPII};

pub const SSN_LEN: usize = 9;
pub const YEAR_OF_BIRTH_LEN: usize = 4;
pub const NAME_PART_LEN: usize = 32;
pub const GENERATION_CODE_LEN: usize = 1;
pub const CONSUMER_NAME_LEN: usize = 129;
pub const ADDRESS_LEN: usize = 97;

/// The six fixed-length strings produced per applicant (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedApplicantPii {
    pub ssn: String,
    pub year_of_birth: String,
    pub consumer_name: String,
    pub current_address: String,
    pub first_previous_address: String,
    pub second_previous_address: String,
}

/// Pads `value` with ASCII spaces up to `len`, or right-truncates if it's
/// longer. Never returns a short string (spec §4.3: "formatting failure for
/// a sub-field yields an empty string of the correct padded length").
pub fn pad_or_truncate(value: &str, len: usize) -> String {
    let char_count = value.chars().count();
    if char_count <= len {
        let mut out = String::with_capacity(len);
        out.push_str(value);
        out.extend(std::iter::repeat(' ').take(len - char_count));
        out
    } else {
        value.chars().take(len).collect()
    }
}

fn year_of_birth(dob: &str) -> String {
    if dob.chars().count() > 3 {
        let chars: Vec<char> = dob.chars().collect();
        chars[chars.len() - 4..].iter().collect()
    } else {
        String::new()
    }
}

fn generation_code(raw: &str) -> String {
    raw.chars().next().map(|c| c.to_uppercase().to_string()).unwrap_or_default()
}

/// Splits a concatenated `line1 + line2` street string into (street_number,
/// street_name). The leading whitespace-delimited token is the street number
/// only if it is entirely ASCII digits; otherwise it stays part of the name.
fn split_street_number(street_address: &str) -> (String, String) {
    let tokens: Vec<&str> = street_address.split_whitespace().collect();
    if tokens.is_empty() {
        return (String::new(), String::new());
    }
    let first = tokens[0];
    if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
        (first.to_string(), tokens[1..].join(" "))
    } else {
        (String::new(), tokens.join(" "))
    }
}

fn format_consumer_name(pii: &ApplicantPII) -> String {
    let name = pii.name.as_ref();
    let last = name.and_then(|n| n.last_name.as_deref()).unwrap_or("");
    let second_last = name.and_then(|n| n.second_last_name.as_deref()).unwrap_or("");
    let first = name.and_then(|n| n.first_name.as_deref()).unwrap_or("");
    let middle = name.and_then(|n| n.middle_name.as_deref()).unwrap_or("");
    let generation = name.and_then(|n| n.generation_code.as_deref()).unwrap_or("");

    pad_or_truncate(last, NAME_PART_LEN)
        + &pad_or_truncate(second_last, NAME_PART_LEN)
        + &pad_or_truncate(first, NAME_PART_LEN)
        + &pad_or_truncate(middle, NAME_PART_LEN)
        + &pad_or_truncate(&generation_code(generation), GENERATION_CODE_LEN)
}

/// Formats one 97-char address block (spec §4.3 "Address 97-char layout").
/// Used for `current_address`, `1st_previous_address` and
/// `2nd_previous_address` -- same layout, three different source addresses.
fn format_address(address: Option<&Address>) -> String {
    let Some(address) = address else {
        return pad_or_truncate("", ADDRESS_LEN);
    };

    let mut street_address = String::new();
    if let Some(line1) = &address.line1 {
        street_address.push_str(line1);
    }
    if let Some(line2) = &address.line2 {
        street_address.push_str(line2);
    }
    let (street_number, street_name) = split_street_number(&street_address);

    let street_suffix = address.street_suffix.as_deref().unwrap_or("");
    let city = address.city.as_deref().unwrap_or("");
    let state = address.state.as_deref().unwrap_or("");
    let unit_id = address.unit_id.as_deref().unwrap_or("");
    let zip_code = address.zip_code.as_deref().unwrap_or("");

    pad_or_truncate(&street_number, 10)
        + &pad_or_truncate(&street_name, 32)
        + &pad_or_truncate(street_suffix, 4)
        + &pad_or_truncate(city, 32)
        + &pad_or_truncate(state, 2)
        + &pad_or_truncate(unit_id, 8)
        + &pad_or_truncate(zip_code, 9)
}

/// Produces the six fixed-length PII fields consumed by the billing record
/// encoder (C8). Missing previous addresses yield all-space blocks rather
/// than shrinking the record.
pub fn format_applicant_pii(pii: &ApplicantPII) -> FormattedApplicantPii {
    let ssn = pad_or_truncate(pii.ssn.as_deref().unwrap_or(""), SSN_LEN);
    let year_of_birth_raw = year_of_birth(pii.dob.as_deref().unwrap_or(""));
    let year_of_birth = pad_or_truncate(&year_of_birth_raw, YEAR_OF_BIRTH_LEN);
    let consumer_name = format_consumer_name(pii);
    let current_address = format_address(pii.inquiry_address.as_ref());
    let first_previous_address = format_address(pii.previous_address.first());
    let second_previous_address = format_address(pii.previous_address.get(1));

    FormattedApplicantPii {
        ssn,
        year_of_birth,
        consumer_name,
        current_address,
        first_previous_address,
        second_previous_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::model::ApplicantName;

    #[test]
    fn pads_short_values_with_spaces() {
        assert_eq!(pad_or_truncate("AB", 5), "AB   ");
    }

    #[test]
    fn truncates_long_values_from_the_right() {
        assert_eq!(pad_or_truncate("ABCDEFGH", 5), "ABCDE");
    }

    #[test]
    fn minimal_pii_yields_blank_blocks_for_missing_fields() {
        let pii = ApplicantPII {
            name: Some(ApplicantName {
                last_name: Some("ANASTASIO".to_string()),
                first_name: Some("JESSE".to_string()),
                ..Default::default()
            }),
            inquiry_address: Some(Address {
                line1: Some("2752 SOLOMONS ISLAND RD".to_string()),
                city: Some("EDGEWATER".to_string()),
                state: Some("MD".to_string()),
                zip_code: Some("210371211".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let formatted = format_applicant_pii(&pii);
        assert_eq!(formatted.ssn, " ".repeat(9));
        assert_eq!(formatted.year_of_birth, " ".repeat(4));
        assert_eq!(formatted.first_previous_address, " ".repeat(97));
        assert_eq!(formatted.second_previous_address, " ".repeat(97));
        assert_eq!(formatted.current_address.len(), 97);
        assert!(formatted.current_address.starts_with("2752      SOLOMONS ISLAND RD"));
        assert!(formatted.current_address.ends_with("MD        210371211"));
    }

    #[test]
    fn full_pii_with_two_previous_addresses() {
        let pii = ApplicantPII {
            name: Some(ApplicantName {
                last_name: Some("BARNETT".to_string()),
                first_name: Some("IRENE".to_string()),
                generation_code: Some("F".to_string()),
                ..Default::default()
            }),
            ssn: Some("666444255".to_string()),
            inquiry_address: Some(Address {
                line1: Some("2752 SOLOMONS ISLAND RD".to_string()),
                city: Some("MD".to_string()),
                ..Default::default()
            }),
            previous_address: vec![
                Address {
                    line1: Some("999 Oak Street".to_string()),
                    city: Some("Orange".to_string()),
                    state: Some("CA".to_string()),
                    zip_code: Some("92544".to_string()),
                    ..Default::default()
                },
                Address {
                    line1: Some("1001 Oak Street".to_string()),
                    line2: Some("Apt 1122".to_string()),
                    city: Some("Orange".to_string()),
                    state: Some("CA".to_string()),
                    zip_code: Some("92544".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let formatted = format_applicant_pii(&pii);
        assert_eq!(formatted.ssn, "666444255");
        assert_eq!(
            formatted.second_previous_address,
            "1001      Oak StreetApt 1122                  Orange                          CA        92544    "
        );
        assert_eq!(formatted.second_previous_address.len(), 97);
    }

    #[test]
    fn non_digit_leading_token_stays_in_street_name() {
        let address = Address {
            line1: Some("PO BOX 123".to_string()),
            ..Default::default()
        };
        let formatted = format_address(Some(&address));
        assert!(formatted.starts_with("          PO BOX 123"));
    }

    #[test]
    fn single_previous_address_leaves_second_blank() {
        let pii = ApplicantPII {
            previous_address: vec![Address {
                line1: Some("5 Main St".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let formatted = format_applicant_pii(&pii);
        assert_eq!(formatted.second_previous_address, " ".repeat(97));
        assert!(formatted.first_previous_address.starts_with("5         Main St"));
    }
}
