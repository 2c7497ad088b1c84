//! CSV intake parsing for traveler records.
//!
//! Upstream manifests arrive as CSV with a full-name column and dates in
//! either ISO (`2030-01-01`) or day-first (`01/01/2030`) form. Parsing is
//! strict: a malformed row fails the whole import with the offending line
//! number, and the store applies the batch atomically.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::{Its, NewTraveler};

/// Date formats accepted on intake, tried in order.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Parse a date in any accepted intake format.
///
/// # Errors
///
/// Returns [`Error::Validation`] if no format matches.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date);
        }
    }
    Err(Error::Validation(format!("unparsable date: {raw}")))
}

/// Split a full name into (first, middle, last).
///
/// First token is the first name, last token the last name; a middle name
/// is kept only when more than two tokens are present. A single-token name
/// is used for both first and last.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an empty name.
pub fn split_full_name(full: &str) -> Result<(String, Option<String>, String)> {
    let parts: Vec<&str> = full.split_whitespace().collect();
    match parts.as_slice() {
        [] => Err(Error::Validation("full name is empty".into())),
        [only] => Ok(((*only).to_string(), None, (*only).to_string())),
        [first, .., last] => {
            let middle = if parts.len() > 2 {
                Some(parts[1].to_string())
            } else {
                None
            };
            Ok(((*first).to_string(), middle, (*last).to_string()))
        }
    }
}

/// One row of the intake manifest.
///
/// Header names match the upstream export; the historical misspelling of
/// the passport column is accepted as an alias.
#[derive(Debug, Deserialize)]
struct ManifestRow {
    #[serde(rename = "ITS_ID")]
    its: i64,
    #[serde(rename = "Full_Name")]
    full_name: String,
    #[serde(rename = "Date of Birth")]
    date_of_birth: String,
    #[serde(rename = "Passport Number", alias = "Passoport Number")]
    passport_no: String,
    #[serde(rename = "Passport Expiry Date")]
    passport_expiry: String,
    #[serde(rename = "Visa Number", default)]
    visa_no: Option<String>,
}

/// Parse a CSV manifest into traveler records.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming the failing line for malformed
/// rows, missing headers, or invalid field values.
pub fn parse_manifest(bytes: &[u8]) -> Result<Vec<NewTraveler>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut travelers = Vec::new();
    for (index, row) in reader.deserialize::<ManifestRow>().enumerate() {
        let line = index + 2; // header is line 1
        let row = row.map_err(|e| Error::Validation(format!("line {line}: {e}")))?;

        let its = Its::new(row.its)
            .map_err(|e| Error::Validation(format!("line {line}: {e}")))?;
        let (first_name, middle_name, last_name) = split_full_name(&row.full_name)
            .map_err(|e| Error::Validation(format!("line {line}: {e}")))?;
        let date_of_birth = parse_date(&row.date_of_birth)
            .map_err(|e| Error::Validation(format!("line {line}: {e}")))?;
        let passport_expiry = parse_date(&row.passport_expiry)
            .map_err(|e| Error::Validation(format!("line {line}: {e}")))?;

        travelers.push(NewTraveler {
            its,
            first_name,
            middle_name,
            last_name,
            date_of_birth: Some(date_of_birth),
            passport_no: non_empty(Some(row.passport_no)),
            passport_expiry: Some(passport_expiry),
            visa_no: non_empty(row.visa_no),
        });
    }

    Ok(travelers)
}

/// Normalize an optional field: whitespace-only becomes `None`.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn date_accepts_both_formats() {
        let iso = parse_date("2030-01-01").unwrap();
        let dayfirst = parse_date("01/01/2030").unwrap();
        assert_eq!(iso, dayfirst);
        assert!(parse_date("Jan 1 2030").is_err());
    }

    #[test]
    fn name_splitting_rules() {
        assert_eq!(
            split_full_name("Amina Khan").unwrap(),
            ("Amina".to_string(), None, "Khan".to_string())
        );
        assert_eq!(
            split_full_name("Amina Bibi Khan").unwrap(),
            (
                "Amina".to_string(),
                Some("Bibi".to_string()),
                "Khan".to_string()
            )
        );
        assert_eq!(
            split_full_name("Amina").unwrap(),
            ("Amina".to_string(), None, "Amina".to_string())
        );
        assert!(split_full_name("   ").is_err());
    }

    #[test]
    fn manifest_parses_and_normalizes() {
        let csv = b"ITS_ID,Full_Name,Date of Birth,Passport Number,Passport Expiry Date,Visa Number\n\
            12345,Amina Bibi Khan,1990-05-12,P123,2030-01-01,V9\n\
            12346,Yusuf Patel,03/07/1985,P124,15/08/2031,\n";

        let rows = parse_manifest(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].its.get(), 12345);
        assert_eq!(rows[0].middle_name.as_deref(), Some("Bibi"));
        assert_eq!(rows[0].visa_no.as_deref(), Some("V9"));
        assert_eq!(rows[1].middle_name, None);
        assert_eq!(rows[1].visa_no, None);
        assert_eq!(
            rows[1].passport_expiry,
            NaiveDate::from_ymd_opt(2031, 8, 15)
        );
    }

    #[test]
    fn manifest_accepts_legacy_passport_header() {
        let csv = b"ITS_ID,Full_Name,Date of Birth,Passoport Number,Passport Expiry Date,Visa Number\n\
            12345,Amina Khan,1990-05-12,P123,2030-01-01,V9\n";

        let rows = parse_manifest(csv).unwrap();
        assert_eq!(rows[0].passport_no.as_deref(), Some("P123"));
    }

    #[test]
    fn manifest_rejects_bad_row_with_line_number() {
        let csv = b"ITS_ID,Full_Name,Date of Birth,Passport Number,Passport Expiry Date,Visa Number\n\
            12345,Amina Khan,not-a-date,P123,2030-01-01,V9\n";

        let err = parse_manifest(csv).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
