//! CSV lead import
//!
//! Turns an uploaded CSV plus a caller-supplied column mapping into lead
//! rows ready for batch insert. Parsing is forgiving where the data is
//! messy (currency strings, stray whitespace, half-filled driver blocks)
//! and strict only where a row is unusable: a row with neither a first nor
//! a last name is skipped and reported, never inserted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::db::NewLead;
use crate::errors::{AppError, Result};

/// Default insurance type applied when the CSV has no mapped type column
/// or the cell is blank.
pub const DEFAULT_INSURANCE_TYPE: &str = "Auto";

/// Lead fields a CSV column can map onto.
///
/// The same field name serves both the lead itself and its additional
/// insureds: a [`ColumnMapping`] with `group: Some(n)` routes the value
/// into the n-th additional insured instead of the top-level lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    FirstName,
    LastName,
    Email,
    Phone,
    InsuranceType,
    Source,
    Notes,
    CurrentCarrier,
    Premium,
    AutoPremium,
    HomePremium,
    SpecialtyPremium,
    DateOfBirth,
    Sr22,
    MilitaryService,
}

/// One CSV column wired to one lead field.
///
/// `group` carries the additional-insured index explicitly; nothing is
/// inferred from the column name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub csv_column: String,
    pub field: LeadField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
}

/// Outcome of an import run: parsed leads plus per-row diagnostics.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    #[serde(skip)]
    pub leads: Vec<NewLead>,
    pub total_rows: usize,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Strip currency formatting and parse a number. `"$1,234.56"` becomes
/// `1234.56`; anything that still fails to parse yields `None` so a bad
/// cell drops the field, not the row.
pub fn sanitize_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Lenient boolean coercion for flag columns
pub fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "yes" | "true" | "1")
}

#[derive(Debug, Default)]
struct InsuredDraft {
    first_name: Option<String>,
    last_name: Option<String>,
    date_of_birth: Option<String>,
    sr22: bool,
    military_service: bool,
}

impl InsuredDraft {
    /// A driver block without any name is treated as unfilled columns,
    /// not as a person.
    fn is_named(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }

    fn into_json(self) -> serde_json::Value {
        serde_json::json!({
            "firstName": self.first_name,
            "lastName": self.last_name,
            "dateOfBirth": self.date_of_birth,
            "sr22": self.sr22,
            "militaryService": self.military_service,
        })
    }
}

/// Parse CSV bytes into lead rows using the supplied column mapping.
///
/// `default_source` stamps every lead with the caller-supplied lead source;
/// a mapped `Source` column takes precedence row by row.
///
/// Row numbers in error messages are 1-based file lines (header is line 1,
/// first data row is line 2), matching what the uploader sees in their
/// spreadsheet.
pub fn parse_leads(
    data: &[u8],
    mappings: &[ColumnMapping],
    pipeline_id: i32,
    status_id: i32,
    file_name: &str,
    default_source: Option<&str>,
) -> Result<ImportReport> {
    if mappings.is_empty() {
        return Err(AppError::validation("Column mapping must not be empty"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| AppError::validation(format!("Unreadable CSV header: {}", e)))?
        .clone();

    // Resolve each mapping to a column index up front; a mapping that names
    // a header the file lacks fails the whole import.
    let mut resolved: Vec<(usize, LeadField, Option<u32>)> = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let idx = headers
            .iter()
            .position(|h| h == mapping.csv_column)
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Mapped column not present in CSV: {}",
                    mapping.csv_column
                ))
            })?;
        resolved.push((idx, mapping.field, mapping.group));
    }

    let mut report = ImportReport::default();

    for (i, record) in reader.records().enumerate() {
        let row_number = i + 2;
        report.total_rows += 1;

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                report.skipped += 1;
                report
                    .errors
                    .push(format!("Row {}: unreadable record ({})", row_number, e));
                continue;
            }
        };

        let mut lead = NewLead {
            pipeline_id,
            status_id,
            insurance_type: DEFAULT_INSURANCE_TYPE.to_string(),
            source: default_source.map(str::to_string),
            import_file_name: Some(file_name.to_string()),
            ..Default::default()
        };
        let mut insureds: BTreeMap<u32, InsuredDraft> = BTreeMap::new();

        for &(idx, field, group) in &resolved {
            let Some(raw) = record.get(idx) else { continue };
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }

            match group {
                None => apply_lead_field(&mut lead, field, value),
                Some(g) => {
                    apply_insured_field(insureds.entry(g).or_default(), field, value);
                }
            }
        }

        if lead.first_name.is_empty() && lead.last_name.is_empty() {
            report.skipped += 1;
            report.errors.push(format!(
                "Row {}: missing both first and last name",
                row_number
            ));
            continue;
        }

        let named: Vec<serde_json::Value> = insureds
            .into_values()
            .filter(InsuredDraft::is_named)
            .map(InsuredDraft::into_json)
            .collect();
        if !named.is_empty() {
            lead.additional_insureds = Some(serde_json::Value::Array(named));
        }

        report.imported += 1;
        report.leads.push(lead);
    }

    Ok(report)
}

fn apply_lead_field(lead: &mut NewLead, field: LeadField, value: &str) {
    match field {
        LeadField::FirstName => lead.first_name = value.to_string(),
        LeadField::LastName => lead.last_name = value.to_string(),
        LeadField::Email => lead.email = Some(value.to_string()),
        LeadField::Phone => lead.phone = Some(value.to_string()),
        LeadField::InsuranceType => lead.insurance_type = value.to_string(),
        LeadField::Source => lead.source = Some(value.to_string()),
        LeadField::Notes => lead.notes = Some(value.to_string()),
        LeadField::CurrentCarrier => lead.current_carrier = Some(value.to_string()),
        LeadField::Premium => lead.premium = sanitize_numeric(value),
        LeadField::AutoPremium => lead.auto_premium = sanitize_numeric(value),
        LeadField::HomePremium => lead.home_premium = sanitize_numeric(value),
        LeadField::SpecialtyPremium => lead.specialty_premium = sanitize_numeric(value),
        // Date/flag fields only make sense inside a driver group
        LeadField::DateOfBirth | LeadField::Sr22 | LeadField::MilitaryService => {}
    }
}

fn apply_insured_field(insured: &mut InsuredDraft, field: LeadField, value: &str) {
    match field {
        LeadField::FirstName => insured.first_name = Some(value.to_string()),
        LeadField::LastName => insured.last_name = Some(value.to_string()),
        LeadField::DateOfBirth => insured.date_of_birth = Some(value.to_string()),
        LeadField::Sr22 => insured.sr22 = parse_flag(value),
        LeadField::MilitaryService => insured.military_service = parse_flag(value),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_mappings() -> Vec<ColumnMapping> {
        vec![
            ColumnMapping {
                csv_column: "First".into(),
                field: LeadField::FirstName,
                group: None,
            },
            ColumnMapping {
                csv_column: "Last".into(),
                field: LeadField::LastName,
                group: None,
            },
            ColumnMapping {
                csv_column: "Premium".into(),
                field: LeadField::Premium,
                group: None,
            },
        ]
    }

    #[test]
    fn test_sanitize_numeric() {
        assert_eq!(sanitize_numeric("$1,234.56"), Some(1234.56));
        assert_eq!(sanitize_numeric("  987 "), Some(987.0));
        assert_eq!(sanitize_numeric("-42.5"), Some(-42.5));
        assert_eq!(sanitize_numeric("n/a"), None);
        assert_eq!(sanitize_numeric(""), None);
        // Too many dots after stripping still fails the parse
        assert_eq!(sanitize_numeric("1.2.3"), None);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("Yes"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("no"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_basic_rows() {
        let csv = b"First,Last,Premium\nAda,Lovelace,\"$1,250.00\"\nAlan,Turing,800\n";
        let report = parse_leads(csv, &base_mappings(), 1, 10, "leads.csv", None).unwrap();

        assert_eq!(report.total_rows, 2);
        assert_eq!(report.imported, 2);
        assert!(report.errors.is_empty());
        assert_eq!(report.leads[0].first_name, "Ada");
        assert_eq!(report.leads[0].premium, Some(1250.0));
        assert_eq!(report.leads[0].insurance_type, DEFAULT_INSURANCE_TYPE);
        assert_eq!(report.leads[0].import_file_name.as_deref(), Some("leads.csv"));
        assert_eq!(report.leads[1].premium, Some(800.0));
    }

    #[test]
    fn test_nameless_row_skipped_with_line_number() {
        let csv = b"First,Last,Premium\n,,100\nGrace,Hopper,200\n";
        let report = parse_leads(csv, &base_mappings(), 1, 10, "leads.csv", None).unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            report.errors,
            vec!["Row 2: missing both first and last name".to_string()]
        );
    }

    #[test]
    fn test_bad_premium_drops_field_not_row() {
        let csv = b"First,Last,Premium\nAda,Lovelace,call me\n";
        let report = parse_leads(csv, &base_mappings(), 1, 10, "leads.csv", None).unwrap();

        assert_eq!(report.imported, 1);
        assert!(report.errors.is_empty());
        assert_eq!(report.leads[0].premium, None);
    }

    #[test]
    fn test_caller_supplied_source_stamped_on_every_lead() {
        let csv = b"First,Last,Premium\nAda,Lovelace,100\nAlan,Turing,200\n";
        let report =
            parse_leads(csv, &base_mappings(), 1, 10, "leads.csv", Some("Web Form")).unwrap();

        assert_eq!(report.leads[0].source.as_deref(), Some("Web Form"));
        assert_eq!(report.leads[1].source.as_deref(), Some("Web Form"));
    }

    #[test]
    fn test_mapped_source_column_overrides_default() {
        let mut mappings = base_mappings();
        mappings.push(ColumnMapping {
            csv_column: "Source".into(),
            field: LeadField::Source,
            group: None,
        });

        // Blank cell keeps the caller-supplied default
        let csv = b"First,Last,Premium,Source\nAda,Lovelace,100,Referral\nAlan,Turing,200,\n";
        let report = parse_leads(csv, &mappings, 1, 10, "leads.csv", Some("Web Form")).unwrap();

        assert_eq!(report.leads[0].source.as_deref(), Some("Referral"));
        assert_eq!(report.leads[1].source.as_deref(), Some("Web Form"));
    }

    #[test]
    fn test_driver_groups() {
        let mut mappings = base_mappings();
        mappings.extend([
            ColumnMapping {
                csv_column: "D1 First".into(),
                field: LeadField::FirstName,
                group: Some(1),
            },
            ColumnMapping {
                csv_column: "D1 SR22".into(),
                field: LeadField::Sr22,
                group: Some(1),
            },
            ColumnMapping {
                csv_column: "D2 First".into(),
                field: LeadField::FirstName,
                group: Some(2),
            },
        ]);

        // Driver 2 columns are blank: the block is dropped, not emitted empty
        let csv = b"First,Last,Premium,D1 First,D1 SR22,D2 First\nAda,Lovelace,100,Mary,yes,\n";
        let report = parse_leads(csv, &mappings, 1, 10, "leads.csv", None).unwrap();

        assert_eq!(report.imported, 1);
        let insureds = report.leads[0].additional_insureds.as_ref().unwrap();
        let arr = insureds.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["firstName"], "Mary");
        assert_eq!(arr[0]["sr22"], true);
    }

    #[test]
    fn test_unknown_mapped_column_fails() {
        let csv = b"First,Last\nAda,Lovelace\n";
        let mappings = vec![ColumnMapping {
            csv_column: "Missing".into(),
            field: LeadField::FirstName,
            group: None,
        }];
        let err = parse_leads(csv, &mappings, 1, 10, "leads.csv", None).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
