//! Field-level validation run before anything is submitted.
//!
//! Problems are collected into [`ValidationErrors`] and shown per field;
//! nothing in here returns `Err`.

use crate::constants::Condition;
use crate::schema::{ColumnDef, ColumnKind, Schema};
use crate::value::{lookup_present, Record, Value};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9()\-\s]{7,20}$").expect("phone pattern"));
static EMPLOYEE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^EMP-[0-9]{3,6}$").expect("employee id pattern"));
static ASSET_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,5}-[0-9]{3,8}$").expect("asset tag pattern"));
static SERIAL_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-]{4,30}$").expect("serial number pattern"));
static MAC_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}[:\-]){5}[0-9A-Fa-f]{2}$").expect("mac address pattern")
});
static LICENSE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]{4,6}(-[A-Za-z0-9]{4,6})+$").expect("license key pattern")
});

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MIN_RETURN_NOTES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFormat {
    Email,
    Phone,
    EmployeeId,
    AssetTag,
    SerialNumber,
    MacAddress,
    LicenseKey,
}

impl FieldFormat {
    pub fn is_valid(self, input: &str) -> bool {
        let input = input.trim();
        match self {
            FieldFormat::Email => EMAIL.is_match(input),
            FieldFormat::Phone => {
                PHONE.is_match(input) && input.chars().filter(char::is_ascii_digit).count() >= 7
            }
            FieldFormat::EmployeeId => EMPLOYEE_ID.is_match(input),
            FieldFormat::AssetTag => ASSET_TAG.is_match(input),
            FieldFormat::SerialNumber => SERIAL_NUMBER.is_match(input),
            FieldFormat::MacAddress => MAC_ADDRESS.is_match(input),
            FieldFormat::LicenseKey => LICENSE_KEY.is_match(input),
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            FieldFormat::Email => "must be a valid email address",
            FieldFormat::Phone => "must be a valid phone number",
            FieldFormat::EmployeeId => "must look like EMP-001",
            FieldFormat::AssetTag => "must look like HW-0001",
            FieldFormat::SerialNumber => "must be 4-30 letters, digits or dashes",
            FieldFormat::MacAddress => "must look like 00:1A:2B:3C:4D:5E",
            FieldFormat::LicenseKey => "must be dash-separated groups of 4-6 characters",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }
}

/// Checks one value against its column definition. Returns the message to
/// show next to the field, if any.
pub fn check_value(column: &ColumnDef, value: Option<&Value>) -> Option<String> {
    let text = value.and_then(Value::as_text).filter(|t| !t.trim().is_empty());

    let Some(text) = text else {
        return column
            .required
            .then(|| format!("{} is required", column.label));
    };
    let value = value?;

    match column.kind {
        ColumnKind::Text => None,
        ColumnKind::Number => value
            .as_number()
            .is_none()
            .then(|| format!("{} must be a number", column.label)),
        ColumnKind::Date => value
            .as_date()
            .is_none()
            .then(|| format!("{} must be a valid date", column.label)),
        ColumnKind::Format(format) => (!format.is_valid(&text))
            .then(|| format!("{} {}", column.label, format.hint())),
        ColumnKind::Enum(options) => {
            let needle = text.trim().to_lowercase();
            (!options.contains(&needle.as_str()))
                .then(|| format!("{} must be one of: {}", column.label, options.join(", ")))
        }
    }
}

pub fn validate_record(record: &Record, schema: &Schema) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    for column in schema.columns {
        if let Some(message) = check_value(column, lookup_present(record, column.key)) {
            errors.add(column.key, message);
        }
    }

    for (start_key, end_key) in schema.date_order {
        let start = lookup_present(record, start_key).and_then(Value::as_date);
        let end = lookup_present(record, end_key).and_then(Value::as_date);
        if let (Some(start), Some(end)) = (start, end) {
            if !is_date_order_valid(start, end) {
                let label = |key: &str| schema.column(key).map_or(key.to_string(), |c| c.label.to_string());
                errors.add(
                    *end_key,
                    format!("{} must be on or after {}", label(*end_key), label(*start_key)),
                );
            }
        }
    }

    errors
}

pub fn is_date_order_valid(start: NaiveDate, end: NaiveDate) -> bool {
    end >= start
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthLevel {
    VeryWeak,
    Weak,
    Fair,
    Good,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    pub score: u8,
    pub level: StrengthLevel,
    pub feedback: Vec<&'static str>,
    pub meets_min_length: bool,
}

impl PasswordStrength {
    pub fn is_acceptable(&self) -> bool {
        self.meets_min_length && self.level >= StrengthLevel::Good
    }
}

pub fn score_password(password: &str) -> PasswordStrength {
    let len = password.chars().count();
    let checks: [(bool, &'static str); 6] = [
        (len >= MIN_PASSWORD_LENGTH, "Use at least 8 characters"),
        (len >= 12, "Use 12 or more characters for a stronger password"),
        (password.chars().any(char::is_lowercase), "Add a lowercase letter"),
        (password.chars().any(char::is_uppercase), "Add an uppercase letter"),
        (password.chars().any(|c| c.is_ascii_digit()), "Add a number"),
        (
            password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()),
            "Add a symbol",
        ),
    ];

    let score = checks.iter().filter(|(ok, _)| *ok).count() as u8;
    let feedback = checks
        .iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, hint)| *hint)
        .collect();

    let level = match score {
        0 | 1 => StrengthLevel::VeryWeak,
        2 => StrengthLevel::Weak,
        3 => StrengthLevel::Fair,
        4 => StrengthLevel::Good,
        _ => StrengthLevel::Strong,
    };

    PasswordStrength {
        score,
        level,
        feedback,
        meets_min_length: len >= MIN_PASSWORD_LENGTH,
    }
}

/// What we know about an assignment when someone tries to return it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentInfo {
    pub assigned_date: Option<NaiveDate>,
    pub status: String,
}

impl AssignmentInfo {
    pub fn from_record(record: &Record) -> Self {
        Self {
            assigned_date: lookup_present(record, "assignedDate").and_then(Value::as_date),
            status: lookup_present(record, "status")
                .and_then(Value::as_text)
                .unwrap_or_default()
                .to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub return_date: Option<NaiveDate>,
    pub condition: Option<Condition>,
    pub notes: String,
}

pub fn validate_return(
    assignment: &AssignmentInfo,
    request: &ReturnRequest,
    today: NaiveDate,
) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    if assignment.status == "returned" {
        errors.add("status", "This assignment has already been returned");
    }

    match request.return_date {
        None => errors.add("returnDate", "Return date is required"),
        Some(date) if date > today => errors.add("returnDate", "Return date cannot be in the future"),
        Some(date) => {
            if let Some(assigned) = assignment.assigned_date {
                if !is_date_order_valid(assigned, date) {
                    errors.add(
                        "returnDate",
                        format!("Return date cannot be before the assignment date ({})", assigned),
                    );
                }
            }
        }
    }

    match request.condition {
        None => errors.add("condition", "Condition is required"),
        Some(condition) if condition.needs_notes() => {
            if request.notes.trim().chars().count() < MIN_RETURN_NOTES {
                errors.add(
                    "notes",
                    format!(
                        "Describe the {} condition in at least {} characters",
                        condition.as_str(),
                        MIN_RETURN_NOTES
                    ),
                );
            }
        }
        Some(_) => {}
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, HARDWARE, SOFTWARE};
    use crate::value::record;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_formats() {
        assert!(FieldFormat::Email.is_valid("jane.doe@example.com"));
        assert!(!FieldFormat::Email.is_valid("jane.doe@example"));
        assert!(FieldFormat::Phone.is_valid("+1 (555) 123-4567"));
        assert!(!FieldFormat::Phone.is_valid("12-34"));
        assert!(!FieldFormat::Phone.is_valid("(--)(--)(--)"));
        assert!(FieldFormat::EmployeeId.is_valid("EMP-0042"));
        assert!(!FieldFormat::EmployeeId.is_valid("E-42"));
        assert!(FieldFormat::AssetTag.is_valid("HW-000123"));
        assert!(!FieldFormat::AssetTag.is_valid("hw-000123"));
        assert!(FieldFormat::SerialNumber.is_valid("5CG1234XYZ"));
        assert!(!FieldFormat::SerialNumber.is_valid("abc"));
        assert!(FieldFormat::MacAddress.is_valid("00:1a:2B:3c:4D:5e"));
        assert!(!FieldFormat::MacAddress.is_valid("00:1a:2B:3c:4D"));
        assert!(FieldFormat::LicenseKey.is_valid("ABCD-1234-EFGH"));
        assert!(!FieldFormat::LicenseKey.is_valid("ABCD"));
    }

    #[test]
    fn test_check_value_required_and_optional() {
        let required = ColumnDef::required("name", "Name", ColumnKind::Text);
        assert_eq!(check_value(&required, None).unwrap(), "Name is required");
        assert_eq!(
            check_value(&required, Some(&Value::from("   "))).unwrap(),
            "Name is required"
        );

        let optional = ColumnDef::new("cost", "Cost", ColumnKind::Number);
        assert!(check_value(&optional, None).is_none());
        assert!(check_value(&optional, Some(&Value::from("12.50"))).is_none());
        assert_eq!(
            check_value(&optional, Some(&Value::from("cheap"))).unwrap(),
            "Cost must be a number"
        );
    }

    #[test]
    fn test_enum_is_case_insensitive() {
        let col = ColumnDef::new("status", "Status", ColumnKind::Enum(&["active", "retired"]));
        assert!(check_value(&col, Some(&Value::from("Active"))).is_none());
        assert!(check_value(&col, Some(&Value::from("gone"))).is_some());
    }

    #[test]
    fn test_validate_hardware_record() {
        let rec = record(&[
            ("assetTag", "HW-1001".into()),
            ("name", "ThinkPad X1".into()),
            ("category", "laptop".into()),
            ("purchaseDate", "2024-02-01".into()),
            ("warrantyExpiry", "2023-02-01".into()),
            ("purchasePrice", "n/a".into()),
        ]);
        let errors = validate_record(&rec, &HARDWARE);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get("warrantyExpiry").unwrap(),
            "Warranty Expiry must be on or after Purchase Date"
        );
        assert!(errors.get("purchasePrice").is_some());
    }

    #[test]
    fn test_validate_software_missing_required() {
        let rec = record(&[("name", "Office".into())]);
        let errors = validate_record(&rec, &SOFTWARE);
        assert!(errors.get("vendor").is_some());
        assert!(errors.get("totalLicenses").is_some());
        assert!(errors.get("name").is_none());
    }

    #[test]
    fn test_password_strength() {
        let weak = score_password("abc");
        assert_eq!(weak.level, StrengthLevel::VeryWeak);
        assert!(!weak.is_acceptable());
        assert!(weak.feedback.contains(&"Use at least 8 characters"));

        let good = score_password("Password1");
        assert_eq!(good.score, 4);
        assert!(good.is_acceptable());

        let strong = score_password("Correct-Horse-42");
        assert_eq!(strong.score, 6);
        assert_eq!(strong.level, StrengthLevel::Strong);
        assert!(strong.feedback.is_empty());

        let short_but_varied = score_password("aB3$");
        assert_eq!(short_but_varied.level, StrengthLevel::Good);
        assert!(!short_but_varied.is_acceptable());
    }

    #[test]
    fn test_return_validation() {
        let assignment = AssignmentInfo {
            assigned_date: Some(ymd(2024, 5, 10)),
            status: "active".into(),
        };
        let today = ymd(2024, 6, 1);

        let ok = ReturnRequest {
            return_date: Some(ymd(2024, 5, 31)),
            condition: Some(Condition::Good),
            notes: String::new(),
        };
        assert!(validate_return(&assignment, &ok, today).is_empty());

        let early = ReturnRequest {
            return_date: Some(ymd(2024, 5, 1)),
            ..ok.clone()
        };
        assert!(validate_return(&assignment, &early, today).get("returnDate").is_some());

        let future = ReturnRequest {
            return_date: Some(ymd(2024, 6, 2)),
            ..ok.clone()
        };
        assert_eq!(
            validate_return(&assignment, &future, today).get("returnDate").unwrap(),
            "Return date cannot be in the future"
        );

        let damaged = ReturnRequest {
            condition: Some(Condition::Damaged),
            notes: "cracked".into(),
            ..ok.clone()
        };
        assert!(validate_return(&assignment, &damaged, today).get("notes").is_some());

        let empty = ReturnRequest {
            return_date: None,
            condition: None,
            notes: String::new(),
        };
        assert_eq!(validate_return(&assignment, &empty, today).len(), 2);
    }

    #[test]
    fn test_cannot_return_twice() {
        let rec = record(&[("assignedDate", "2024-01-02".into()), ("status", "Returned".into())]);
        let info = AssignmentInfo::from_record(&rec);
        assert_eq!(info.assigned_date, Some(ymd(2024, 1, 2)));
        let req = ReturnRequest {
            return_date: Some(ymd(2024, 2, 1)),
            condition: Some(Condition::Fair),
            notes: String::new(),
        };
        assert!(validate_return(&info, &req, ymd(2024, 3, 1)).get("status").is_some());
    }
}
