//! Parsing of the directory's employee payload.
//!
//! The payload is a JSON array of objects. A record that lacks a mandatory
//! field is skipped and counted; it never fails the batch.

use serde_json::{Map, Value};
use thiserror::Error;

use coworkers_core::Employee;

use crate::error::DirectoryError;

const UID: &str = "uid";
const FIRST_NAME: &str = "firstName";
const LAST_NAME: &str = "lastName";
const FIRST_NAME_NATIVE: &str = "firstNameNative";
const LAST_NAME_NATIVE: &str = "lastNameNative";
const POSITION: &str = "position";
const EMAIL: &str = "email";
const MOBILE: &str = "mobile";
const SKYPE: &str = "skype";
const PHOTO: &str = "photo";

/// Why one record was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("field {0} is mandatory")]
    MissingField(&'static str),

    #[error("field {0} is not a scalar")]
    NotAScalar(&'static str),
}

/// Employees that parsed, plus how many records were skipped.
#[derive(Debug, Default)]
pub struct ParsedEmployees {
    pub employees: Vec<Employee>,
    pub skipped: usize,
}

/// Parse a directory response body.
pub fn parse_employees(body: &[u8]) -> Result<ParsedEmployees, DirectoryError> {
    let payload: Value =
        serde_json::from_slice(body).map_err(|e| DirectoryError::InvalidPayload(e.to_string()))?;
    let Value::Array(records) = payload else {
        return Err(DirectoryError::InvalidPayload(
            "expected a JSON array".to_string(),
        ));
    };

    let mut parsed = ParsedEmployees::default();
    for (index, record) in records.iter().enumerate() {
        match parse_employee(record) {
            Ok(employee) => parsed.employees.push(employee),
            Err(err) => {
                tracing::debug!("inconsistent data in record {index}: {err}");
                parsed.skipped += 1;
            }
        }
    }
    tracing::debug!(
        "parsed {}, skipped {}",
        parsed.employees.len(),
        parsed.skipped
    );
    Ok(parsed)
}

/// Parse one record. Native names are kept only when both halves are present.
pub fn parse_employee(record: &Value) -> Result<Employee, RecordError> {
    let Value::Object(fields) = record else {
        return Err(RecordError::NotAnObject);
    };

    let uid = mandatory(fields, UID)?;
    let first_name = mandatory(fields, FIRST_NAME)?;
    let last_name = mandatory(fields, LAST_NAME)?;

    let mut employee = Employee::new(uid, first_name, last_name);

    let first_native = optional(fields, FIRST_NAME_NATIVE)?;
    let last_native = optional(fields, LAST_NAME_NATIVE)?;
    if let (Some(first), Some(last)) = (first_native, last_native) {
        employee = employee.with_native_name(first, last);
    }

    Ok(employee
        .with_position(optional(fields, POSITION)?)
        .with_email(optional(fields, EMAIL)?)
        .with_mobile(optional(fields, MOBILE)?)
        .with_skype(optional(fields, SKYPE)?)
        .with_photo_url(optional(fields, PHOTO)?))
}

fn mandatory(fields: &Map<String, Value>, name: &'static str) -> Result<String, RecordError> {
    optional(fields, name)?.ok_or(RecordError::MissingField(name))
}

/// Absent and `null` are the same; numbers and booleans are coerced to text.
fn optional(fields: &Map<String, Value>, name: &'static str) -> Result<Option<String>, RecordError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(RecordError::NotAScalar(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn parses_full_record() {
        let record = json!({
            "uid": "e1",
            "firstName": "Anton",
            "lastName": "Grytsenko",
            "firstNameNative": "Антон",
            "lastNameNative": "Гриценко",
            "position": "Engineer",
            "email": "anton@example.com",
            "mobile": "+380000000000",
            "skype": "anton.g",
            "photo": "http://x/p.png"
        });
        let employee = parse_employee(&record).expect("parse");
        assert_eq!(employee.uid().0, "e1");
        assert_eq!(employee.native_name().map(|n| n.family.as_str()), Some("Гриценко"));
        assert_eq!(employee.position(), Some("Engineer"));
        assert_eq!(employee.skype(), Some("anton.g"));
        assert_eq!(employee.photo_url(), Some("http://x/p.png"));
    }

    #[rstest]
    #[case(json!({"firstName": "A", "lastName": "B"}), RecordError::MissingField("uid"))]
    #[case(json!({"uid": "e1", "lastName": "B"}), RecordError::MissingField("firstName"))]
    #[case(json!({"uid": "e1", "firstName": "A", "lastName": null}), RecordError::MissingField("lastName"))]
    #[case(json!({"uid": {"nested": true}, "firstName": "A", "lastName": "B"}), RecordError::NotAScalar("uid"))]
    #[case(json!("e1"), RecordError::NotAnObject)]
    fn rejects_invalid_records(#[case] record: Value, #[case] expected: RecordError) {
        assert_eq!(parse_employee(&record).unwrap_err(), expected);
    }

    #[test]
    fn half_native_pair_is_ignored() {
        let record = json!({"uid": "e1", "firstName": "A", "lastName": "B", "firstNameNative": "А"});
        let employee = parse_employee(&record).expect("parse");
        assert!(employee.native_name().is_none());
    }

    #[test]
    fn numeric_uid_is_coerced() {
        let record = json!({"uid": 1042, "firstName": "A", "lastName": "B"});
        assert_eq!(parse_employee(&record).unwrap().uid().0, "1042");
    }

    #[test]
    fn bad_records_are_counted_not_fatal() {
        let body = br#"[
            {"uid": "e1", "firstName": "A", "lastName": "B"},
            {"uid": "e2", "firstName": "C"},
            {"uid": "e3", "firstName": "E", "lastName": "F", "photo": ""}
        ]"#;
        let parsed = parse_employees(body).expect("parse");
        assert_eq!(parsed.employees.len(), 2);
        assert_eq!(parsed.skipped, 1);
        assert_eq!(parsed.employees[1].photo_url(), None);
    }

    #[test]
    fn non_array_payload_is_invalid() {
        let err = parse_employees(br#"{"employees": []}"#).unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidPayload(_)));
        let err = parse_employees(b"<html>").unwrap_err();
        assert!(matches!(err, DirectoryError::InvalidPayload(_)));
    }
}
