use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A saved subsidy deadline. `id` is the backend-generated key and the only
/// handle used for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub subsidy_name: String,
    pub deadline: NaiveDate,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewDeadline {
    pub username: String,
    pub subsidy_name: String,
    pub deadline: NaiveDate,
}

const DEADLINE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%B %d, %Y", "%d %B %Y"];

/// Parse a user-entered deadline. Accepts ISO dates as well as the
/// "May 31, 2024" and "31 May 2024" forms printed on subsidy forms.
pub fn parse_deadline_input(input: &str) -> Result<NaiveDate, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ValidationError::MissingDeadline);
    }
    DEADLINE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .ok_or_else(|| ValidationError::InvalidDeadline(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_iso_and_form_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        assert_eq!(parse_deadline_input("2024-05-31"), Ok(expected));
        assert_eq!(parse_deadline_input("May 31, 2024"), Ok(expected));
        assert_eq!(parse_deadline_input("31 May 2024"), Ok(expected));
    }

    #[test]
    fn test_blank_deadline_is_missing() {
        assert_eq!(parse_deadline_input("  "), Err(ValidationError::MissingDeadline));
    }

    #[test]
    fn test_garbage_deadline_is_invalid() {
        assert_eq!(
            parse_deadline_input("next week"),
            Err(ValidationError::InvalidDeadline("next week".to_string()))
        );
    }

    #[test]
    fn test_record_reads_backend_shape() {
        let record: DeadlineRecord = serde_json::from_value(json!({
            "_id": "65f1c0ffee",
            "username": "ramesh",
            "subsidy_name": "PM-KISAN",
            "deadline": "2024-05-31",
            "created_at": "2024-03-01T10:00:00"
        }))
        .unwrap();
        assert_eq!(record.id, "65f1c0ffee");
        assert_eq!(record.deadline, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
    }

    #[test]
    fn test_new_deadline_wire_shape() {
        let new = NewDeadline {
            username: "ramesh".to_string(),
            subsidy_name: "PM-KISAN".to_string(),
            deadline: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&new).unwrap(),
            json!({ "username": "ramesh", "subsidy_name": "PM-KISAN", "deadline": "2024-05-31" })
        );
    }
}
