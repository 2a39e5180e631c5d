use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::BotError;

pub const HOMEWORKS_KEY: &str = "homeworks";
pub const CURRENT_DATE_KEY: &str = "current_date";
pub const NAME_KEY: &str = "homework_name";
pub const STATUS_KEY: &str = "status";

/// Sent when the batch carries no homework changes.
pub const STATUS_UNCHANGED: &str = "Status unchanged.";

/// Unix timestamp the API reports changes from.
pub type Cursor = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Approved,
    Reviewing,
    Rejected,
}

impl Verdict {
    pub const ALL: [Verdict; 3] = [Verdict::Approved, Verdict::Reviewing, Verdict::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::Reviewing => "reviewing",
            Verdict::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == raw)
    }

    pub fn text(&self) -> &'static str {
        match self {
            Verdict::Approved => "Work reviewed: the reviewer liked everything. Hooray!",
            Verdict::Reviewing => "Work has been taken up for review.",
            Verdict::Rejected => "Work reviewed: the reviewer has comments.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeworkStatus {
    pub name: String,
    pub verdict: Verdict,
}

impl HomeworkStatus {
    /// Read a raw API record. Name is checked before status.
    pub fn from_record(record: &Value) -> Result<Self, BotError> {
        let name = record.get(NAME_KEY).ok_or(BotError::MissingField(NAME_KEY))?;
        let status = record.get(STATUS_KEY).unwrap_or(&Value::Null);
        let verdict = status
            .as_str()
            .and_then(Verdict::parse)
            .ok_or_else(|| BotError::UnknownVerdict(display_value(status)))?;
        Ok(Self {
            name: display_value(name),
            verdict,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "Status changed for \"{}\". {}",
            self.name,
            self.verdict.text()
        )
    }
}

/// A validated API response. Records are kept raw; they are only checked
/// when a message is extracted from them.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusBatch {
    pub homeworks: Vec<Value>,
    pub current_date: Cursor,
}

impl StatusBatch {
    /// Message for this batch: the first record's status, or the
    /// "unchanged" literal when there are no records.
    pub fn message(&self) -> Result<String, BotError> {
        match self.homeworks.first() {
            Some(record) => extract_message(record),
            None => Ok(STATUS_UNCHANGED.to_string()),
        }
    }
}

/// Check the response envelope and split it into records and next cursor.
#[instrument(skip_all)]
pub fn validate(raw: Value) -> Result<StatusBatch, BotError> {
    info!("validating API response");
    let mut body = match raw {
        Value::Object(body) => body,
        other => {
            return Err(BotError::MalformedResponse(format!(
                "expected a JSON object, got {}",
                kind_of(&other)
            )))
        }
    };
    if !body.contains_key(HOMEWORKS_KEY) || !body.contains_key(CURRENT_DATE_KEY) {
        return Err(BotError::MalformedResponse(format!(
            "schema violation: `{HOMEWORKS_KEY}` or `{CURRENT_DATE_KEY}` is missing"
        )));
    }
    let current_date = match body.get(CURRENT_DATE_KEY).and_then(as_timestamp) {
        Some(ts) => ts,
        None => {
            return Err(BotError::MalformedResponse(format!(
                "`{CURRENT_DATE_KEY}` is not a whole-second timestamp"
            )))
        }
    };
    let homeworks = match body.remove(HOMEWORKS_KEY) {
        Some(Value::Array(items)) => items,
        other => {
            return Err(BotError::MalformedResponse(format!(
                "`{HOMEWORKS_KEY}` is not a list, got {}",
                kind_of(&other.unwrap_or_default())
            )))
        }
    };
    debug!(count = homeworks.len(), current_date, "response is well-formed");
    Ok(StatusBatch {
        homeworks,
        current_date,
    })
}

/// Render the notification text for one homework record.
#[instrument(skip_all)]
pub fn extract_message(record: &Value) -> Result<String, BotError> {
    let status = HomeworkStatus::from_record(record)?;
    info!(homework = %status.name, verdict = status.verdict.as_str(), "extracted homework status");
    Ok(status.render())
}

/// Integers as-is; floats only when they hold a whole number of seconds.
fn as_timestamp(value: &Value) -> Option<Cursor> {
    if let Some(ts) = value.as_i64() {
        return Some(ts);
    }
    let ts = value.as_f64()?;
    if ts.fract() == 0.0 && ts >= i64::MIN as f64 && ts < i64::MAX as f64 {
        Some(ts as i64)
    } else {
        None
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_every_known_verdict() {
        for verdict in Verdict::ALL {
            let record = json!({"homework_name": "hw_api", "status": verdict.as_str()});
            let msg = extract_message(&record).unwrap();
            assert!(msg.contains("hw_api"));
            assert!(msg.ends_with(verdict.text()));
        }
    }

    #[test]
    fn approved_message_is_exact() {
        let record = json!({"homework_name": "proj1", "status": "approved"});
        assert_eq!(
            extract_message(&record).unwrap(),
            "Status changed for \"proj1\". Work reviewed: the reviewer liked everything. Hooray!"
        );
    }

    #[test]
    fn unknown_verdict_carries_value() {
        let record = json!({"homework_name": "hw", "status": "lost"});
        match extract_message(&record).unwrap_err() {
            BotError::UnknownVerdict(v) => assert_eq!(v, "lost"),
            other => panic!("wrong error: {other:?}"),
        }

        let record = json!({"homework_name": "hw"});
        match extract_message(&record).unwrap_err() {
            BotError::UnknownVerdict(v) => assert_eq!(v, "null"),
            other => panic!("wrong error: {other:?}"),
        }
    }

    #[test]
    fn missing_name_is_reported_first() {
        let record = json!({"status": "bogus"});
        assert!(matches!(
            extract_message(&record),
            Err(BotError::MissingField("homework_name"))
        ));
        assert!(matches!(
            extract_message(&json!(["not", "a", "record"])),
            Err(BotError::MissingField(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_envelopes() {
        let cases = [
            json!([]),
            json!("text"),
            json!({"current_date": 1}),
            json!({"homeworks": []}),
            json!({"homeworks": {"a": 1}, "current_date": 1}),
            json!({"homeworks": [], "current_date": "yesterday"}),
            json!({"homeworks": [], "current_date": 1700000000.5}),
            json!({"homeworks": [], "current_date": null}),
        ];
        for raw in cases {
            assert!(
                matches!(validate(raw.clone()), Err(BotError::MalformedResponse(_))),
                "accepted {raw}"
            );
        }
    }

    #[test]
    fn validate_keeps_order_and_cursor() {
        let raw = json!({
            "homeworks": [
                {"homework_name": "second", "status": "reviewing"},
                {"homework_name": "first", "status": "oops"}
            ],
            "current_date": 1700000000
        });
        let batch = validate(raw).unwrap();
        assert_eq!(batch.current_date, 1_700_000_000);
        assert_eq!(batch.homeworks.len(), 2);
        assert_eq!(batch.homeworks[1]["homework_name"], "first");
        // only the first record is looked at
        assert_eq!(
            batch.message().unwrap(),
            "Status changed for \"second\". Work has been taken up for review."
        );
    }

    #[test]
    fn whole_float_cursor_is_accepted() {
        let batch = validate(json!({"homeworks": [], "current_date": 1700000000.0})).unwrap();
        assert_eq!(batch.current_date, 1_700_000_000);
    }

    #[test]
    fn empty_batch_is_unchanged() {
        let batch = validate(json!({"homeworks": [], "current_date": 5})).unwrap();
        assert_eq!(batch.message().unwrap(), STATUS_UNCHANGED);
    }
}
