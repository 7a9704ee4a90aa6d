//! Canonical timestamp encoding for persisted messages.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Render a timestamp in canonical RFC 3339 form (milliseconds, `Z`).
pub fn to_canonical(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Truncate a timestamp to the precision kept by the canonical form.
pub fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(value.timestamp_millis())
        .single()
        .unwrap_or(value)
}

/// Parse a timestamp from an RFC 3339 string or epoch milliseconds.
pub fn parse_loose(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(raw) => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        serde_json::Value::Number(number) => number
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

/// Serde adapter writing canonical strings and reading loose forms.
pub mod canonical {
    use super::{parse_loose, to_canonical};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_canonical(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        parse_loose(&raw).ok_or_else(|| de::Error::custom("unparseable timestamp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn canonical_form_has_millis_and_zulu() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(to_canonical(&ts), "2024-05-01T12:30:00.000Z");
    }

    #[test]
    fn parse_loose_accepts_strings_and_millis() {
        let from_str = parse_loose(&json!("2024-05-01T12:30:00.000Z")).expect("string");
        let from_millis = parse_loose(&json!(from_str.timestamp_millis())).expect("millis");
        assert_eq!(from_str, from_millis);
        assert_eq!(parse_loose(&json!("yesterday")), None);
        assert_eq!(parse_loose(&json!(true)), None);
    }
}
