//! Recording descriptors as returned by the server's `getRecordings` call.
//!
//! A descriptor is a nested key-value structure keyed by upstream field
//! names. `normalize_descriptor` renames the identifying keys to the local
//! schema's names; `RecordingData` is the typed view the rest of the sync
//! works with. Malformed values never fail the conversion: they fall back to
//! "absent", zero, or the original string.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::db::RecordingUser;

/// A raw recording descriptor.
pub type Descriptor = Map<String, Value>;

/// Upstream key → local key.
const KEY_MAPPINGS: [(&str, &str); 4] = [
    ("recordID", "recordid"),
    ("meetingID", "meetingid"),
    ("startTime", "start_time"),
    ("endTime", "end_time"),
];

/// Rename the upstream identifier keys of `descriptor` to local names.
/// Unknown keys pass through unchanged.
pub fn normalize_descriptor(descriptor: &Descriptor) -> Descriptor {
    let mut normalized: Descriptor = descriptor
        .iter()
        .filter(|(key, _)| !KEY_MAPPINGS.iter().any(|(from, _)| from == key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for (from, to) in KEY_MAPPINGS {
        if let Some(value) = descriptor.get(from) {
            normalized.insert(to.to_string(), value.clone());
        }
    }
    normalized
}

/// One playback format of an incoming descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatData {
    pub format_type: String,
    pub url: Option<String>,
    /// Length in minutes.
    pub length: i64,
}

/// Typed view of a normalized descriptor.
///
/// Scalar fields are `None` when the descriptor does not carry them. Missing
/// metadata and playback blocks are empty collections.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingData {
    pub recordid: Option<String>,
    pub meetingid: Option<String>,
    pub name: Option<String>,
    pub published: Option<bool>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    /// Size exactly as the server reported it.
    pub size: Option<String>,
    pub metadata: BTreeMap<String, Option<String>>,
    /// Formats with a non-blank type, in server order.
    pub formats: Vec<FormatData>,
    /// `None` when the descriptor has no participant list.
    pub recording_users: Option<Vec<RecordingUser>>,
    /// The normalized descriptor, for room matchers that need extra keys.
    pub normalized: Descriptor,
}

impl RecordingData {
    /// Normalize `descriptor` and build its typed view.
    pub fn from_descriptor(descriptor: &Descriptor) -> Self {
        Self::from_normalized(normalize_descriptor(descriptor))
    }

    pub fn from_normalized(normalized: Descriptor) -> Self {
        let field = |key: &str| normalized.get(key);

        Self {
            recordid: field("recordid").and_then(text_value),
            meetingid: field("meetingid").and_then(text_value),
            name: field("name").and_then(text_value),
            published: field("published").and_then(bool_value),
            start_time: field("start_time").and_then(int_value),
            end_time: field("end_time").and_then(int_value),
            size: field("size").and_then(text_value),
            metadata: field("metadata").map(metadata_map).unwrap_or_default(),
            formats: field("playback").map(playback_formats).unwrap_or_default(),
            recording_users: field("recordingUsers").and_then(recording_users),
            normalized,
        }
    }

    /// Size in bytes as it will be stored; unparsable sizes become 0.
    pub fn size_bytes(&self) -> Option<i64> {
        self.size.as_deref().map(|s| parse_int_or(s, 0))
    }
}

/// Parse an integer out of `raw`, truncating decimals, or return `default`.
pub fn parse_int_or(raw: &str, default: i64) -> i64 {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return n;
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => f.trunc() as i64,
        _ => default,
    }
}

/// Playback length in minutes; anything non-numeric or missing is 0.
pub fn parse_length(value: Option<&Value>) -> i64 {
    value.and_then(int_value).unwrap_or(0)
}

/// An external user id: integers when they parse as one, the original text
/// otherwise.
pub fn parse_user_id(value: &Value) -> Option<RecordingUser> {
    match value {
        Value::Number(n) => Some(match n.as_i64() {
            Some(id) => RecordingUser::Id(id),
            None => RecordingUser::External(n.to_string()),
        }),
        Value::String(s) => Some(match s.trim().parse::<i64>() {
            Ok(id) => RecordingUser::Id(id),
            Err(_) => RecordingUser::External(s.clone()),
        }),
        Value::Bool(b) => Some(RecordingUser::External(b.to_string())),
        _ => None,
    }
}

/// A single object or a list of objects, as the XML-derived payloads carry
/// repeated elements.
fn one_or_many(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

fn bool_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

fn metadata_map(value: &Value) -> BTreeMap<String, Option<String>> {
    match value {
        Value::Object(entries) => entries
            .iter()
            .map(|(name, content)| (name.clone(), text_value(content)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn playback_formats(value: &Value) -> Vec<FormatData> {
    let Some(format) = value.get("format") else {
        return Vec::new();
    };
    one_or_many(format)
        .into_iter()
        .filter_map(|f| {
            let format_type = f.get("type").and_then(text_value)?;
            if format_type.trim().is_empty() {
                return None;
            }
            Some(FormatData {
                format_type,
                url: f.get("url").and_then(text_value),
                length: parse_length(f.get("length")),
            })
        })
        .collect()
}

fn recording_users(value: &Value) -> Option<Vec<RecordingUser>> {
    let users = value.get("user")?;
    Some(
        one_or_many(users)
            .into_iter()
            .filter_map(|u| u.get("externalUserID").and_then(parse_user_id))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(value: Value) -> Descriptor {
        match value {
            Value::Object(map) => map,
            _ => panic!("descriptor fixtures must be objects"),
        }
    }

    #[test]
    fn test_normalize_renames_identifier_keys() {
        let raw = descriptor(json!({
            "recordID": "x",
            "meetingID": "y",
            "startTime": 100,
            "endTime": 200
        }));
        let expected = descriptor(json!({
            "recordid": "x",
            "meetingid": "y",
            "start_time": 100,
            "end_time": 200
        }));
        assert_eq!(normalize_descriptor(&raw), expected);
    }

    #[test]
    fn test_normalize_passes_unknown_keys_through() {
        let raw = descriptor(json!({
            "recordID": "x",
            "published": true,
            "rawSize": 1234
        }));
        let normalized = normalize_descriptor(&raw);
        assert_eq!(normalized.get("published"), Some(&json!(true)));
        assert_eq!(normalized.get("rawSize"), Some(&json!(1234)));
        assert!(normalized.get("recordID").is_none());
    }

    #[test]
    fn test_recording_data_fields() {
        let data = RecordingData::from_descriptor(&descriptor(json!({
            "recordID": "rec-1",
            "meetingID": "meeting-1",
            "name": "Weekly",
            "published": "true",
            "startTime": "1000",
            "endTime": 2000.7,
            "size": 500,
            "metadata": { "title": "Weekly", "count": 3, "empty": null },
            "playback": {
                "format": {"type": "presentation", "url": "p1", "length": "62"}
            }
        })));

        assert_eq!(data.recordid.as_deref(), Some("rec-1"));
        assert_eq!(data.meetingid.as_deref(), Some("meeting-1"));
        assert_eq!(data.published, Some(true));
        assert_eq!(data.start_time, Some(1000));
        assert_eq!(data.end_time, Some(2000));
        assert_eq!(data.size.as_deref(), Some("500"));
        assert_eq!(data.size_bytes(), Some(500));
        assert_eq!(data.metadata.get("count"), Some(&Some("3".to_string())));
        assert_eq!(data.metadata.get("empty"), Some(&None));
        assert_eq!(
            data.formats,
            vec![FormatData {
                format_type: "presentation".to_string(),
                url: Some("p1".to_string()),
                length: 62,
            }]
        );
        assert!(data.recording_users.is_none());
    }

    #[test]
    fn test_missing_blocks_are_empty() {
        let data = RecordingData::from_descriptor(&descriptor(json!({ "recordID": "rec-1" })));
        assert!(data.metadata.is_empty());
        assert!(data.formats.is_empty());
        assert!(data.published.is_none());
        assert!(data.size_bytes().is_none());
    }

    #[test]
    fn test_playback_list_skips_blank_types() {
        let data = RecordingData::from_descriptor(&descriptor(json!({
            "recordID": "rec-1",
            "playback": {
                "format": [
                    {"type": "video", "url": "v1", "length": 3},
                    {"type": "", "url": "x"},
                    {"url": "y"},
                    {"type": "presentation", "url": "p1", "length": "abc"}
                ]
            }
        })));
        let types: Vec<&str> = data.formats.iter().map(|f| f.format_type.as_str()).collect();
        assert_eq!(types, vec!["video", "presentation"]);
        assert_eq!(data.formats[1].length, 0, "non-numeric length falls back to 0");
    }

    #[test]
    fn test_user_id_coercion() {
        let data = RecordingData::from_descriptor(&descriptor(json!({
            "recordID": "rec-1",
            "recordingUsers": {
                "user": [
                    {"externalUserID": "42"},
                    {"externalUserID": "abc"}
                ]
            }
        })));
        assert_eq!(
            data.recording_users,
            Some(vec![
                RecordingUser::Id(42),
                RecordingUser::External("abc".to_string())
            ])
        );
    }

    #[test]
    fn test_single_user_object() {
        let data = RecordingData::from_descriptor(&descriptor(json!({
            "recordID": "rec-1",
            "recordingUsers": { "user": {"externalUserID": 7} }
        })));
        assert_eq!(data.recording_users, Some(vec![RecordingUser::Id(7)]));
    }

    #[test]
    fn test_parse_int_or() {
        assert_eq!(parse_int_or("500", 0), 500);
        assert_eq!(parse_int_or(" 12.9 ", 0), 12);
        assert_eq!(parse_int_or("abc", 0), 0);
        assert_eq!(parse_int_or("", 7), 7);
    }
}
