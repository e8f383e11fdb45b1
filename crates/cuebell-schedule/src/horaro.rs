use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use cuebell_core::{ScheduleDocument, ScheduleItem, SourceError};

#[derive(Debug, Deserialize)]
struct Payload {
    schedule: RawSchedule,
}

#[derive(Debug, Deserialize)]
struct RawSchedule {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    columns: Vec<Option<String>>,
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    scheduled: Option<String>,
    #[serde(default)]
    length_t: i64,
    #[serde(default)]
    data: Vec<Value>,
}

/// Convert a raw schedule payload fetched from `url` into a [`ScheduleDocument`].
///
/// A missing or unparseable document `start` is a [`SourceError::Parse`]; an
/// item with a bad `scheduled` value is kept as unscheduled.
pub fn parse_document(url: &str, payload: &Value) -> Result<ScheduleDocument, SourceError> {
    let parse_err = |reason: String| SourceError::Parse {
        url: url.to_string(),
        reason,
    };

    let raw: Payload = Payload::deserialize(payload).map_err(|e| parse_err(e.to_string()))?;
    let raw = raw.schedule;

    let start = raw
        .start
        .as_deref()
        .ok_or_else(|| parse_err("schedule has no start time".to_string()))?;
    let start_time =
        parse_time(start).ok_or_else(|| parse_err(format!("invalid start time: {start}")))?;

    let items = raw
        .items
        .into_iter()
        .map(|item| {
            let scheduled_time = item.scheduled.as_deref().and_then(|s| {
                let parsed = parse_time(s);
                if parsed.is_none() {
                    warn!(%url, scheduled = %s, "ignoring unparseable item time");
                }
                parsed
            });
            ScheduleItem {
                scheduled_time,
                length_seconds: item.length_t.max(0),
                display_lines: item.data.iter().map(cell_text).collect(),
            }
        })
        .collect();

    Ok(ScheduleDocument {
        name: raw.name,
        description: raw.description.filter(|d| !d.trim().is_empty()),
        start_time,
        timezone: raw.timezone.unwrap_or_else(|| "UTC".to_string()),
        columns: raw.columns.into_iter().map(Option::unwrap_or_default).collect(),
        items,
    })
}

fn parse_time(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s.trim()).ok()
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
