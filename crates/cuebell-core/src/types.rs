use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// A schedule URL being watched on behalf of one Discord channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredEvent {
    /// Schedule page URL, without the `.json` suffix.
    pub url: String,
    /// Lead time, in minutes, for advance notices.
    pub notice_minutes: u32,
    /// Discord guild (server) snowflake.
    pub server_id: u64,
    /// Discord channel snowflake inside `server_id`.
    pub channel_id: u64,
}

/// A complete schedule as published by the schedule host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDocument {
    pub name: String,
    pub description: Option<String>,
    /// Overall start of the event, in the schedule's own offset.
    pub start_time: DateTime<FixedOffset>,
    /// IANA timezone name as published (display only).
    pub timezone: String,
    /// Column headers naming each position of [`ScheduleItem::display_lines`].
    #[serde(default)]
    pub columns: Vec<String>,
    /// Program items, in chronological order.
    pub items: Vec<ScheduleItem>,
}

/// One program slot in a [`ScheduleDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleItem {
    /// `None` when the host has not assigned a start time yet.
    pub scheduled_time: Option<DateTime<FixedOffset>>,
    pub length_seconds: i64,
    /// Cell values for this row; empty strings stand in for blank cells so
    /// positions keep lining up with [`ScheduleDocument::columns`].
    pub display_lines: Vec<String>,
}

impl ScheduleItem {
    /// First non-blank display line, used as the item's headline.
    pub fn title(&self) -> Option<&str> {
        self.display_lines
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }

    pub fn scheduled_utc(&self) -> Option<DateTime<Utc>> {
        self.scheduled_time.map(|t| t.with_timezone(&Utc))
    }
}

/// Structured detail attached to a notification, rendered by the sink
/// (Discord turns it into an embed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDetail {
    pub schedule_name: String,
    pub title: Option<String>,
    /// `(label, value)` pairs, blank values already removed.
    pub fields: Vec<(String, String)>,
    /// Start of the item, in the schedule's own offset.
    pub event_time: DateTime<FixedOffset>,
    pub timezone: String,
}

impl NotificationDetail {
    /// Build the detail payload for `item`, labelling cells with the document's columns.
    ///
    /// Returns `None` when the item has no scheduled time.
    pub fn for_item(doc: &ScheduleDocument, item: &ScheduleItem) -> Option<Self> {
        let event_time = item.scheduled_time?;
        let fields = item
            .display_lines
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(i, value)| {
                let label = doc
                    .columns
                    .get(i)
                    .filter(|c| !c.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("#{}", i + 1));
                (label, value.trim().to_string())
            })
            .collect();
        Some(Self {
            schedule_name: doc.name.clone(),
            title: item.title().map(str::to_string),
            fields,
            event_time,
            timezone: doc.timezone.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with(item: ScheduleItem) -> ScheduleDocument {
        ScheduleDocument {
            name: "Summer Marathon".to_string(),
            description: None,
            start_time: DateTime::parse_from_rfc3339("2026-08-01T10:00:00+09:00").unwrap(),
            timezone: "Asia/Tokyo".to_string(),
            columns: vec!["Game".to_string(), "Runner".to_string()],
            items: vec![item],
        }
    }

    #[test]
    fn title_skips_blank_cells() {
        let item = ScheduleItem {
            scheduled_time: None,
            length_seconds: 600,
            display_lines: vec!["  ".to_string(), "Tetris".to_string()],
        };
        assert_eq!(item.title(), Some("Tetris"));
    }

    #[test]
    fn detail_labels_cells_with_columns() {
        let item = ScheduleItem {
            scheduled_time: Some(DateTime::parse_from_rfc3339("2026-08-01T11:00:00+09:00").unwrap()),
            length_seconds: 1800,
            display_lines: vec!["Tetris".to_string(), String::new(), "extra".to_string()],
        };
        let doc = doc_with(item.clone());
        let detail = NotificationDetail::for_item(&doc, &item).unwrap();

        assert_eq!(detail.title.as_deref(), Some("Tetris"));
        assert_eq!(
            detail.fields,
            vec![
                ("Game".to_string(), "Tetris".to_string()),
                ("#3".to_string(), "extra".to_string()),
            ]
        );
        assert_eq!(detail.timezone, "Asia/Tokyo");
    }

    #[test]
    fn detail_requires_scheduled_time() {
        let item = ScheduleItem {
            scheduled_time: None,
            length_seconds: 0,
            display_lines: vec![],
        };
        let doc = doc_with(item.clone());
        assert!(NotificationDetail::for_item(&doc, &item).is_none());
    }
}
