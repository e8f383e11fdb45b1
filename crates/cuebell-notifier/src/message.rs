use cuebell_core::{Locale, ScheduleDocument, ScheduleItem};

use crate::types::NoticeKind;

const UNTITLED: &str = "TBA";

/// Render the message text for `kind` about `item`.
///
/// Available placeholders: `{name}`, `{title}`, `{minutes}`, `{late}`,
/// `{time}` (HH:MM in the schedule's own offset) and `{timezone}`.
pub fn render_message(
    locale: &Locale,
    doc: &ScheduleDocument,
    item: &ScheduleItem,
    kind: NoticeKind,
) -> String {
    let (minutes, late) = match kind {
        NoticeKind::Advance { minutes_until } => (minutes_until, 0),
        NoticeKind::StartingSoon {
            minutes_until,
            minutes_late,
        } => (minutes_until, minutes_late),
        NoticeKind::AlreadyStarted { minutes_since } => (minutes_since, 0),
    };
    let time = item
        .scheduled_time
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default();

    locale.render(
        kind.template_key(),
        &[
            ("name", doc.name.clone()),
            ("title", item.title().unwrap_or(UNTITLED).to_string()),
            ("minutes", minutes.to_string()),
            ("late", late.to_string()),
            ("time", time),
            ("timezone", doc.timezone.clone()),
        ],
    )
}
