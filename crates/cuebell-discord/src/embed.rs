//! Embed rendering for notification details.
//!
//! The detail payload becomes a single embed: the item's headline as title,
//! one inline field per labelled cell, and the start time in the schedule's own
//! offset as footer.

use serenity::builder::{CreateEmbed, CreateEmbedFooter};

use cuebell_core::NotificationDetail;

// Discord embed limits
const TITLE_MAX: usize = 256;
const FIELD_NAME_MAX: usize = 256;
const FIELD_VALUE_MAX: usize = 1024;
const FIELDS_MAX: usize = 25;

const EMBED_COLOUR: u32 = 0x3498db;

/// Plain description of the embed, kept separate from the serenity builder
/// so it can be inspected.
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeEmbed {
    pub title: String,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub footer: String,
}

impl NoticeEmbed {
    pub fn from_detail(detail: &NotificationDetail) -> Self {
        let title = detail
            .title
            .as_deref()
            .unwrap_or(detail.schedule_name.as_str());
        let fields = detail
            .fields
            .iter()
            .take(FIELDS_MAX)
            .map(|(name, value)| (truncate(name, FIELD_NAME_MAX), truncate(value, FIELD_VALUE_MAX)))
            .collect();
        let footer = format!(
            "{} {}",
            detail.event_time.format("%Y-%m-%d %H:%M (UTC%:z)"),
            detail.timezone
        );

        Self {
            title: truncate(title, TITLE_MAX),
            description: detail.schedule_name.clone(),
            fields,
            footer,
        }
    }

    /// Convert to a serenity `CreateEmbed` builder.
    pub fn to_create_embed(&self) -> CreateEmbed {
        let mut e = CreateEmbed::new()
            .title(&self.title)
            .description(&self.description)
            .colour(EMBED_COLOUR);
        for (name, value) in &self.fields {
            e = e.field(name, value, true);
        }
        e.footer(CreateEmbedFooter::new(&self.footer))
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}
