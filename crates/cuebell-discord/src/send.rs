use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::http::Http;
use serenity::model::id::ChannelId;

/// Maximum characters per Discord message (2000 is the limit; we use 1950 for safety).
const CHUNK_MAX: usize = 1950;

/// Split `text` into chunks of at most [`CHUNK_MAX`] characters, preferring
/// splits on newline/whitespace boundaries.
///
/// Lengths are counted in chars, so multi-byte titles never split mid-codepoint.
pub fn split_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    // byte offset of the first char past the limit, if the rest is too long
    while let Some((limit, _)) = remaining.char_indices().nth(CHUNK_MAX) {
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

/// Send `text` to `channel_id` in ≤1950-char chunks, attaching `embed` to the
/// first one.
pub async fn send_chunked(
    http: &Http,
    channel_id: ChannelId,
    text: &str,
    embed: Option<CreateEmbed>,
) -> Result<(), serenity::Error> {
    let mut embed = embed;
    for chunk in split_chunks(text) {
        let mut msg = CreateMessage::new().content(chunk);
        if let Some(e) = embed.take() {
            msg = msg.embed(e);
        }
        channel_id.send_message(http, msg).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_chunks("Summer Marathon's next program will start in 10 minutes!");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn long_text_splits_on_newline() {
        let line = "a".repeat(1000);
        let text = format!("{}\n{}", line, line);
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 2);
        for c in &chunks {
            assert!(c.chars().count() <= CHUNK_MAX, "chunk too large: {}", c.len());
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "開".repeat(4000);
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= CHUNK_MAX));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn empty_text_still_yields_one_message() {
        assert_eq!(split_chunks(""), vec![String::new()]);
    }
}
