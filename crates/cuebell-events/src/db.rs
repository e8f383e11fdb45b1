use rusqlite::Connection;

use crate::error::Result;

/// Initialise the registry schema in `conn`.
///
/// Creates the `events` table (idempotent) plus indexes for the two lookup
/// paths the bot uses: by URL and by server.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS events (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            url             TEXT    NOT NULL,
            notice_minutes  INTEGER NOT NULL,
            server_id       INTEGER NOT NULL,   -- Discord snowflake
            channel_id      INTEGER NOT NULL,   -- Discord snowflake
            created_at      TEXT    NOT NULL,
            UNIQUE (url, server_id, channel_id)
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_events_url ON events (url);
        CREATE INDEX IF NOT EXISTS idx_events_server ON events (server_id);
        ",
    )?;
    Ok(())
}
