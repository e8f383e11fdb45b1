use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params_from_iter, types::Value, Connection, ErrorCode};
use tracing::info;

use cuebell_core::{EventRegistry, MonitoredEvent, RegistryError};

use crate::{
    db::init_db,
    error::{EventsError, Result},
    types::{EventFilter, EventUpdate},
};

const SELECT_EVENTS: &str = "SELECT url, notice_minutes, server_id, channel_id FROM events";

/// SQLite store of monitored events.
///
/// Holds its own `Connection` so command handlers can manage events while the
/// scan loop lists them.
pub struct EventStore {
    conn: Mutex<Connection>,
}

impl EventStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Register `event`. Fails with `Duplicate` if the destination already
    /// monitors this URL.
    pub fn add_event(&self, event: &MonitoredEvent) -> Result<()> {
        if event.url.trim().is_empty() {
            return Err(EventsError::Invalid("url must not be empty".to_string()));
        }

        let conn = self.lock();
        let now = Utc::now().to_rfc3339();
        let res = conn.execute(
            "INSERT INTO events (url, notice_minutes, server_id, channel_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                event.url,
                event.notice_minutes,
                event.server_id as i64,
                event.channel_id as i64,
                now
            ],
        );

        match res {
            Ok(_) => {
                info!(url = %event.url, server_id = event.server_id, channel_id = event.channel_id, "event added");
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => Err(EventsError::Duplicate {
                url: event.url.clone(),
                server_id: event.server_id,
                channel_id: event.channel_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every event watching `url`. Returns the number removed.
    pub fn remove_by_url(&self, url: &str) -> Result<usize> {
        let n = self.lock().execute("DELETE FROM events WHERE url = ?1", [url])?;
        if n == 0 {
            return Err(EventsError::NotFound {
                url: url.to_string(),
            });
        }
        info!(%url, removed = n, "events removed");
        Ok(n)
    }

    /// Remove every event owned by `server_id` (e.g. the bot left the guild).
    pub fn remove_by_server(&self, server_id: u64) -> Result<usize> {
        let n = self
            .lock()
            .execute("DELETE FROM events WHERE server_id = ?1", [server_id as i64])?;
        info!(server_id, removed = n, "server events removed");
        Ok(n)
    }

    /// Apply `update` to every event watching `old_url`.
    pub fn update_event(&self, old_url: &str, update: &EventUpdate) -> Result<usize> {
        let conn = self.lock();

        if update.is_empty() {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM events WHERE url = ?1",
                [old_url],
                |row| row.get(0),
            )?;
            if n == 0 {
                return Err(EventsError::NotFound {
                    url: old_url.to_string(),
                });
            }
            return Ok(n as usize);
        }

        let mut sets = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        if let Some(url) = &update.url {
            if url.trim().is_empty() {
                return Err(EventsError::Invalid("url must not be empty".to_string()));
            }
            params.push(Value::Text(url.clone()));
            sets.push(format!("url = ?{}", params.len()));
        }
        if let Some(notice) = update.notice_minutes {
            params.push(Value::Integer(i64::from(notice)));
            sets.push(format!("notice_minutes = ?{}", params.len()));
        }
        if let Some(server_id) = update.server_id {
            params.push(Value::Integer(server_id as i64));
            sets.push(format!("server_id = ?{}", params.len()));
        }
        if let Some(channel_id) = update.channel_id {
            params.push(Value::Integer(channel_id as i64));
            sets.push(format!("channel_id = ?{}", params.len()));
        }
        params.push(Value::Text(old_url.to_string()));
        let sql = format!(
            "UPDATE events SET {} WHERE url = ?{}",
            sets.join(", "),
            params.len()
        );

        let n = match conn.execute(&sql, params_from_iter(params)) {
            Ok(n) => n,
            Err(e) if is_constraint_violation(&e) => {
                return Err(EventsError::Invalid(
                    "update would duplicate an existing event".to_string(),
                ))
            }
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            return Err(EventsError::NotFound {
                url: old_url.to_string(),
            });
        }
        info!(%old_url, updated = n, "events updated");
        Ok(n)
    }

    /// All events, oldest first.
    pub fn list_events(&self) -> Result<Vec<MonitoredEvent>> {
        self.find_events(&EventFilter::default())
    }

    pub fn events_by_url(&self, url: &str) -> Result<Vec<MonitoredEvent>> {
        self.find_events(&EventFilter {
            url: Some(url.to_string()),
            ..EventFilter::default()
        })
    }

    pub fn events_by_server(&self, server_id: u64) -> Result<Vec<MonitoredEvent>> {
        self.find_events(&EventFilter {
            server_id: Some(server_id),
            ..EventFilter::default()
        })
    }

    /// Events matching every condition set in `filter`.
    pub fn find_events(&self, filter: &EventFilter) -> Result<Vec<MonitoredEvent>> {
        let mut conds = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        if let Some(url) = &filter.url {
            params.push(Value::Text(url.clone()));
            conds.push(format!("url = ?{}", params.len()));
        }
        if let Some(notice) = filter.notice_minutes {
            params.push(Value::Integer(i64::from(notice)));
            conds.push(format!("notice_minutes = ?{}", params.len()));
        }
        if let Some(server_id) = filter.server_id {
            params.push(Value::Integer(server_id as i64));
            conds.push(format!("server_id = ?{}", params.len()));
        }
        if let Some(channel_id) = filter.channel_id {
            params.push(Value::Integer(channel_id as i64));
            conds.push(format!("channel_id = ?{}", params.len()));
        }

        let sql = if conds.is_empty() {
            format!("{SELECT_EVENTS} ORDER BY id")
        } else {
            format!("{SELECT_EVENTS} WHERE {} ORDER BY id", conds.join(" AND "))
        };

        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let events = stmt
            .query_map(params_from_iter(params), |row| {
                Ok(MonitoredEvent {
                    url: row.get(0)?,
                    notice_minutes: row.get(1)?,
                    server_id: row.get::<_, i64>(2)? as u64,
                    channel_id: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventRegistry for EventStore {
    async fn list(&self) -> std::result::Result<Vec<MonitoredEvent>, RegistryError> {
        self.list_events().map_err(RegistryError::from)
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}
