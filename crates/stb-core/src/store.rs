//! SQLite-backed persistent store.
//!
//! Two tables: `state` (scalar key/value, currently only `current_index`) and
//! `links` (append-only original -> short mappings). Every operation runs
//! under one process-wide mutex around the connection; the lock is never
//! held across an `.await`.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    domain::{LinkId, LinkRecord, UserId},
    errors::Error,
    Result,
};

const CURRENT_INDEX_KEY: &str = "current_index";

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        tracing::info!(path = %path.display(), "store opened");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS state (
                key TEXT PRIMARY KEY,
                value TEXT
            );
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                original_url TEXT,
                short_url TEXT
            );",
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO state(key, value) VALUES(?1, ?2)",
            params![CURRENT_INDEX_KEY, "0"],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Store("store lock poisoned".to_string()))
    }

    pub fn current_index(&self) -> Result<usize> {
        let conn = self.lock()?;
        read_index(&conn)
    }

    pub fn set_current_index(&self, index: usize) -> Result<()> {
        let conn = self.lock()?;
        write_index(&conn, index)
    }

    /// Unconditionally move the cursor one step forward (mod `count`).
    pub fn advance_cursor(&self, count: usize) -> Result<usize> {
        if count == 0 {
            return Err(Error::Config("provider count must be positive".to_string()));
        }
        let conn = self.lock()?;
        let next = (read_index(&conn)? + 1) % count;
        write_index(&conn, next)?;
        Ok(next)
    }

    /// Move the cursor from `expected` to `expected + 1` (mod `count`), but only
    /// if it still points at `expected`. Returns the cursor value afterwards.
    pub fn advance_cursor_from(&self, expected: usize, count: usize) -> Result<usize> {
        if count == 0 {
            return Err(Error::Config("provider count must be positive".to_string()));
        }
        let conn = self.lock()?;
        let current = read_index(&conn)?;
        if current != expected {
            return Ok(current);
        }
        let next = (current + 1) % count;
        write_index(&conn, next)?;
        Ok(next)
    }

    /// Bring a persisted cursor back into `0..count` (registry may have shrunk
    /// between restarts). Returns the valid cursor.
    pub fn normalize_cursor(&self, count: usize) -> Result<usize> {
        if count == 0 {
            return Err(Error::Config("provider count must be positive".to_string()));
        }
        let conn = self.lock()?;
        let current = read_index(&conn)?;
        if current < count {
            return Ok(current);
        }
        let fixed = current % count;
        write_index(&conn, fixed)?;
        tracing::warn!(from = current, to = fixed, "persisted provider index out of range, reset");
        Ok(fixed)
    }

    pub fn insert_link(
        &self,
        requester: UserId,
        original_url: &str,
        short_url: &str,
    ) -> Result<LinkRecord> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO links(user_id, original_url, short_url) VALUES(?1, ?2, ?3)",
            params![requester.0, original_url, short_url],
        )?;
        Ok(LinkRecord {
            id: LinkId(conn.last_insert_rowid()),
            requester,
            original_url: original_url.to_string(),
            short_url: short_url.to_string(),
        })
    }

    pub fn get_link(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        let conn = self.lock()?;
        let rec = conn
            .query_row(
                "SELECT id, user_id, original_url, short_url FROM links WHERE id = ?1",
                params![id.0],
                row_to_record,
            )
            .optional()?;
        Ok(rec)
    }

    /// Every stored link, oldest first.
    pub fn all_links(&self) -> Result<Vec<LinkRecord>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, user_id, original_url, short_url FROM links ORDER BY id")?;
        let rows = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Most recent links of one requester, newest first.
    pub fn links_for(&self, requester: UserId, limit: usize) -> Result<Vec<LinkRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, original_url, short_url FROM links
             WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![requester.0, limit], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn link_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM links", [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    /// Replace the short URL of an existing link. Returns `false` if no such id.
    pub fn update_short_url(&self, id: LinkId, short_url: &str) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE links SET short_url = ?1 WHERE id = ?2",
            params![short_url, id.0],
        )?;
        Ok(changed > 0)
    }
}

fn read_index(conn: &Connection) -> Result<usize> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM state WHERE key = ?1",
            params![CURRENT_INDEX_KEY],
            |row| row.get(0),
        )
        .optional()?;
    let raw = raw.ok_or_else(|| Error::Store("current_index is missing".to_string()))?;
    raw.trim()
        .parse::<usize>()
        .map_err(|e| Error::Store(format!("current_index {raw:?} is not an index: {e}")))
}

fn write_index(conn: &Connection, index: usize) -> Result<()> {
    conn.execute(
        "INSERT INTO state(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![CURRENT_INDEX_KEY, index.to_string()],
    )?;
    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<LinkRecord> {
    Ok(LinkRecord {
        id: LinkId(row.get(0)?),
        requester: UserId(row.get(1)?),
        original_url: row.get(2)?,
        short_url: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_starts_at_zero() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.current_index().unwrap(), 0);
        assert_eq!(store.link_count().unwrap(), 0);
    }

    #[test]
    fn advance_wraps_around() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.advance_cursor(3).unwrap(), 1);
        assert_eq!(store.advance_cursor(3).unwrap(), 2);
        assert_eq!(store.advance_cursor(3).unwrap(), 0);
        assert_eq!(store.current_index().unwrap(), 0);
    }

    #[test]
    fn conditional_advance_only_moves_from_expected() {
        let store = Store::open_in_memory().unwrap();
        store.set_current_index(1).unwrap();

        // Someone else already moved past 0.
        assert_eq!(store.advance_cursor_from(0, 3).unwrap(), 1);
        assert_eq!(store.current_index().unwrap(), 1);

        assert_eq!(store.advance_cursor_from(1, 3).unwrap(), 2);
        assert_eq!(store.current_index().unwrap(), 2);
    }

    #[test]
    fn zero_count_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(store.advance_cursor(0), Err(Error::Config(_))));
        assert!(matches!(
            store.advance_cursor_from(0, 0),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn normalize_cursor_reduces_out_of_range_index() {
        let store = Store::open_in_memory().unwrap();
        store.set_current_index(5).unwrap();
        assert_eq!(store.normalize_cursor(2).unwrap(), 1);
        assert_eq!(store.current_index().unwrap(), 1);
        assert_eq!(store.normalize_cursor(2).unwrap(), 1);
    }

    #[test]
    fn inserted_link_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let rec = store
            .insert_link(UserId(42), "https://example.com/page", "https://tinyurl.com/abc")
            .unwrap();

        let got = store.get_link(rec.id).unwrap().unwrap();
        assert_eq!(got, rec);
        assert_eq!(got.original_url, "https://example.com/page");
        assert_eq!(got.short_url, "https://tinyurl.com/abc");
        assert_eq!(got.requester, UserId(42));
    }

    #[test]
    fn ids_increase_and_listing_is_ordered() {
        let store = Store::open_in_memory().unwrap();
        let a = store.insert_link(UserId(1), "https://a.test", "s/a").unwrap();
        let b = store.insert_link(UserId(2), "https://b.test", "s/b").unwrap();
        let c = store.insert_link(UserId(1), "https://c.test", "s/c").unwrap();
        assert!(a.id < b.id && b.id < c.id);

        let all = store.all_links().unwrap();
        assert_eq!(all, vec![a.clone(), b, c.clone()]);

        let mine = store.links_for(UserId(1), 10).unwrap();
        assert_eq!(mine, vec![c.clone(), a]);
        assert_eq!(store.links_for(UserId(1), 1).unwrap(), vec![c]);
        assert_eq!(store.link_count().unwrap(), 3);
    }

    #[test]
    fn update_short_url_in_place() {
        let store = Store::open_in_memory().unwrap();
        let rec = store.insert_link(UserId(1), "https://a.test", "old").unwrap();

        assert!(store.update_short_url(rec.id, "new").unwrap());
        let got = store.get_link(rec.id).unwrap().unwrap();
        assert_eq!(got.short_url, "new");
        assert_eq!(got.original_url, "https://a.test");

        assert!(!store.update_short_url(LinkId(9999), "x").unwrap());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot_data.db");

        {
            let store = Store::open(&path).unwrap();
            store.advance_cursor(2).unwrap();
            store.insert_link(UserId(7), "https://a.test", "s/a").unwrap();
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.current_index().unwrap(), 1);
        assert_eq!(store.all_links().unwrap().len(), 1);
    }
}
