use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Fetched pages keyed by their fetch URL, so a re-run does not hit the site again.
pub struct PageCache {
    conn: Connection,
}

impl PageCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open page cache {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        init_schema(&conn)?;
        Ok(PageCache { conn })
    }

    #[cfg(test)]
    pub fn in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(PageCache { conn })
    }

    pub fn get(&self, url: &str) -> rusqlite::Result<Option<String>> {
        self.conn
            .query_row("SELECT html FROM pages WHERE url = ?1", params![url], |r| {
                r.get(0)
            })
            .optional()
    }

    /// Store or refresh a page.
    pub fn put(&self, url: &str, html: &str) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO pages (url, html) VALUES (?1, ?2)
             ON CONFLICT(url) DO UPDATE SET html = excluded.html, fetched_at = datetime('now')",
            params![url, html],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn len(&self) -> rusqlite::Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            url        TEXT PRIMARY KEY,
            html       TEXT NOT NULL,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = PageCache::in_memory().unwrap();
        assert_eq!(cache.get("https://host/a?p=x").unwrap(), None);
        cache.put("https://host/a?p=x", "<p>1</p>").unwrap();
        assert_eq!(cache.get("https://host/a?p=x").unwrap().as_deref(), Some("<p>1</p>"));
    }

    #[test]
    fn put_refreshes() {
        let cache = PageCache::in_memory().unwrap();
        cache.put("u", "old").unwrap();
        cache.put("u", "new").unwrap();
        assert_eq!(cache.get("u").unwrap().as_deref(), Some("new"));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = std::env::temp_dir().join(format!("genea-cache-{}", std::process::id()));
        let path = dir.join("nested").join("pages.sqlite");
        let cache = PageCache::open(&path).unwrap();
        cache.put("u", "x").unwrap();
        assert!(path.exists());
        drop(cache);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
