// Settings queries
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::db::{DbConnection, DbResult};

/// Settings key holding the backend API key
pub const API_KEY_SETTING: &str = "llm_api_key";

/// Get a setting value by key
pub fn get_setting(db: &DbConnection, key: &str) -> DbResult<Option<String>> {
    let conn = db.lock();
    let value = conn
        .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}

/// Insert or replace a setting
pub fn set_setting(db: &DbConnection, key: &str, value: &str) -> DbResult<()> {
    let conn = db.lock();
    conn.execute(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Remove a setting; returns whether it existed
pub fn delete_setting(db: &DbConnection, key: &str) -> DbResult<bool> {
    let conn = db.lock();
    let rows = conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
    Ok(rows > 0)
}

pub fn get_api_key(db: &DbConnection) -> DbResult<Option<String>> {
    Ok(get_setting(db, API_KEY_SETTING)?.filter(|key| !key.trim().is_empty()))
}

/// Store the API key; a blank key removes the saved one
pub fn set_api_key(db: &DbConnection, key: &str) -> DbResult<()> {
    let key = key.trim();
    if key.is_empty() {
        delete_setting(db, API_KEY_SETTING)?;
        return Ok(());
    }
    set_setting(db, API_KEY_SETTING, key)
}
