use anyhow::{Context, Result};
use rusqlite::Connection;

use super::migrations;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_entries_table(conn)?;
    create_bookings_table(conn)?;
    run_booking_migrations(conn)?;
    Ok(())
}

fn create_entries_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            day TEXT NOT NULL,
            parent_id TEXT,
            payload TEXT NOT NULL,
            FOREIGN KEY (parent_id) REFERENCES entries(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("Failed to create entries table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entries_day ON entries(day)",
        [],
    )
    .context("Failed to create entries day index")?;
    Ok(())
}

fn create_bookings_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS bookings (
            id TEXT PRIMARY KEY,
            conference TEXT NOT NULL,
            booking_type TEXT NOT NULL,
            payload TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create bookings table")?;
    Ok(())
}

fn run_booking_migrations(conn: &Connection) -> Result<()> {
    migrations::ensure_column(
        conn,
        "bookings",
        "updated_at",
        "ALTER TABLE bookings ADD COLUMN updated_at TEXT",
    )
}
