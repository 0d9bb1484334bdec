use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE stories (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL CHECK (length(trim(name)) > 0),
                email             TEXT NOT NULL CHECK (length(trim(email)) > 0),
                school            TEXT NOT NULL CHECK (length(trim(school)) > 0),
                location          TEXT NOT NULL CHECK (length(trim(location)) > 0),
                graduation        TEXT,
                story_type        TEXT NOT NULL CHECK (length(trim(story_type)) > 0),
                title             TEXT NOT NULL CHECK (length(trim(title)) > 0),
                body              TEXT NOT NULL CHECK (length(trim(body)) > 0),
                status            TEXT NOT NULL DEFAULT 'pending',
                rejection_reason  TEXT,
                created_at        TEXT NOT NULL,
                approved_at       TEXT,
                approved_by       TEXT
            );

            CREATE INDEX idx_stories_status
                ON stories(status, created_at);

            CREATE TABLE attachments (
                id             TEXT PRIMARY KEY,
                story_id       TEXT NOT NULL REFERENCES stories(id) ON DELETE CASCADE,
                position       INTEGER NOT NULL,
                original_name  TEXT NOT NULL,
                stored_name    TEXT NOT NULL,
                content_type   TEXT NOT NULL,
                byte_size      INTEGER NOT NULL
            );

            CREATE INDEX idx_attachments_story
                ON attachments(story_id, position);

            CREATE TABLE admins (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                email       TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
