use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create notes table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            file_path TEXT NOT NULL UNIQUE,
            content TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            embedding TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create attachments table; file name is the identity
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attachments (
            file_name TEXT PRIMARY KEY,
            note_id TEXT NOT NULL,
            file_path TEXT NOT NULL,
            description TEXT,
            embedding TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (note_id) REFERENCES notes(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create links table; the triple is the identity
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS links (
            from_id TEXT NOT NULL,
            to_id TEXT NOT NULL,
            label TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (from_id, to_id, label)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create claim_checks table (keyed result hand-off with expiry)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS claim_checks (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_notes_file_name ON notes(file_name)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_to_id ON links(to_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attachments_note_id ON attachments(note_id)")
        .execute(pool)
        .await?;

    Ok(())
}
