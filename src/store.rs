//! SQLite-backed content store.
//!
//! All note, attachment, and link persistence goes through
//! [`NoteStore`]. Nearest-neighbor ranking is computed here over the
//! stored vector literals (cosine similarity, descending), so callers
//! treat it as an opaque ranking oracle.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::Failure;
use crate::models::{Attachment, Link, Note};
use crate::vector;

#[derive(Clone)]
pub struct NoteStore {
    pool: SqlitePool,
}

impl NoteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ============ Notes ============

    pub async fn find_by_path(&self, file_path: &str) -> Result<Option<Note>> {
        let row = sqlx::query("SELECT * FROM notes WHERE file_path = ?")
            .bind(file_path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| note_from_row(&r)))
    }

    pub async fn find_by_file_name(&self, file_name: &str) -> Result<Option<Note>> {
        let row = sqlx::query("SELECT * FROM notes WHERE file_name = ? LIMIT 1")
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| note_from_row(&r)))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Note>> {
        let row = sqlx::query("SELECT * FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| note_from_row(&r)))
    }

    pub async fn all_notes(&self) -> Result<Vec<Note>> {
        let rows = sqlx::query("SELECT * FROM notes ORDER BY file_path")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(note_from_row).collect())
    }

    pub async fn insert_note(
        &self,
        file_name: &str,
        file_path: &str,
        content: &str,
        file_size: i64,
    ) -> Result<Note> {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO notes (id, file_name, file_path, content, file_size, embedding, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(file_name)
        .bind(file_path)
        .bind(content)
        .bind(file_size)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Note {
            id,
            file_name: file_name.to_string(),
            file_path: file_path.to_string(),
            content: content.to_string(),
            file_size,
            embedding: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrite content and size for a changed file. The stored
    /// embedding is cleared so it gets regenerated.
    pub async fn update_note_content(&self, id: &str, content: &str, file_size: i64) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "UPDATE notes SET content = ?, file_size = ?, embedding = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(content)
        .bind(file_size)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a note together with its attachments and every edge
    /// touching it, in either direction.
    pub async fn delete_note(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM links WHERE from_id = ? OR to_id = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM attachments WHERE note_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete every note whose path is absent from the disk set.
    /// Returns the number of notes removed.
    pub async fn delete_notes_not_on_disk(&self, disk_paths: &HashSet<String>) -> Result<usize> {
        let all = self.all_notes().await?;
        let mut deleted = 0usize;

        for note in all {
            if !disk_paths.contains(&note.file_path) {
                tracing::info!(file = %note.file_name, "note file no longer exists, deleting");
                self.delete_note(&note.id).await?;
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    /// Notes that still need a vector: NULL embedding and non-blank
    /// content.
    pub async fn notes_missing_embedding(&self) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            "SELECT * FROM notes WHERE embedding IS NULL AND LENGTH(TRIM(content)) > 0 ORDER BY file_path",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(note_from_row).collect())
    }

    pub async fn update_note_embedding(&self, id: &str, embedding: &[f32]) -> Result<()> {
        let literal = vector::to_literal(embedding);
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("UPDATE notes SET embedding = ?, updated_at = ? WHERE id = ?")
            .bind(&literal)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Failure::NotFound(format!("note {id} vanished before embedding")).into());
        }

        Ok(())
    }

    /// Top-`limit` notes nearest to the query vector, most similar
    /// first. Rows with a malformed stored literal are skipped.
    pub async fn find_nearest(&self, query: &[f32], limit: usize) -> Result<Vec<Note>> {
        let rows = sqlx::query("SELECT * FROM notes WHERE embedding IS NOT NULL")
            .fetch_all(&self.pool)
            .await?;

        let mut scored: Vec<(f32, Note)> = rows
            .iter()
            .map(note_from_row)
            .filter_map(|note| {
                let stored = vector::parse_literal(note.embedding.as_deref()?)?;
                Some((vector::cosine_similarity(query, &stored), note))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, note)| note).collect())
    }

    // ============ Links ============

    /// Remove every edge touching the note, incoming and outgoing.
    pub async fn delete_links_touching(&self, note_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM links WHERE from_id = ? OR to_id = ?")
            .bind(note_id)
            .bind(note_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Insert an edge; a conflicting triple is swallowed. Returns
    /// whether a new row was written.
    pub async fn insert_link(&self, from_id: &str, to_id: &str, label: &str) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO links (from_id, to_id, label, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(from_id)
        .bind(to_id)
        .bind(label)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn outgoing_links(&self, note_id: &str) -> Result<Vec<Link>> {
        let rows = sqlx::query("SELECT * FROM links WHERE from_id = ? ORDER BY created_at, to_id")
            .bind(note_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(link_from_row).collect())
    }

    pub async fn incoming_links(&self, note_id: &str) -> Result<Vec<Link>> {
        let rows = sqlx::query("SELECT * FROM links WHERE to_id = ? ORDER BY created_at, from_id")
            .bind(note_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(link_from_row).collect())
    }

    // ============ Attachments ============

    pub async fn attachment_exists(&self, file_name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attachments WHERE file_name = ?")
            .bind(file_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    /// Insert an attachment. A duplicate file name surfaces as
    /// [`Failure::Conflict`] so the caller can treat it as a skip.
    pub async fn insert_attachment(
        &self,
        file_name: &str,
        note_id: &str,
        file_path: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO attachments (file_name, note_id, file_path, description, embedding, created_at, updated_at)
            VALUES (?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(file_name)
        .bind(note_id)
        .bind(file_path)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(Failure::Conflict(format!("attachment {file_name} already exists")).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update_attachment_embedding(
        &self,
        file_name: &str,
        embedding: &[f32],
    ) -> Result<()> {
        let literal = vector::to_literal(embedding);
        let now = chrono::Utc::now().timestamp();
        sqlx::query("UPDATE attachments SET embedding = ?, updated_at = ? WHERE file_name = ?")
            .bind(&literal)
            .bind(now)
            .bind(file_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn attachments_for_note(&self, note_id: &str) -> Result<Vec<Attachment>> {
        let rows = sqlx::query("SELECT * FROM attachments WHERE note_id = ? ORDER BY file_name")
            .bind(note_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(attachment_from_row).collect())
    }

    // ============ Counters (stats) ============

    pub async fn count_notes(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM notes")
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn count_embedded_notes(&self) -> Result<i64> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    pub async fn count_links(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM links")
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn count_attachments(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM attachments")
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn count_captioned_attachments(&self) -> Result<i64> {
        Ok(sqlx::query_scalar(
            "SELECT COUNT(*) FROM attachments WHERE description IS NOT NULL AND LENGTH(TRIM(description)) > 0",
        )
        .fetch_one(&self.pool)
        .await?)
    }
}

fn note_from_row(row: &SqliteRow) -> Note {
    Note {
        id: row.get("id"),
        file_name: row.get("file_name"),
        file_path: row.get("file_path"),
        content: row.get("content"),
        file_size: row.get("file_size"),
        embedding: row.get("embedding"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn link_from_row(row: &SqliteRow) -> Link {
    Link {
        from_id: row.get("from_id"),
        to_id: row.get("to_id"),
        label: row.get("label"),
        created_at: row.get("created_at"),
    }
}

fn attachment_from_row(row: &SqliteRow) -> Attachment {
    Attachment {
        file_name: row.get("file_name"),
        note_id: row.get("note_id"),
        file_path: row.get("file_path"),
        description: row.get("description"),
        embedding: row.get("embedding"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
