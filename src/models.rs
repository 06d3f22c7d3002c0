//! Core data models used throughout notegraph.
//!
//! These types represent the notes, attachments, and graph edges that
//! flow through the sync and retrieval pipeline, plus the report
//! structs returned by each phase.

use serde::Serialize;

/// A markdown note stored in SQLite.
///
/// `file_path` uniquely identifies a note. `file_size` is the sole
/// change-detection signal between scans; `embedding` is the textual
/// vector literal (`[0.1,0.2,...]`) or `None` when not yet generated.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub content: String,
    pub file_size: i64,
    pub embedding: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Note {
    pub fn has_embedding(&self) -> bool {
        self.embedding.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// An image attachment referenced from a note.
///
/// Identity is the file name, assumed unique across the vault. Created
/// once the first time any note references the image; never updated in
/// place; deleted together with the owning note.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub note_id: String,
    pub file_path: String,
    pub description: Option<String>,
    pub embedding: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A directed wikilink edge between two notes.
///
/// Identity is the `(from_id, to_id, label)` triple; the label is fixed
/// to [`RELATED_LABEL`]. Never self-referential.
#[derive(Debug, Clone)]
pub struct Link {
    pub from_id: String,
    pub to_id: String,
    pub label: String,
    pub created_at: i64,
}

/// The single relation kind used for wikilink edges.
pub const RELATED_LABEL: &str = "RELATED";

/// Outcome of one vault scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub total_files: usize,
    pub new_notes: usize,
    pub updated_notes: usize,
    pub skipped_notes: usize,
    pub error_notes: usize,
    pub deleted_notes: usize,
    /// Ids of notes created or updated by this scan, in scan order.
    pub changed_note_ids: Vec<String>,
}

/// Outcome of attachment processing for one batch of notes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AttachmentReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Per-note link-building counts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LinkStats {
    pub created: usize,
    pub broken: usize,
}

/// Aggregate link-building counts for a changed-note batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkBuildReport {
    pub total_notes: usize,
    pub total_links: usize,
    pub broken_links: usize,
}

/// Result of one full synchronization run.
#[derive(Debug, Clone, Serialize)]
pub struct FullSyncReport {
    pub scan: ScanReport,
    pub attachments: AttachmentReport,
    pub embeddings_generated: usize,
    pub links: LinkBuildReport,
}

impl FullSyncReport {
    /// Human-readable summary for terminal output.
    pub fn summary(&self) -> String {
        format!(
            "files: {} total ({} new, {} updated, {} deleted)\n\
             images: {} processed ({} skipped, {} errors)\n\
             embeddings generated: {}\n\
             links: {} created ({} broken wikilinks)",
            self.scan.total_files,
            self.scan.new_notes,
            self.scan.updated_notes,
            self.scan.deleted_notes,
            self.attachments.processed,
            self.attachments.skipped,
            self.attachments.errors,
            self.embeddings_generated,
            self.links.total_links,
            self.links.broken_links,
        )
    }
}

/// Answer produced by the RAG pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    /// Final answer text, with the sources footer already appended.
    pub answer: String,
    /// File names of the direct semantic hits, in hit order.
    pub source_files: Vec<String>,
    /// Paths of attachments owned by direct hits, capped at the
    /// configured maximum.
    pub attachment_paths: Vec<String>,
}
