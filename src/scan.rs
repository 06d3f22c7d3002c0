//! Vault scanning.
//!
//! Walks the vault for markdown files and diffs them against the store.
//! Change detection is size-based: a file whose byte length matches the
//! stored record is assumed unchanged and skipped without reading it.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;
use crate::models::ScanReport;
use crate::store::NoteStore;

enum FileOutcome {
    Created(String),
    Updated(String),
    Skipped,
}

/// Scan the vault and reconcile the note table with the files on disk.
///
/// Per-file errors are counted and logged, never fatal. An unreadable
/// or missing vault root and any directory-enumeration failure are
/// fatal: the deletion sweep relies on a complete disk set, and a
/// partial walk would make it remove live notes. Notes whose file
/// vanished are deleted along with their attachments and edges.
pub async fn scan_vault(store: &NoteStore, config: &Config) -> Result<ScanReport> {
    let root = config
        .vault
        .root
        .canonicalize()
        .with_context(|| format!("vault root not accessible: {}", config.vault.root.display()))?;
    if !root.is_dir() {
        anyhow::bail!("vault root is not a directory: {}", root.display());
    }

    let mut report = ScanReport::default();
    let mut disk_paths: HashSet<String> = HashSet::new();

    for entry in WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
    {
        // Enumeration failures abort the scan before the deletion
        // sweep; a file under an unreadable subtree is not a deleted
        // file.
        let entry = entry.context("failed to enumerate vault directory")?;

        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }

        report.total_files += 1;
        let path_str = entry.path().display().to_string();
        disk_paths.insert(path_str.clone());

        match sync_single_note(store, entry.path(), &path_str).await {
            Ok(FileOutcome::Created(id)) => {
                report.new_notes += 1;
                report.changed_note_ids.push(id);
            }
            Ok(FileOutcome::Updated(id)) => {
                report.updated_notes += 1;
                report.changed_note_ids.push(id);
            }
            Ok(FileOutcome::Skipped) => report.skipped_notes += 1,
            Err(e) => {
                tracing::warn!(file = %path_str, error = %e, "failed to sync note");
                report.error_notes += 1;
            }
        }
    }

    report.deleted_notes = store.delete_notes_not_on_disk(&disk_paths).await?;

    tracing::info!(
        total = report.total_files,
        new = report.new_notes,
        updated = report.updated_notes,
        skipped = report.skipped_notes,
        deleted = report.deleted_notes,
        errors = report.error_notes,
        "vault scan complete"
    );

    Ok(report)
}

async fn sync_single_note(
    store: &NoteStore,
    path: &Path,
    path_str: &str,
) -> Result<FileOutcome> {
    let metadata = std::fs::metadata(path)?;
    let file_size = metadata.len() as i64;

    match store.find_by_path(path_str).await? {
        None => {
            let content = std::fs::read_to_string(path)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path_str.to_string());
            let note = store
                .insert_note(&file_name, path_str, &content, file_size)
                .await?;
            tracing::debug!(file = %note.file_name, "note created");
            Ok(FileOutcome::Created(note.id))
        }
        Some(existing) if existing.file_size == file_size => Ok(FileOutcome::Skipped),
        Some(existing) => {
            let content = std::fs::read_to_string(path)?;
            store
                .update_note_content(&existing.id, &content, file_size)
                .await?;
            tracing::debug!(file = %existing.file_name, "note updated");
            Ok(FileOutcome::Updated(existing.id))
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("md"))
}
