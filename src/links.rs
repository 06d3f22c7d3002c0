//! Wikilink graph construction.
//!
//! Rebuilds the outgoing edges of a note from its current content.
//! Each rebuild first deletes every edge touching the note (both
//! directions), then re-inserts the outgoing edges its wikilinks
//! resolve to; incoming edges reappear when their source notes are
//! rebuilt.

use anyhow::Result;

use crate::models::{LinkBuildReport, LinkStats, RELATED_LABEL};
use crate::store::NoteStore;
use crate::wikilink;

/// Rebuild the edges for a single note from its content.
pub async fn build_links_for_note(store: &NoteStore, note_id: &str) -> Result<LinkStats> {
    let note = store
        .find_by_id(note_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("note {note_id} not found"))?;

    store.delete_links_touching(&note.id).await?;

    let mut stats = LinkStats::default();

    for target_name in wikilink::extract_wikilinks(&note.content) {
        let Some(target) = store.find_by_file_name(&target_name).await? else {
            tracing::warn!(
                from = %note.file_name,
                to = %target_name,
                "broken wikilink, target note not found"
            );
            stats.broken += 1;
            continue;
        };

        if target.id == note.id {
            continue;
        }

        if store
            .insert_link(&note.id, &target.id, RELATED_LABEL)
            .await?
        {
            stats.created += 1;
        }
    }

    Ok(stats)
}

/// Rebuild edges for a batch of changed notes. Per-note failures are
/// logged and do not abort the batch; ids that no longer resolve are
/// skipped.
pub async fn build_links_for_changed(
    store: &NoteStore,
    changed_ids: &[String],
) -> Result<LinkBuildReport> {
    let mut report = LinkBuildReport {
        total_notes: changed_ids.len(),
        ..Default::default()
    };

    for id in changed_ids {
        if store.find_by_id(id).await?.is_none() {
            tracing::warn!(note_id = %id, "changed note no longer exists, skipping links");
            continue;
        }

        match build_links_for_note(store, id).await {
            Ok(stats) => {
                report.total_links += stats.created;
                report.broken_links += stats.broken;
            }
            Err(e) => {
                tracing::warn!(note_id = %id, error = %e, "failed to build links");
            }
        }
    }

    tracing::info!(
        notes = report.total_notes,
        links = report.total_links,
        broken = report.broken_links,
        "link build complete"
    );

    Ok(report)
}

/// Ids of notes one hop away from `note_id`, outgoing neighbors first,
/// then incoming, duplicates removed while preserving order.
pub async fn related_ids(store: &NoteStore, note_id: &str) -> Result<Vec<String>> {
    let mut ids: Vec<String> = Vec::new();

    for link in store.outgoing_links(note_id).await? {
        if !ids.contains(&link.to_id) {
            ids.push(link.to_id);
        }
    }
    for link in store.incoming_links(note_id).await? {
        if !ids.contains(&link.from_id) {
            ids.push(link.from_id);
        }
    }

    Ok(ids)
}
