//! Attachment discovery and captioning.
//!
//! For every changed note, finds the embedded image references, locates
//! the files under the vault's image directory, captions new ones, and
//! embeds the caption so attachments participate in retrieval.
//!
//! An attachment is created once per unique file name and never updated
//! in place; a reference to an already-known image is a skip.

use anyhow::Result;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::Failure;
use crate::image_ref;
use crate::models::AttachmentReport;
use crate::store::NoteStore;
use crate::vision::VisionCaptioner;

/// Process image references for the given changed notes.
///
/// Per-image failures (missing file, caption failure, embed failure)
/// are counted and logged, never fatal.
pub async fn process_attachments(
    store: &NoteStore,
    captioner: &dyn VisionCaptioner,
    embedder: &dyn Embedder,
    config: &Config,
    changed_ids: &[String],
) -> Result<AttachmentReport> {
    let img_dir = config.vault.root.join(&config.vault.image_dir);
    let mut report = AttachmentReport::default();

    for note_id in changed_ids {
        let Some(note) = store.find_by_id(note_id).await? else {
            tracing::warn!(note_id = %note_id, "changed note no longer exists, skipping images");
            continue;
        };

        for image_name in image_ref::extract_image_references(&note.content) {
            if store.attachment_exists(&image_name).await? {
                report.skipped += 1;
                continue;
            }

            let image_path = img_dir.join(&image_name);
            if !image_path.is_file() {
                tracing::warn!(
                    note = %note.file_name,
                    image = %image_name,
                    "referenced image not found on disk"
                );
                report.errors += 1;
                continue;
            }

            let caption = match captioner.describe(&image_path, &note.content).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(image = %image_name, error = %e, "failed to caption image");
                    report.errors += 1;
                    continue;
                }
            };

            let path_str = image_path.display().to_string();
            let description = if caption.trim().is_empty() {
                None
            } else {
                Some(caption.as_str())
            };

            match store
                .insert_attachment(&image_name, &note.id, &path_str, description)
                .await
            {
                Ok(()) => {}
                Err(e) if e.downcast_ref::<Failure>().is_some_and(|f| matches!(f, Failure::Conflict(_))) => {
                    // Another note referenced the same image first.
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(image = %image_name, error = %e, "failed to store attachment");
                    report.errors += 1;
                    continue;
                }
            }

            if !caption.trim().is_empty() {
                match embedder.embed(&caption).await {
                    Ok(vector) => {
                        if let Err(e) = store
                            .update_attachment_embedding(&image_name, &vector)
                            .await
                        {
                            tracing::warn!(image = %image_name, error = %e, "failed to store attachment embedding");
                            report.errors += 1;
                            continue;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(image = %image_name, error = %e, "failed to embed caption");
                        report.errors += 1;
                        continue;
                    }
                }
            }

            tracing::debug!(image = %image_name, note = %note.file_name, "attachment processed");
            report.processed += 1;
        }
    }

    tracing::info!(
        processed = report.processed,
        skipped = report.skipped,
        errors = report.errors,
        "attachment processing complete"
    );

    Ok(report)
}
