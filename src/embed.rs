//! Batch embedding of notes that are missing vectors.
//!
//! Content sent to the embedder is enriched with the captions of the
//! note's attachments so images are searchable through their owning
//! note.

use anyhow::Result;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::models::Note;
use crate::store::NoteStore;

/// Embed every note whose vector is missing, in configured batch
/// sizes. Returns the number of notes embedded. A failed batch is
/// skipped, not fatal.
pub async fn generate_missing_embeddings(
    store: &NoteStore,
    embedder: &dyn Embedder,
    config: &Config,
) -> Result<usize> {
    let pending = store.notes_missing_embedding().await?;
    if pending.is_empty() {
        return Ok(0);
    }

    tracing::info!(count = pending.len(), "generating missing embeddings");

    let mut generated = 0usize;

    for batch in pending.chunks(config.embedding.batch_size) {
        let texts = match batch_texts(store, batch).await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(batch_size = batch.len(), error = %e, "failed to enrich batch, skipping");
                continue;
            }
        };

        let vectors = match embedder.embed_batch(&texts).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(batch_size = batch.len(), error = %e, "embedding batch failed, skipping");
                continue;
            }
        };

        if vectors.len() != batch.len() {
            tracing::warn!(
                expected = batch.len(),
                got = vectors.len(),
                "embedding count mismatch, skipping batch"
            );
            continue;
        }

        for (note, vector) in batch.iter().zip(vectors.iter()) {
            match store.update_note_embedding(&note.id, vector).await {
                Ok(()) => generated += 1,
                Err(e) => {
                    tracing::warn!(file = %note.file_name, error = %e, "failed to store embedding");
                }
            }
        }
    }

    tracing::info!(generated, "embedding generation complete");
    Ok(generated)
}

async fn batch_texts(store: &NoteStore, batch: &[Note]) -> Result<Vec<String>> {
    let mut texts = Vec::with_capacity(batch.len());
    for note in batch {
        texts.push(enriched_content(store, note).await?);
    }
    Ok(texts)
}

/// Note content plus an `[Image: ...]` block per captioned attachment.
async fn enriched_content(store: &NoteStore, note: &Note) -> Result<String> {
    let mut text = note.content.clone();

    for attachment in store.attachments_for_note(&note.id).await? {
        if let Some(caption) = attachment
            .description
            .as_deref()
            .filter(|c| !c.trim().is_empty())
        {
            text.push_str(&format!(
                "\n\n[Image: {}]\n{}",
                attachment.file_name, caption
            ));
        }
    }

    Ok(text)
}
