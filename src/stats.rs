//! Store statistics for the `stats` command.

use anyhow::Result;

use crate::store::NoteStore;

pub async fn run_stats(store: &NoteStore) -> Result<()> {
    let notes = store.count_notes().await?;
    let embedded = store.count_embedded_notes().await?;
    let links = store.count_links().await?;
    let attachments = store.count_attachments().await?;
    let captioned = store.count_captioned_attachments().await?;

    println!("Notes:                {notes}");
    println!("  with embeddings:    {embedded}");
    println!("Links:                {links}");
    println!("Attachments:          {attachments}");
    println!("  with captions:      {captioned}");

    Ok(())
}
