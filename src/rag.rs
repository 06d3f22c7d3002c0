//! Retrieval-augmented answering over the note graph.
//!
//! A question is embedded, matched against note vectors, the hit set is
//! expanded one hop through the wikilink graph, and the combined
//! context is handed to the chat provider. Sources and attachment
//! paths come only from the direct semantic hits, never from graph
//! neighbors.

use anyhow::{Context, Result};

use crate::chat::ChatProvider;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::links;
use crate::models::RagAnswer;
use crate::store::NoteStore;

/// Returned verbatim when no embedded notes match the question.
pub const NO_CONTEXT_ANSWER: &str = "нич";

const SYSTEM_PROMPT: &str = "You are a personal knowledge base assistant. Answer the question \
using ONLY the provided context from the user's notes.\n\
\n\
Rules:\n\
- Base the answer on the context. If the context does not contain the answer, say so briefly.\n\
- If you add anything from general knowledge beyond the notes, prefix that part with \
\"⚠️ *Не з нотаток (AI knowledge):*\".\n\
- Answer in the same language as the question.\n\
- Never add a sources or references section; sources are appended separately.\n\
- Format for Telegram: no markdown headers (#), use *bold* and _italic_ sparingly, \
short paragraphs, plain dashes for lists.";

/// Answer a question against the vault.
pub async fn answer_question(
    store: &NoteStore,
    embedder: &dyn Embedder,
    chat: &dyn ChatProvider,
    config: &Config,
    question: &str,
) -> Result<RagAnswer> {
    let query = embedder
        .embed(question)
        .await
        .context("failed to embed question")?;

    let hits = store.find_nearest(&query, config.retrieval.top_k).await?;

    if hits.is_empty() {
        return Ok(RagAnswer {
            answer: NO_CONTEXT_ANSWER.to_string(),
            source_files: Vec::new(),
            attachment_paths: Vec::new(),
        });
    }

    let direct_ids: Vec<String> = hits.iter().map(|n| n.id.clone()).collect();

    // Expand one hop through the link graph, keeping insertion order.
    let mut context_ids: Vec<String> = direct_ids.clone();
    for id in &direct_ids {
        for related in links::related_ids(store, id).await? {
            if !context_ids.contains(&related) {
                context_ids.push(related);
            }
        }
    }

    let mut context = String::new();
    let mut attachment_paths: Vec<String> = Vec::new();

    for id in &context_ids {
        let Some(note) = store.find_by_id(id).await? else {
            continue;
        };

        context.push_str(&format!("--- File: {} ---\n{}\n", note.file_name, note.content));

        let attachments = store.attachments_for_note(&note.id).await?;
        let captioned: Vec<_> = attachments
            .iter()
            .filter(|a| a.description.as_deref().is_some_and(|d| !d.trim().is_empty()))
            .collect();

        if !captioned.is_empty() {
            context.push_str("\n[Attachments in this note:]\n");
            for attachment in &captioned {
                context.push_str(&format!(
                    "- {}: {}\n",
                    attachment.file_name,
                    attachment.description.as_deref().unwrap_or_default()
                ));
            }
        }

        // Only direct hits contribute returned attachment paths.
        if direct_ids.contains(id) {
            for attachment in &attachments {
                if attachment_paths.len() < config.retrieval.max_attachments {
                    attachment_paths.push(attachment.file_path.clone());
                }
            }
        }

        context.push('\n');
    }

    let user_prompt = format!("Context from notes:\n{context}\n\nQuestion: {question}\n");

    let mut answer = chat
        .complete(SYSTEM_PROMPT, &user_prompt)
        .await
        .context("chat completion failed")?;

    let source_files: Vec<String> = hits.iter().map(|n| n.file_name.clone()).collect();

    if !source_files.is_empty() {
        answer.push_str("\n\n---\nSources:\n");
        for file in &source_files {
            answer.push_str(&format!("- {file}\n"));
        }
    }

    Ok(RagAnswer {
        answer,
        source_files,
        attachment_paths,
    })
}

/// Semantic search returning matching note file names, most similar
/// first.
pub async fn find_notes(
    store: &NoteStore,
    embedder: &dyn Embedder,
    query: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let vector = embedder.embed(query).await.context("failed to embed query")?;
    let hits = store.find_nearest(&vector, limit).await?;
    Ok(hits.into_iter().map(|n| n.file_name).collect())
}

/// Find notes related to the given content, excluding the note itself.
pub async fn analyze_note(
    store: &NoteStore,
    embedder: &dyn Embedder,
    config: &Config,
    file_name: &str,
    content: &str,
) -> Result<Vec<String>> {
    let vector = embedder
        .embed(content)
        .await
        .context("failed to embed note content")?;

    let candidates = store
        .find_nearest(&vector, config.retrieval.analyze_candidates)
        .await?;

    Ok(candidates
        .into_iter()
        .map(|n| n.file_name)
        .filter(|name| name != file_name)
        .take(config.retrieval.analyze_limit)
        .collect())
}
