//! # notegraph
//!
//! A personal knowledge base over a directory of markdown notes.
//!
//! notegraph continuously synchronizes a vault of `.md` files into a
//! SQLite store, enriches notes with vector embeddings, materializes the
//! inline wikilink graph, and answers free-form questions through a
//! retrieval-augmented generation (RAG) pipeline grounded in the notes.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────────────────┐   ┌──────────┐
//! │   Vault   │──▶│  Sync pipeline                │──▶│  SQLite   │
//! │  (*.md)   │   │ scan → images → embed → links │   │ notes +   │
//! └───────────┘   └──────────────────────────────┘   │ links     │
//!                                                     └────┬─────┘
//!                                                          │
//!                        question ──▶ embed ──▶ top-K ──▶ 1-hop
//!                        expand ──▶ prompt ──▶ answer + sources
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! notegraph init                        # create database
//! notegraph sync                        # full vault synchronization
//! notegraph ask "what did I read about raft?"
//! notegraph find "distributed consensus"
//! notegraph stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`wikilink`] | Wikilink extraction and normalization |
//! | [`image_ref`] | Embedded image reference extraction |
//! | [`scan`] | Vault scanning and file-to-record diffing |
//! | [`links`] | Wikilink graph construction |
//! | [`attachments`] | Image captioning and attachment enrichment |
//! | [`embed`] | Batch embedding of notes missing vectors |
//! | [`rag`] | Retrieval, context expansion, and answering |
//! | [`sync`] | Full-sync orchestration with progress reporting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`vision`] | Image captioning provider abstraction |
//! | [`chat`] | Chat completion provider abstraction |
//! | [`store`] | SQLite-backed content store |
//! | [`claim_check`] | Keyed hand-off of large results with expiry |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod attachments;
pub mod chat;
pub mod claim_check;
pub mod config;
pub mod db;
pub mod embed;
pub mod embedding;
pub mod error;
pub mod image_ref;
pub mod links;
pub mod migrate;
pub mod models;
pub mod rag;
pub mod scan;
pub mod stats;
pub mod store;
pub mod sync;
pub mod vector;
pub mod vision;
pub mod wikilink;
