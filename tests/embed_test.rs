use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

use notegraph::config::{Config, DbConfig, VaultConfig};
use notegraph::embed::generate_missing_embeddings;
use notegraph::embedding::Embedder;
use notegraph::error::Failure;
use notegraph::store::NoteStore;
use notegraph::{db, migrate};

/// Fails any batch containing the marker text, succeeds otherwise.
struct PoisonEmbedder;

#[async_trait]
impl Embedder for PoisonEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Failure> {
        if texts.iter().any(|t| t.contains("poison")) {
            return Err(Failure::Provider("simulated outage".to_string()));
        }
        Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
    }
}

/// Returns one vector fewer than requested.
struct ShortEmbedder;

#[async_trait]
impl Embedder for ShortEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Failure> {
        Ok(texts.iter().skip(1).map(|_| vec![0.5, 0.5]).collect())
    }
}

/// Records every text it is asked to embed.
#[derive(Default)]
struct RecordingEmbedder {
    texts: Mutex<Vec<String>>,
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Failure> {
        self.texts.lock().unwrap().extend(texts.iter().cloned());
        Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
    }
}

fn test_config(dir: &Path) -> Config {
    Config {
        vault: VaultConfig {
            root: dir.to_path_buf(),
            image_dir: "img".to_string(),
        },
        db: DbConfig {
            path: dir.join("test.sqlite"),
        },
        embedding: Default::default(),
        chat: Default::default(),
        retrieval: Default::default(),
        claim_check: Default::default(),
    }
}

async fn setup() -> (tempfile::TempDir, NoteStore, Config) {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let pool = db::connect_at(&config.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    (dir, NoteStore::new(pool), config)
}

#[tokio::test]
async fn failed_batch_is_skipped_and_later_batches_still_run() {
    let (_dir, store, mut config) = setup().await;
    config.embedding.batch_size = 1;

    store
        .insert_note("a.md", "/v/a.md", "alpha body", 10)
        .await
        .unwrap();
    store
        .insert_note("b.md", "/v/b.md", "poison pill", 11)
        .await
        .unwrap();
    store
        .insert_note("c.md", "/v/c.md", "gamma body", 10)
        .await
        .unwrap();

    let generated = generate_missing_embeddings(&store, &PoisonEmbedder, &config)
        .await
        .unwrap();

    assert_eq!(generated, 2);

    let a = store.find_by_file_name("a.md").await.unwrap().unwrap();
    let b = store.find_by_file_name("b.md").await.unwrap().unwrap();
    let c = store.find_by_file_name("c.md").await.unwrap().unwrap();
    assert!(a.has_embedding());
    assert!(!b.has_embedding());
    assert!(c.has_embedding());

    // The failed note is still pending and gets retried next run.
    let pending = store.notes_missing_embedding().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].file_name, "b.md");
}

#[tokio::test]
async fn vector_count_mismatch_skips_batch() {
    let (_dir, store, config) = setup().await;

    store
        .insert_note("a.md", "/v/a.md", "alpha", 5)
        .await
        .unwrap();
    store
        .insert_note("b.md", "/v/b.md", "beta", 4)
        .await
        .unwrap();

    let generated = generate_missing_embeddings(&store, &ShortEmbedder, &config)
        .await
        .unwrap();

    assert_eq!(generated, 0);
    assert_eq!(store.notes_missing_embedding().await.unwrap().len(), 2);
}

#[tokio::test]
async fn captions_enrich_embedded_text() {
    let (_dir, store, config) = setup().await;

    let note = store
        .insert_note("a.md", "/v/a.md", "alpha body", 10)
        .await
        .unwrap();
    store
        .insert_attachment("chart.png", &note.id, "/v/img/chart.png", Some("a bar chart"))
        .await
        .unwrap();
    store
        .insert_attachment("blank.png", &note.id, "/v/img/blank.png", None)
        .await
        .unwrap();

    let embedder = RecordingEmbedder::default();
    let generated = generate_missing_embeddings(&store, &embedder, &config)
        .await
        .unwrap();

    assert_eq!(generated, 1);
    let texts = embedder.texts.lock().unwrap();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("alpha body"));
    assert!(texts[0].contains("[Image: chart.png]\na bar chart"));
    assert!(!texts[0].contains("blank.png"));
}
