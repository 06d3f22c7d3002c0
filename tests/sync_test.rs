use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

use notegraph::claim_check::{ClaimCheckStore, SqliteClaimCheck};
use notegraph::config::{Config, DbConfig, VaultConfig};
use notegraph::embedding::Embedder;
use notegraph::error::Failure;
use notegraph::store::NoteStore;
use notegraph::sync::{run_full_sync, ProgressSink, SyncEvent, SyncPhase};
use notegraph::vision::VisionCaptioner;
use notegraph::{db, migrate};

struct MockEmbedder;

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Failure> {
        Ok(texts.iter().map(|_| vec![0.5, 0.5, 0.0]).collect())
    }
}

struct MockCaptioner;

#[async_trait]
impl VisionCaptioner for MockCaptioner {
    async fn describe(&self, _image_path: &Path, _context: &str) -> Result<String, Failure> {
        Ok("a test diagram".to_string())
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl ProgressSink for CollectingSink {
    fn report(&self, event: SyncEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn test_config(root: &Path, db_path: &Path) -> Config {
    Config {
        vault: VaultConfig {
            root: root.to_path_buf(),
            image_dir: "img".to_string(),
        },
        db: DbConfig {
            path: db_path.to_path_buf(),
        },
        embedding: Default::default(),
        chat: Default::default(),
        retrieval: Default::default(),
        claim_check: Default::default(),
    }
}

async fn setup(dir: &Path) -> (NoteStore, Config) {
    let vault = dir.join("vault");
    std::fs::create_dir_all(vault.join("img")).unwrap();
    let db_path = dir.join("test.sqlite");
    let pool = db::connect_at(&db_path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    (NoteStore::new(pool), test_config(&vault, &db_path))
}

#[tokio::test]
async fn full_sync_runs_phases_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    std::fs::write(
        config.vault.root.join("alpha.md"),
        "# Alpha\nlinks to [[beta]] and shows ![[chart.png]]",
    )
    .unwrap();
    std::fs::write(config.vault.root.join("beta.md"), "# Beta").unwrap();
    std::fs::write(config.vault.root.join("img/chart.png"), b"fakepng").unwrap();

    let sink = CollectingSink::default();
    let report = run_full_sync(&store, &MockEmbedder, &MockCaptioner, &config, &sink)
        .await
        .unwrap();

    assert_eq!(report.scan.new_notes, 2);
    assert_eq!(report.attachments.processed, 1);
    assert_eq!(report.embeddings_generated, 2);
    assert_eq!(report.links.total_links, 1);
    assert_eq!(report.links.broken_links, 0);

    let events = sink.events.lock().unwrap();
    let phases: Vec<(bool, SyncPhase)> = events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::PhaseStarted { phase } => Some((true, *phase)),
            SyncEvent::PhaseFinished { phase, .. } => Some((false, *phase)),
            SyncEvent::Failed { .. } => None,
        })
        .collect();

    assert_eq!(
        phases,
        vec![
            (true, SyncPhase::Scan),
            (false, SyncPhase::Scan),
            (true, SyncPhase::Attachments),
            (false, SyncPhase::Attachments),
            (true, SyncPhase::Embed),
            (false, SyncPhase::Embed),
            (true, SyncPhase::Links),
            (false, SyncPhase::Links),
        ]
    );
}

#[tokio::test]
async fn embed_phase_covers_preexisting_unembedded_notes() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    // A note from an earlier run that never got its vector.
    store
        .insert_note("old.md", "/elsewhere/old.md", "leftover", 8)
        .await
        .unwrap();

    let sink = CollectingSink::default();
    let report = run_full_sync(&store, &MockEmbedder, &MockCaptioner, &config, &sink)
        .await
        .unwrap();

    // The leftover note's file is not on disk, so the scan removes it
    // before the embed phase runs.
    assert_eq!(report.scan.deleted_notes, 1);
    assert_eq!(report.embeddings_generated, 0);

    // Now the other way around: the note exists on disk, the sync run
    // embeds it even though this scan reports it unchanged.
    std::fs::write(config.vault.root.join("kept.md"), "kept body").unwrap();
    run_full_sync(&store, &MockEmbedder, &MockCaptioner, &config, &sink)
        .await
        .unwrap();

    let kept = store.find_by_file_name("kept.md").await.unwrap().unwrap();
    store
        .update_note_content(&kept.id, "kept body", kept.file_size)
        .await
        .unwrap();

    let report = run_full_sync(&store, &MockEmbedder, &MockCaptioner, &config, &sink)
        .await
        .unwrap();
    assert_eq!(report.scan.skipped_notes, 1);
    assert_eq!(report.embeddings_generated, 1);
}

#[tokio::test]
async fn duplicate_image_reference_is_skip_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    std::fs::write(config.vault.root.join("one.md"), "![[shared.png]]").unwrap();
    std::fs::write(config.vault.root.join("two.md"), "also ![[shared.png]]").unwrap();
    std::fs::write(config.vault.root.join("img/shared.png"), b"fakepng").unwrap();

    let sink = CollectingSink::default();
    let report = run_full_sync(&store, &MockEmbedder, &MockCaptioner, &config, &sink)
        .await
        .unwrap();

    assert_eq!(report.attachments.processed, 1);
    assert_eq!(report.attachments.skipped, 1);
    assert_eq!(report.attachments.errors, 0);
    assert_eq!(store.count_attachments().await.unwrap(), 1);
}

#[tokio::test]
async fn missing_image_counts_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    std::fs::write(config.vault.root.join("note.md"), "![[ghost.png]]").unwrap();

    let sink = CollectingSink::default();
    let report = run_full_sync(&store, &MockEmbedder, &MockCaptioner, &config, &sink)
        .await
        .unwrap();

    assert_eq!(report.attachments.errors, 1);
    assert_eq!(report.attachments.processed, 0);
}

#[tokio::test]
async fn claim_check_roundtrip_and_expiry() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _config) = setup(dir.path()).await;
    let claim = SqliteClaimCheck::new(store.pool().clone());

    let value = serde_json::json!({ "new_notes": 3, "ok": true });
    claim.put_json("sync:result:abc", &value, 3600).await.unwrap();

    let fetched = claim.get_json("sync:result:abc").await.unwrap();
    assert_eq!(fetched, Some(value.clone()));

    // Overwrite with an already-expired entry; the next read drops it.
    claim.put_json("sync:result:abc", &value, -1).await.unwrap();
    assert_eq!(claim.get_json("sync:result:abc").await.unwrap(), None);
    assert_eq!(claim.get_json("sync:result:abc").await.unwrap(), None);
}
