use std::path::Path;

use notegraph::config::{ClaimCheckConfig, Config, DbConfig, VaultConfig};
use notegraph::scan::scan_vault;
use notegraph::store::NoteStore;
use notegraph::{db, migrate};

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
        claim_check: ClaimCheckConfig::default(),
    }
}

async fn setup(dir: &Path) -> (NoteStore, Config) {
    let vault = dir.join("vault");
    std::fs::create_dir_all(&vault).unwrap();
    let db_path = dir.join("test.sqlite");
    let pool = db::connect_at(&db_path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    (NoteStore::new(pool), test_config(&vault, &db_path))
}

#[tokio::test]
async fn first_scan_creates_notes() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    std::fs::write(config.vault.root.join("alpha.md"), "# Alpha\ncontent").unwrap();
    std::fs::write(config.vault.root.join("beta.md"), "# Beta").unwrap();

    let report = scan_vault(&store, &config).await.unwrap();

    assert_eq!(report.total_files, 2);
    assert_eq!(report.new_notes, 2);
    assert_eq!(report.updated_notes, 0);
    assert_eq!(report.skipped_notes, 0);
    assert_eq!(report.deleted_notes, 0);
    assert_eq!(report.changed_note_ids.len(), 2);
    assert_eq!(store.count_notes().await.unwrap(), 2);
}

#[tokio::test]
async fn unchanged_size_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    std::fs::write(config.vault.root.join("note.md"), "stable content").unwrap();
    scan_vault(&store, &config).await.unwrap();

    // Same byte length, different bytes: treated as unchanged.
    std::fs::write(config.vault.root.join("note.md"), "stable CONTENT").unwrap();
    let report = scan_vault(&store, &config).await.unwrap();

    assert_eq!(report.skipped_notes, 1);
    assert_eq!(report.updated_notes, 0);
    assert!(report.changed_note_ids.is_empty());
}

#[tokio::test]
async fn size_change_updates_and_clears_embedding() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    let path = config.vault.root.join("note.md");
    std::fs::write(&path, "original").unwrap();
    let report = scan_vault(&store, &config).await.unwrap();
    let id = report.changed_note_ids[0].clone();

    store
        .update_note_embedding(&id, &[0.1, 0.2, 0.3])
        .await
        .unwrap();
    assert!(store.find_by_id(&id).await.unwrap().unwrap().has_embedding());

    std::fs::write(&path, "much longer replacement content").unwrap();
    let report = scan_vault(&store, &config).await.unwrap();

    assert_eq!(report.updated_notes, 1);
    assert_eq!(report.changed_note_ids, vec![id.clone()]);

    let note = store.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(note.content, "much longer replacement content");
    assert!(!note.has_embedding());
}

#[tokio::test]
async fn deleted_files_remove_notes() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    std::fs::write(config.vault.root.join("keep.md"), "keep").unwrap();
    std::fs::write(config.vault.root.join("gone.md"), "gone").unwrap();
    scan_vault(&store, &config).await.unwrap();

    std::fs::remove_file(config.vault.root.join("gone.md")).unwrap();
    let report = scan_vault(&store, &config).await.unwrap();

    assert_eq!(report.deleted_notes, 1);
    assert_eq!(store.count_notes().await.unwrap(), 1);
    let remaining = store.all_notes().await.unwrap();
    assert_eq!(remaining[0].file_name, "keep.md");
}

#[tokio::test]
async fn hidden_directories_and_non_markdown_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    std::fs::write(config.vault.root.join("note.md"), "visible").unwrap();
    std::fs::write(config.vault.root.join("data.txt"), "not markdown").unwrap();

    let hidden = config.vault.root.join(".obsidian");
    std::fs::create_dir_all(&hidden).unwrap();
    std::fs::write(hidden.join("workspace.md"), "hidden").unwrap();

    let report = scan_vault(&store, &config).await.unwrap();

    assert_eq!(report.total_files, 1);
    assert_eq!(report.new_notes, 1);
}

#[tokio::test]
async fn nested_directories_are_scanned() {
    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    let nested = config.vault.root.join("projects").join("rust");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("deep.md"), "nested note").unwrap();

    let report = scan_vault(&store, &config).await.unwrap();

    assert_eq!(report.new_notes, 1);
    let notes = store.all_notes().await.unwrap();
    assert_eq!(notes[0].file_name, "deep.md");
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_subdirectory_aborts_scan_without_deleting() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let (store, config) = setup(dir.path()).await;

    let sub = config.vault.root.join("sub");
    std::fs::create_dir_all(&sub).unwrap();
    std::fs::write(sub.join("inner.md"), "inner").unwrap();
    std::fs::write(config.vault.root.join("top.md"), "top").unwrap();

    scan_vault(&store, &config).await.unwrap();
    assert_eq!(store.count_notes().await.unwrap(), 2);

    std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o000)).unwrap();
    // Directory permissions don't apply to root; nothing to observe.
    if std::fs::read_dir(&sub).is_ok() {
        std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = scan_vault(&store, &config).await;
    std::fs::set_permissions(&sub, std::fs::Permissions::from_mode(0o755)).unwrap();

    // The scan fails instead of sweeping away notes whose files are
    // merely unreadable.
    assert!(result.is_err());
    assert_eq!(store.count_notes().await.unwrap(), 2);
}

#[tokio::test]
async fn missing_vault_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (store, mut config) = setup(dir.path()).await;
    config.vault.root = dir.path().join("does-not-exist");

    assert!(scan_vault(&store, &config).await.is_err());
}
