//! Integration tests for the filesystem blob store.

use mipropina_core::error::MiPropinaError;
use mipropina_core::gateway::BlobStore;
use mipropina_db::FsBlobStore;

#[tokio::test]
async fn put_object_writes_under_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path(), "http://localhost:3000/assets");

    store
        .put_object(
            "brand-assets",
            "mipropina/cafe-luz/logo.png",
            b"png-bytes".to_vec(),
            "image/png",
        )
        .await
        .unwrap();

    let written = std::fs::read(dir.path().join("brand-assets/mipropina/cafe-luz/logo.png")).unwrap();
    assert_eq!(written, b"png-bytes");
    assert_eq!(
        store.public_url("brand-assets", "mipropina/cafe-luz/logo.png"),
        "http://localhost:3000/assets/brand-assets/mipropina/cafe-luz/logo.png"
    );
}

#[tokio::test]
async fn put_object_overwrites_existing_object() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path(), "http://cdn");

    for body in [b"first".to_vec(), b"second".to_vec()] {
        store
            .put_object("b", "logo.png", body, "image/png")
            .await
            .unwrap();
    }

    let written = std::fs::read(dir.path().join("b/logo.png")).unwrap();
    assert_eq!(written, b"second");

    // No temporary files left behind.
    let entries: Vec<_> = std::fs::read_dir(dir.path().join("b")).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn traversal_path_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path(), "http://cdn");

    let err = store
        .put_object("b", "../escape.png", b"x".to_vec(), "image/png")
        .await
        .unwrap_err();
    assert!(matches!(err, MiPropinaError::Internal(_)));
}
