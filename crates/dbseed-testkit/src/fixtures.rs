//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use dbseed_store::{MemoryStore, ObjectStoreExt};

/// Name of the upload directory inside a target directory.
pub const UPLOAD_DIR: &str = "uploadFiles";

/// Name of the seed data file inside a target directory.
pub const DATA_FILE: &str = "data.json";

/// A temporary target directory and an in-memory store.
///
/// The directory is removed when the fixture is dropped.
pub struct TestFixture {
    pub store: MemoryStore,
    dir: TempDir,
}

impl TestFixture {
    /// Create a fixture with an empty upload directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir(dir.path().join(UPLOAD_DIR)).expect("create upload dir");
        Self {
            store: MemoryStore::new(),
            dir,
        }
    }

    /// Create a fixture that uses the given store.
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            store,
            ..Self::new()
        }
    }

    /// The target directory.
    pub fn target_dir(&self) -> &Path {
        self.dir.path()
    }

    /// The upload directory inside the target directory.
    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join(UPLOAD_DIR)
    }

    /// The seed data file path.
    pub fn data_file(&self) -> PathBuf {
        self.dir.path().join(DATA_FILE)
    }

    /// Write a file into the upload directory.
    pub fn write_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.upload_dir().join(name);
        std::fs::write(&path, content).expect("write upload file");
        path
    }

    /// Remove a file from the upload directory.
    pub fn remove_file(&self, name: &str) {
        std::fs::remove_file(self.upload_dir().join(name)).expect("remove upload file");
    }

    /// Write `data.json` into the target directory.
    pub fn write_seed_data(&self, data: &serde_json::Value) {
        let text = serde_json::to_string_pretty(data).expect("serialize seed data");
        std::fs::write(self.data_file(), text).expect("write seed data");
    }

    /// Upload named text objects directly into the store's bucket.
    pub async fn seed_objects(&self, objects: &[(&str, &str)]) {
        for (name, content) in objects {
            self.store
                .upload_bytes(name, content.as_bytes())
                .await
                .expect("seed object");
        }
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbseed_store::ObjectStore;

    #[test]
    fn test_fixture_layout() {
        let fixture = TestFixture::new();
        assert!(fixture.upload_dir().is_dir());

        fixture.write_file("a.png", b"a");
        assert!(fixture.upload_dir().join("a.png").is_file());

        fixture.remove_file("a.png");
        assert!(!fixture.upload_dir().join("a.png").exists());
    }

    #[tokio::test]
    async fn test_seed_objects() {
        let fixture = TestFixture::new();
        fixture.seed_objects(&[("a", "1"), ("b", "2")]).await;

        let names = fixture.store.list_names().await.unwrap();
        assert_eq!(names.len(), 2);
    }
}
