//! The Seeder: reset the database, insert seed records, then mirror files.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use dbseed_core::{CollectionName, ReconciliationPolicy, Record, SeedData};
use dbseed_store::{ObjectStore, RecordStore};
use dbseed_sync::{LocalDirectory, SyncReport, Synchronizer};

use crate::error::{Result, SeedError};

/// Upload directory name inside the target directory.
pub const UPLOAD_DIR: &str = "uploadFiles";

/// Seed data file name inside the target directory.
pub const DATA_FILE: &str = "data.json";

/// Configuration for a seeding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeederConfig {
    /// How files are reconciled against the bucket.
    pub policy: ReconciliationPolicy,
    /// Directory holding the seed data and upload directory.
    pub target_dir: PathBuf,
    /// Directory mirrored into the bucket.
    pub upload_dir: PathBuf,
    /// JSON file of seed records.
    pub data_file: PathBuf,
}

impl SeederConfig {
    /// Configuration for a target directory with the default layout.
    pub fn for_target(target_dir: impl Into<PathBuf>) -> Self {
        let target_dir = target_dir.into();
        Self {
            policy: ReconciliationPolicy::default(),
            upload_dir: target_dir.join(UPLOAD_DIR),
            data_file: target_dir.join(DATA_FILE),
            target_dir,
        }
    }

    pub fn with_policy(mut self, policy: ReconciliationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = path.into();
        self
    }
}

impl Default for SeederConfig {
    fn default() -> Self {
        Self::for_target("data")
    }
}

/// Report of a completed seeding run.
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    /// Record collections dropped during reset.
    pub dropped: Vec<String>,
    /// Records inserted per collection. Empty collections appear with 0.
    pub inserted: BTreeMap<String, usize>,
    /// Sum of `inserted`.
    pub total_inserted: usize,
    /// File synchronization outcome.
    pub sync: SyncReport,
}

/// Runs the seeding process against one store.
///
/// The store must serve both records and the bucket. The Seeder owns no
/// global state; everything comes in through the constructor.
pub struct Seeder<S> {
    store: Arc<S>,
    config: SeederConfig,
}

impl<S> Seeder<S>
where
    S: RecordStore + ObjectStore + 'static,
{
    pub fn new(store: S, config: SeederConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create from a store handle shared with the caller.
    pub fn from_shared(store: Arc<S>, config: SeederConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SeederConfig {
        &self.config
    }

    /// Execute one seeding run.
    pub async fn run(&self) -> Result<SeedReport> {
        tracing::info!(
            policy = %self.config.policy,
            target = %self.config.target_dir.display(),
            "seeding started"
        );

        // Nothing is dropped until the seed data has parsed.
        let data = self.load_seed_data().await?;
        let dropped = self.reset().await?;
        let inserted = self.insert(data).await?;
        let total_inserted = inserted.values().sum();

        let source = LocalDirectory::new(&self.config.upload_dir);
        let mut synchronizer =
            Synchronizer::new(Arc::clone(&self.store), source, self.config.policy);
        let sync = synchronizer.run().await?;

        Ok(SeedReport {
            dropped,
            inserted,
            total_inserted,
            sync,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Steps
    // ─────────────────────────────────────────────────────────────────────────

    /// Drop record collections. Under `AlwaysUpload` the bucket goes too.
    async fn reset(&self) -> Result<Vec<String>> {
        let collections = self.store.list_collections().await?;
        let dropped: Vec<String> = collections.into_iter().collect();

        if self.config.policy.resets_bucket() {
            self.store.drop_all().await?;
            for name in &dropped {
                tracing::info!(collection = %name, "dropped collection");
            }
            tracing::info!(bucket = %self.store.bucket().name, "dropped database including bucket");
        } else {
            for name in &dropped {
                if self.store.drop_collection(name).await? {
                    tracing::info!(collection = %name, "dropped collection");
                }
            }
        }

        Ok(dropped)
    }

    /// Read the seed data file. A missing file means no records.
    async fn load_seed_data(&self) -> Result<SeedData> {
        let path = &self.config.data_file;
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(SeedData::from_json_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "no seed data file, inserting no records");
                Ok(SeedData::new())
            }
            Err(source) => Err(SeedError::DataFile {
                path: path.clone(),
                source,
            }),
        }
    }

    /// Insert every collection in name order, assigning missing `_id`s.
    ///
    /// Sequence values already used as an explicit `_id` in the same
    /// collection are skipped.
    async fn insert(&self, data: SeedData) -> Result<BTreeMap<String, usize>> {
        let mut inserted = BTreeMap::new();

        for (collection, mut records) in data {
            if records.is_empty() {
                tracing::info!(collection = %collection, count = 0, "skipped empty collection");
                inserted.insert(collection.to_string(), 0);
                continue;
            }

            let taken: HashSet<String> = records.iter().filter_map(Record::id_key).collect();
            for record in &mut records {
                if record.id().is_none() {
                    let seq = self.free_seq(&collection, &taken).await?;
                    record.ensure_id(|| seq);
                }
            }

            let count = self.store.bulk_insert(&collection, records).await?;
            tracing::info!(collection = %collection, count, "inserted records");
            inserted.insert(collection.to_string(), count);
        }

        Ok(inserted)
    }

    async fn free_seq(&self, collection: &CollectionName, taken: &HashSet<String>) -> Result<u64> {
        loop {
            let seq = self.store.next_seq(collection.as_str()).await?;
            if !taken.contains(&seq.to_string()) {
                return Ok(seq);
            }
            tracing::debug!(collection = %collection, seq, "sequence value used as explicit _id");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_layout() {
        let config = SeederConfig::for_target("/srv/acme");
        assert_eq!(config.upload_dir, PathBuf::from("/srv/acme/uploadFiles"));
        assert_eq!(config.data_file, PathBuf::from("/srv/acme/data.json"));
        assert_eq!(config.policy, ReconciliationPolicy::UpdateOnly);
    }

    #[test]
    fn test_config_overrides() {
        let config = SeederConfig::for_target("t")
            .with_policy(ReconciliationPolicy::NoUpload)
            .with_upload_dir("files")
            .with_data_file("seed.json");
        assert_eq!(config.upload_dir, PathBuf::from("files"));
        assert_eq!(config.data_file, PathBuf::from("seed.json"));
        assert_eq!(config.policy, ReconciliationPolicy::NoUpload);
    }
}
