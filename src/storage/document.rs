use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};

const CACHE_TTL: Duration = Duration::from_millis(5000);

struct CacheEntry<T> {
  data: T,
  stamp: Instant,
}

/// Durable access to a single JSON document on disk.
///
/// Reads go through a short-lived cache; writes are serialized by a fair
/// async mutex and committed with a write-to-temp-then-rename scheme, with a
/// backup copy taken first so a failed write can be rolled back. Readers
/// therefore only ever see the document fully-before or fully-after a write,
/// never in between.
///
/// One instance owns one file. Callers that need read-modify-write atomicity
/// hold [`DocumentStore::lock`] across the whole sequence and finish with
/// `write_unlocked`; plain `write` takes the lock itself.
pub struct DocumentStore<T> {
  path: PathBuf,
  tmp_path: PathBuf,
  backup_path: PathBuf,
  cache_ttl: Duration,
  cache: parking_lot::Mutex<Option<CacheEntry<T>>>,
  lock: Mutex<()>,
}

impl<T> DocumentStore<T>
where
  T: Serialize + DeserializeOwned + Default + Clone,
{
  pub fn new(data_dir: impl AsRef<Path>, filename: &str) -> Self {
    Self::at_path(data_dir.as_ref().join(filename))
  }

  pub fn at_path(path: impl Into<PathBuf>) -> Self {
    let path = path.into();
    let tmp_path = sibling(&path, "tmp");
    let backup_path = sibling(&path, "backup");
    Self {
      path,
      tmp_path,
      backup_path,
      cache_ttl: CACHE_TTL,
      cache: parking_lot::Mutex::new(None),
      lock: Mutex::new(()),
    }
  }

  #[cfg(test)]
  fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
    self.cache_ttl = cache_ttl;
    self
  }

  pub fn path(&self) -> &Path {
    self.path.as_path()
  }

  /// Acquires the store-wide mutex. Hold the guard across a read followed by
  /// `write_unlocked` to get a race-free read-modify-write cycle; guarded
  /// operations run in arrival order.
  pub async fn lock(&self) -> MutexGuard<'_, ()> {
    self.lock.lock().await
  }

  /// Returns the document, served from cache when the cached copy is younger
  /// than the TTL. A missing file is not an error: it reads as the default
  /// (empty) document, which is also cached.
  ///
  /// Unlocked callers may observe data up to TTL milliseconds stale relative
  /// to an in-flight writer; callers that hold [`DocumentStore::lock`] get a
  /// view consistent with all committed writes, because every write
  /// invalidates the cache before releasing the lock.
  pub async fn read(&self) -> Result<T> {
    if let Some(data) = self.cached() {
      debug!("returning cached document for {}", self.path.display());
      return Ok(data);
    }

    let raw = match fs::read_to_string(&self.path).await {
      Ok(raw) => raw,
      Err(err) if err.kind() == ErrorKind::NotFound => {
        warn!(
          "document {} not found, starting with an empty one",
          self.path.display()
        );
        let empty = T::default();
        self.fill_cache(&empty);
        return Ok(empty);
      }
      Err(err) => {
        return Err(Error::Storage(format!(
          "Failed to load {}: {}",
          self.path.display(),
          err
        )));
      }
    };

    let data: T = serde_json::from_str(&raw).map_err(|err| {
      Error::Storage(format!("Failed to parse {}: {}", self.path.display(), err))
    })?;
    self.fill_cache(&data);
    Ok(data)
  }

  /// Replaces the document on disk. Takes the store mutex for the duration.
  pub async fn write(&self, data: &T) -> Result<()> {
    let _guard = self.lock.lock().await;
    self.write_unlocked(data).await
  }

  /// Write primitive for callers already holding [`DocumentStore::lock`].
  /// Never call this without the guard; never call `write` while holding it.
  pub(crate) async fn write_unlocked(&self, data: &T) -> Result<()> {
    if let Err(err) = self.commit(data).await {
      self.rollback().await;
      return Err(Error::Storage(format!(
        "Failed to save {}: {}",
        self.path.display(),
        err
      )));
    }

    self.invalidate_cache();

    // The committed write made the backup redundant; losing this cleanup is
    // harmless, so the error is not propagated.
    if let Err(err) = fs::remove_file(&self.backup_path).await {
      if err.kind() != ErrorKind::NotFound {
        debug!(
          "could not remove backup {}: {}",
          self.backup_path.display(),
          err
        );
      }
    }
    Ok(())
  }

  /// Checks that the document file exists, is readable and writable, and
  /// parses into a structurally valid document. Meant for health probes; a
  /// missing file fails the check even though `read` would tolerate it.
  pub async fn verify(&self) -> Result<()> {
    let mut file = fs::OpenOptions::new()
      .read(true)
      .write(true)
      .open(&self.path)
      .await
      .map_err(|err| {
        Error::Storage(format!(
          "document {} is not accessible: {}",
          self.path.display(),
          err
        ))
      })?;

    let mut raw = String::new();
    file.read_to_string(&mut raw).await.map_err(|err| {
      Error::Storage(format!(
        "document {} is not readable: {}",
        self.path.display(),
        err
      ))
    })?;

    serde_json::from_str::<T>(&raw).map_err(|err| {
      Error::Storage(format!(
        "document {} is not valid: {}",
        self.path.display(),
        err
      ))
    })?;
    Ok(())
  }

  /// Backup, stage, rename. The rename is the commit point: until it happens
  /// the primary file is untouched, after it the new document is fully
  /// visible.
  async fn commit(&self, data: &T) -> std::io::Result<()> {
    if let Some(dir) = self.path.parent() {
      fs::create_dir_all(dir).await?;
    }

    match fs::copy(&self.path, &self.backup_path).await {
      Ok(_) => debug!("backed up {}", self.path.display()),
      // First write, nothing to back up yet.
      Err(err) if err.kind() == ErrorKind::NotFound => {}
      Err(err) => return Err(err),
    }

    let json = serde_json::to_string_pretty(data)
      .map_err(|err| std::io::Error::new(ErrorKind::InvalidData, err))?;
    fs::write(&self.tmp_path, json).await?;
    fs::rename(&self.tmp_path, &self.path).await?;
    Ok(())
  }

  /// Best effort: restore the primary from the backup and drop the staging
  /// file. Failures here are logged but never override the write error that
  /// got us here.
  async fn rollback(&self) {
    match fs::copy(&self.backup_path, &self.path).await {
      Ok(_) => warn!(
        "write failed, restored {} from backup",
        self.path.display()
      ),
      Err(err) if err.kind() == ErrorKind::NotFound => {}
      Err(err) => error!(
        "rollback from {} failed: {}",
        self.backup_path.display(),
        err
      ),
    }

    if let Err(err) = fs::remove_file(&self.tmp_path).await {
      if err.kind() != ErrorKind::NotFound {
        debug!(
          "could not remove staging file {}: {}",
          self.tmp_path.display(),
          err
        );
      }
    }
  }

  fn cached(&self) -> Option<T> {
    let cache = self.cache.lock();
    match cache.as_ref() {
      Some(entry) if entry.stamp.elapsed() < self.cache_ttl => Some(entry.data.clone()),
      _ => None,
    }
  }

  fn fill_cache(&self, data: &T) {
    *self.cache.lock() = Some(CacheEntry {
      data: data.clone(),
      stamp: Instant::now(),
    });
  }

  fn invalidate_cache(&self) {
    *self.cache.lock() = None;
    debug!("cache invalidated for {}", self.path.display());
  }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
  PathBuf::from(format!("{}.{}", path.display(), suffix))
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use super::DocumentStore;

  #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
  struct Notes {
    notes: Vec<String>,
  }

  fn notes(items: &[&str]) -> Notes {
    Notes {
      notes: items.iter().map(|note| note.to_string()).collect(),
    }
  }

  fn store_in(dir: &tempfile::TempDir) -> DocumentStore<Notes> {
    DocumentStore::new(dir.path(), "notes.json")
  }

  #[tokio::test]
  async fn missing_file_reads_as_empty_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let doc = store.read().await.unwrap();
    assert_eq!(doc, Notes::default());
    assert!(!store.path().exists());
  }

  #[tokio::test]
  async fn write_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let doc = notes(&["one", "two"]);

    store.write(&doc).await.unwrap();
    assert_eq!(store.read().await.unwrap(), doc);
  }

  #[tokio::test]
  async fn write_creates_the_data_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store: DocumentStore<Notes> =
      DocumentStore::new(dir.path().join("nested").join("deeper"), "notes.json");

    store.write(&notes(&["one"])).await.unwrap();
    assert!(store.path().exists());
  }

  #[tokio::test]
  async fn successful_write_leaves_no_staging_or_backup_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store.write(&notes(&["one"])).await.unwrap();
    store.write(&notes(&["one", "two"])).await.unwrap();

    assert!(store.path().exists());
    assert!(!dir.path().join("notes.json.tmp").exists());
    assert!(!dir.path().join("notes.json.backup").exists());
  }

  #[tokio::test]
  async fn fresh_cache_serves_reads_without_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let doc = notes(&["one"]);

    store.write(&doc).await.unwrap();
    assert_eq!(store.read().await.unwrap(), doc);

    // Mutate the file behind the store's back; the cached copy wins until
    // the TTL expires.
    std::fs::write(store.path(), "{\"notes\":[\"sneaky\"]}").unwrap();
    assert_eq!(store.read().await.unwrap(), doc);
  }

  #[tokio::test]
  async fn expired_cache_falls_back_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir).with_cache_ttl(Duration::from_millis(0));
    let doc = notes(&["one"]);

    store.write(&doc).await.unwrap();
    assert_eq!(store.read().await.unwrap(), doc);

    std::fs::write(store.path(), "{\"notes\":[\"direct\"]}").unwrap();
    assert_eq!(store.read().await.unwrap(), notes(&["direct"]));
  }

  #[tokio::test]
  async fn write_invalidates_the_cache_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    store.write(&notes(&["one"])).await.unwrap();
    store.read().await.unwrap();
    store.write(&notes(&["one", "two"])).await.unwrap();

    assert_eq!(store.read().await.unwrap(), notes(&["one", "two"]));
  }

  #[tokio::test]
  async fn unparsable_file_is_a_storage_error_and_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::write(dir.path().join("notes.json"), "not json at all").unwrap();

    store.read().await.unwrap_err();
    // Still failing on the second read proves nothing bogus got cached.
    store.read().await.unwrap_err();
  }

  #[tokio::test]
  async fn failed_write_rolls_back_to_the_previous_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let original = notes(&["keep me"]);

    store.write(&original).await.unwrap();
    let on_disk_before = std::fs::read(store.path()).unwrap();

    // A directory squatting on the staging path makes the temp write fail
    // after the backup has been taken.
    std::fs::create_dir(dir.path().join("notes.json.tmp")).unwrap();
    let err = store.write(&notes(&["lost"])).await.unwrap_err();
    assert!(err.to_string().contains("Failed to save"));

    assert_eq!(std::fs::read(store.path()).unwrap(), on_disk_before);
    assert_eq!(store.read().await.unwrap(), original);

    // Once the obstruction is gone the store works again.
    std::fs::remove_dir(dir.path().join("notes.json.tmp")).unwrap();
    store.write(&notes(&["recovered"])).await.unwrap();
    assert_eq!(store.read().await.unwrap(), notes(&["recovered"]));
    assert!(!dir.path().join("notes.json.tmp").exists());
    assert!(!dir.path().join("notes.json.backup").exists());
  }

  #[tokio::test]
  async fn verify_reports_on_presence_and_validity() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    // No file yet: health check fails even though read() would not.
    store.verify().await.unwrap_err();

    store.write(&notes(&["one"])).await.unwrap();
    store.verify().await.unwrap();

    std::fs::write(store.path(), "{broken").unwrap();
    store.verify().await.unwrap_err();
  }
}
