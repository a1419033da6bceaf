use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use stockroom_core::{MediaId, UserId};
use stockroom_inventory::{InventoryId, InventoryMedia, MediaKind};

use super::CollaboratorError;

/// A file to store as evidence on a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn photo(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: MediaKind::Photo,
            bytes,
        }
    }
}

/// Stores and deletes media files.
pub trait MediaStore: Send + Sync {
    /// Store a file for `owner`, returning its url.
    fn upload(&self, owner: InventoryId, file: &MediaUpload) -> Result<String, CollaboratorError>;

    fn delete(&self, url: &str) -> Result<(), CollaboratorError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    pub file_name: String,
    pub reason: String,
}

/// Outcome of a multi-file upload. Individual failures do not abort the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: Vec<InventoryMedia>,
    pub failed: Vec<FailedUpload>,
}

impl UploadReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_partial_failure(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> + '_ {
        self.uploaded.iter().map(|m| m.url.as_str())
    }
}

/// Upload every file, collecting successes and failures.
pub fn upload_all(
    store: &dyn MediaStore,
    owner: InventoryId,
    files: &[MediaUpload],
    uploaded_by: UserId,
    uploaded_at: DateTime<Utc>,
) -> UploadReport {
    let mut report = UploadReport::default();
    for file in files {
        match store.upload(owner, file) {
            Ok(url) => report.uploaded.push(InventoryMedia {
                id: MediaId::new(),
                url,
                kind: file.kind,
                file_name: file.file_name.clone(),
                uploaded_at,
                uploaded_by,
            }),
            Err(err) => {
                warn!(record_id = %owner, file = %file.file_name, error = %err, "media upload failed");
                report.failed.push(FailedUpload {
                    file_name: file.file_name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

/// Delete stored files, logging failures. Returns how many could not be deleted.
pub(crate) fn delete_all<'a>(store: &dyn MediaStore, urls: impl IntoIterator<Item = &'a str>) -> usize {
    let mut failed = 0;
    for url in urls {
        if let Err(err) = store.delete(url) {
            warn!(url, error = %err, "media delete failed");
            failed += 1;
        }
    }
    failed
}

/// In-memory media store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryMediaStore {
    files: RwLock<HashMap<String, InventoryId>>,
    rejected_names: RwLock<HashSet<String>>,
    fail_deletes: AtomicBool,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads of files with this name will fail.
    pub fn reject_file(&self, file_name: impl Into<String>) {
        if let Ok(mut names) = self.rejected_names.write() {
            names.insert(file_name.into());
        }
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.files
            .read()
            .map(|f| f.contains_key(url))
            .unwrap_or(false)
    }

    pub fn stored_count(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }
}

impl MediaStore for InMemoryMediaStore {
    fn upload(&self, owner: InventoryId, file: &MediaUpload) -> Result<String, CollaboratorError> {
        let rejected = self
            .rejected_names
            .read()
            .map(|names| names.contains(&file.file_name))
            .unwrap_or(false);
        if rejected {
            return Err(CollaboratorError::Unavailable(format!(
                "upload of `{}` failed",
                file.file_name
            )));
        }
        if file.bytes.is_empty() {
            return Err(CollaboratorError::Rejected(format!(
                "`{}` is empty",
                file.file_name
            )));
        }

        let url = format!(
            "memory://inventory/{owner}/{}-{}",
            Uuid::now_v7(),
            file.file_name
        );
        let mut files = self
            .files
            .write()
            .map_err(|_| CollaboratorError::Unavailable("lock poisoned".to_string()))?;
        files.insert(url.clone(), owner);
        Ok(url)
    }

    fn delete(&self, url: &str) -> Result<(), CollaboratorError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable(format!("delete of {url} failed")));
        }
        let mut files = self
            .files
            .write()
            .map_err(|_| CollaboratorError::Unavailable("lock poisoned".to_string()))?;
        files
            .remove(url)
            .map(|_| ())
            .ok_or_else(|| CollaboratorError::NotFound(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_upload_failure_is_reported() {
        let store = InMemoryMediaStore::new();
        store.reject_file("blurry.jpg");
        let owner = InventoryId::generate();
        let files = vec![
            MediaUpload::photo("front.jpg", vec![1, 2, 3]),
            MediaUpload::photo("blurry.jpg", vec![4]),
            MediaUpload::photo("empty.jpg", vec![]),
        ];

        let report = upload_all(&store, owner, &files, UserId::new(), Utc::now());

        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.failed_count(), 2);
        assert!(report.is_partial_failure());
        let url = report.uploaded[0].url.clone();
        assert!(store.contains(&url));

        assert_eq!(delete_all(&store, report.urls()), 0);
        assert_eq!(store.stored_count(), 0);
    }
}
