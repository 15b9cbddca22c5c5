//! Saved comparison storage: trait plus a file-backed implementation.
//!
//! Bookmarks are plain records: which scans to compare and a note.
//! The file store keeps one JSON document per bookmark:
//! ```text
//! {root}/
//!   {bookmark_id}.json
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::Utc;
use scanhist_core::{Bookmark, BookmarkId, ScanId};

use crate::error::{Result, StoreError};

/// Trait for bookmark persistence backends.
pub trait BookmarkStore {
    /// Save a new bookmark. Scan ids are stored sorted and de-duplicated.
    fn create(&self, scan_ids: Vec<ScanId>, note: &str) -> Result<Bookmark>;

    fn get(&self, id: BookmarkId) -> Result<Bookmark>;

    /// All bookmarks, most recently updated first.
    fn list(&self) -> Result<Vec<Bookmark>>;

    /// Replace the note and bump `updated_at`.
    fn update_note(&self, id: BookmarkId, note: &str) -> Result<Bookmark>;

    fn delete(&self, id: BookmarkId) -> Result<()>;
}

pub struct FileBookmarkStore {
    root: PathBuf,
}

impl FileBookmarkStore {
    /// Create a new store rooted at the given directory.
    /// Creates the directory if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn bookmark_path(&self, id: BookmarkId) -> PathBuf {
        self.root.join(format!("{}.json", id.0))
    }

    fn write(&self, bookmark: &Bookmark) -> Result<()> {
        let json = serde_json::to_string_pretty(bookmark)?;
        fs::write(self.bookmark_path(bookmark.id), json)?;
        Ok(())
    }
}

impl BookmarkStore for FileBookmarkStore {
    fn create(&self, mut scan_ids: Vec<ScanId>, note: &str) -> Result<Bookmark> {
        scan_ids.sort();
        scan_ids.dedup();
        if scan_ids.is_empty() {
            return Err(StoreError::EmptyBookmark);
        }

        let bookmark = Bookmark::new(scan_ids, note);
        self.write(&bookmark)?;

        tracing::debug!(
            bookmark_id = %bookmark.id,
            scans = bookmark.scan_ids.len(),
            "Bookmark created"
        );
        Ok(bookmark)
    }

    fn get(&self, id: BookmarkId) -> Result<Bookmark> {
        match fs::read_to_string(self.bookmark_path(id)) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::BookmarkNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<Bookmark>> {
        let mut results = Vec::new();

        for entry in fs::read_dir(&self.root)?.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = fs::read_to_string(&path)?;
            results.push(serde_json::from_str::<Bookmark>(&json)?);
        }

        results.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(results)
    }

    fn update_note(&self, id: BookmarkId, note: &str) -> Result<Bookmark> {
        let mut bookmark = self.get(id)?;
        bookmark.note = note.to_string();
        bookmark.updated_at = Utc::now();
        self.write(&bookmark)?;
        Ok(bookmark)
    }

    fn delete(&self, id: BookmarkId) -> Result<()> {
        match fs::remove_file(self.bookmark_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::BookmarkNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[i64]) -> Vec<ScanId> {
        raw.iter().copied().map(ScanId).collect()
    }

    #[test]
    fn create_and_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBookmarkStore::new(dir.path()).unwrap();

        let created = store.create(ids(&[3, 1, 3, 2]), "weekly sweep").unwrap();
        let fetched = store.get(created.id).unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.scan_ids, ids(&[1, 2, 3]));
        assert_eq!(fetched.note, "weekly sweep");
    }

    #[test]
    fn create_rejects_empty_scan_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBookmarkStore::new(dir.path()).unwrap();

        let result = store.create(Vec::new(), "nothing");
        assert!(matches!(result, Err(StoreError::EmptyBookmark)));
    }

    #[test]
    fn update_note_bumps_updated_at() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBookmarkStore::new(dir.path()).unwrap();
        let created = store.create(ids(&[1, 2]), "before").unwrap();

        let updated = store.update_note(created.id, "after").unwrap();
        assert_eq!(updated.note, "after");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(store.get(created.id).unwrap().note, "after");
    }

    #[test]
    fn list_orders_by_most_recent_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBookmarkStore::new(dir.path()).unwrap();
        let first = store.create(ids(&[1, 2]), "first").unwrap();
        let second = store.create(ids(&[2, 3]), "second").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store.update_note(first.id, "first, revised").unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[test]
    fn delete_removes_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBookmarkStore::new(dir.path()).unwrap();
        let created = store.create(ids(&[4, 5]), "").unwrap();

        store.delete(created.id).unwrap();
        assert!(matches!(
            store.get(created.id),
            Err(StoreError::BookmarkNotFound(_))
        ));
        assert!(matches!(
            store.delete(created.id),
            Err(StoreError::BookmarkNotFound(_))
        ));
    }
}
