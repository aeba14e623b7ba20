//! JSONL-backed subscription store.
//!
//! Each user's subscriptions live in `<data_dir>/<user_id>.jsonl`, one JSON
//! record per line. Files are rewritten whole through a temp file and rename,
//! so a crash mid-write leaves the previous contents intact. The highest ID
//! ever assigned is kept in `<data_dir>/last_id` so IDs are never reused.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use tracker_core::models::{ListSubscriptionsRequest, Subscription};
use tracker_core::{Result, TrackerError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::repository::{apply_list_request, NewSubscription, SubscriptionRepository};

const LAST_ID_FILE: &str = "last_id";

/// File-backed [`SubscriptionRepository`].
#[derive(Debug, Clone)]
pub struct JsonlStore {
    root: PathBuf,
}

impl JsonlStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| TrackerError::FileWrite {
            path: root.clone(),
            source,
        })?;
        debug!("JSONL store opened at {}", root.display());
        Ok(Self { root })
    }

    /// Directory holding the per-user files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_file(&self, user_id: Uuid) -> PathBuf {
        self.root.join(format!("{}.jsonl", user_id))
    }

    /// Every `.jsonl` file directly under the root, sorted by path.
    fn find_jsonl_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .map(|ext| ext == "jsonl")
                        .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        files
    }

    /// All records across all users, in ascending ID order.
    fn load_all(&self) -> Result<Vec<Subscription>> {
        let mut all = Vec::new();
        for path in self.find_jsonl_files() {
            all.extend(read_records(&path)?);
        }
        all.sort_by_key(|s| s.id);
        Ok(all)
    }

    /// Records of one user, in ascending ID order. Missing file → empty.
    fn load_user(&self, user_id: Uuid) -> Result<Vec<Subscription>> {
        let path = self.user_file(user_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut records = read_records(&path)?;
        records.sort_by_key(|s| s.id);
        Ok(records)
    }

    /// Highest ID ever handed out. A missing or unreadable marker counts as 0.
    fn read_last_id(&self) -> Result<u64> {
        let path = self.root.join(LAST_ID_FILE);
        if !path.exists() {
            return Ok(0);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|source| TrackerError::FileRead { path: path.clone(), source })?;
        Ok(content.trim().parse().unwrap_or_else(|e| {
            warn!("Ignoring corrupt {}: {}", path.display(), e);
            0
        }))
    }

    fn write_last_id(&self, id: u64) -> Result<()> {
        let path = self.root.join(LAST_ID_FILE);
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, format!("{}\n", id)).map_err(|source| TrackerError::FileWrite {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| TrackerError::FileWrite { path, source })
    }

    /// Replace one user's file with `records`, removing it when empty.
    fn save_user(&self, user_id: Uuid, records: &[Subscription]) -> Result<()> {
        let path = self.user_file(user_id);
        if records.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)
                    .map_err(|source| TrackerError::FileWrite { path, source })?;
            }
            return Ok(());
        }

        let mut body = String::new();
        for record in records {
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("jsonl.tmp");
        std::fs::write(&tmp, body).map_err(|source| TrackerError::FileWrite {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| TrackerError::FileWrite { path, source })?;
        Ok(())
    }
}

impl SubscriptionRepository for JsonlStore {
    fn create(&mut self, new: NewSubscription) -> Result<Subscription> {
        let highest = self.load_all()?.iter().map(|s| s.id).max().unwrap_or(0);
        let next_id = self.read_last_id()?.max(highest) + 1;
        let sub = new.with_id(next_id);

        let mut records = self.load_user(sub.user_id)?;
        records.push(sub.clone());
        self.save_user(sub.user_id, &records)?;
        self.write_last_id(next_id)?;

        info!(
            id = sub.id,
            user_id = %sub.user_id,
            service = %sub.service_name,
            "subscription stored"
        );
        Ok(sub)
    }

    fn get(&self, id: u64) -> Result<Option<Subscription>> {
        Ok(self.load_all()?.into_iter().find(|s| s.id == id))
    }

    fn list(&self, request: &ListSubscriptionsRequest) -> Result<(usize, Vec<Subscription>)> {
        let records = match request.user_id {
            Some(user_id) => self.load_user(user_id)?,
            None => self.load_all()?,
        };
        Ok(apply_list_request(records, request))
    }

    fn update(&mut self, subscription: &Subscription) -> Result<()> {
        let mut records = self.load_user(subscription.user_id)?;
        let slot = records
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or(TrackerError::NotFound(subscription.id))?;
        *slot = subscription.clone();
        self.save_user(subscription.user_id, &records)
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        let owner = self
            .get(id)?
            .map(|s| s.user_id)
            .ok_or(TrackerError::NotFound(id))?;
        let mut records = self.load_user(owner)?;
        records.retain(|s| s.id != id);
        self.save_user(owner, &records)
    }

    fn find_by_user_and_service(
        &self,
        user_id: Uuid,
        service_name: &str,
    ) -> Result<Vec<Subscription>> {
        let found: Vec<Subscription> = self
            .load_user(user_id)?
            .into_iter()
            .filter(|s| s.service_name == service_name)
            .collect();
        debug!(
            user_id = %user_id,
            service = service_name,
            count = found.len(),
            "subscriptions loaded"
        );
        Ok(found)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Parse every well-formed line of a JSONL file. Blank lines are ignored;
/// malformed lines are skipped with a warning.
fn read_records(path: &Path) -> Result<Vec<Subscription>> {
    let file = std::fs::File::open(path).map_err(|source| TrackerError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = std::io::BufReader::new(file);

    let mut records = Vec::new();
    for (index, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|source| TrackerError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Subscription>(trimmed) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                "Skipping malformed line {} in {}: {}",
                index + 1,
                path.display(),
                e
            ),
        }
    }
    Ok(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn new_sub(user: Uuid, service: &str, price: i64) -> NewSubscription {
        NewSubscription {
            service_name: service.to_string(),
            price,
            user_id: user,
            start_date: ymd(2024, 1),
            end_date: Some(ymd(2024, 6)),
        }
    }

    fn open_tmp() -> (TempDir, JsonlStore) {
        let tmp = TempDir::new().expect("tempdir");
        let store = JsonlStore::open(tmp.path().join("data")).expect("open");
        (tmp, store)
    }

    // ── open ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_open_creates_directory() {
        let (tmp, store) = open_tmp();
        assert!(tmp.path().join("data").is_dir());
        assert_eq!(store.root(), tmp.path().join("data").as_path());
    }

    // ── create ────────────────────────────────────────────────────────────────

    #[test]
    fn test_create_writes_user_file() {
        let (_tmp, mut store) = open_tmp();
        let user = Uuid::from_u128(7);
        let sub = store.create(new_sub(user, "Netflix", 300)).unwrap();
        assert_eq!(sub.id, 1);

        let path = store.user_file(user);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"service_name\":\"Netflix\""));
        assert!(content.contains("\"start_date\":\"2024-01-01\""));
    }

    #[test]
    fn test_ids_are_global_across_users() {
        let (_tmp, mut store) = open_tmp();
        let a = store.create(new_sub(Uuid::from_u128(1), "Netflix", 1)).unwrap();
        let b = store.create(new_sub(Uuid::from_u128(2), "Netflix", 1)).unwrap();
        let c = store.create(new_sub(Uuid::from_u128(1), "Kion", 1)).unwrap();
        assert_eq!((a.id, b.id, c.id), (1, 2, 3));
    }

    #[test]
    fn test_records_survive_reopen() {
        let (tmp, mut store) = open_tmp();
        let user = Uuid::from_u128(9);
        store.create(new_sub(user, "Netflix", 300)).unwrap();

        let reopened = JsonlStore::open(tmp.path().join("data")).unwrap();
        let found = reopened.find_by_user_and_service(user, "Netflix").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].end_date, Some(ymd(2024, 6)));
    }

    #[test]
    fn test_ids_not_reused_after_deleting_highest() {
        let (tmp, mut store) = open_tmp();
        let user = Uuid::from_u128(6);
        store.create(new_sub(user, "Netflix", 1)).unwrap();
        let second = store.create(new_sub(user, "Netflix", 1)).unwrap();
        store.delete(second.id).unwrap();

        let third = store.create(new_sub(user, "Kion", 1)).unwrap();
        assert_eq!(third.id, 3);

        store.delete(third.id).unwrap();
        let mut reopened = JsonlStore::open(tmp.path().join("data")).unwrap();
        let fourth = reopened.create(new_sub(user, "Kion", 1)).unwrap();
        assert_eq!(fourth.id, 4);
    }

    #[test]
    fn test_existing_records_above_marker_win() {
        let (_tmp, mut store) = open_tmp();
        let user = Uuid::from_u128(8);
        let seeded = new_sub(user, "Netflix", 1).with_id(10);
        store.save_user(user, &[seeded]).unwrap();
        store.write_last_id(2).unwrap();

        let sub = store.create(new_sub(user, "Netflix", 1)).unwrap();
        assert_eq!(sub.id, 11);
    }

    // ── get / update / delete ─────────────────────────────────────────────────

    #[test]
    fn test_update_and_get() {
        let (_tmp, mut store) = open_tmp();
        let mut sub = store.create(new_sub(Uuid::from_u128(3), "Netflix", 300)).unwrap();
        sub.end_date = None;
        sub.price = 333;
        store.update(&sub).unwrap();

        let loaded = store.get(sub.id).unwrap().unwrap();
        assert_eq!(loaded.price, 333);
        assert!(loaded.end_date.is_none());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (_tmp, mut store) = open_tmp();
        let ghost = new_sub(Uuid::from_u128(3), "Netflix", 1).with_id(5);
        assert!(matches!(store.update(&ghost), Err(TrackerError::NotFound(5))));
    }

    #[test]
    fn test_delete_last_record_removes_file() {
        let (_tmp, mut store) = open_tmp();
        let user = Uuid::from_u128(4);
        let sub = store.create(new_sub(user, "Netflix", 300)).unwrap();
        store.delete(sub.id).unwrap();
        assert!(!store.user_file(user).exists());
        assert!(matches!(store.delete(sub.id), Err(TrackerError::NotFound(_))));
    }

    // ── list ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_list_across_users() {
        let (_tmp, mut store) = open_tmp();
        store.create(new_sub(Uuid::from_u128(1), "Netflix", 1)).unwrap();
        store.create(new_sub(Uuid::from_u128(2), "Netflix", 1)).unwrap();
        store.create(new_sub(Uuid::from_u128(2), "Kion", 1)).unwrap();

        let (total, _) = store.list(&ListSubscriptionsRequest::default()).unwrap();
        assert_eq!(total, 3);

        let request = ListSubscriptionsRequest {
            user_id: Some(Uuid::from_u128(2)),
            service_name: Some("Kion".to_string()),
            ..Default::default()
        };
        let (total, page) = store.list(&request).unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].id, 3);
    }

    // ── read_records ──────────────────────────────────────────────────────────

    #[test]
    fn test_malformed_lines_are_skipped() {
        let (_tmp, store) = open_tmp();
        let user = Uuid::from_u128(5);
        let good = new_sub(user, "Netflix", 300).with_id(1);
        let body = format!(
            "{}\nnot json\n\n{{\"id\": 2}}\n",
            serde_json::to_string(&good).unwrap()
        );
        std::fs::write(store.user_file(user), body).unwrap();

        let found = store.find_by_user_and_service(user, "Netflix").unwrap();
        assert_eq!(found, vec![good]);
    }

    #[test]
    fn test_non_jsonl_files_are_ignored() {
        let (_tmp, store) = open_tmp();
        std::fs::write(store.root().join("notes.txt"), "hello").unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }
}
