use crate::error::{Result, SakegramError};
use crate::types::{NewPost, Post, PostStatus, PublishOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const DEFAULT_POST_LIMIT: usize = 100;

/// On-disk layout of `db.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// Durable list of posts backed by a single JSON file.
///
/// Every mutation is written to disk before it becomes visible in memory,
/// so a failed write leaves both sides unchanged.
pub struct PostStore {
    data: RwLock<StoreData>,
    file_path: PathBuf,
}

impl PostStore {
    /// Open the store, creating an empty file when none exists.
    ///
    /// A file that exists but cannot be parsed is an error: the server
    /// refuses to start rather than overwrite scheduled posts.
    pub fn open(file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();
        let data = if file_path.exists() {
            let contents = std::fs::read_to_string(&file_path)?;
            if contents.trim().is_empty() {
                StoreData::default()
            } else {
                serde_json::from_str::<StoreData>(&contents).map_err(|e| {
                    SakegramError::Json(format!("{}: {}", file_path.display(), e))
                })?
            }
        } else {
            StoreData::default()
        };

        let store = Self {
            data: RwLock::new(StoreData::default()),
            file_path,
        };
        store.persist(&data)?;
        *store.write() = data;

        tracing::info!(
            "Loaded {} posts from {}",
            store.len(),
            store.file_path.display()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn len(&self) -> usize {
        self.read().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All posts in insertion order.
    pub fn list(&self) -> Vec<Post> {
        self.read().posts.clone()
    }

    pub fn get(&self, id: i64) -> Option<Post> {
        self.read().posts.iter().find(|p| p.id == id).cloned()
    }

    /// Scheduled posts whose time has come, in insertion order.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<Post> {
        self.read()
            .posts
            .iter()
            .filter(|p| p.is_due(now))
            .cloned()
            .collect()
    }

    pub fn insert(&self, new_post: NewPost) -> Result<Post> {
        self.insert_at(new_post, Utc::now())
    }

    /// Insert with an explicit creation time. The id is the creation time
    /// in milliseconds, bumped past the largest existing id on collision.
    pub fn insert_at(&self, new_post: NewPost, now: DateTime<Utc>) -> Result<Post> {
        let mut guard = self.write();
        let last_id = guard.posts.iter().map(|p| p.id).max().unwrap_or(i64::MIN);
        let id = now.timestamp_millis().max(last_id.saturating_add(1));

        let post = Post {
            id,
            image_path: new_post.image_path,
            caption: new_post.caption,
            schedule_time: new_post.schedule_time,
            status: PostStatus::Scheduled,
            created_at: Some(now),
            posted_at: None,
            error: None,
            media_id: None,
        };

        let mut next = guard.clone();
        next.posts.push(post.clone());
        self.persist(&next)?;
        *guard = next;
        Ok(post)
    }

    /// Returns false when no post has that id.
    pub fn remove(&self, id: i64) -> Result<bool> {
        let mut guard = self.write();
        if !guard.posts.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        let mut next = guard.clone();
        next.posts.retain(|p| p.id != id);
        self.persist(&next)?;
        *guard = next;
        Ok(true)
    }

    pub fn record_outcome(
        &self,
        id: i64,
        outcome: &PublishOutcome,
        at: DateTime<Utc>,
    ) -> Result<Post> {
        let mut guard = self.write();
        let mut next = guard.clone();
        let post = next
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(SakegramError::PostNotFound(id))?;
        post.apply_outcome(outcome, at);
        let updated = post.clone();

        self.persist(&next)?;
        *guard = next;
        Ok(updated)
    }

    /// Keep at most `limit` posts, dropping the oldest first. Returns how
    /// many were removed.
    pub fn prune(&self, limit: usize) -> Result<usize> {
        let mut guard = self.write();
        let total = guard.posts.len();
        if total <= limit {
            return Ok(0);
        }

        let mut by_age: Vec<(i64, i64)> = guard.posts.iter().map(|p| (p.age_key(), p.id)).collect();
        by_age.sort();
        let doomed: std::collections::HashSet<i64> = by_age
            .iter()
            .take(total - limit)
            .map(|(_, id)| *id)
            .collect();

        let mut next = guard.clone();
        next.posts.retain(|p| !doomed.contains(&p.id));
        self.persist(&next)?;
        *guard = next;

        tracing::info!("Pruned {} old posts (limit {})", doomed.len(), limit);
        Ok(doomed.len())
    }

    fn persist(&self, data: &StoreData) -> Result<()> {
        let json = serde_json::to_vec_pretty(data)?;
        write_atomic(&self.file_path, &json)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Write via a temp file in the same directory and rename over the target,
/// so readers see either the old contents or the new ones.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| SakegramError::Io(e.error.to_string()))?;
    Ok(())
}
