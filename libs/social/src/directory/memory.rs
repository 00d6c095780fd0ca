//! In-process user directory
//!
//! Each user record sits behind its own mutex. Pair updates lock the two
//! records in ascending id order, so `update_pair(a, b)` and
//! `update_pair(b, a)` running concurrently cannot deadlock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use super::UserDirectory;
use crate::error::{SocialError, SocialResult};
use crate::leaderboard::select_top;
use crate::models::{
    LeaderboardEntry, NewUser, Progress, Relation, RelationSets, User, UserId, UserSummary,
    level_for_xp,
};

#[derive(Debug)]
struct UserRecord {
    user: User,
    relations: RelationSets,
}

type RecordHandle = Arc<Mutex<UserRecord>>;

/// User directory held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    records: Arc<RwLock<HashMap<UserId, RecordHandle>>>,
}

impl MemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of a user's relationship sets
    pub async fn relations(&self, id: UserId) -> SocialResult<RelationSets> {
        let record = self.record(id).await.ok_or(SocialError::UserNotFound(id))?;
        let record = record.lock().await;
        Ok(record.relations.clone())
    }

    async fn record(&self, id: UserId) -> Option<RecordHandle> {
        self.records.read().await.get(&id).cloned()
    }
}

impl UserDirectory for MemoryDirectory {
    async fn find_user(&self, id: UserId) -> SocialResult<Option<User>> {
        match self.record(id).await {
            Some(record) => Ok(Some(record.lock().await.user.clone())),
            None => Ok(None),
        }
    }

    async fn create_user(&self, new_user: NewUser) -> SocialResult<User> {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name: new_user.name,
            avatar: new_user.avatar,
            xp: 0,
            level: level_for_xp(0),
            preferences: new_user.preferences,
            created_at: now,
            updated_at: now,
        };

        let record = UserRecord {
            user: user.clone(),
            relations: RelationSets::default(),
        };
        self.records
            .write()
            .await
            .insert(user.id, Arc::new(Mutex::new(record)));

        Ok(user)
    }

    async fn record_progress(&self, id: UserId, progress: Progress) -> SocialResult<User> {
        let record = self.record(id).await.ok_or(SocialError::UserNotFound(id))?;
        let mut record = record.lock().await;

        record.user.xp = progress.xp;
        record.user.level = progress.level;
        record.user.updated_at = Utc::now();

        Ok(record.user.clone())
    }

    async fn peers(&self, id: UserId, relation: Relation) -> SocialResult<Vec<UserSummary>> {
        let ids = {
            let record = self.record(id).await.ok_or(SocialError::UserNotFound(id))?;
            let record = record.lock().await;
            record.relations.list(relation).to_vec()
        };

        let mut peers = Vec::with_capacity(ids.len());
        for peer in ids {
            if let Some(record) = self.record(peer).await {
                peers.push(record.lock().await.user.summary());
            }
        }

        Ok(peers)
    }

    async fn update_pair<T, F>(&self, a: UserId, b: UserId, apply: F) -> SocialResult<T>
    where
        T: Send,
        F: FnOnce(&mut Option<Relation>, &mut Option<Relation>) -> SocialResult<T> + Send,
    {
        if a == b {
            return Err(SocialError::InvalidTarget(b));
        }

        let (record_a, record_b) = {
            let records = self.records.read().await;
            let record_a = records.get(&a).cloned().ok_or(SocialError::UserNotFound(a))?;
            let record_b = records.get(&b).cloned().ok_or(SocialError::UserNotFound(b))?;
            (record_a, record_b)
        };

        let (mut guard_a, mut guard_b) = if a < b {
            let guard_a = record_a.lock().await;
            let guard_b = record_b.lock().await;
            (guard_a, guard_b)
        } else {
            let guard_b = record_b.lock().await;
            let guard_a = record_a.lock().await;
            (guard_a, guard_b)
        };

        let mut view_a = guard_a.relations.get(b);
        let mut view_b = guard_b.relations.get(a);

        let outcome = apply(&mut view_a, &mut view_b)?;

        guard_a.relations.set(b, view_a);
        guard_b.relations.set(a, view_b);

        Ok(outcome)
    }

    async fn top_by_xp(&self, limit: usize) -> SocialResult<Vec<LeaderboardEntry>> {
        let handles: Vec<RecordHandle> = self.records.read().await.values().cloned().collect();

        let mut entries = Vec::with_capacity(handles.len());
        for handle in handles {
            entries.push(LeaderboardEntry::for_user(&handle.lock().await.user));
        }

        Ok(select_top(entries, limit))
    }
}
