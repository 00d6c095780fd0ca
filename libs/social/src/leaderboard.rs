//! Ranked leaderboard over the user directory
//!
//! Rankings are XP descending with ascending user id as the tie-break, so
//! repeated queries over unchanged data return the same order. An optional
//! [`LeaderboardCache`] keeps one global snapshot of the top
//! [`MAX_LIMIT`] users for a bounded staleness window.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::directory::UserDirectory;
use crate::error::{SocialError, SocialResult};
use crate::models::{LeaderboardEntry, Progress, User, UserId};

/// Number of entries returned when the caller does not ask for a bound
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest bound honored; larger requests are clamped
pub const MAX_LIMIT: i64 = 100;

/// Check a requested bound and clamp it to [`MAX_LIMIT`]
pub fn validate_limit(k: i64) -> SocialResult<usize> {
    if k <= 0 {
        return Err(SocialError::InvalidArgument(format!(
            "leaderboard limit must be positive, got {}",
            k
        )));
    }
    Ok(k.min(MAX_LIMIT) as usize)
}

/// Orders entries so that "greater" means "ranked higher".
struct Ranked(LeaderboardEntry);

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .xp
            .cmp(&other.0.xp)
            .then_with(|| other.0.id.cmp(&self.0.id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Pick the `limit` best entries with a bounded min-heap and assign ranks.
pub(crate) fn select_top<I>(entries: I, limit: usize) -> Vec<LeaderboardEntry>
where
    I: IntoIterator<Item = LeaderboardEntry>,
{
    if limit == 0 {
        return Vec::new();
    }

    let mut heap = BinaryHeap::with_capacity(limit + 1);
    for entry in entries {
        heap.push(Reverse(Ranked(entry)));
        if heap.len() > limit {
            heap.pop();
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .enumerate()
        .map(|(idx, Reverse(Ranked(mut entry)))| {
            entry.rank = idx as u32 + 1;
            entry
        })
        .collect()
}

struct Snapshot {
    entries: Vec<LeaderboardEntry>,
    taken_at: Instant,
}

/// Single global snapshot of the top of the leaderboard.
///
/// A snapshot is served while younger than the TTL. Every progress write
/// invalidates it; a fetch that raced with an invalidation is not stored.
pub struct LeaderboardCache {
    ttl: Duration,
    generation: AtomicU64,
    snapshot: RwLock<Option<Snapshot>>,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            generation: AtomicU64::new(0),
            snapshot: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop the current snapshot
    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, AtomicOrdering::SeqCst);
        *self.snapshot.write().await = None;
    }

    async fn fresh(&self, limit: usize) -> Option<Vec<LeaderboardEntry>> {
        let snapshot = self.snapshot.read().await;
        snapshot
            .as_ref()
            .filter(|s| s.taken_at.elapsed() < self.ttl)
            .map(|s| s.entries.iter().take(limit).cloned().collect())
    }

    fn generation(&self) -> u64 {
        self.generation.load(AtomicOrdering::SeqCst)
    }

    async fn store(&self, entries: Vec<LeaderboardEntry>, generation: u64) {
        let mut snapshot = self.snapshot.write().await;
        if self.generation() == generation {
            *snapshot = Some(Snapshot {
                entries,
                taken_at: Instant::now(),
            });
        }
    }
}

/// Top-K queries over a user directory
#[derive(Clone)]
pub struct LeaderboardQuery<D> {
    directory: D,
    cache: Option<Arc<LeaderboardCache>>,
}

impl<D: UserDirectory> LeaderboardQuery<D> {
    /// Uncached queries; every call scans the directory
    pub fn new(directory: D) -> Self {
        Self {
            directory,
            cache: None,
        }
    }

    /// Queries served from a snapshot at most `ttl` old. A zero TTL disables
    /// the cache.
    pub fn with_cache(directory: D, ttl: Duration) -> Self {
        let cache = (!ttl.is_zero()).then(|| Arc::new(LeaderboardCache::new(ttl)));
        Self { directory, cache }
    }

    /// The `k` highest-ranked users, best first.
    ///
    /// Fails with `InvalidArgument` when `k <= 0`; bounds above
    /// [`MAX_LIMIT`] are clamped.
    pub async fn top_users(&self, k: i64) -> SocialResult<Vec<LeaderboardEntry>> {
        let limit = validate_limit(k)?;

        let Some(cache) = &self.cache else {
            return self.directory.top_by_xp(limit).await;
        };

        if let Some(entries) = cache.fresh(limit).await {
            return Ok(entries);
        }

        let generation = cache.generation();
        let entries = self.directory.top_by_xp(MAX_LIMIT as usize).await?;
        let top = entries.iter().take(limit).cloned().collect();
        cache.store(entries, generation).await;

        Ok(top)
    }

    /// Store externally computed XP/level and invalidate the cached ranking
    pub async fn record_progress(&self, user: UserId, progress: Progress) -> SocialResult<User> {
        let updated = self.directory.record_progress(user, progress).await?;
        self.invalidate().await;
        Ok(updated)
    }

    pub async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::models::NewUser;
    use uuid::Uuid;

    fn entry(id: u128, xp: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            rank: 0,
            id: UserId(Uuid::from_u128(id)),
            name: format!("user-{}", id),
            avatar: None,
            level: 1,
            xp,
        }
    }

    async fn seed(directory: &MemoryDirectory, name: &str, xp: u64) -> UserId {
        let user = directory.create_user(NewUser::named(name)).await.unwrap();
        directory
            .record_progress(user.id, Progress::from_xp(xp))
            .await
            .unwrap();
        user.id
    }

    #[test]
    fn test_validate_limit() {
        assert!(matches!(
            validate_limit(0),
            Err(SocialError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_limit(-3),
            Err(SocialError::InvalidArgument(_))
        ));
        assert_eq!(validate_limit(1).unwrap(), 1);
        assert_eq!(validate_limit(DEFAULT_LIMIT).unwrap(), 10);
        assert_eq!(validate_limit(5_000).unwrap(), 100);
    }

    #[test]
    fn test_select_top_orders_and_ranks() {
        let entries = vec![entry(1, 900), entry(2, 1500), entry(3, 1200), entry(4, 100)];

        let top = select_top(entries, 3);
        let xp: Vec<_> = top.iter().map(|e| e.xp).collect();
        let ranks: Vec<_> = top.iter().map(|e| e.rank).collect();
        assert_eq!(xp, vec![1500, 1200, 900]);
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_select_top_breaks_ties_by_id() {
        let entries = vec![entry(30, 500), entry(10, 500), entry(20, 500), entry(5, 100)];

        let top = select_top(entries, 2);
        let ids: Vec<_> = top.iter().map(|e| e.id.0.as_u128()).collect();
        assert_eq!(ids, vec![10, 20]);
    }

    #[test]
    fn test_select_top_short_input() {
        assert_eq!(select_top(vec![entry(1, 1)], 10).len(), 1);
        assert!(select_top(Vec::new(), 10).is_empty());
        assert!(select_top(vec![entry(1, 1)], 0).is_empty());
    }

    #[tokio::test]
    async fn test_top_users_scenario() {
        let directory = MemoryDirectory::new();
        let alice = seed(&directory, "Alice Johnson", 1500).await;
        let bob = seed(&directory, "Bob Smith", 1200).await;
        seed(&directory, "Charlie Davis", 900).await;

        let leaderboard = LeaderboardQuery::new(directory);
        let top = leaderboard.top_users(2).await.unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, alice);
        assert_eq!(top[0].level, 15);
        assert_eq!(top[1].id, bob);
        assert_eq!(top[1].rank, 2);
    }

    #[tokio::test]
    async fn test_top_users_is_deterministic() {
        let directory = MemoryDirectory::new();
        for i in 0..20 {
            seed(&directory, &format!("user-{}", i), (i % 4) * 100).await;
        }

        let leaderboard = LeaderboardQuery::new(directory);
        let first = leaderboard.top_users(DEFAULT_LIMIT).await.unwrap();
        let second = leaderboard.top_users(DEFAULT_LIMIT).await.unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].xp >= w[1].xp));
    }

    #[tokio::test]
    async fn test_top_users_rejects_non_positive_bound() {
        let leaderboard = LeaderboardQuery::new(MemoryDirectory::new());
        let err = leaderboard.top_users(0).await.unwrap_err();
        assert!(matches!(err, SocialError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_cache_serves_snapshot_until_invalidated() {
        let directory = MemoryDirectory::new();
        let alice = seed(&directory, "Alice Johnson", 1500).await;
        let bob = seed(&directory, "Bob Smith", 1200).await;

        let leaderboard = LeaderboardQuery::with_cache(directory.clone(), Duration::from_secs(3600));
        assert_eq!(leaderboard.top_users(1).await.unwrap()[0].id, alice);

        // A write behind the cache's back is not visible yet.
        directory
            .record_progress(bob, Progress::from_xp(2000))
            .await
            .unwrap();
        assert_eq!(leaderboard.top_users(1).await.unwrap()[0].id, alice);

        leaderboard.invalidate().await;
        assert_eq!(leaderboard.top_users(1).await.unwrap()[0].id, bob);
    }

    #[tokio::test]
    async fn test_record_progress_invalidates_cache() {
        let directory = MemoryDirectory::new();
        let alice = seed(&directory, "Alice Johnson", 1500).await;
        let bob = seed(&directory, "Bob Smith", 1200).await;

        let leaderboard = LeaderboardQuery::with_cache(directory, Duration::from_secs(3600));
        assert_eq!(leaderboard.top_users(2).await.unwrap()[0].id, alice);

        let updated = leaderboard
            .record_progress(bob, Progress::from_xp(2500))
            .await
            .unwrap();
        assert_eq!(updated.level, 25);

        let top = leaderboard.top_users(2).await.unwrap();
        assert_eq!(top[0].id, bob);
        assert_eq!(top[1].id, alice);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let directory = MemoryDirectory::new();
        let alice = seed(&directory, "Alice Johnson", 1500).await;
        let bob = seed(&directory, "Bob Smith", 1200).await;

        let leaderboard = LeaderboardQuery::with_cache(directory.clone(), Duration::ZERO);
        assert_eq!(leaderboard.top_users(1).await.unwrap()[0].id, alice);

        directory
            .record_progress(bob, Progress::from_xp(2000))
            .await
            .unwrap();
        assert_eq!(leaderboard.top_users(1).await.unwrap()[0].id, bob);
    }
}
