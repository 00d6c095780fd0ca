//! User directory: the system of record for users and their relations
//!
//! The friendship engine and the leaderboard only ever talk to a
//! [`UserDirectory`]. Two backends are provided: [`MemoryDirectory`] keeps
//! everything in process, [`PgDirectory`] stores users in PostgreSQL.

use std::future::Future;

use crate::error::SocialResult;
use crate::models::{LeaderboardEntry, NewUser, Progress, Relation, User, UserId, UserSummary};

pub mod memory;
pub mod postgres;

pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;

/// Storage operations needed by the social core.
///
/// Implementations must apply [`UserDirectory::update_pair`] atomically:
/// both users' views change together or not at all, and concurrent pair
/// updates touching a common user are serialized.
pub trait UserDirectory: Clone + Send + Sync + 'static {
    /// Look up a user by id
    fn find_user(&self, id: UserId) -> impl Future<Output = SocialResult<Option<User>>> + Send;

    /// Register a user with empty relationship sets
    fn create_user(&self, new_user: NewUser) -> impl Future<Output = SocialResult<User>> + Send;

    /// Store externally computed XP and level.
    ///
    /// Fails with `UserNotFound` when the user does not exist.
    fn record_progress(
        &self,
        id: UserId,
        progress: Progress,
    ) -> impl Future<Output = SocialResult<User>> + Send;

    /// Peers `id` holds `relation` toward, in insertion order.
    ///
    /// Fails with `UserNotFound` when `id` does not exist.
    fn peers(
        &self,
        id: UserId,
        relation: Relation,
    ) -> impl Future<Output = SocialResult<Vec<UserSummary>>> + Send;

    /// Atomically read and rewrite the relations between `a` and `b`.
    ///
    /// `apply` receives `a`'s view of `b` and `b`'s view of `a`. Changes are
    /// persisted only when it returns `Ok`. Fails with `UserNotFound` naming
    /// the first missing user, and with `InvalidTarget` when `a == b`.
    fn update_pair<T, F>(
        &self,
        a: UserId,
        b: UserId,
        apply: F,
    ) -> impl Future<Output = SocialResult<T>> + Send
    where
        T: Send,
        F: FnOnce(&mut Option<Relation>, &mut Option<Relation>) -> SocialResult<T> + Send;

    /// The `limit` highest-XP users, ties broken by ascending id, ranked from 1
    fn top_by_xp(
        &self,
        limit: usize,
    ) -> impl Future<Output = SocialResult<Vec<LeaderboardEntry>>> + Send;
}
