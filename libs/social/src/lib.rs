//! Social core: friendships and the XP leaderboard
//!
//! The crate is transport-agnostic. Callers hand in an already authenticated
//! acting user id and get plain results back:
//!
//! - [`FriendshipEngine`] runs the request / accept / decline / remove
//!   workflow and keeps both users' views of a relationship in sync.
//! - [`LeaderboardQuery`] ranks users by XP.
//! - [`UserDirectory`] is the storage seam, with in-memory and PostgreSQL
//!   backends.
//!
//! ```rust
//! use social::{FriendshipEngine, MemoryDirectory, NewUser, UserDirectory};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), social::SocialError> {
//! let directory = MemoryDirectory::new();
//! let alice = directory.create_user(NewUser::named("Alice")).await?.id;
//! let bob = directory.create_user(NewUser::named("Bob")).await?.id;
//!
//! let friendships = FriendshipEngine::new(directory);
//! friendships.send_request(alice, bob).await?;
//! friendships.accept_request(bob, alice).await?;
//! assert_eq!(friendships.list_friends(alice).await?[0].id, bob);
//! # Ok(())
//! # }
//! ```

pub mod directory;
pub mod error;
pub mod friendship;
pub mod leaderboard;
pub mod models;

pub use directory::{MemoryDirectory, PgDirectory, UserDirectory};
pub use error::{SocialError, SocialResult};
pub use friendship::FriendshipEngine;
pub use leaderboard::{DEFAULT_LIMIT, LeaderboardCache, LeaderboardQuery, MAX_LIMIT};
pub use models::{
    LeaderboardEntry, NewUser, Preferences, Progress, Relation, RelationSets, User, UserId,
    UserSummary,
};
