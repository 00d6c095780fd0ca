//! Social core models

pub mod relation;
pub mod user;

// Re-export for convenience
pub use relation::{Relation, RelationSets};
pub use user::{
    LeaderboardEntry, NewUser, Preferences, Progress, User, UserId, UserSummary, level_for_xp,
};
