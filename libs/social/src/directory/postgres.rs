//! PostgreSQL user directory
//!
//! Each user's view of a peer is one row of `user_relations`, so a pending
//! request or a friendship is two rows, one per side. Pair updates run in a
//! single transaction that first locks both `users` rows in id order.

use common::error::DatabaseError;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Row};
use tracing::debug;

use super::UserDirectory;
use crate::error::{SocialError, SocialResult};
use crate::models::{
    LeaderboardEntry, NewUser, Preferences, Progress, Relation, User, UserId, UserSummary,
    level_for_xp,
};

const USER_COLUMNS: &str = "id, name, avatar, xp, level, preferences, created_at, updated_at";

/// User directory backed by PostgreSQL
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    /// Create a new directory over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_error(e: sqlx::Error) -> SocialError {
    SocialError::Database(DatabaseError::Query(e))
}

fn to_db_xp(xp: u64) -> SocialResult<i64> {
    i64::try_from(xp).map_err(|_| SocialError::InvalidArgument(format!("xp {} is too large", xp)))
}

fn from_db_xp(xp: i64) -> SocialResult<u64> {
    u64::try_from(xp)
        .map_err(|_| DatabaseError::CorruptRow(format!("negative xp {}", xp)).into())
}

fn from_db_level(level: i32) -> SocialResult<u32> {
    u32::try_from(level)
        .map_err(|_| DatabaseError::CorruptRow(format!("negative level {}", level)).into())
}

fn user_from_row(row: &PgRow) -> SocialResult<User> {
    let preferences: Json<Preferences> = row.try_get("preferences").map_err(query_error)?;

    Ok(User {
        id: row.try_get("id").map_err(query_error)?,
        name: row.try_get("name").map_err(query_error)?,
        avatar: row.try_get("avatar").map_err(query_error)?,
        xp: from_db_xp(row.try_get("xp").map_err(query_error)?)?,
        level: from_db_level(row.try_get("level").map_err(query_error)?)?,
        preferences: preferences.0,
        created_at: row.try_get("created_at").map_err(query_error)?,
        updated_at: row.try_get("updated_at").map_err(query_error)?,
    })
}

/// Replace `owner`'s view of `peer` inside an open transaction
async fn write_view(
    conn: &mut PgConnection,
    owner: UserId,
    peer: UserId,
    relation: Option<Relation>,
) -> SocialResult<()> {
    sqlx::query("DELETE FROM user_relations WHERE user_id = $1 AND peer_id = $2")
        .bind(owner)
        .bind(peer)
        .execute(&mut *conn)
        .await
        .map_err(query_error)?;

    if let Some(relation) = relation {
        sqlx::query("INSERT INTO user_relations (user_id, peer_id, kind) VALUES ($1, $2, $3)")
            .bind(owner)
            .bind(peer)
            .bind(relation.as_str())
            .execute(&mut *conn)
            .await
            .map_err(query_error)?;
    }

    Ok(())
}

impl UserDirectory for PgDirectory {
    async fn find_user(&self, id: UserId) -> SocialResult<Option<User>> {
        debug!("Finding user by ID: {}", id);

        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_user(&self, new_user: NewUser) -> SocialResult<User> {
        debug!("Creating user: {}", new_user.name);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, name, avatar, xp, level, preferences)
            VALUES ($1, $2, $3, 0, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(UserId::new())
        .bind(&new_user.name)
        .bind(&new_user.avatar)
        .bind(level_for_xp(0) as i32)
        .bind(Json(&new_user.preferences))
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;

        user_from_row(&row)
    }

    async fn record_progress(&self, id: UserId, progress: Progress) -> SocialResult<User> {
        debug!("Recording progress for user {}: {:?}", id, progress);

        let level = i32::try_from(progress.level).map_err(|_| {
            SocialError::InvalidArgument(format!("level {} is too large", progress.level))
        })?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE users
            SET xp = $2, level = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(to_db_xp(progress.xp)?)
        .bind(level)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(SocialError::UserNotFound(id)),
        }
    }

    async fn peers(&self, id: UserId, relation: Relation) -> SocialResult<Vec<UserSummary>> {
        debug!("Listing {} peers of user {}", relation, id);

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;
        if !exists {
            return Err(SocialError::UserNotFound(id));
        }

        let rows = sqlx::query(
            r#"
            SELECT u.id, u.name, u.avatar
            FROM user_relations r
            JOIN users u ON u.id = r.peer_id
            WHERE r.user_id = $1 AND r.kind = $2
            ORDER BY r.seq
            "#,
        )
        .bind(id)
        .bind(relation.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| -> SocialResult<UserSummary> {
                Ok(UserSummary {
                    id: row.try_get("id").map_err(query_error)?,
                    name: row.try_get("name").map_err(query_error)?,
                    avatar: row.try_get("avatar").map_err(query_error)?,
                })
            })
            .collect()
    }

    async fn update_pair<T, F>(&self, a: UserId, b: UserId, apply: F) -> SocialResult<T>
    where
        T: Send,
        F: FnOnce(&mut Option<Relation>, &mut Option<Relation>) -> SocialResult<T> + Send,
    {
        if a == b {
            return Err(SocialError::InvalidTarget(b));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SocialError::Database(DatabaseError::Transaction(e)))?;

        let locked: Vec<UserId> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE")
                .bind(vec![a.0, b.0])
                .fetch_all(&mut *tx)
                .await
                .map_err(query_error)?;

        for id in [a, b] {
            if !locked.contains(&id) {
                return Err(SocialError::UserNotFound(id));
            }
        }

        let rows = sqlx::query(
            r#"
            SELECT user_id, kind
            FROM user_relations
            WHERE (user_id = $1 AND peer_id = $2) OR (user_id = $2 AND peer_id = $1)
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_all(&mut *tx)
        .await
        .map_err(query_error)?;

        let mut view_a = None;
        let mut view_b = None;
        for row in &rows {
            let owner: UserId = row.try_get("user_id").map_err(query_error)?;
            let kind: String = row.try_get("kind").map_err(query_error)?;
            let relation = kind.parse::<Relation>().map_err(DatabaseError::CorruptRow)?;
            if owner == a {
                view_a = Some(relation);
            } else {
                view_b = Some(relation);
            }
        }

        let (before_a, before_b) = (view_a, view_b);
        let outcome = apply(&mut view_a, &mut view_b)?;

        if view_a != before_a {
            write_view(&mut *tx, a, b, view_a).await?;
        }
        if view_b != before_b {
            write_view(&mut *tx, b, a, view_b).await?;
        }

        tx.commit()
            .await
            .map_err(|e| SocialError::Database(DatabaseError::Transaction(e)))?;

        debug!("Updated relations between {} and {}", a, b);
        Ok(outcome)
    }

    async fn top_by_xp(&self, limit: usize) -> SocialResult<Vec<LeaderboardEntry>> {
        debug!("Fetching top {} users by XP", limit);

        let rows = sqlx::query(
            r#"
            SELECT id, name, avatar, level, xp
            FROM users
            ORDER BY xp DESC, id ASC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        rows.iter()
            .enumerate()
            .map(|(idx, row)| -> SocialResult<LeaderboardEntry> {
                Ok(LeaderboardEntry {
                    rank: idx as u32 + 1,
                    id: row.try_get("id").map_err(query_error)?,
                    name: row.try_get("name").map_err(query_error)?,
                    avatar: row.try_get("avatar").map_err(query_error)?,
                    level: from_db_level(row.try_get("level").map_err(query_error)?)?,
                    xp: from_db_xp(row.try_get("xp").map_err(query_error)?)?,
                })
            })
            .collect()
    }
}
