use chrono::Utc;
use rand::Rng;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::database::connection::DatabaseManager;
use crate::database::models::*;
use crate::utils::logging::{log_database_operation, log_session_event};

/// Persistent bookkeeping of sessions, players, suggestions and idle counts.
///
/// Every operation holds one store-wide lock for its whole duration, and each
/// mutation runs in a single transaction, so a leave and the session cleanup
/// it triggers are never observed halfway. Clones share the pool and the lock.
#[derive(Clone)]
pub struct GameStore {
    pool: SqlitePool,
    lock: Arc<Mutex<()>>,
}

impl GameStore {
    pub fn new(db: &DatabaseManager) -> Self {
        Self {
            pool: db.pool.clone(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn is_open(&self) -> bool {
        !self.pool.is_closed()
    }

    /// Waits for running operations, then closes every connection.
    pub async fn close(&self) {
        let _guard = self.lock.lock().await;
        self.pool.close().await;
    }

    pub(crate) async fn guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Puts the user into a brand new session, leaving the current one first.
    pub async fn create_session(&self, user_id: i64) -> Result<SessionChange, sqlx::Error> {
        let _guard = self.guard().await;
        let mut tx = self.pool.begin().await?;

        let previous = leave_session_in(&mut tx, user_id).await?;

        let token = loop {
            let candidate = generate_session_token();
            if session_id_from_token_in(&mut tx, &candidate).await?.is_none() {
                break candidate;
            }
        };

        let session_id = sqlx::query("INSERT INTO sessions (token) VALUES (?)")
            .bind(&token)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let updated = sqlx::query(
            "UPDATE users SET current_session = ?, current_session_idle_count = 0 WHERE id = ?",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // dropping the transaction rolls the empty session back
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;
        log_session_event("created", session_id, Some(&format!("by user {user_id}")));

        Ok(SessionChange {
            session_id,
            previous,
        })
    }

    /// Moves the user into an existing session.
    ///
    /// Returns `None` if the session does not exist. Joining the session the
    /// user is already in only resets their idle count.
    pub async fn join_session(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<Option<SessionChange>, sqlx::Error> {
        let _guard = self.guard().await;
        let mut tx = self.pool.begin().await?;

        if !session_exists_in(&mut tx, session_id).await? {
            return Ok(None);
        }

        let previous = if user_session_in(&mut tx, user_id).await? == Some(session_id) {
            None
        } else {
            leave_session_in(&mut tx, user_id).await?
        };

        let updated = sqlx::query(
            "UPDATE users SET current_session = ?, current_session_idle_count = 0 WHERE id = ?",
        )
        .bind(session_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;
        log_session_event("joined", session_id, Some(&format!("user {user_id}")));

        Ok(Some(SessionChange {
            session_id,
            previous,
        }))
    }

    /// Takes the user out of their session; `None` if they were in none.
    pub async fn leave_session(&self, user_id: i64) -> Result<Option<LeaveOutcome>, sqlx::Error> {
        let _guard = self.guard().await;
        let mut tx = self.pool.begin().await?;
        let outcome = leave_session_in(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn user_session(&self, user_id: i64) -> Result<Option<i64>, sqlx::Error> {
        let _guard = self.guard().await;
        let mut conn = self.pool.acquire().await?;
        user_session_in(&mut conn, user_id).await
    }

    pub async fn session_exists(&self, session_id: i64) -> Result<bool, sqlx::Error> {
        let _guard = self.guard().await;
        let mut conn = self.pool.acquire().await?;
        session_exists_in(&mut conn, session_id).await
    }

    pub async fn session_id_from_token(&self, token: &str) -> Result<Option<i64>, sqlx::Error> {
        let _guard = self.guard().await;
        let mut conn = self.pool.acquire().await?;
        session_id_from_token_in(&mut conn, token).await
    }

    pub async fn token_from_session_id(&self, session_id: i64) -> Result<Option<String>, sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query_scalar::<_, String>("SELECT token FROM sessions WHERE id = ? LIMIT 1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Ids of every player in the session, chat and web.
    pub async fn participants(&self, session_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE current_session = ? ORDER BY id")
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
    }

    /// Players of the session with everything a broadcast needs.
    pub async fn participant_views(&self, session_id: i64) -> Result<Vec<SessionParticipant>, sqlx::Error> {
        let _guard = self.guard().await;
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT users.id AS user_id,
                   COALESCE(telegram_users.chat_id, web_users.token, 0) AS chat_id,
                   users.name AS name,
                   users.gender AS gender,
                   users.current_session_idle_count AS idle_count,
                   (web_users.user_id IS NOT NULL) AS is_web
            FROM users
            LEFT JOIN telegram_users ON users.id = telegram_users.user_id
            LEFT JOIN web_users ON users.id = web_users.user_id
            WHERE users.current_session = ?
            ORDER BY users.id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SessionParticipant::from).collect())
    }

    /// Number of players; `primary_only` counts only chat players.
    pub async fn participant_count(&self, session_id: i64, primary_only: bool) -> Result<i64, sqlx::Error> {
        let _guard = self.guard().await;
        let mut conn = self.pool.acquire().await?;
        participant_count_in(&mut conn, session_id, primary_only).await
    }

    pub async fn enqueue_suggestion(&self, session_id: i64, command: &str) -> Result<(), sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query("INSERT INTO session_commands (session_id, command) VALUES (?, ?)")
            .bind(session_id)
            .bind(command)
            .execute(&self.pool)
            .await?;
        log_database_operation("INSERT", "session_commands", Some(&format!("session {session_id}")));
        Ok(())
    }

    /// Removes and returns a random queued suggestion; `None` if the queue is empty.
    pub async fn pop_random_suggestion(&self, session_id: i64) -> Result<Option<String>, sqlx::Error> {
        let _guard = self.guard().await;
        let mut tx = self.pool.begin().await?;

        let picked = sqlx::query_as::<_, SuggestedCommand>(
            "SELECT id, session_id, command FROM session_commands WHERE session_id = ? ORDER BY RANDOM() LIMIT 1",
        )
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(picked) = picked else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM session_commands WHERE id = ?")
            .bind(picked.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        log_database_operation("POP", "session_commands", Some(&format!("session {session_id}")));
        Ok(Some(picked.command))
    }

    pub async fn suggestion_count(&self, session_id: i64) -> Result<i64, sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM session_commands WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
    }

    /// Adds `amount` to the idle count of `increase` and zeroes it for
    /// `reset`, both in one transaction. Only players still in `session_id`
    /// are touched.
    pub async fn adjust_idle_counts(
        &self,
        session_id: i64,
        increase: &[i64],
        amount: i64,
        reset: &[i64],
    ) -> Result<(), sqlx::Error> {
        let _guard = self.guard().await;
        let mut tx = self.pool.begin().await?;

        if !increase.is_empty() {
            let query = format!(
                "UPDATE users SET current_session_idle_count = current_session_idle_count + ? \
                 WHERE current_session = ? AND id IN ({})",
                id_placeholders(increase.len())
            );
            let mut query = sqlx::query(&query).bind(amount).bind(session_id);
            for user_id in increase {
                query = query.bind(*user_id);
            }
            query.execute(&mut *tx).await?;
        }

        if !reset.is_empty() {
            let query = format!(
                "UPDATE users SET current_session_idle_count = 0 WHERE current_session = ? AND id IN ({})",
                id_placeholders(reset.len())
            );
            let mut query = sqlx::query(&query).bind(session_id);
            for user_id in reset {
                query = query.bind(*user_id);
            }
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        log_database_operation(
            "UPDATE",
            "users",
            Some(&format!(
                "session {session_id}: idle +{amount} for {} users, reset {}",
                increase.len(),
                reset.len()
            )),
        );
        Ok(())
    }

    pub async fn idle_count(&self, user_id: i64) -> Result<Option<i64>, sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query_scalar::<_, i64>("SELECT current_session_idle_count FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Number of open sessions.
    pub async fn session_total(&self) -> Result<i64, sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await
    }
}

/// Session token: creation time plus a random suffix.
fn generate_session_token() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..100_000);
    format!("{}-{}", Utc::now().timestamp(), suffix)
}

pub(crate) fn id_placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

pub(crate) async fn user_session_in(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<i64>, sqlx::Error> {
    let session = sqlx::query_scalar::<_, Option<i64>>("SELECT current_session FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(session.flatten())
}

pub(crate) async fn session_exists_in(conn: &mut SqliteConnection, session_id: i64) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM sessions WHERE id = ? LIMIT 1")
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn session_id_from_token_in(conn: &mut SqliteConnection, token: &str) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM sessions WHERE token = ? LIMIT 1")
        .bind(token)
        .fetch_optional(&mut *conn)
        .await
}

async fn participant_count_in(
    conn: &mut SqliteConnection,
    session_id: i64,
    primary_only: bool,
) -> Result<i64, sqlx::Error> {
    let query = if primary_only {
        "SELECT COUNT(*) FROM users JOIN telegram_users ON users.id = telegram_users.user_id WHERE users.current_session = ?"
    } else {
        "SELECT COUNT(*) FROM users WHERE current_session = ?"
    };
    sqlx::query_scalar::<_, i64>(query)
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await
}

/// Leaves the current session and deletes it when no chat player is left:
/// its suggestion queue, its web players with their backlogs, then the
/// session row itself.
async fn leave_session_in(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<LeaveOutcome>, sqlx::Error> {
    let Some(session_id) = user_session_in(conn, user_id).await? else {
        return Ok(None);
    };

    sqlx::query("UPDATE users SET current_session = NULL, current_session_idle_count = 0 WHERE id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    if participant_count_in(conn, session_id, true).await? > 0 {
        log_session_event("left", session_id, Some(&format!("user {user_id}")));
        return Ok(Some(LeaveOutcome {
            session_id,
            session_deleted: false,
        }));
    }

    sqlx::query("DELETE FROM session_commands WHERE session_id = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;

    let web_user_ids = sqlx::query_scalar::<_, i64>(
        "SELECT users.id FROM users JOIN web_users ON users.id = web_users.user_id WHERE users.current_session = ?",
    )
    .bind(session_id)
    .fetch_all(&mut *conn)
    .await?;

    if !web_user_ids.is_empty() {
        let placeholders = id_placeholders(web_user_ids.len());
        for table_query in [
            format!("DELETE FROM recent_web_messages WHERE user_id IN ({placeholders})"),
            format!("DELETE FROM web_users WHERE user_id IN ({placeholders})"),
            format!("DELETE FROM users WHERE id IN ({placeholders})"),
        ] {
            let mut query = sqlx::query(&table_query);
            for web_user_id in &web_user_ids {
                query = query.bind(*web_user_id);
            }
            query.execute(&mut *conn).await?;
        }
    }

    // nobody may keep pointing at a deleted session
    sqlx::query("UPDATE users SET current_session = NULL, current_session_idle_count = 0 WHERE current_session = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;

    log_session_event(
        "deleted",
        session_id,
        Some(&format!("last chat player {user_id} left, {} web players removed", web_user_ids.len())),
    );

    Ok(Some(LeaveOutcome {
        session_id,
        session_deleted: true,
    }))
}
