use crate::database::models::*;
use crate::database::store::{session_exists_in, GameStore};
use crate::game::Gender;
use crate::utils::logging::log_database_operation;

impl GameStore {
    /// Adds a web player to the session under their join token.
    ///
    /// Returns false if the token is taken or the session is gone.
    pub async fn add_web_participant(
        &self,
        session_id: i64,
        token: i64,
        name: &str,
        gender: Gender,
    ) -> Result<bool, sqlx::Error> {
        let _guard = self.guard().await;
        let mut tx = self.pool().begin().await?;

        if !session_exists_in(&mut tx, session_id).await? {
            return Ok(false);
        }

        let taken = sqlx::query_scalar::<_, i64>("SELECT 1 FROM web_users WHERE token = ?")
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Ok(false);
        }

        let user_id = sqlx::query(
            "INSERT INTO users (name, gender, current_session, current_session_idle_count) VALUES (?, ?, ?, 0)",
        )
        .bind(name)
        .bind(gender.bits())
        .bind(session_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query("INSERT INTO web_users (user_id, token) VALUES (?, ?)")
            .bind(user_id)
            .bind(token)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        log_database_operation("INSERT", "web_users", Some(&format!("user {user_id} session {session_id}")));
        Ok(true)
    }

    /// Deletes a web player with their backlog; false if the token is unknown.
    pub async fn remove_web_participant(&self, token: i64) -> Result<bool, sqlx::Error> {
        let _guard = self.guard().await;
        let mut tx = self.pool().begin().await?;

        let user_id = sqlx::query_scalar::<_, i64>("SELECT user_id FROM web_users WHERE token = ?")
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(user_id) = user_id else {
            return Ok(false);
        };

        for query in [
            "DELETE FROM web_users WHERE user_id = ?",
            "DELETE FROM recent_web_messages WHERE user_id = ?",
            "DELETE FROM users WHERE id = ?",
        ] {
            sqlx::query(query).bind(user_id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        log_database_operation("DELETE", "web_users", Some(&format!("user {user_id}")));
        Ok(true)
    }

    pub async fn web_user_exists(&self, token: i64) -> Result<bool, sqlx::Error> {
        Ok(self.web_user_id(token).await?.is_some())
    }

    pub async fn web_user_id(&self, token: i64) -> Result<Option<i64>, sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query_scalar::<_, i64>("SELECT user_id FROM web_users WHERE token = ?")
            .bind(token)
            .fetch_optional(self.pool())
            .await
    }

    /// Appends to the player's backlog and keeps only the newest `capacity` entries.
    ///
    /// Indices start at 1 and grow by one per message, so a client that has
    /// seen nothing polls with `since = 0`.
    pub async fn append_backlog_message(&self, user_id: i64, message: &str, capacity: i64) -> Result<(), sqlx::Error> {
        let _guard = self.guard().await;
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r#"
            INSERT INTO recent_web_messages (user_id, index_for_user, message)
            VALUES (?, (SELECT IFNULL(MAX(index_for_user), 0) FROM recent_web_messages WHERE user_id = ?) + 1, ?)
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(message)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM recent_web_messages
            WHERE user_id = ?
              AND index_for_user <= (SELECT MAX(index_for_user) FROM recent_web_messages WHERE user_id = ?) - ?
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(capacity.max(1))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Backlog entries newer than `since`.
    ///
    /// An empty backlog (never written, or cleared when the session ended)
    /// yields no messages and index 0. Otherwise the returned index never
    /// goes below `since`.
    pub async fn poll_new_messages(&self, user_id: i64, since: i64) -> Result<MessagePoll, sqlx::Error> {
        let _guard = self.guard().await;
        let mut conn = self.pool().acquire().await?;

        let newest = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(index_for_user) FROM recent_web_messages WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        let Some(newest) = newest else {
            return Ok(MessagePoll::default());
        };

        if since >= newest {
            return Ok(MessagePoll {
                messages: Vec::new(),
                last_index: since,
            });
        }

        let entries = sqlx::query_as::<_, WebMessage>(
            "SELECT index_for_user, message FROM recent_web_messages WHERE user_id = ? AND index_for_user > ? ORDER BY index_for_user",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&mut *conn)
        .await?;

        let last_index = entries.last().map_or(since, |entry| entry.index_for_user);
        Ok(MessagePoll {
            messages: entries.into_iter().map(|entry| entry.message).collect(),
            last_index,
        })
    }
}
