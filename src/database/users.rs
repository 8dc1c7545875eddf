use crate::database::models::*;
use crate::database::store::GameStore;
use crate::game::Gender;
use crate::utils::logging::log_database_operation;

impl GameStore {
    /// Finds the player behind a Telegram chat, registering them on first contact.
    pub async fn get_or_create_telegram_user(
        &self,
        chat_id: i64,
        language: &str,
        name: &str,
    ) -> Result<i64, sqlx::Error> {
        let _guard = self.guard().await;
        let mut tx = self.pool().begin().await?;

        let existing = sqlx::query_scalar::<_, i64>("SELECT user_id FROM telegram_users WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(user_id) = existing {
            return Ok(user_id);
        }

        let user_id = sqlx::query(
            "INSERT INTO users (name, gender, current_session_idle_count) VALUES (?, 0, 0)",
        )
        .bind(name)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO telegram_users (user_id, chat_id, language, ftue_completed) VALUES (?, ?, ?, 0)",
        )
        .bind(user_id)
        .bind(chat_id)
        .bind(language)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        log_database_operation("INSERT", "telegram_users", Some(&format!("user {user_id} chat {chat_id}")));
        Ok(user_id)
    }

    pub async fn telegram_user(&self, user_id: i64) -> Result<Option<TelegramUser>, sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query_as::<_, TelegramUser>(
            "SELECT id, user_id, chat_id, language, ftue_completed, current_session_message FROM telegram_users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
    }

    pub async fn telegram_chat_id(&self, user_id: i64) -> Result<Option<i64>, sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query_scalar::<_, i64>("SELECT chat_id FROM telegram_users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
    }

    pub async fn user(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query_as::<_, User>(
            "SELECT id, name, gender, current_session, current_session_idle_count FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
    }

    pub async fn set_user_name(&self, user_id: i64, name: &str) -> Result<(), sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(name)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn set_user_gender(&self, user_id: i64, gender: Gender) -> Result<(), sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query("UPDATE users SET gender = ? WHERE id = ?")
            .bind(gender.bits())
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn set_user_language(&self, user_id: i64, language: &str) -> Result<(), sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query("UPDATE telegram_users SET language = ? WHERE user_id = ?")
            .bind(language)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn set_user_completed_ftue(&self, user_id: i64, completed: bool) -> Result<(), sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query("UPDATE telegram_users SET ftue_completed = ? WHERE user_id = ?")
            .bind(completed)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Remembers the session dialog message so it can be replaced later.
    pub async fn set_session_message_id(&self, user_id: i64, message_id: Option<i64>) -> Result<(), sqlx::Error> {
        let _guard = self.guard().await;
        sqlx::query("UPDATE telegram_users SET current_session_message = ? WHERE user_id = ?")
            .bind(message_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
