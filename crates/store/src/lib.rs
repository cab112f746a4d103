//! SQLite persistence for AgriSense.
//!
//! One database file, three tables:
//! - `sensor_readings` — insert-only device observations
//! - `conversations`   — chat containers with a last-activity timestamp
//! - `messages`        — per-conversation history rows
//!
//! A single `Store` (wrapping one `SqlitePool`) is created at process start
//! and shared by reference with every component that needs persistence —
//! there is no per-request connection creation.

use agrisense_core::{Conversation, Role, SensorReading, StoreError, StoredMessage};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// The long-lived storage session.
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database at `path` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Run schema migrations — creates all tables and indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        // Integer rowid alias keeps insertion order queryable for tie-breaks
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sensor_readings (
                iid           INTEGER PRIMARY KEY AUTOINCREMENT,
                id            TEXT UNIQUE NOT NULL,
                temperature   TEXT NOT NULL DEFAULT '',
                humidity      TEXT NOT NULL DEFAULT '',
                water_level   TEXT NOT NULL DEFAULT '',
                steam         TEXT NOT NULL DEFAULT '',
                light         TEXT NOT NULL DEFAULT '',
                soil_humidity TEXT NOT NULL DEFAULT '',
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("sensor_readings table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                iid        INTEGER PRIMARY KEY AUTOINCREMENT,
                id         TEXT UNIQUE NOT NULL,
                title      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("conversations table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid             INTEGER PRIMARY KEY AUTOINCREMENT,
                id              TEXT UNIQUE NOT NULL,
                conversation_id TEXT NOT NULL,
                role            TEXT NOT NULL,
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_readings_created_at ON sensor_readings(created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("readings index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    // ── Sensor readings ───────────────────────────────────────────────────

    /// Persist one reading.
    pub async fn insert_reading(&self, reading: &SensorReading) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sensor_readings
                (id, temperature, humidity, water_level, steam, light, soil_humidity, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&reading.id)
        .bind(&reading.temperature)
        .bind(&reading.humidity)
        .bind(&reading.water_level)
        .bind(&reading.steam)
        .bind(&reading.light)
        .bind(&reading.soil_humidity)
        .bind(reading.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT reading failed: {e}")))?;

        debug!(reading_id = %reading.id, "Stored sensor reading");
        Ok(())
    }

    /// All persisted readings, newest first.
    pub async fn list_readings(&self) -> Result<Vec<SensorReading>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM sensor_readings ORDER BY created_at DESC, iid DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("List readings: {e}")))?;

        rows.iter().map(Self::row_to_reading).collect()
    }

    /// The grounding snapshot: every persisted reading. Ordering is not
    /// significant to the prompt composer, which only consumes the six
    /// metric fields.
    pub async fn sensor_snapshot(&self) -> Result<Vec<SensorReading>, StoreError> {
        let rows = sqlx::query("SELECT * FROM sensor_readings ORDER BY iid")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Sensor snapshot: {e}")))?;

        rows.iter().map(Self::row_to_reading).collect()
    }

    /// Delete every reading. Returns the number of rows removed.
    pub async fn delete_readings(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sensor_readings")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE readings failed: {e}")))?;

        Ok(result.rows_affected())
    }

    // ── Conversations ─────────────────────────────────────────────────────

    /// Create a conversation with the placeholder title.
    pub async fn create_conversation(&self) -> Result<Conversation, StoreError> {
        let conv = Conversation::new();

        sqlx::query("INSERT INTO conversations (id, title, updated_at) VALUES (?1, ?2, ?3)")
            .bind(&conv.id)
            .bind(&conv.title)
            .bind(conv.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT conversation failed: {e}")))?;

        Ok(conv)
    }

    /// All conversations, most recent activity first.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM conversations ORDER BY updated_at DESC, iid DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("List conversations: {e}")))?;

        rows.iter().map(Self::row_to_conversation).collect()
    }

    /// Bump a conversation's last-activity timestamp to now.
    pub async fn touch_conversation(&self, conversation_id: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now().to_rfc3339())
            .bind(conversation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("UPDATE conversation failed: {e}")))?;

        Ok(())
    }

    /// Delete all messages and conversations (administrative sweep).
    pub async fn delete_all_conversations(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM messages")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE messages failed: {e}")))?;

        sqlx::query("DELETE FROM conversations")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE conversations failed: {e}")))?;

        Ok(())
    }

    // ── Messages ──────────────────────────────────────────────────────────

    /// Insert a single message row.
    pub async fn insert_message(&self, message: &StoredMessage) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT message failed: {e}")))?;

        Ok(())
    }

    /// Append a user/assistant pair as one logical batch (single statement,
    /// two rows). The conversation timestamp bump is a separate call — the
    /// two operations carry no atomicity guarantee between them.
    pub async fn insert_exchange(
        &self,
        conversation_id: &str,
        user_content: &str,
        assistant_content: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, created_at)
            VALUES (?1, ?2, 'user', ?3, ?4), (?5, ?6, 'assistant', ?7, ?8)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(conversation_id)
        .bind(user_content)
        .bind(&now)
        .bind(Uuid::new_v4().to_string())
        .bind(conversation_id)
        .bind(assistant_content)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT exchange failed: {e}")))?;

        Ok(())
    }

    /// Full history of a conversation, oldest first.
    pub async fn messages_for(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY created_at ASC, iid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("List messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    /// The most recent `limit` messages of a conversation in chronological
    /// order.
    ///
    /// Fetches the window in reverse-chronological order (latest-inserted
    /// first among identical timestamps), caps it, then reverses in memory.
    /// The two-step shape is what defines the tie-break, so it stays.
    pub async fn recent_history(
        &self,
        conversation_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM messages
            WHERE conversation_id = ?1
            ORDER BY created_at DESC, iid DESC
            LIMIT ?2
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Recent history: {e}")))?;

        let mut history: Vec<StoredMessage> = rows
            .iter()
            .map(Self::row_to_message)
            .collect::<Result<_, _>>()?;
        history.reverse();
        Ok(history)
    }

    // ── Row codecs ────────────────────────────────────────────────────────

    fn row_to_reading(row: &sqlx::sqlite::SqliteRow) -> Result<SensorReading, StoreError> {
        Ok(SensorReading {
            id: Self::get_text(row, "id")?,
            temperature: Self::get_text(row, "temperature")?,
            humidity: Self::get_text(row, "humidity")?,
            water_level: Self::get_text(row, "water_level")?,
            steam: Self::get_text(row, "steam")?,
            light: Self::get_text(row, "light")?,
            soil_humidity: Self::get_text(row, "soil_humidity")?,
            created_at: Self::parse_timestamp(&Self::get_text(row, "created_at")?),
        })
    }

    fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, StoreError> {
        Ok(Conversation {
            id: Self::get_text(row, "id")?,
            title: Self::get_text(row, "title")?,
            updated_at: Self::parse_timestamp(&Self::get_text(row, "updated_at")?),
        })
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredMessage, StoreError> {
        let role_str = Self::get_text(row, "role")?;
        let role = Role::from_str(&role_str)
            .map_err(|e| StoreError::QueryFailed(format!("role column: {e}")))?;

        Ok(StoredMessage {
            id: Self::get_text(row, "id")?,
            conversation_id: Self::get_text(row, "conversation_id")?,
            role,
            content: Self::get_text(row, "content")?,
            created_at: Self::parse_timestamp(&Self::get_text(row, "created_at")?),
        })
    }

    fn get_text(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, StoreError> {
        row.try_get(column)
            .map_err(|e| StoreError::QueryFailed(format!("{column} column: {e}")))
    }

    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}
