use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{anyhow, Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

use shared::domain::Role;

/// Well-known keys the session scope is stored under. Both are written on
/// login and deleted together on logout.
const SESSION_TOKEN_KEY: &str = "session.token";
const SESSION_ROLE_KEY: &str = "session.role";

/// Durable client-side state. Holds exactly one session per database: the
/// bearer token and the role it was issued for.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub token: String,
    pub role: Role,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_client_state_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_client_state_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS client_state (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure client_state table exists")?;
        Ok(())
    }

    async fn put_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO client_state (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM client_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    /// Writes the session scope. Both keys are written in one transaction so
    /// a crash cannot leave a token without its role.
    pub async fn save_session(&self, token: &str, role: Role) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (key, value) in [
            (SESSION_TOKEN_KEY, token),
            (SESSION_ROLE_KEY, role.as_str()),
        ] {
            sqlx::query(
                "INSERT INTO client_state (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Returns the persisted session, or `None` when either key is absent.
    /// A half-written scope (token without role) is treated as corrupt.
    pub async fn load_session(&self) -> Result<Option<PersistedSession>> {
        let token = self.get_value(SESSION_TOKEN_KEY).await?;
        let role = self.get_value(SESSION_ROLE_KEY).await?;
        match (token, role) {
            (Some(token), Some(role)) => {
                let role = role
                    .parse::<Role>()
                    .map_err(|err| anyhow!("corrupt persisted session: {err}"))?;
                Ok(Some(PersistedSession { token, role }))
            }
            (None, None) => Ok(None),
            _ => Err(anyhow!(
                "corrupt persisted session: token and role must be stored together"
            )),
        }
    }

    /// Deletes the session scope. A no-op when nothing is stored.
    pub async fn clear_session(&self) -> Result<()> {
        sqlx::query("DELETE FROM client_state WHERE key IN (?, ?)")
            .bind(SESSION_TOKEN_KEY)
            .bind(SESSION_ROLE_KEY)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Generic accessor for other well-known keys (display name, last server
    /// URL). Session keys are reserved for the typed API above.
    pub async fn put_preference(&self, key: &str, value: &str) -> Result<()> {
        if key == SESSION_TOKEN_KEY || key == SESSION_ROLE_KEY {
            return Err(anyhow!("key '{key}' is reserved for the session scope"));
        }
        self.put_value(key, value).await
    }

    pub async fn get_preference(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key).await
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
