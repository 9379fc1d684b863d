//! Token repository and alert log


use crate::error::Result;
use crate::types::{Chain, TokenRecord};
use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Database for tokens and sent alerts
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to SQLite database (creates if not exists)
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// In-memory database, used by tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL,
                chain_id INTEGER NOT NULL,
                name TEXT,
                symbol TEXT,
                decimals INTEGER,
                created_at TEXT NOT NULL,
                UNIQUE (address, chain_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_address TEXT NOT NULL,
                chain_id INTEGER NOT NULL,
                channel_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_alerts_token ON alerts (token_address, chain_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the token row, inserting it first if unknown. Addresses
    /// are stored lowercased.
    pub async fn find_or_create_token(&self, address: &str, chain: Chain) -> Result<TokenRecord> {
        let address = address.to_lowercase();
        if let Some(existing) = self.get_token(&address, chain).await? {
            return Ok(existing);
        }

        sqlx::query(
            r#"
            INSERT INTO tokens (address, chain_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (address, chain_id) DO NOTHING
            "#,
        )
        .bind(&address)
        .bind(chain.id() as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_token(&address, chain)
            .await?
            .ok_or_else(|| crate::error::BotError::Internal("token insert vanished".to_string()))
    }

    async fn get_token(&self, address: &str, chain: Chain) -> Result<Option<TokenRecord>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, address, chain_id, name, symbol, decimals, created_at
            FROM tokens
            WHERE address = ? AND chain_id = ?
            "#,
        )
        .bind(address)
        .bind(chain.id() as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|r| r.try_into().ok()))
    }

    /// Fill in identity fields, keeping existing values when the new
    /// ones are absent.
    pub async fn update_token(
        &self,
        id: i64,
        name: Option<&str>,
        symbol: Option<&str>,
        decimals: Option<u8>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tokens
            SET name = COALESCE(?, name),
                symbol = COALESCE(?, symbol),
                decimals = COALESCE(?, decimals)
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(symbol)
        .bind(decimals.map(|d| d as i64))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Whether an alert for this token has already gone out.
    pub async fn has_alerted(&self, address: &str, chain: Chain) -> Result<bool> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM alerts WHERE token_address = ? AND chain_id = ?",
        )
        .bind(address.to_lowercase())
        .bind(chain.id() as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    /// Record a sent alert.
    pub async fn record_alert(&self, address: &str, chain: Chain, channel_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO alerts (token_address, chain_id, channel_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(address.to_lowercase())
        .bind(chain.id() as i64)
        .bind(channel_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    id: i64,
    address: String,
    chain_id: i64,
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<i64>,
    created_at: String,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = anyhow::Error;

    fn try_from(row: TokenRow) -> std::result::Result<Self, Self::Error> {
        let chain = Chain::from_id(row.chain_id as u64)
            .ok_or_else(|| anyhow::anyhow!("unknown chain id: {}", row.chain_id))?;

        Ok(TokenRecord {
            id: row.id,
            address: row.address,
            chain,
            name: row.name,
            symbol: row.symbol,
            decimals: row.decimals.map(|d| d as u8),
            created_at: row.created_at.parse()?,
        })
    }
}
