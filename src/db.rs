use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::{AnyPool, Row};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::AppError;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self, AppError> {
        if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(Dialect::MySql)
        } else if url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            Err(AppError::Config(format!(
                "Unsupported database URL scheme: {}",
                url.split(':').next().unwrap_or_default()
            )))
        }
    }

    /// SQLite's Any backend reports no last insert id, so inserts there
    /// read the new id back with `RETURNING`.
    pub fn returning_id(self, insert: &str) -> String {
        match self {
            Dialect::MySql => insert.to_string(),
            Dialect::Sqlite => format!("{} RETURNING id", insert),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }
}

pub fn quote_ident(dialect: Dialect, name: &str) -> Result<String, AppError> {
    if !IDENTIFIER.is_match(name) {
        return Err(AppError::Validation(format!("Invalid SQL identifier: {}", name)));
    }

    Ok(match dialect {
        Dialect::MySql => format!("`{}`", name),
        Dialect::Sqlite => format!("\"{}\"", name),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

/// Pool handle plus the SQL dialect spoken behind it. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: AnyPool,
    dialect: Dialect,
    /// Lazily connected typed pool for result sets whose MySQL column types
    /// (DATETIME, DECIMAL, TINYINT, JSON) the Any driver cannot carry.
    mysql: Option<MySqlPool>,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let url = config.connection_url()?;
        info!(url = %config.display_url(), "Connecting to database");
        Self::connect_url(&url, config.max_connections).await
    }

    pub async fn connect_url(url: &str, max_connections: u32) -> Result<Self, AppError> {
        sqlx::any::install_default_drivers();
        let dialect = Dialect::from_url(url)?;

        // An in-memory SQLite database lives and dies with its connection.
        let options = match dialect {
            Dialect::Sqlite if url.contains(":memory:") => AnyPoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>),
            _ => AnyPoolOptions::new().max_connections(max_connections),
        };

        let pool = options.connect(url).await?;
        let mysql = match dialect {
            Dialect::MySql => Some(MySqlPoolOptions::new().max_connections(1).connect_lazy(url)?),
            Dialect::Sqlite => None,
        };
        Ok(Self {
            pool,
            dialect,
            mysql,
        })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn mysql_pool(&self) -> Option<&MySqlPool> {
        self.mysql.as_ref()
    }

    pub fn quote(&self, name: &str) -> Result<String, AppError> {
        quote_ident(self.dialect, name)
    }

    pub async fn close(self) {
        info!("Closing database connections");
        self.pool.close().await;
        if let Some(mysql) = self.mysql {
            mysql.close().await;
        }
    }

    #[instrument(skip(self))]
    pub async fn table_exists(&self, table: &str) -> Result<bool, AppError> {
        let sql = match self.dialect {
            Dialect::MySql => {
                "SELECT COUNT(*) FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?"
            }
            Dialect::Sqlite => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        };

        let count: i64 = sqlx::query_scalar(sql)
            .bind(table)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    pub async fn column_exists(&self, table: &str, column: &str) -> Result<bool, AppError> {
        let sql = match self.dialect {
            Dialect::MySql => {
                "SELECT COUNT(*) FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND COLUMN_NAME = ?"
            }
            Dialect::Sqlite => "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
        };

        let count: i64 = sqlx::query_scalar(sql)
            .bind(table)
            .bind(column)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    pub async fn index_exists(&self, table: &str, index: &str) -> Result<bool, AppError> {
        let sql = match self.dialect {
            Dialect::MySql => {
                "SELECT COUNT(*) FROM information_schema.STATISTICS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME = ?"
            }
            Dialect::Sqlite => {
                "SELECT COUNT(*) FROM sqlite_master \
                 WHERE type = 'index' AND tbl_name = ? AND name = ?"
            }
        };

        let count: i64 = sqlx::query_scalar(sql)
            .bind(table)
            .bind(index)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self))]
    pub async fn list_tables(&self) -> Result<Vec<String>, AppError> {
        let sql = match self.dialect {
            Dialect::MySql => {
                "SELECT CAST(TABLE_NAME AS CHAR) FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
                 ORDER BY TABLE_NAME"
            }
            Dialect::Sqlite => {
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            }
        };

        let tables: Vec<String> = sqlx::query_scalar(sql).fetch_all(&self.pool).await?;
        Ok(tables)
    }

    #[instrument(skip(self))]
    pub async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, AppError> {
        let sql = match self.dialect {
            Dialect::MySql => {
                "SELECT CAST(COLUMN_NAME AS CHAR), CAST(DATA_TYPE AS CHAR), \
                 CASE WHEN IS_NULLABLE = 'YES' THEN 1 ELSE 0 END, \
                 CASE WHEN COLUMN_KEY = 'PRI' THEN 1 ELSE 0 END \
                 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION"
            }
            Dialect::Sqlite => {
                "SELECT name, type, CASE WHEN \"notnull\" = 0 THEN 1 ELSE 0 END, \
                 CASE WHEN pk > 0 THEN 1 ELSE 0 END \
                 FROM pragma_table_info(?) ORDER BY cid"
            }
        };

        let rows = sqlx::query(sql).bind(table).fetch_all(&self.pool).await?;
        rows.iter().map(column_from_row).collect()
    }

    #[instrument(skip(self))]
    pub async fn count_rows(&self, table: &str) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.quote(table)?);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

fn column_from_row(row: &AnyRow) -> Result<ColumnInfo, AppError> {
    let nullable: i64 = row.try_get(2)?;
    let primary_key: i64 = row.try_get(3)?;

    Ok(ColumnInfo {
        name: row.try_get(0)?,
        data_type: row.try_get::<String, _>(1)?.to_lowercase(),
        nullable: nullable != 0,
        primary_key: primary_key != 0,
    })
}

/// Current UTC time in the `YYYY-MM-DD HH:MM:SS` form both dialects accept.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
