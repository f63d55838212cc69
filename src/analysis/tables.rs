use serde::Serialize;
use tracing::{info, instrument};

use crate::db::Database;
use crate::error::AppError;

pub const TABLES_REPORT: &str = "database-tables-analysis.json";
const TOP_TABLES: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStats {
    pub name: String,
    pub row_count: i64,
    pub column_count: usize,
    pub has_soft_delete: bool,
    pub has_timestamps: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesReport {
    pub generated_at: String,
    pub dialect: String,
    pub total_tables: usize,
    pub total_rows: i64,
    pub tables: Vec<TableStats>,
    pub empty_tables: Vec<String>,
    pub top_tables: Vec<TableStats>,
}

#[instrument(skip(db))]
pub async fn analyze_tables(db: &Database) -> Result<TablesReport, AppError> {
    let mut tables = Vec::new();

    for name in db.list_tables().await? {
        let columns = db.list_columns(&name).await?;
        let has = |column: &str| columns.iter().any(|c| c.name == column);

        tables.push(TableStats {
            row_count: db.count_rows(&name).await?,
            column_count: columns.len(),
            has_soft_delete: has("deleted_at"),
            has_timestamps: has("created_at") && has("updated_at"),
            name,
        });
    }

    let empty_tables = tables
        .iter()
        .filter(|t| t.row_count == 0)
        .map(|t| t.name.clone())
        .collect();

    let mut top_tables: Vec<TableStats> =
        tables.iter().filter(|t| t.row_count > 0).cloned().collect();
    top_tables.sort_by(|a, b| b.row_count.cmp(&a.row_count).then(a.name.cmp(&b.name)));
    top_tables.truncate(TOP_TABLES);

    let report = TablesReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        dialect: db.dialect().as_str().to_string(),
        total_tables: tables.len(),
        total_rows: tables.iter().map(|t| t.row_count).sum(),
        tables,
        empty_tables,
        top_tables,
    };

    info!(
        tables = report.total_tables,
        rows = report.total_rows,
        "Table analysis complete"
    );
    Ok(report)
}
