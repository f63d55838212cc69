use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::any::AnyRow;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row};
use tracing::{info, instrument};

use crate::db::{Database, now_timestamp};
use crate::error::AppError;
use crate::router::{RouteDecision, RuleAction, Tier};
use crate::seed::insert_row;

pub const ROUTER_MODEL_NAME: &str = "query-router";

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub action: String,
    pub rows: Vec<Value>,
    pub usage_record_id: i64,
}

pub(crate) struct ToolQuery {
    pub(crate) sql: String,
    pub(crate) binds: Vec<String>,
}

/// Tools answered by [`tool_query`]; any other tool name needs the AI Bridge.
pub(crate) const DATABASE_TOOLS: [&str; 8] = [
    "get_today_activities",
    "get_activity_list",
    "get_activity_stats",
    "get_attendance_stats",
    "get_enrollment_stats",
    "get_pending_enrollment_data",
    "get_student_stats",
    "get_task_stats",
];

/// Read-only queries behind the named tools the phrase table points at.
/// These run through the Any pool, so date columns are selected as text.
pub(crate) fn tool_query(name: &str, today: NaiveDate) -> Option<ToolQuery> {
    let day = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
    let tomorrow = today + Duration::days(1);

    let (sql, binds) = match name {
        "get_today_activities" => (
            "SELECT id, title, activity_type, CAST(start_time AS CHAR) AS start_time, location \
             FROM activities \
             WHERE deleted_at IS NULL AND start_time >= ? AND start_time < ? ORDER BY start_time",
            vec![day(today), day(tomorrow)],
        ),
        "get_activity_list" => (
            "SELECT id, title, activity_type, CAST(start_time AS CHAR) AS start_time, status \
             FROM activities \
             WHERE deleted_at IS NULL ORDER BY start_time DESC LIMIT 20",
            vec![],
        ),
        "get_activity_stats" => (
            "SELECT status, COUNT(*) AS total FROM activities \
             WHERE deleted_at IS NULL GROUP BY status ORDER BY status",
            vec![],
        ),
        "get_attendance_stats" => (
            "SELECT status, COUNT(*) AS total FROM attendances \
             WHERE attendance_date = ? GROUP BY status ORDER BY status",
            vec![day(today)],
        ),
        "get_enrollment_stats" => (
            "SELECT status, COUNT(*) AS total FROM enrollment_applications \
             WHERE deleted_at IS NULL GROUP BY status ORDER BY status",
            vec![],
        ),
        "get_pending_enrollment_data" => (
            "SELECT id, child_name, parent_name, CAST(applied_at AS CHAR) AS applied_at \
             FROM enrollment_applications \
             WHERE deleted_at IS NULL AND status = 'pending' ORDER BY applied_at",
            vec![],
        ),
        "get_student_stats" => (
            "SELECT status, COUNT(*) AS total FROM students \
             WHERE deleted_at IS NULL GROUP BY status ORDER BY status",
            vec![],
        ),
        "get_task_stats" => (
            "SELECT status, COUNT(*) AS total FROM tasks GROUP BY status ORDER BY status",
            vec![],
        ),
        _ => return None,
    };

    Some(ToolQuery {
        sql: sql.to_string(),
        binds,
    })
}

/// Accepts a single `SELECT` / `WITH` statement without bind placeholders.
pub fn ensure_read_only(sql: &str) -> Result<(), AppError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    let lowered = trimmed.to_lowercase();

    if !(lowered.starts_with("select") || lowered.starts_with("with")) {
        return Err(AppError::Validation(
            "Only SELECT templates can be executed".to_string(),
        ));
    }
    if trimmed.contains(';') {
        return Err(AppError::Validation(
            "Templates must contain a single statement".to_string(),
        ));
    }
    if trimmed.contains('?') {
        return Err(AppError::Validation(
            "Template requires parameters and cannot be run directly".to_string(),
        ));
    }
    Ok(())
}

/// Best-effort conversion of a row into JSON; undecodable values become null.
fn row_to_json(row: &AnyRow) -> Value {
    let mut object = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
            v.map(Value::from)
        } else {
            None
        };
        object.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    Value::Object(object)
}

/// Typed decoding for MySQL rows, falling back to the raw text of values
/// with no matching Rust type (DECIMAL, JSON, binary collations).
fn mysql_row_to_json(row: &MySqlRow) -> Value {
    let mut object = Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<u64>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(i) {
            v.map(Value::from)
        } else if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(i) {
            v.map(|d| Value::from(d.format("%Y-%m-%d %H:%M:%S").to_string()))
        } else if let Ok(v) = row.try_get::<Option<NaiveDate>, _>(i) {
            v.map(|d| Value::from(d.format("%Y-%m-%d").to_string()))
        } else if let Ok(v) = row.try_get::<Option<NaiveTime>, _>(i) {
            v.map(|t| Value::from(t.format("%H:%M:%S").to_string()))
        } else if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(i) {
            v.map(Value::from)
        } else {
            None
        };
        object.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    Value::Object(object)
}

/// Dictionary templates select arbitrary columns, so on MySQL they skip the
/// Any driver and go through the typed pool.
async fn fetch_template(db: &Database, sql: &str) -> Result<Vec<Value>, AppError> {
    match db.mysql_pool() {
        Some(pool) => {
            let rows = sqlx::query(sql).fetch_all(pool).await?;
            Ok(rows.iter().map(mysql_row_to_json).collect())
        }
        None => fetch_json(db, sql, &[]).await,
    }
}

async fn fetch_json(db: &Database, sql: &str, binds: &[String]) -> Result<Vec<Value>, AppError> {
    let mut query = sqlx::query(sql);
    for bind in binds {
        query = query.bind(bind.as_str());
    }
    let rows = query.fetch_all(db.pool()).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

/// Runs the action behind a routed query when it can be answered from the
/// database alone, and records the usage. Returns `None` for the complex tier
/// and for workflow tools, which need the AI Bridge.
#[instrument(skip(db, decision), fields(tier = decision.tier.as_str()))]
pub async fn execute_decision(
    db: &Database,
    decision: &RouteDecision,
) -> Result<Option<ExecutionResult>, AppError> {
    if decision.tier == Tier::Complex {
        return Ok(None);
    }
    let Some(action) = decision.action() else {
        return Ok(None);
    };

    let rows = match action {
        RuleAction::CountRows(target) => {
            let sql = format!(
                "SELECT COUNT(*) AS total FROM {} WHERE deleted_at IS NULL",
                db.quote(target.table())?
            );
            fetch_json(db, &sql, &[]).await?
        }
        RuleAction::ExecuteSql(sql) => {
            ensure_read_only(sql)?;
            fetch_template(db, sql.trim().trim_end_matches(';')).await?
        }
        RuleAction::Tool(name) => match tool_query(name, Local::now().date_naive()) {
            Some(query) => fetch_json(db, &query.sql, &query.binds).await?,
            None => {
                info!("Tool {} needs the AI Bridge; not executed", name);
                return Ok(None);
            }
        },
    };

    let usage_record_id = record_usage(db, decision).await?;
    info!(
        action = %action.name(),
        rows = rows.len(),
        "Executed routed query"
    );

    Ok(Some(ExecutionResult {
        action: action.name(),
        rows,
        usage_record_id,
    }))
}

#[instrument(skip(db, decision))]
pub async fn record_usage(db: &Database, decision: &RouteDecision) -> Result<i64, AppError> {
    let now = now_timestamp();
    let summary: String = decision.query.chars().take(200).collect();

    let sql = db.dialect().returning_id(
        "INSERT INTO ai_usage_records \
         (model_name, usage_type, tier, input_tokens, output_tokens, request_summary, \
          created_at, updated_at) \
         VALUES (?, 'query', ?, ?, 0, ?, ?, ?)",
    );
    let query = sqlx::query(&sql)
        .bind(ROUTER_MODEL_NAME)
        .bind(decision.tier.as_str())
        .bind(decision.estimated_tokens as i64)
        .bind(&summary)
        .bind(&now)
        .bind(&now);

    insert_row(db.pool(), db.dialect(), query, "ai usage record").await
}
