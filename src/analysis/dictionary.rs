use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::analysis::percentage;
use crate::db::Database;
use crate::error::AppError;

pub const DICTIONARY_REPORT: &str = "dictionary-coverage-analysis.json";

static TABLE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN|INTO|UPDATE)\s+`?([A-Za-z_][A-Za-z0-9_]*)`?")
        .expect("table reference regex")
});
static SQL_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(SELECT|INSERT|UPDATE|DELETE)\b").expect("sql statement regex")
});

const NOT_TABLES: [&str; 3] = ["dual", "select", "information_schema"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryFileStats {
    pub file: String,
    pub query_templates: usize,
    pub direct_matches: usize,
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryCoverageReport {
    pub generated_at: String,
    pub files: Vec<DictionaryFileStats>,
    pub total_query_templates: usize,
    pub total_direct_matches: usize,
    pub database_tables: usize,
    pub referenced_tables: Vec<String>,
    pub covered_tables: Vec<String>,
    pub uncovered_tables: Vec<String>,
    pub unknown_tables: Vec<String>,
    pub coverage_rate: f64,
}

/// True when `offset` sits inside parentheses that are not a subquery, as
/// in `EXTRACT(MONTH FROM created_at)` or `TRIM(' ' FROM name)`.
fn inside_expression(sql: &str, offset: usize) -> bool {
    let mut open = Vec::new();
    for (i, c) in sql[..offset].char_indices() {
        match c {
            '(' => open.push(i + 1),
            ')' => {
                open.pop();
            }
            _ => {}
        }
    }

    open.last().is_some_and(|&start| {
        let inner = sql[start..offset].trim_start().to_lowercase();
        !(inner.starts_with("select") || inner.starts_with("with"))
    })
}

/// Table names referenced by a SQL string.
pub fn extract_tables(sql: &str) -> BTreeSet<String> {
    TABLE_REFERENCE
        .captures_iter(sql)
        .filter(|caps| !inside_expression(sql, caps.get(0).map_or(0, |m| m.start())))
        .map(|caps| caps[1].to_string())
        .filter(|t| !NOT_TABLES.contains(&t.to_lowercase().as_str()))
        .collect()
}

fn collect_sql_tables(value: &Value, tables: &mut BTreeSet<String>) {
    match value {
        Value::String(s) if SQL_STATEMENT.is_match(s) => tables.extend(extract_tables(s)),
        Value::Array(items) => items.iter().for_each(|v| collect_sql_tables(v, tables)),
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| !key.starts_with("//"))
            .for_each(|(_, v)| collect_sql_tables(v, tables)),
        _ => {}
    }
}

fn entry_count(dictionary: &Value, section: &str) -> usize {
    dictionary
        .get(section)
        .and_then(Value::as_object)
        .map(|map| map.keys().filter(|k| !k.starts_with("//")).count())
        .unwrap_or(0)
}

pub fn analyze_dictionary_file(path: &Path) -> Result<DictionaryFileStats, AppError> {
    let content = fs::read_to_string(path)?;
    let dictionary: Value = serde_json::from_str(&content)?;

    let mut tables = BTreeSet::new();
    collect_sql_tables(&dictionary, &mut tables);

    Ok(DictionaryFileStats {
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        query_templates: entry_count(&dictionary, "queryTemplates"),
        direct_matches: entry_count(&dictionary, "directMatches"),
        tables: tables.into_iter().collect(),
    })
}

pub fn scan_dictionary_dir(dir: &Path) -> Result<Vec<DictionaryFileStats>, AppError> {
    if !dir.is_dir() {
        return Err(AppError::NotFound(format!(
            "Dictionary directory {} does not exist",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    paths.sort();

    let mut files = Vec::new();
    for path in paths {
        match analyze_dictionary_file(&path) {
            Ok(stats) => files.push(stats),
            Err(AppError::Json(e)) => {
                warn!("Skipping malformed dictionary {}: {}", path.display(), e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(files)
}

pub fn build_coverage_report(
    files: Vec<DictionaryFileStats>,
    database_tables: &[String],
) -> DictionaryCoverageReport {
    let existing: BTreeSet<&str> = database_tables.iter().map(String::as_str).collect();
    let referenced: BTreeSet<String> = files
        .iter()
        .flat_map(|f| f.tables.iter().cloned())
        .collect();

    let covered: Vec<String> = referenced
        .iter()
        .filter(|t| existing.contains(t.as_str()))
        .cloned()
        .collect();
    let unknown = referenced
        .iter()
        .filter(|t| !existing.contains(t.as_str()))
        .cloned()
        .collect();
    let uncovered = existing
        .iter()
        .filter(|t| !referenced.contains(**t))
        .map(|t| t.to_string())
        .collect();

    DictionaryCoverageReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        total_query_templates: files.iter().map(|f| f.query_templates).sum(),
        total_direct_matches: files.iter().map(|f| f.direct_matches).sum(),
        database_tables: existing.len(),
        coverage_rate: percentage(covered.len(), existing.len()),
        referenced_tables: referenced.into_iter().collect(),
        covered_tables: covered,
        uncovered_tables: uncovered,
        unknown_tables: unknown,
        files,
    }
}

#[instrument(skip(db))]
pub async fn analyze_dictionary_coverage(
    db: &Database,
    dir: &Path,
) -> Result<DictionaryCoverageReport, AppError> {
    let files = scan_dictionary_dir(dir)?;
    let tables = db.list_tables().await?;
    let report = build_coverage_report(files, &tables);

    info!(
        covered = report.covered_tables.len(),
        total = report.database_tables,
        rate = report.coverage_rate,
        "Dictionary coverage analysed"
    );
    Ok(report)
}
