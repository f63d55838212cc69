use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument};
use walkdir::{DirEntry, WalkDir};

use crate::analysis::percentage;
use crate::error::AppError;

pub const COMPLIANCE_REPORT: &str = "ai-usage-compliance.json";
pub const DEFAULT_BRIDGE_DIR: &str = "ai-bridge";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    ProviderEndpoint,
    SdkImport,
    SdkConstruction,
    CompletionsCall,
}

pub struct ComplianceRule {
    pub kind: RuleKind,
    pub description: &'static str,
    pub pattern: Regex,
}

static RULES: Lazy<Vec<ComplianceRule>> = Lazy::new(|| {
    let rule = |kind: RuleKind, description: &'static str, pattern: &str| ComplianceRule {
        kind,
        description,
        pattern: Regex::new(pattern).expect("compliance rule regex"),
    };

    vec![
        rule(
            RuleKind::ProviderEndpoint,
            "Direct request to a third-party AI endpoint",
            r"api\.openai\.com|api\.anthropic\.com|dashscope\.aliyuncs\.com|ark\.cn-beijing\.volces\.com|api\.deepseek\.com|generativelanguage\.googleapis\.com",
        ),
        rule(
            RuleKind::SdkImport,
            "Imports a provider SDK",
            r#"from\s+['"](openai|@anthropic-ai/sdk|@google/generative-ai)['"]|require\(\s*['"](openai|@anthropic-ai/sdk|@google/generative-ai)['"]\s*\)"#,
        ),
        rule(
            RuleKind::SdkConstruction,
            "Constructs a provider client",
            r"new\s+(OpenAI|Anthropic|GoogleGenerativeAI)\s*\(",
        ),
        rule(
            RuleKind::CompletionsCall,
            "Calls a completions API without the bridge",
            r"\.(chat\.)?completions\.create\s*\(|\.messages\.create\s*\(",
        ),
    ]
});

static BRIDGE_USAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"aiBridge|ai-bridge|AIBridge").expect("bridge regex"));

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub file: String,
    pub line: usize,
    pub rule: RuleKind,
    pub description: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub generated_at: String,
    pub files_scanned: usize,
    pub bridge_files: usize,
    pub files_using_bridge: usize,
    pub files_with_violations: usize,
    pub violations: Vec<Violation>,
    pub compliance_rate: f64,
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir()
        && (name == "node_modules"
            || name.starts_with("dist")
            || name == "tests"
            || name == "__tests__"
            || name.starts_with('.'))
        && entry.depth() > 0
}

fn is_source_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let is_test = name.contains(".test.") || name.contains(".spec.");
    let is_code = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e, "ts" | "js"))
        && !name.ends_with(".d.ts");
    is_code && !is_test
}

fn in_bridge(path: &Path, root: &Path, bridge_dir: &str) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str() == bridge_dir)
}

/// Rule hits in one source file; comment lines are ignored.
pub fn scan_source(file: &str, content: &str) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") || trimmed.starts_with('*') || trimmed.starts_with("/*") {
            continue;
        }

        for rule in RULES.iter() {
            if rule.pattern.is_match(line) {
                violations.push(Violation {
                    file: file.to_string(),
                    line: index + 1,
                    rule: rule.kind,
                    description: rule.description.to_string(),
                    snippet: line.trim().chars().take(160).collect(),
                });
            }
        }
    }

    violations
}

#[instrument]
pub fn check_ai_compliance(root: &Path, bridge_dir: &str) -> Result<ComplianceReport, AppError> {
    if !root.is_dir() {
        return Err(AppError::NotFound(format!(
            "Source directory {} does not exist",
            root.display()
        )));
    }

    let mut files_scanned = 0;
    let mut bridge_files = 0;
    let mut files_using_bridge = 0;
    let mut files_with_violations = 0;
    let mut violations = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_source_file(path) {
            continue;
        }

        files_scanned += 1;
        if in_bridge(path, root, bridge_dir) {
            bridge_files += 1;
            continue;
        }

        let content = fs::read_to_string(path)?;
        if BRIDGE_USAGE.is_match(&content) {
            files_using_bridge += 1;
        }

        let relative = path.strip_prefix(root).unwrap_or(path).display().to_string();
        let found = scan_source(&relative, &content);
        if !found.is_empty() {
            debug!(file = %relative, count = found.len(), "Direct AI calls found");
            files_with_violations += 1;
            violations.extend(found);
        }
    }

    let report = ComplianceReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        files_scanned,
        bridge_files,
        files_using_bridge,
        files_with_violations,
        compliance_rate: if files_scanned == 0 {
            100.0
        } else {
            percentage(files_scanned - files_with_violations, files_scanned)
        },
        violations,
    };

    info!(
        scanned = report.files_scanned,
        violations = report.violations.len(),
        rate = report.compliance_rate,
        "AI usage compliance checked"
    );
    Ok(report)
}
