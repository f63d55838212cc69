use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::analysis::percentage;
use crate::error::AppError;

pub const TEST_COVERAGE_REPORT: &str = "test-coverage-report.json";
pub const TEST_COVERAGE_SUMMARY: &str = "test-coverage-report.md";

/// Coverage below this raises a critical alert.
pub const CRITICAL_COVERAGE: f64 = 70.0;
/// Coverage below this raises a warning.
pub const WARNING_COVERAGE: f64 = 85.0;
pub const TARGET_COVERAGE: f64 = 90.0;

const HIGH_RISK_ALERT_COUNT: usize = 10;
const CRITICAL_UNCOVERED_COUNT: usize = 5;
const CRITICAL_CATEGORIES: [&str; 3] = ["system", "admin", "finance"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    High,
    Medium,
    Low,
}

impl Risk {
    /// Request handling layers carry the most risk when untested.
    pub fn for_category(category: &str) -> Risk {
        match category {
            "controllers" | "services" | "middlewares" | "middleware" => Risk::High,
            "routes" | "models" => Risk::Medium,
            _ => Risk::Low,
        }
    }

    fn debt_weight(&self) -> usize {
        match self {
            Risk::High => 3,
            Risk::Medium => 2,
            Risk::Low => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Path relative to the scanned root, with `/` separators.
    pub file: String,
    pub category: String,
    pub stem: String,
}

impl Component {
    pub fn from_relative(relative: &str) -> Self {
        let file = relative.replace('\\', "/");
        let category = match file.split_once('/') {
            Some((first, _)) => first.to_string(),
            None => "root".to_string(),
        };
        let name = file.rsplit('/').next().unwrap_or(file.as_str());
        Component {
            stem: source_stem(name),
            category,
            file,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCoverage {
    pub category: String,
    pub total: usize,
    pub covered: usize,
    pub coverage_rate: f64,
    pub grade: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RiskBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskBreakdown {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UncoveredComponent {
    pub file: String,
    pub category: String,
    pub risk: Risk,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCoverageReport {
    pub generated_at: String,
    pub total_components: usize,
    pub covered_components: usize,
    pub test_files: usize,
    pub coverage_rate: f64,
    pub categories: Vec<CategoryCoverage>,
    /// Uncovered components by risk.
    pub risk: RiskBreakdown,
    pub health_score: f64,
    pub health_status: &'static str,
    pub test_debt: usize,
    pub debt_level: &'static str,
    pub alerts: Vec<Alert>,
    pub uncovered: Vec<UncoveredComponent>,
}

/// File name without its extension, lowercased: `Student.service.ts` is `student.service`.
fn source_stem(name: &str) -> String {
    let name = name.to_lowercase();
    match name.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name,
    }
}

/// The component a test file exercises: `student.service.test.ts` tests `student.service`.
pub fn test_stem(name: &str) -> String {
    let name = name.to_lowercase();
    for marker in [".test.", ".spec."] {
        if let Some(index) = name.find(marker) {
            return name[..index].to_string();
        }
    }
    source_stem(&name)
}

fn is_test_name(name: &str) -> bool {
    name.contains(".test.") || name.contains(".spec.")
}

fn is_code_file(name: &str) -> bool {
    !name.ends_with(".d.ts")
        && [".ts", ".js", ".vue"].iter().any(|ext| name.ends_with(ext))
}

fn is_test_dir(name: &str) -> bool {
    name == "tests" || name == "__tests__" || name == "test"
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.depth() > 0
        && entry.file_type().is_dir()
        && (name == "node_modules" || name.starts_with("dist") || name.starts_with('.'))
}

pub fn health_status(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "excellent",
        s if s >= 80.0 => "good",
        s if s >= 70.0 => "fair",
        s if s >= 60.0 => "poor",
        _ => "critical",
    }
}

pub fn debt_level(debt: usize) -> &'static str {
    match debt {
        d if d > 30 => "critical",
        d if d > 15 => "high",
        d if d > 5 => "medium",
        _ => "low",
    }
}

pub fn coverage_grade(rate: f64) -> &'static str {
    match rate {
        r if r >= 95.0 => "A+",
        r if r >= 90.0 => "A",
        r if r >= 85.0 => "B",
        r if r >= 70.0 => "C",
        r if r >= 50.0 => "D",
        _ => "F",
    }
}

/// Matches components against the stems of the test files found.
pub fn build_test_coverage(
    components: &[Component],
    test_stems: &HashSet<String>,
    test_files: usize,
) -> TestCoverageReport {
    let mut per_category: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    let mut risk = RiskBreakdown::default();
    let mut uncovered = Vec::new();

    for component in components {
        let entry = per_category.entry(component.category.as_str()).or_default();
        entry.0 += 1;
        if test_stems.contains(&component.stem) {
            entry.1 += 1;
            continue;
        }

        let level = Risk::for_category(&component.category);
        match level {
            Risk::High => risk.high += 1,
            Risk::Medium => risk.medium += 1,
            Risk::Low => risk.low += 1,
        }
        uncovered.push(UncoveredComponent {
            file: component.file.clone(),
            category: component.category.clone(),
            risk: level,
        });
    }
    uncovered.sort_by(|a, b| a.risk.cmp(&b.risk).then_with(|| a.file.cmp(&b.file)));

    let categories: Vec<CategoryCoverage> = per_category
        .into_iter()
        .map(|(category, (total, covered))| {
            let coverage_rate = percentage(covered, total);
            CategoryCoverage {
                category: category.to_string(),
                total,
                covered,
                coverage_rate,
                grade: coverage_grade(coverage_rate),
            }
        })
        .collect();

    let covered_components = components.len() - uncovered.len();
    let coverage_rate = percentage(covered_components, components.len());

    let low_risk_share = if risk.total() == 0 {
        1.0
    } else {
        risk.low as f64 / risk.total() as f64
    };
    let category_average = if categories.is_empty() {
        0.0
    } else {
        categories.iter().map(|c| c.coverage_rate).sum::<f64>() / categories.len() as f64 / 100.0
    };
    let health_score =
        ((coverage_rate * 0.6 + low_risk_share * 30.0 + category_average * 10.0) * 100.0).round()
            / 100.0;

    let test_debt = uncovered.iter().map(|u| u.risk.debt_weight()).sum();

    let mut alerts = Vec::new();
    if coverage_rate < CRITICAL_COVERAGE {
        alerts.push(Alert {
            level: AlertLevel::Critical,
            kind: "low_coverage",
            message: format!(
                "Coverage {:.2}% is below the critical threshold of {}%",
                coverage_rate, CRITICAL_COVERAGE
            ),
        });
    } else if coverage_rate < WARNING_COVERAGE {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            kind: "medium_coverage",
            message: format!(
                "Coverage {:.2}% is below the warning threshold of {}%",
                coverage_rate, WARNING_COVERAGE
            ),
        });
    }
    if risk.high >= HIGH_RISK_ALERT_COUNT {
        alerts.push(Alert {
            level: AlertLevel::Warning,
            kind: "high_risk_components",
            message: format!("{} high-risk components have no tests", risk.high),
        });
    }
    for category in &categories {
        let missing = category.total - category.covered;
        if CRITICAL_CATEGORIES.contains(&category.category.as_str())
            && missing >= CRITICAL_UNCOVERED_COUNT
        {
            alerts.push(Alert {
                level: AlertLevel::Critical,
                kind: "critical_uncovered",
                message: format!(
                    "{} components in {} have no tests",
                    missing, category.category
                ),
            });
        }
    }

    TestCoverageReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        total_components: components.len(),
        covered_components,
        test_files,
        coverage_rate,
        categories,
        risk,
        health_status: health_status(health_score),
        health_score,
        debt_level: debt_level(test_debt),
        test_debt,
        alerts,
        uncovered,
    }
}

/// Walks `root` for components and test files. Tests may also live in
/// `test_dirs` outside the root.
#[instrument]
pub fn analyze_test_coverage(
    root: &Path,
    test_dirs: &[PathBuf],
) -> Result<TestCoverageReport, AppError> {
    if !root.is_dir() {
        return Err(AppError::NotFound(format!(
            "Source directory {} does not exist",
            root.display()
        )));
    }
    if let Some(missing) = test_dirs.iter().find(|d| !d.is_dir()) {
        return Err(AppError::NotFound(format!(
            "Test directory {} does not exist",
            missing.display()
        )));
    }

    let mut components = Vec::new();
    let mut test_stems = HashSet::new();
    let mut test_files = 0;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e));
    for entry in walker {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if !entry.file_type().is_file() || !is_code_file(&name) {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let in_test_dir = relative
            .parent()
            .is_some_and(|p| p.components().any(|c| is_test_dir(&c.as_os_str().to_string_lossy())));
        if is_test_name(&name) || in_test_dir {
            test_files += 1;
            test_stems.insert(test_stem(&name));
        } else {
            components.push(Component::from_relative(&relative.to_string_lossy()));
        }
    }

    for dir in test_dirs {
        for entry in WalkDir::new(dir).into_iter().filter_entry(|e| !is_skipped_dir(e)) {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_file() && is_code_file(&name) {
                test_files += 1;
                test_stems.insert(test_stem(&name));
            }
        }
    }
    debug!(components = components.len(), test_files, "Source tree scanned");

    let report = build_test_coverage(&components, &test_stems, test_files);
    if !report.alerts.is_empty() {
        warn!(alerts = report.alerts.len(), "Test coverage alerts raised");
    }
    info!(
        components = report.total_components,
        covered = report.covered_components,
        rate = report.coverage_rate,
        health = report.health_score,
        "Test coverage analyzed"
    );
    Ok(report)
}

impl TestCoverageReport {
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# Test Coverage Report\n\n");
        md.push_str(&format!("Generated: {}\n\n", self.generated_at));

        md.push_str("## Summary\n\n");
        md.push_str(&format!("- Components: {}\n", self.total_components));
        md.push_str(&format!("- Covered: {}\n", self.covered_components));
        md.push_str(&format!("- Test files: {}\n", self.test_files));
        md.push_str(&format!(
            "- Coverage: {:.2}% (target {}%)\n",
            self.coverage_rate, TARGET_COVERAGE
        ));
        md.push_str(&format!(
            "- Health: {:.2} ({})\n",
            self.health_score, self.health_status
        ));
        md.push_str(&format!(
            "- Test debt: {} ({})\n\n",
            self.test_debt, self.debt_level
        ));

        if !self.alerts.is_empty() {
            md.push_str("## Alerts\n\n");
            for alert in &self.alerts {
                let level = match alert.level {
                    AlertLevel::Critical => "CRITICAL",
                    AlertLevel::Warning => "WARNING",
                };
                md.push_str(&format!("- **{}** {}\n", level, alert.message));
            }
            md.push('\n');
        }

        md.push_str("## Categories\n\n");
        md.push_str("| Category | Components | Covered | Coverage | Grade |\n|---|---|---|---|---|\n");
        for c in &self.categories {
            md.push_str(&format!(
                "| {} | {} | {} | {:.2}% | {} |\n",
                c.category, c.total, c.covered, c.coverage_rate, c.grade
            ));
        }

        md.push_str(&format!(
            "\n## Untested components ({})\n\n",
            self.uncovered.len()
        ));
        for u in &self.uncovered {
            let risk = match u.risk {
                Risk::High => "high",
                Risk::Medium => "medium",
                Risk::Low => "low",
            };
            md.push_str(&format!("- `{}` ({} risk)\n", u.file, risk));
        }
        md
    }
}
