use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};

use crate::analysis::percentage;
use crate::analysis::routes::{RouteFile, normalize_path, scan_routes_dir};
use crate::api::Suite;
use crate::error::AppError;

pub const API_COVERAGE_REPORT: &str = "api-coverage-report.md";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
}

impl Endpoint {
    fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            path: normalize_path(path),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UndocumentedRoutes {
    pub file: String,
    pub declared: usize,
    pub undocumented: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiCoverageReport {
    pub documented: BTreeSet<Endpoint>,
    pub tested: BTreeSet<Endpoint>,
    pub covered: Vec<Endpoint>,
    pub untested: Vec<Endpoint>,
    pub undocumented_tested: Vec<Endpoint>,
    pub files: Vec<UndocumentedRoutes>,
    pub coverage_rate: f64,
}

/// Endpoints exercised by the built-in API suites.
pub fn tested_endpoints() -> BTreeSet<Endpoint> {
    Suite::ALL
        .iter()
        .flat_map(|s| s.checks())
        .map(|c| Endpoint::new(c.method.as_str(), &c.path))
        .collect()
}

pub fn build_api_coverage(route_files: &[RouteFile], tested: BTreeSet<Endpoint>) -> ApiCoverageReport {
    let documented: BTreeSet<Endpoint> = route_files
        .iter()
        .flat_map(|f| f.documented.iter())
        .map(|e| Endpoint::new(&e.method, &e.path))
        .collect();

    let covered: Vec<Endpoint> = documented.intersection(&tested).cloned().collect();
    let untested = documented.difference(&tested).cloned().collect();
    let undocumented_tested = tested.difference(&documented).cloned().collect();

    let files = route_files
        .iter()
        .filter(|f| !f.declarations.is_empty())
        .map(|f| UndocumentedRoutes {
            file: f.file.display().to_string(),
            declared: f.declarations.len(),
            undocumented: f
                .undocumented()
                .iter()
                .map(|d| format!("{} {} (line {})", d.method, d.path, d.line))
                .collect(),
        })
        .collect();

    ApiCoverageReport {
        coverage_rate: percentage(covered.len(), documented.len()),
        documented,
        tested,
        covered,
        untested,
        undocumented_tested,
        files,
    }
}

#[instrument]
pub fn analyze_api_coverage(routes_dir: &Path) -> Result<ApiCoverageReport, AppError> {
    let route_files = scan_routes_dir(routes_dir)?;
    let report = build_api_coverage(&route_files, tested_endpoints());

    info!(
        documented = report.documented.len(),
        tested = report.tested.len(),
        rate = report.coverage_rate,
        "API coverage analysed"
    );
    Ok(report)
}

impl ApiCoverageReport {
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# API Coverage Report\n\n");
        md.push_str(&format!("Generated: {}\n\n", chrono::Utc::now().to_rfc3339()));

        md.push_str("## Summary\n\n");
        md.push_str(&format!("- Documented endpoints: {}\n", self.documented.len()));
        md.push_str(&format!("- Tested endpoints: {}\n", self.tested.len()));
        md.push_str(&format!("- Documented and tested: {}\n", self.covered.len()));
        md.push_str(&format!("- Coverage: {:.2}%\n\n", self.coverage_rate));

        let endpoint_list = |title: &str, endpoints: &[Endpoint]| {
            let mut section = format!("## {} ({})\n\n", title, endpoints.len());
            for e in endpoints {
                section.push_str(&format!("- `{} {}`\n", e.method, e.path));
            }
            section.push('\n');
            section
        };
        md.push_str(&endpoint_list("Untested documented endpoints", &self.untested));
        md.push_str(&endpoint_list(
            "Tested but undocumented endpoints",
            &self.undocumented_tested,
        ));

        md.push_str("## Route declarations without documentation\n\n");
        md.push_str("| File | Declared | Undocumented |\n|---|---|---|\n");
        for f in &self.files {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                f.file,
                f.declared,
                f.undocumented.len()
            ));
        }
        for f in self.files.iter().filter(|f| !f.undocumented.is_empty()) {
            md.push_str(&format!("\n### {}\n\n", f.file));
            for route in &f.undocumented {
                md.push_str(&format!("- {}\n", route));
            }
        }

        md
    }
}
