pub mod suites;
pub mod transport;

pub use suites::*;
pub use transport::*;

use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::config::ApiConfig;
use crate::error::AppError;

pub const API_TEST_REPORT: &str = "api-test-report.md";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const PLATFORM_HEADER: &str = "X-Client-Platform";

#[derive(Debug, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed,
    Failed,
    AuthRequired,
    NotFound,
}

impl CheckOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::Passed => "PASS",
            CheckOutcome::Failed => "FAIL",
            CheckOutcome::AuthRequired => "AUTH",
            CheckOutcome::NotFound => "404",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub role: String,
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub status: Option<u16>,
    pub outcome: CheckOutcome,
    pub detail: Option<String>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub depth: TestDepth,
    pub roles: Vec<String>,
    pub platform: Option<Platform>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            depth: TestDepth::Standard,
            roles: vec!["admin".to_string()],
            platform: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestRun {
    pub suites: Vec<Suite>,
    pub depth: TestDepth,
    pub platform: Option<Platform>,
    pub results: Vec<CheckResult>,
}

impl TestRun {
    pub fn count(&self, outcome: CheckOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(CheckOutcome::Failed) > 0
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# API Test Report\n\n");
        md.push_str(&format!(
            "- Generated: {}\n- Suites: {}\n- Depth: {:?}\n- Platform: {}\n\n",
            chrono::Utc::now().to_rfc3339(),
            self.suites
                .iter()
                .map(Suite::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            self.depth,
            self.platform.map(|p| p.as_str()).unwrap_or("default"),
        ));

        md.push_str("## Summary\n\n| Outcome | Count |\n|---|---|\n");
        for outcome in [
            CheckOutcome::Passed,
            CheckOutcome::Failed,
            CheckOutcome::AuthRequired,
            CheckOutcome::NotFound,
        ] {
            md.push_str(&format!("| {} | {} |\n", outcome.label(), self.count(outcome)));
        }

        md.push_str("\n## Results\n\n| Role | Check | Method | Path | Status | Outcome | Time (ms) | Detail |\n");
        md.push_str("|---|---|---|---|---|---|---|---|\n");
        for r in &self.results {
            md.push_str(&format!(
                "| {} | {} | {} | `{}` | {} | {} | {} | {} |\n",
                r.role,
                r.name,
                r.method.as_str(),
                r.path,
                r.status.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
                r.outcome.label(),
                r.duration_ms,
                r.detail.as_deref().unwrap_or("").replace('|', "\\|"),
            ));
        }
        md
    }
}

/// Decides the outcome of a check from the response it got.
pub fn classify(check: &ApiCheck, response: &ApiResponse) -> (CheckOutcome, Option<String>) {
    let status = response.status;

    if check.expect_status.contains(&status) {
        return match (check.expect_success, response.success_flag()) {
            (Some(expected), actual) if actual != Some(expected) => (
                CheckOutcome::Failed,
                Some(format!("expected success={}, got {:?}", expected, actual)),
            ),
            _ => (CheckOutcome::Passed, None),
        };
    }

    let detail = Some(format!(
        "expected {:?}, got {}{}",
        check.expect_status,
        status,
        response
            .message()
            .map(|m| format!(": {}", m))
            .unwrap_or_default()
    ));

    if matches!(status, 401 | 403) && check.expects_2xx() {
        (CheckOutcome::AuthRequired, detail)
    } else if status == 404 {
        (CheckOutcome::NotFound, detail)
    } else {
        (CheckOutcome::Failed, detail)
    }
}

pub struct ApiTester<T: ApiTransport> {
    transport: T,
    config: ApiConfig,
}

impl<T: ApiTransport> ApiTester<T> {
    pub fn new(transport: T, config: ApiConfig) -> Self {
        Self { transport, config }
    }

    fn request(&self, method: HttpMethod, path: &str, platform: Option<Platform>) -> ApiRequest {
        let request = ApiRequest::new(method, path);
        match platform {
            Some(p) => request.header(PLATFORM_HEADER, p.as_str()),
            None => request,
        }
    }

    /// Logs in with the configured credentials for `role` and returns the bearer token.
    #[instrument(skip(self))]
    pub async fn login(&self, role: &str, platform: Option<Platform>) -> Result<String, AppError> {
        let (username, password) = self.config.credentials(role)?;
        let login = LoginRequest { username, password };
        login
            .validate()
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        let request = self
            .request(HttpMethod::Post, LOGIN_PATH, platform)
            .json(serde_json::to_value(&login)?);
        let response = self.transport.send(request).await?;

        if response.status != 200 || response.success_flag() == Some(false) {
            return Err(AppError::Authentication(format!(
                "Login as {} failed with status {}{}",
                role,
                response.status,
                response
                    .message()
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default()
            )));
        }

        extract_token(&response.body).ok_or_else(|| {
            AppError::Authentication(format!("Login as {} returned no token", role))
        })
    }

    pub async fn run_check(
        &self,
        check: &ApiCheck,
        role: &str,
        token: Option<&str>,
        platform: Option<Platform>,
    ) -> CheckResult {
        let started = Instant::now();
        let mut result = CheckResult {
            role: role.to_string(),
            name: check.name.clone(),
            method: check.method,
            path: check.path.clone(),
            status: None,
            outcome: CheckOutcome::Failed,
            detail: None,
            duration_ms: 0,
        };

        let mut request = self.request(check.method, &check.path, platform);
        if check.auth {
            match token {
                Some(token) => request = request.bearer(token),
                None => {
                    result.outcome = CheckOutcome::AuthRequired;
                    result.detail = Some("no token for role".to_string());
                    return result;
                }
            }
        }
        if let Some(body) = &check.body {
            request = request.json(body.clone());
        }

        match self.transport.send(request).await {
            Ok(response) => {
                let (outcome, detail) = classify(check, &response);
                result.status = Some(response.status);
                result.outcome = outcome;
                result.detail = detail;
            }
            Err(e) => result.detail = Some(e.to_string()),
        }
        result.duration_ms = started.elapsed().as_millis();
        result
    }

    /// Runs each suite once per role; a failed login is recorded and the
    /// role's authenticated checks are reported as needing auth.
    #[instrument(skip(self, options))]
    pub async fn run(&self, suites: &[Suite], options: &RunOptions) -> TestRun {
        let mut results = Vec::new();

        for role in &options.roles {
            let started = Instant::now();
            let token = match self.login(role, options.platform).await {
                Ok(token) => {
                    results.push(login_result(role, CheckOutcome::Passed, None, started));
                    Some(token)
                }
                Err(e) => {
                    warn!("Login failed for {}: {}", role, e);
                    results.push(login_result(
                        role,
                        CheckOutcome::Failed,
                        Some(e.to_string()),
                        started,
                    ));
                    None
                }
            };

            for suite in suites {
                for check in suite.checks().iter().filter(|c| c.depth <= options.depth) {
                    let result = self
                        .run_check(check, role, token.as_deref(), options.platform)
                        .await;
                    info!(
                        "[{}] {} {} {}",
                        result.outcome.label(),
                        check.method.as_str(),
                        check.path,
                        role
                    );
                    results.push(result);
                }
            }
        }

        TestRun {
            suites: suites.to_vec(),
            depth: options.depth,
            platform: options.platform,
            results,
        }
    }
}

fn login_result(
    role: &str,
    outcome: CheckOutcome,
    detail: Option<String>,
    started: Instant,
) -> CheckResult {
    CheckResult {
        role: role.to_string(),
        name: format!("login as {}", role),
        method: HttpMethod::Post,
        path: LOGIN_PATH.to_string(),
        status: None,
        outcome,
        detail,
        duration_ms: started.elapsed().as_millis(),
    }
}

/// The token lives at `data.token` or at the top level, depending on the endpoint version.
pub fn extract_token(body: &Value) -> Option<String> {
    body.pointer("/data/token")
        .or_else(|| body.get("token"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(String::from)
}
