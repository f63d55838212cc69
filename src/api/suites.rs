use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Value, json};

use crate::api::transport::HttpMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestDepth {
    Smoke,
    Standard,
    Deep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Suite {
    Comprehensive,
    TeachingCenter,
    ThreeCenters,
}

impl Suite {
    pub const ALL: [Suite; 3] = [Suite::Comprehensive, Suite::TeachingCenter, Suite::ThreeCenters];

    pub fn as_str(&self) -> &'static str {
        match self {
            Suite::Comprehensive => "comprehensive",
            Suite::TeachingCenter => "teaching-center",
            Suite::ThreeCenters => "three-centers",
        }
    }

    pub fn checks(&self) -> Vec<ApiCheck> {
        match self {
            Suite::Comprehensive => comprehensive(),
            Suite::TeachingCenter => teaching_center(),
            Suite::ThreeCenters => three_centers(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiCheck {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    /// Sends the role's bearer token when set.
    pub auth: bool,
    pub expect_status: Vec<u16>,
    pub expect_success: Option<bool>,
    pub depth: TestDepth,
}

impl ApiCheck {
    pub fn get(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            method: HttpMethod::Get,
            path: path.to_string(),
            body: None,
            auth: true,
            expect_status: vec![200],
            expect_success: Some(true),
            depth: TestDepth::Smoke,
        }
    }

    pub fn post(name: &str, path: &str, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body),
            ..Self::get(name, path)
        }
    }

    pub fn depth(mut self, depth: TestDepth) -> Self {
        self.depth = depth;
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.auth = false;
        self
    }

    pub fn expect(mut self, statuses: &[u16], success: Option<bool>) -> Self {
        self.expect_status = statuses.to_vec();
        self.expect_success = success;
        self
    }

    pub fn expects_2xx(&self) -> bool {
        self.expect_status.iter().all(|s| (200..300).contains(s))
    }
}

fn comprehensive() -> Vec<ApiCheck> {
    vec![
        ApiCheck::post(
            "login rejects invalid credentials",
            "/api/auth/login",
            json!({ "username": "nonexistent_user", "password": "wrong-password" }),
        )
        .anonymous()
        .expect(&[400, 401], None),
        ApiCheck::post("login rejects missing fields", "/api/auth/login", json!({}))
            .anonymous()
            .expect(&[400, 401], None)
            .depth(TestDepth::Standard),
        ApiCheck::get("students require a token", "/api/students")
            .anonymous()
            .expect(&[401, 403], None),
        ApiCheck::get("list users", "/api/users"),
        ApiCheck::get("list students", "/api/students"),
        ApiCheck::get("list classes", "/api/classes"),
        ApiCheck::get("list teachers", "/api/teachers").depth(TestDepth::Standard),
        ApiCheck::get("list activities", "/api/activities").depth(TestDepth::Standard),
        ApiCheck::get("list enrollment applications", "/api/enrollment-applications")
            .depth(TestDepth::Standard),
        ApiCheck::get("search students", "/api/students/search?keyword=a").depth(TestDepth::Deep),
        ApiCheck::get("user detail", "/api/users/1").depth(TestDepth::Deep),
        ApiCheck::get("list notifications", "/api/notifications").depth(TestDepth::Deep),
        ApiCheck::get("list todos", "/api/todos").depth(TestDepth::Deep),
        ApiCheck::get("system settings", "/api/system/settings").depth(TestDepth::Deep),
    ]
}

fn teaching_center() -> Vec<ApiCheck> {
    vec![
        ApiCheck::get("teaching center overview", "/api/teaching-center/overview"),
        ApiCheck::get("course progress", "/api/teaching-center/course-progress"),
        ApiCheck::get("courses", "/api/teaching-center/courses").depth(TestDepth::Standard),
        ApiCheck::get("course plans", "/api/teaching-center/course-plans")
            .depth(TestDepth::Standard),
        ApiCheck::get("class progress", "/api/teaching-center/classes/1/progress")
            .depth(TestDepth::Deep),
    ]
}

fn three_centers() -> Vec<ApiCheck> {
    vec![
        ApiCheck::get("enrollment center overview", "/api/enrollment-center/overview"),
        ApiCheck::get("marketing campaigns", "/api/marketing/campaigns"),
        ApiCheck::get("activity center overview", "/api/activity-center/overview"),
        ApiCheck::get("enrollment plans", "/api/enrollment-center/plans")
            .depth(TestDepth::Standard),
        ApiCheck::get("referral statistics", "/api/marketing/referrals/stats")
            .depth(TestDepth::Standard),
        ApiCheck::get("activity timeline", "/api/activity-center/timeline")
            .depth(TestDepth::Deep),
        ApiCheck::get("campaign detail", "/api/marketing/campaigns/1").depth(TestDepth::Deep),
    ]
}
