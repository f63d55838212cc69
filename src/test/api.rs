#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{Value, json};
    use serial_test::serial;

    use crate::api::{
        ApiCheck, ApiRequest, ApiResponse, ApiTester, ApiTransport, CheckOutcome, HttpMethod,
        HttpTransport, LOGIN_PATH, PLATFORM_HEADER, Platform, RunOptions, Suite, TestDepth, classify,
        extract_token,
    };
    use crate::config::ApiConfig;
    use crate::error::AppError;

    const TOKEN: &str = "token-admin";

    /// Accepts admin/secret, 404s course progress, and wants the admin token elsewhere.
    #[derive(Default)]
    struct FakeBackend {
        requests: Mutex<Vec<ApiRequest>>,
    }

    impl FakeBackend {
        fn respond(&self, request: &ApiRequest) -> ApiResponse {
            if request.path == LOGIN_PATH {
                let body = request.body.clone().unwrap_or(Value::Null);
                return if body["username"] == "admin" && body["password"] == "secret" {
                    response(200, json!({"success": true, "data": {"token": TOKEN}}))
                } else {
                    response(401, json!({"success": false, "message": "bad credentials"}))
                };
            }

            let authorized = request
                .headers
                .iter()
                .any(|(name, value)| name == "Authorization" && value == &format!("Bearer {}", TOKEN));
            if !authorized {
                return response(401, json!({"success": false, "message": "token required"}));
            }
            if request.path.contains("course-progress") {
                return response(404, json!({"success": false, "message": "not found"}));
            }
            response(200, json!({"success": true, "data": []}))
        }
    }

    impl ApiTransport for &FakeBackend {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, AppError> {
            let reply = self.respond(&request);
            self.requests.lock().unwrap().push(request);
            Ok(reply)
        }
    }

    fn response(status: u16, body: Value) -> ApiResponse {
        ApiResponse { status, body }
    }

    fn api_config() -> ApiConfig {
        ApiConfig {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 5,
        }
    }

    fn credential_vars(teacher_password: &str) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("API_USERNAME", None),
            ("API_PASSWORD", Some("secret".to_string())),
            ("API_ADMIN_USERNAME", None),
            ("API_ADMIN_PASSWORD", None),
            ("API_TEACHER_USERNAME", Some("teacher".to_string())),
            ("API_TEACHER_PASSWORD", Some(teacher_password.to_string())),
        ]
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(
            extract_token(&json!({"data": {"token": "abc"}})),
            Some("abc".to_string())
        );
        assert_eq!(extract_token(&json!({"token": "xyz"})), Some("xyz".to_string()));
        assert_eq!(extract_token(&json!({"data": {"token": ""}})), None);
        assert_eq!(extract_token(&json!({"success": true})), None);
    }

    #[test]
    fn test_endpoint_urls_keep_the_base_path() {
        let mut config = api_config();
        config.base_url = "http://gateway.local/kindergarten/".to_string();
        let transport = HttpTransport::new(&config).unwrap();

        assert_eq!(
            transport.endpoint_url("/api/students?page=2").unwrap().as_str(),
            "http://gateway.local/kindergarten/api/students?page=2"
        );
        assert_eq!(
            transport.endpoint_url(LOGIN_PATH).unwrap().path(),
            format!("/kindergarten{}", LOGIN_PATH)
        );

        let root = HttpTransport::new(&api_config()).unwrap();
        assert_eq!(
            root.endpoint_url("api/health").unwrap().as_str(),
            "http://localhost:3000/api/health"
        );
    }

    #[test]
    fn test_classify_outcomes() {
        let list = ApiCheck::get("list students", "/api/students");

        let (ok, _) = classify(&list, &response(200, json!({"success": true})));
        assert_eq!(ok, CheckOutcome::Passed);

        let (flag, detail) = classify(&list, &response(200, json!({"success": false})));
        assert_eq!(flag, CheckOutcome::Failed);
        assert!(detail.unwrap().contains("expected success=true"));

        let (auth, _) = classify(&list, &response(403, json!({})));
        assert_eq!(auth, CheckOutcome::AuthRequired);

        let (missing, _) = classify(&list, &response(404, json!({})));
        assert_eq!(missing, CheckOutcome::NotFound);

        let (server, detail) = classify(&list, &response(500, json!({"message": "boom"})));
        assert_eq!(server, CheckOutcome::Failed);
        assert!(detail.unwrap().ends_with(": boom"));
    }

    #[test]
    fn test_classify_negative_checks() {
        let guarded = ApiCheck::get("students require a token", "/api/students")
            .anonymous()
            .expect(&[401, 403], None);

        let (rejected, _) = classify(&guarded, &response(401, json!({"success": false})));
        assert_eq!(rejected, CheckOutcome::Passed);

        // A 200 on a protected route is a failure, not an auth problem.
        let (leaked, _) = classify(&guarded, &response(200, json!({"success": true})));
        assert_eq!(leaked, CheckOutcome::Failed);
    }

    #[tokio::test]
    #[serial]
    async fn test_login_returns_token() {
        let backend = FakeBackend::default();
        let tester = ApiTester::new(&backend, api_config());

        let token = temp_env::async_with_vars(credential_vars("wrong"), async {
            tester.login("admin", Some(Platform::Pc)).await
        })
        .await
        .unwrap();

        assert_eq!(token, TOKEN);
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].body.as_ref().unwrap()["username"], "admin");
        assert!(
            requests[0]
                .headers
                .contains(&(PLATFORM_HEADER.to_string(), "pc".to_string()))
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_login_failure_is_authentication_error() {
        let backend = FakeBackend::default();
        let tester = ApiTester::new(&backend, api_config());

        let result = temp_env::async_with_vars(credential_vars("wrong"), async {
            tester.login("teacher", None).await
        })
        .await;

        match result {
            Err(AppError::Authentication(message)) => {
                assert!(message.contains("401"));
                assert!(message.contains("bad credentials"));
            }
            other => panic!("expected authentication error, got {:?}", other),
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_login_without_credentials_is_config_error() {
        let backend = FakeBackend::default();
        let tester = ApiTester::new(&backend, api_config());

        let result = temp_env::async_with_vars(
            [
                ("API_PRINCIPAL_USERNAME", None::<&str>),
                ("API_PRINCIPAL_PASSWORD", None),
            ],
            async { tester.login("principal", None).await },
        )
        .await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_run_records_every_role_and_check() {
        let backend = FakeBackend::default();
        let tester = ApiTester::new(&backend, api_config());
        let options = RunOptions {
            depth: TestDepth::Smoke,
            roles: vec!["admin".to_string(), "teacher".to_string()],
            platform: Some(Platform::Mobile),
        };

        let run = temp_env::async_with_vars(credential_vars("wrong"), async {
            tester.run(&[Suite::TeachingCenter], &options).await
        })
        .await;

        // Login plus two smoke checks per role.
        assert_eq!(run.results.len(), 6);
        assert_eq!(run.count(CheckOutcome::Passed), 2);
        assert_eq!(run.count(CheckOutcome::NotFound), 1);
        assert_eq!(run.count(CheckOutcome::Failed), 1);
        assert_eq!(run.count(CheckOutcome::AuthRequired), 2);
        assert!(run.has_failures());

        let teacher: Vec<_> = run.results.iter().filter(|r| r.role == "teacher").collect();
        assert_eq!(teacher[0].name, "login as teacher");
        assert_eq!(teacher[0].outcome, CheckOutcome::Failed);
        assert!(
            teacher[1..]
                .iter()
                .all(|r| r.outcome == CheckOutcome::AuthRequired && r.status.is_none())
        );

        // The teacher's checks never reach the backend without a token.
        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|r| {
            r.headers
                .contains(&(PLATFORM_HEADER.to_string(), "mobile".to_string()))
        }));

        let markdown = run.to_markdown();
        assert!(markdown.contains("| PASS | 2 |"));
        assert!(markdown.contains("Platform: mobile"));
        assert!(markdown.contains("teaching-center"));
    }

    #[tokio::test]
    #[serial]
    async fn test_deeper_runs_include_more_checks() {
        let backend = FakeBackend::default();
        let tester = ApiTester::new(&backend, api_config());
        let smoke = RunOptions {
            depth: TestDepth::Smoke,
            ..Default::default()
        };
        let deep = RunOptions {
            depth: TestDepth::Deep,
            ..Default::default()
        };

        let (smoke_run, deep_run) = temp_env::async_with_vars(credential_vars("wrong"), async {
            (
                tester.run(&[Suite::Comprehensive], &smoke).await,
                tester.run(&[Suite::Comprehensive], &deep).await,
            )
        })
        .await;

        assert!(deep_run.results.len() > smoke_run.results.len());
        assert_eq!(
            deep_run.results.len(),
            Suite::Comprehensive.checks().len() + 1
        );
        assert!(!smoke_run.has_failures());
    }
}
