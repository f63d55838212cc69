#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use crate::database::{ColumnType, baseline_table};
    use crate::error::AppError;
    use crate::router::{
        COMPLEX_TIER_TOKENS, CountTarget, DATABASE_TOOLS, DirectRule, MatchKind, QueryRouter,
        RuleAction, Tier, analyze_complexity, builtin_rules, ensure_read_only, execute_decision,
        keyword_count, record_usage, tool_query,
    };
    use crate::test::utils::test_db::{TestDbBuilder, small_demo};

    #[test]
    fn test_exact_phrase_is_direct() {
        let router = QueryRouter::new();

        let decision = router.route("  学生总数 ");

        assert_eq!(decision.tier, Tier::Direct);
        assert_eq!(decision.match_kind, Some(MatchKind::Exact));
        assert_eq!(
            decision.action(),
            Some(&RuleAction::CountRows(CountTarget::Students))
        );
        assert_eq!(decision.estimated_tokens, 10);
        assert_eq!(decision.confidence, 1.0);
        assert!(decision.analysis.is_none());
    }

    #[test]
    fn test_phrase_inside_longer_query_is_substring_match() {
        let router = QueryRouter::new();

        let decision = router.route("请告诉我学生总数");

        assert_eq!(decision.tier, Tier::Direct);
        assert_eq!(decision.match_kind, Some(MatchKind::Substring));
        assert_eq!(decision.rule.unwrap().phrase, "学生总数");
    }

    #[test]
    fn test_single_character_does_not_reverse_match() {
        let router = QueryRouter::new();

        assert!(router.direct_match("活").is_none());
        assert!(matches!(
            router.direct_match("活动"),
            Some((MatchKind::Substring, _))
        ));
    }

    #[test]
    fn test_render_requests_skip_phrase_table() {
        let router = QueryRouter::new();

        let decision = router.route("用表格显示学生总数");

        assert_ne!(decision.tier, Tier::Direct);
        assert!(decision.rule.is_none());
        assert!(decision.analysis.is_some());
    }

    #[test]
    fn test_query_verb_with_entity_skips_phrase_table() {
        let router = QueryRouter::new();

        assert!(router.direct_match("查询学生总数").is_none());
        assert_ne!(router.route("查询学生总数").tier, Tier::Direct);
    }

    #[test]
    fn test_smart_match_on_domain_keywords() {
        let router = QueryRouter::new();

        let decision = router.route("招生情况怎样");

        assert_eq!(decision.tier, Tier::Direct);
        assert_eq!(decision.match_kind, Some(MatchKind::Smart));
        let rule = decision.rule.unwrap();
        assert_eq!(rule.action, RuleAction::Tool("get_enrollment_stats".to_string()));
        assert_eq!(rule.source, "smart");
    }

    #[test]
    fn test_simple_query_goes_to_semantic_tier() {
        let router = QueryRouter::new();

        let decision = router.route("list students");

        assert_eq!(decision.tier, Tier::Semantic);
        let analysis = decision.analysis.unwrap();
        assert_eq!(analysis.actions.len(), 1);
        assert_eq!(analysis.actions[0].group, "read");
        assert_eq!(analysis.entities[0].group, "student");
        assert!((analysis.complexity - 0.15).abs() < 1e-9);
        assert_eq!(analysis.estimated_tokens, 230);
        assert!((decision.confidence - 0.85).abs() < 1e-9);
        assert_eq!(decision.estimated_tokens, 230);
    }

    #[test]
    fn test_analysis_query_goes_to_complex_tier() {
        let router = QueryRouter::new();

        let decision = router.route("请帮我分析最近三个月的招生趋势并给出建议");

        assert_eq!(decision.tier, Tier::Complex);
        assert_eq!(decision.estimated_tokens, COMPLEX_TIER_TOKENS);
        assert!(decision.confidence >= 0.5);
        assert!(decision.analysis.unwrap().complexity <= 1.0);
    }

    #[test]
    fn test_complexity_is_capped_but_tokens_are_not() {
        let analysis = analyze_complexity("为什么 如何 分析 比较 报告 趋势 建议 对比");

        assert_eq!(analysis.complexity, 1.0);
        let uncapped_floor = 100 + 5 * 8 + 500;
        assert!(analysis.estimated_tokens > uncapped_floor);
    }

    #[test]
    fn test_dictionary_rules_extend_and_replace_builtins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("01-basic-queries.json"),
            json!({
                "directMatches": {
                    "// comment": "ignored",
                    "学生总数": {"response": "Custom count", "action": "count_students", "tokens": 5},
                    "Top Classes ": {"action": "list_classes"}
                }
            })
            .to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("02-activity-attendance.json"), "{ not json").unwrap();
        fs::write(
            dir.path().join("05-query-templates.json"),
            json!({
                "queryTemplates": {
                    "最近报名": {"sql": "SELECT * FROM enrollment_applications", "tokens": 30}
                }
            })
            .to_string(),
        )
        .unwrap();

        let router = QueryRouter::with_dictionary(dir.path());

        assert_eq!(router.rules().len(), builtin_rules().len() + 2);
        assert_eq!(router.rules()[0].phrase, "学生总数");
        assert_eq!(router.rules()[0].response, "Custom count");
        assert_eq!(router.rules()[0].tokens, 5);
        assert_eq!(router.rules()[0].source, "01-basic-queries.json");

        let top = router.rules().iter().find(|r| r.phrase == "top classes").unwrap();
        assert_eq!(top.action, RuleAction::Tool("list_classes".to_string()));
        assert_eq!(top.response, "Running list_classes...");
        assert_eq!(top.tokens, 20);

        let decision = router.route("最近报名");
        assert_eq!(decision.match_kind, Some(MatchKind::Exact));
        assert_eq!(
            decision.action(),
            Some(&RuleAction::ExecuteSql(
                "SELECT * FROM enrollment_applications".to_string()
            ))
        );
        assert_eq!(decision.estimated_tokens, 30);
    }

    #[test]
    fn test_missing_dictionary_keeps_builtins() {
        let dir = tempfile::tempdir().unwrap();

        let router = QueryRouter::with_dictionary(&dir.path().join("absent"));

        assert_eq!(router.rules(), builtin_rules().as_slice());
    }

    #[test]
    fn test_added_rule_for_new_phrase_is_appended() {
        let mut router = QueryRouter::new();
        router.add_rules([DirectRule {
            phrase: "园所概况".to_string(),
            response: "Loading overview...".to_string(),
            action: RuleAction::Tool("get_overview".to_string()),
            tokens: 12,
            source: "test".to_string(),
        }]);

        assert_eq!(router.rules().last().unwrap().phrase, "园所概况");
        assert_eq!(router.stats().direct_match_count, builtin_rules().len() + 1);
    }

    #[test]
    fn test_router_stats() {
        let stats = QueryRouter::new().stats();

        assert_eq!(stats.direct_match_count, builtin_rules().len());
        assert_eq!(stats.keyword_count, keyword_count());
        assert_eq!(stats.complexity_threshold, 0.5);

        let value = serde_json::to_value(&stats).unwrap();
        assert!(value.get("directMatchCount").is_some());
    }

    #[test]
    fn test_only_single_select_statements_are_read_only() {
        assert!(ensure_read_only("select count(*) from students;").is_ok());
        assert!(ensure_read_only("WITH t AS (SELECT 1 AS n) SELECT n FROM t").is_ok());

        for sql in [
            "DELETE FROM students",
            "SELECT 1; DROP TABLE users",
            "SELECT * FROM students WHERE id = ?",
        ] {
            assert!(
                matches!(ensure_read_only(sql), Err(AppError::Validation(_))),
                "accepted {}",
                sql
            );
        }
    }

    #[tokio::test]
    async fn test_executing_count_records_usage() {
        let test_db = TestDbBuilder::new().demo(small_demo(21)).build().await.unwrap();
        let decision = QueryRouter::new().route("学生总数");

        let result = execute_decision(&test_db.db, &decision)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.action, "count_students");
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["total"], json!(12));

        let (tier, tokens): (String, i64) = sqlx::query_as(
            "SELECT tier, input_tokens FROM ai_usage_records WHERE id = ?",
        )
        .bind(result.usage_record_id)
        .fetch_one(test_db.db.pool())
        .await
        .unwrap();
        assert_eq!(tier, "direct");
        assert_eq!(tokens, 10);
    }

    #[tokio::test]
    async fn test_executing_tool_query() {
        let test_db = TestDbBuilder::new().demo(small_demo(22)).build().await.unwrap();
        let decision = QueryRouter::new().route("任务统计");

        let result = execute_decision(&test_db.db, &decision)
            .await
            .unwrap()
            .unwrap();

        let total: i64 = result
            .rows
            .iter()
            .map(|row| row["total"].as_i64().unwrap())
            .sum();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_complex_and_workflow_queries_are_not_executed() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let router = QueryRouter::new();

        let complex = router.route("请帮我分析最近三个月的招生趋势并给出建议");
        assert!(execute_decision(&test_db.db, &complex).await.unwrap().is_none());

        let workflow = router.route("创建活动");
        assert_eq!(workflow.tier, Tier::Direct);
        assert!(execute_decision(&test_db.db, &workflow).await.unwrap().is_none());

        assert_eq!(test_db.count("ai_usage_records").await, 0);
    }

    #[test]
    fn test_every_keyword_hit_adds_tokens() {
        // Both words hit the student group and each hit is priced.
        let analysis = analyze_complexity("学生 孩子");

        assert_eq!(analysis.entities.len(), 2);
        assert!(analysis.entities.iter().all(|m| m.group == "student"));
        assert_eq!(analysis.matched(), 2);
        assert_eq!(analysis.estimated_tokens, 350);
    }

    /// The MySQL Any bridge only carries integer, float, text and blob
    /// columns, so tool queries must not select dates or decimals raw.
    #[test]
    fn test_tool_queries_select_only_text_and_integer_columns() {
        let today = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        for name in DATABASE_TOOLS {
            let query = tool_query(name, today).unwrap();
            let lowered = query.sql.to_lowercase();
            let select = &lowered["select ".len()..lowered.find(" from ").unwrap()];
            let table = lowered[lowered.find(" from ").unwrap() + 6..]
                .split_whitespace()
                .next()
                .unwrap();
            let table = baseline_table(table).unwrap();

            for expression in select.split(", ") {
                let expression = expression.trim();
                if expression.starts_with("count(*)") {
                    continue;
                }
                if let Some(inner) = expression.strip_prefix("cast(") {
                    assert!(inner.contains(" as char)"), "{}: {}", name, expression);
                    continue;
                }
                let column = table
                    .columns
                    .iter()
                    .find(|c| c.name == expression)
                    .unwrap_or_else(|| panic!("{}: unknown column {}", name, expression));
                assert!(
                    matches!(
                        column.column_type,
                        ColumnType::Id
                            | ColumnType::BigInt
                            | ColumnType::Int
                            | ColumnType::Varchar(_)
                            | ColumnType::Text
                    ),
                    "{} selects {} as {:?}",
                    name,
                    expression,
                    column.column_type
                );
            }
        }
        assert!(tool_query("get_fee_stats", today).is_none());
    }

    #[tokio::test]
    async fn test_activity_list_returns_times_as_text() {
        let test_db = TestDbBuilder::new().demo(small_demo(23)).build().await.unwrap();
        let decision = QueryRouter::new().route("活动列表");

        let result = execute_decision(&test_db.db, &decision)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.rows.len(), 2);
        for row in &result.rows {
            let start = row["start_time"].as_str().unwrap();
            assert!(chrono::NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M:%S").is_ok());
        }
    }

    #[tokio::test]
    async fn test_usage_records_get_distinct_ids() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let decision = QueryRouter::new().route("学生总数");

        let first = record_usage(&test_db.db, &decision).await.unwrap();
        let second = record_usage(&test_db.db, &decision).await.unwrap();

        assert!(first > 0);
        assert_eq!(second, first + 1);
        assert_eq!(test_db.count("ai_usage_records").await, 2);
    }
}
