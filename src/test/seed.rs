#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::db::Dialect;
    use crate::error::AppError;
    use crate::seed::{
        DOCUMENT_TEMPLATES, DemoSeedSummary, PAGE_GUIDES, ReferralPlan, TeachingVariant,
        TemplateCategory, current_semester, insert_row, remove_document_templates, seed_demo,
        seed_document_templates, seed_page_guides, seed_referrals, seed_teaching_center,
    };
    use crate::test::utils::test_db::{TEST_PASSWORD, TestDbBuilder, small_demo, test_seed_config};

    fn plan(monthly: Vec<u32>) -> ReferralPlan {
        ReferralPlan {
            start_month: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            monthly_conversions: monthly,
            leads_per_month: 5,
            reward_amount: 200.0,
        }
    }

    #[tokio::test]
    async fn test_demo_seed_counts_match_options() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let options = small_demo(7);

        let summary = seed_demo(&test_db.db, &options, &test_seed_config())
            .await
            .unwrap();

        // One class per grade, one teacher per class plus the principal.
        let classes = 4 * options.classes_per_grade;
        let students = classes * options.students_per_class;
        assert_eq!(summary.kindergartens, 1);
        assert_eq!(summary.classes, classes);
        assert_eq!(summary.teachers, classes + 1);
        assert_eq!(summary.users, classes + 1);
        assert_eq!(summary.students, students);
        assert_eq!(summary.parents, students);
        assert_eq!(summary.relations, students);
        assert_eq!(summary.activities, options.activities);
        assert_eq!(summary.enrollment_applications, options.enrollment_applications);
        assert_eq!(summary.attendances, students * options.attendance_days);
        assert_eq!(summary.tasks, options.tasks);

        assert_eq!(test_db.count("students").await, students as i64);
        assert_eq!(test_db.count("attendances").await, summary.attendances as i64);
        assert_eq!(
            test_db.count("activity_registrations").await,
            summary.registrations as i64
        );
    }

    #[tokio::test]
    async fn test_demo_passwords_are_hashed() {
        let test_db = TestDbBuilder::new().demo(small_demo(3)).build().await.unwrap();

        let hash: String = sqlx::query_scalar("SELECT password FROM users WHERE username = ?")
            .bind("principal_3")
            .fetch_one(test_db.db.pool())
            .await
            .unwrap();

        assert_ne!(hash, TEST_PASSWORD);
        assert!(bcrypt::verify(TEST_PASSWORD, &hash).unwrap());
    }

    #[tokio::test]
    async fn test_demo_same_seed_is_rejected() {
        let test_db = TestDbBuilder::new().demo(small_demo(11)).build().await.unwrap();

        let result = seed_demo(&test_db.db, &small_demo(11), &test_seed_config()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let other: DemoSeedSummary = seed_demo(&test_db.db, &small_demo(12), &test_seed_config())
            .await
            .unwrap();
        assert_eq!(other.kindergartens, 1);
        assert_eq!(test_db.count("kindergartens").await, 2);
    }

    #[tokio::test]
    async fn test_demo_is_deterministic_for_a_seed() {
        let first = TestDbBuilder::new().demo(small_demo(5)).build().await.unwrap();
        let second = TestDbBuilder::new().demo(small_demo(5)).build().await.unwrap();

        let names = |db: &crate::db::Database| {
            let pool = db.pool().clone();
            async move {
                sqlx::query_scalar::<_, String>("SELECT name FROM students ORDER BY id")
                    .fetch_all(&pool)
                    .await
                    .unwrap()
            }
        };

        assert_eq!(names(&first.db).await, names(&second.db).await);
    }

    #[tokio::test]
    async fn test_referral_seed_converts_every_planned_referral() {
        let test_db = TestDbBuilder::new()
            .teacher("Zhang Wei")
            .teacher("Wang Fang")
            .parent("Li Na")
            .build()
            .await
            .unwrap();
        let plan = plan(vec![8, 12, 15, 18, 22, 25]);

        let summary = seed_referrals(&test_db.db, &plan).await.unwrap();

        assert_eq!(summary.converted, 100);
        assert_eq!(summary.rewards, 100);
        assert_eq!(summary.leads, 30);
        assert_eq!(summary.monthly.len(), 6);
        assert_eq!(summary.monthly[0].month, "2025-01");
        assert_eq!(summary.monthly[5].month, "2025-06");
        assert_eq!(summary.monthly[5].converted, 25);

        assert_eq!(
            test_db
                .count_where(
                    "SELECT COUNT(*) FROM referral_relationships WHERE status = 'converted'"
                )
                .await,
            100
        );
        assert_eq!(test_db.count("referral_rewards").await, 100);
        assert!(
            test_db
                .count_where(
                    "SELECT COUNT(*) FROM referral_relationships \
                     WHERE referral_code = 'REF-T000001'"
                )
                .await
                > 0
        );
    }

    #[tokio::test]
    async fn test_referral_seed_requires_referrers() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let result = seed_referrals(&test_db.db, &plan(vec![1, 2])).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(test_db.count("referral_relationships").await, 0);
    }

    #[tokio::test]
    async fn test_referral_seed_rejects_empty_plan() {
        let test_db = TestDbBuilder::new().teacher("Zhang Wei").build().await.unwrap();

        let result = seed_referrals(&test_db.db, &plan(vec![])).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_referral_seed_rolls_back_on_failure() {
        let test_db = TestDbBuilder::new().teacher("Zhang Wei").build().await.unwrap();
        sqlx::query("DROP TABLE referral_rewards")
            .execute(test_db.db.pool())
            .await
            .unwrap();

        let result = seed_referrals(&test_db.db, &plan(vec![3])).await;
        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(test_db.count("referral_relationships").await, 0);
    }

    #[test]
    fn test_plan_ending_this_month_starts_months_back() {
        let plan = ReferralPlan::ending_this_month(vec![1, 2, 3]);
        let last = plan.month_start(2).unwrap();
        let today = chrono::Utc::now().date_naive();

        assert_eq!(plan.total_conversions(), 6);
        assert_eq!(last.format("%Y-%m").to_string(), today.format("%Y-%m").to_string());
    }

    #[tokio::test]
    async fn test_teaching_center_creates_classes_when_missing() {
        let test_db = TestDbBuilder::new().build().await.unwrap();

        let summary = seed_teaching_center(&test_db.db, TeachingVariant::Minimal)
            .await
            .unwrap();

        assert_eq!(summary.courses_created, 2);
        assert_eq!(summary.classes_created, 4);
        assert_eq!(summary.plans_created, 8);
        assert_eq!(summary.progress_rows, 8 * 8);
        assert_eq!(
            summary.completed_sessions,
            8 * TeachingVariant::Minimal.completed_sessions() as usize
        );
        assert_eq!(test_db.count("course_progress").await, 64);
    }

    #[tokio::test]
    async fn test_teaching_center_is_idempotent() {
        let test_db = TestDbBuilder::new().demo(small_demo(9)).build().await.unwrap();

        let first = seed_teaching_center(&test_db.db, TeachingVariant::Standard)
            .await
            .unwrap();
        let second = seed_teaching_center(&test_db.db, TeachingVariant::Standard)
            .await
            .unwrap();

        assert_eq!(first.classes_created, 0);
        assert_eq!(first.plans_created, 4 * 4);
        assert_eq!(second.courses_created, 0);
        assert_eq!(second.plans_created, 0);
        assert_eq!(second.plans_skipped, first.plans_created);
        assert_eq!(
            test_db.count("course_progress").await,
            first.progress_rows as i64
        );
    }

    #[test]
    fn test_current_semester() {
        let spring = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let autumn = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        assert_eq!(current_semester(spring), "2026-spring");
        assert_eq!(current_semester(autumn), "2026-autumn");
    }

    #[tokio::test]
    async fn test_page_guides_seed_once() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let sections: usize = PAGE_GUIDES.iter().map(|g| g.sections.len()).sum();

        let first = seed_page_guides(&test_db.db, PAGE_GUIDES).await.unwrap();
        assert_eq!(first.guides_created, PAGE_GUIDES.len());
        assert_eq!(first.sections_created, sections);

        let second = seed_page_guides(&test_db.db, PAGE_GUIDES).await.unwrap();
        assert_eq!(second.guides_created, 0);
        assert_eq!(second.guides_skipped, PAGE_GUIDES.len());
        assert_eq!(second.sections_skipped, sections);
        assert_eq!(test_db.count("page_guide_sections").await, sections as i64);
    }

    #[tokio::test]
    async fn test_inserted_rows_report_their_ids() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let db = &test_db.db;
        let insert = "INSERT INTO parents (name, phone) VALUES (?, ?)";
        assert_eq!(Dialect::MySql.returning_id(insert), insert);

        let sql = db.dialect().returning_id(insert);
        assert!(sql.ends_with(" RETURNING id"));

        let query = sqlx::query(&sql).bind("Zhou Min").bind("13800000001");
        let first = insert_row(db.pool(), db.dialect(), query, "parent")
            .await
            .unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let query = sqlx::query(&sql).bind("Wu Fang").bind("13800000002");
        let second = insert_row(&mut *tx, db.dialect(), query, "parent")
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(second, first + 1);
        let name: String = sqlx::query_scalar("SELECT name FROM parents WHERE id = ?")
            .bind(second)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(name, "Wu Fang");
    }

    #[test]
    fn test_document_catalog_codes_follow_their_category() {
        assert_eq!(DOCUMENT_TEMPLATES.len(), 73);

        for (index, template) in DOCUMENT_TEMPLATES.iter().enumerate() {
            let (prefix, number) = template.code.split_once('-').unwrap();
            assert_eq!(prefix, template.category.code_prefix(), "{}", template.code);
            assert_eq!(number.parse::<usize>().unwrap(), index + 1);
        }
        for category in TemplateCategory::ALL {
            assert!(DOCUMENT_TEMPLATES.iter().any(|t| t.category == category));
        }
    }

    #[test]
    fn test_document_content_has_a_slot_for_every_variable() {
        let annual = &DOCUMENT_TEMPLATES[0];
        let variables = annual.variables();
        let names: Vec<&str> = variables
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            ["kindergarten_name", "fill_date", "filled_by", "year", "self_check_date", "principal_name"]
        );
        assert_eq!(variables[1]["default"], "{{today}}");

        let content = annual.render_content();
        assert!(content.starts_with(&format!("# {}\n", annual.name)));
        for name in names {
            assert!(content.contains(&format!("{{{{{}}}}}", name)), "no slot for {}", name);
        }
        assert!(annual.is_detailed());

        let bus = DOCUMENT_TEMPLATES.iter().find(|t| t.code == "02-35").unwrap();
        assert!(bus.render_content().contains("facility it covers does not exist"));
        assert!(!bus.is_detailed());
    }

    #[tokio::test]
    async fn test_document_templates_seed_once() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let db = &test_db.db;
        sqlx::query("INSERT INTO users (username, password, role) VALUES ('root', 'x', 'admin')")
            .execute(db.pool())
            .await
            .unwrap();

        let first = seed_document_templates(db, DOCUMENT_TEMPLATES).await.unwrap();
        assert_eq!(first.created, 73);
        assert_eq!(first.skipped, 0);

        let second = seed_document_templates(db, DOCUMENT_TEMPLATES).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.skipped, 73);
        assert_eq!(test_db.count("document_templates").await, 73);

        assert_eq!(
            test_db
                .count_where(
                    "SELECT COUNT(*) FROM document_templates \
                     WHERE created_by IS NULL OR content_type <> 'markdown' OR version <> '1.0'"
                )
                .await,
            0
        );
        assert_eq!(
            test_db
                .count_where("SELECT COUNT(*) FROM document_templates WHERE is_detailed = 1")
                .await,
            DOCUMENT_TEMPLATES.iter().filter(|t| t.is_detailed()).count() as i64
        );

        let variables: String =
            sqlx::query_scalar("SELECT variables FROM document_templates WHERE code = '06-62'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        let variables: serde_json::Value = serde_json::from_str(&variables).unwrap();
        assert_eq!(variables.as_array().unwrap().len(), 5);
        assert_eq!(variables[3]["name"], "period");

        assert_eq!(remove_document_templates(db).await.unwrap(), 73);
        assert_eq!(test_db.count("document_templates").await, 0);
    }

    #[tokio::test]
    async fn test_document_templates_need_their_table() {
        let test_db = TestDbBuilder::new().unmigrated().build().await.unwrap();

        let result = seed_document_templates(&test_db.db, DOCUMENT_TEMPLATES).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
