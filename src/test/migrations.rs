#[cfg(test)]
mod tests {
    use crate::database::{
        ColumnDef, ColumnType, Migration, Migrator, SchemaStep, StepOutcome, baseline_tables,
        catalog,
    };
    use crate::db::Dialect;
    use crate::error::is_duplicate_object_error;
    use crate::test::utils::test_db::{TestDbBuilder, small_demo};

    fn total_steps(migrations: &[Migration]) -> usize {
        migrations.iter().map(|m| m.steps.len()).sum()
    }

    #[tokio::test]
    async fn test_fresh_database_gets_every_step() {
        let test_db = TestDbBuilder::new().unmigrated().build().await.unwrap();
        let migrator = Migrator::with_catalog(&test_db.db);

        let pending = migrator.plan().await.unwrap();
        assert_eq!(pending.len(), total_steps(migrator.migrations()));
        assert_eq!(pending[0].migration, "baseline");
        assert!(pending[0].sql.starts_with("CREATE TABLE IF NOT EXISTS"));

        let report = migrator.run().await.unwrap();
        assert_eq!(report.applied(), total_steps(migrator.migrations()));
        assert_eq!(report.skipped(), 0);

        for table in baseline_tables() {
            assert!(
                test_db.db.table_exists(&table.name).await.unwrap(),
                "missing table {}",
                table.name
            );
        }
        assert!(test_db.db.column_exists("students", "blood_type").await.unwrap());
        assert!(test_db.db.column_exists("ai_usage_records", "billing_status").await.unwrap());
        assert!(
            test_db
                .db
                .index_exists("attendances", "uk_attendance_student_date")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_one_attendance_row_per_student_per_day() {
        let test_db = TestDbBuilder::new().demo(small_demo(31)).build().await.unwrap();
        let pool = test_db.db.pool();
        let student_id: i64 = sqlx::query_scalar("SELECT MIN(id) FROM students")
            .fetch_one(pool)
            .await
            .unwrap();
        let insert = "INSERT INTO attendances (student_id, attendance_date, status) VALUES (?, ?, ?)";

        sqlx::query(insert)
            .bind(student_id)
            .bind("2030-01-07")
            .bind("present")
            .execute(pool)
            .await
            .unwrap();

        let duplicate = sqlx::query(insert)
            .bind(student_id)
            .bind("2030-01-07")
            .bind("absent")
            .execute(pool)
            .await;
        assert!(duplicate.is_err());

        sqlx::query(insert)
            .bind(student_id)
            .bind("2030-01-08")
            .bind("present")
            .execute(pool)
            .await
            .unwrap();

        let rows = test_db
            .count_where(&format!(
                "SELECT COUNT(*) FROM attendances \
                 WHERE student_id = {} AND attendance_date >= '2030-01-01'",
                student_id
            ))
            .await;
        assert_eq!(rows, 2);
    }

    #[tokio::test]
    async fn test_second_run_applies_nothing() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let migrator = Migrator::with_catalog(&test_db.db);

        let report = migrator.run().await.unwrap();
        assert_eq!(report.applied(), 0);
        assert_eq!(report.skipped(), total_steps(migrator.migrations()));
        assert!(
            report
                .results
                .iter()
                .all(|r| r.outcome == StepOutcome::AlreadyPresent)
        );

        assert!(migrator.plan().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_schema_only_gets_missing_steps() {
        let test_db = TestDbBuilder::new().unmigrated().build().await.unwrap();
        let migrations = catalog();
        let baseline = migrations[0].clone();

        Migrator::new(&test_db.db, vec![baseline.clone()])
            .run()
            .await
            .unwrap();
        assert!(!test_db.db.column_exists("students", "blood_type").await.unwrap());

        let migrator = Migrator::new(&test_db.db, migrations.clone());
        let pending = migrator.plan().await.unwrap();
        assert_eq!(pending.len(), total_steps(&migrations) - baseline.steps.len());
        assert!(pending.iter().all(|p| p.migration != "baseline"));

        let report = migrator.run().await.unwrap();
        assert_eq!(report.applied(), pending.len());
        assert!(test_db.db.column_exists("students", "blood_type").await.unwrap());
        assert!(test_db.db.column_exists("parents", "referral_count").await.unwrap());
    }

    #[tokio::test]
    async fn test_existing_data_survives_migration() {
        let test_db = TestDbBuilder::new().unmigrated().build().await.unwrap();
        let migrations = catalog();
        Migrator::new(&test_db.db, vec![migrations[0].clone()])
            .run()
            .await
            .unwrap();

        sqlx::query("INSERT INTO parents (name, phone) VALUES ('Li Na', '13800000000')")
            .execute(test_db.db.pool())
            .await
            .unwrap();

        Migrator::new(&test_db.db, migrations).run().await.unwrap();

        let referral_count: i64 =
            sqlx::query_scalar("SELECT referral_count FROM parents WHERE name = 'Li Na'")
                .fetch_one(test_db.db.pool())
                .await
                .unwrap();
        assert_eq!(referral_count, 0);
    }

    #[tokio::test]
    async fn test_duplicate_object_errors_are_recognised() {
        let test_db = TestDbBuilder::new().unmigrated().build().await.unwrap();
        let pool = test_db.db.pool();

        sqlx::query("CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT)")
            .execute(pool)
            .await
            .unwrap();

        let table_again = sqlx::query("CREATE TABLE widgets (id INTEGER PRIMARY KEY)")
            .execute(pool)
            .await
            .unwrap_err();
        assert!(is_duplicate_object_error(&table_again));

        let column_again = sqlx::query("ALTER TABLE widgets ADD COLUMN name TEXT")
            .execute(pool)
            .await
            .unwrap_err();
        assert!(is_duplicate_object_error(&column_again));

        let missing = sqlx::query("SELECT * FROM no_such_table")
            .execute(pool)
            .await
            .unwrap_err();
        assert!(!is_duplicate_object_error(&missing));
    }

    #[test]
    fn test_step_rendering_per_dialect() {
        let step = SchemaStep::add_column(
            "students",
            ColumnDef::new("allergies", ColumnType::Text),
        );

        assert_eq!(step.describe(), "add column students.allergies");
        assert!(
            step.render(Dialect::MySql)
                .unwrap()
                .starts_with("ALTER TABLE `students` ADD COLUMN `allergies`")
        );
        assert!(
            step.render(Dialect::Sqlite)
                .unwrap()
                .starts_with("ALTER TABLE \"students\" ADD COLUMN \"allergies\"")
        );
    }

    #[test]
    fn test_invalid_identifiers_are_rejected() {
        let step = SchemaStep::add_column(
            "students; DROP TABLE users",
            ColumnDef::new("allergies", ColumnType::Text),
        );
        assert!(step.render(Dialect::Sqlite).is_err());
    }
}
