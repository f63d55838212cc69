#[cfg(test)]
pub mod test_db {
    use std::sync::Once;

    use crate::config::SeedConfig;
    use crate::database::Migrator;
    use crate::db::Database;
    use crate::error::AppError;
    use crate::seed::teaching::ensure_kindergarten;
    use crate::seed::{DemoOptions, insert_row, seed_demo};

    static INIT: Once = Once::new();
    pub static TEST_PASSWORD: &str = "password123";

    pub fn test_seed_config() -> SeedConfig {
        SeedConfig {
            default_password: TEST_PASSWORD.to_string(),
            bcrypt_cost: 4,
        }
    }

    pub struct TestDbBuilder {
        migrate: bool,
        teachers: Vec<String>,
        parents: Vec<String>,
        demo: Option<DemoOptions>,
    }

    impl Default for TestDbBuilder {
        fn default() -> Self {
            Self {
                migrate: true,
                teachers: Vec::new(),
                parents: Vec::new(),
                demo: None,
            }
        }
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// An empty database with no tables at all.
        pub fn unmigrated(mut self) -> Self {
            self.migrate = false;
            self
        }

        pub fn teacher(mut self, name: &str) -> Self {
            self.teachers.push(name.to_string());
            self
        }

        pub fn parent(mut self, name: &str) -> Self {
            self.parents.push(name.to_string());
            self
        }

        pub fn demo(mut self, options: DemoOptions) -> Self {
            self.demo = Some(options);
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter("debug")
                    .with_test_writer()
                    .try_init();
            });

            let db = Database::connect_url("sqlite::memory:", 1).await?;
            if !self.migrate {
                return Ok(TestDb { db });
            }

            Migrator::with_catalog(&db).run().await?;

            if !self.teachers.is_empty() {
                let kindergarten_id = ensure_kindergarten(&db, "KG-TEST", "Test Kindergarten").await?;
                let sql = db.dialect().returning_id(
                    "INSERT INTO teachers (kindergarten_id, name, phone) VALUES (?, ?, ?)",
                );
                for (i, name) in self.teachers.iter().enumerate() {
                    let query = sqlx::query(&sql)
                        .bind(kindergarten_id)
                        .bind(name)
                        .bind(format!("1390000{:04}", i));
                    insert_row(db.pool(), db.dialect(), query, "teacher").await?;
                }
            }

            for (i, name) in self.parents.iter().enumerate() {
                sqlx::query("INSERT INTO parents (name, phone) VALUES (?, ?)")
                    .bind(name)
                    .bind(format!("1380000{:04}", i))
                    .execute(db.pool())
                    .await?;
            }

            if let Some(options) = &self.demo {
                seed_demo(&db, options, &test_seed_config()).await?;
            }

            Ok(TestDb { db })
        }
    }

    pub struct TestDb {
        pub db: Database,
    }

    impl TestDb {
        pub async fn count(&self, table: &str) -> i64 {
            self.db.count_rows(table).await.expect("count rows")
        }

        pub async fn count_where(&self, sql: &str) -> i64 {
            sqlx::query_scalar(sql)
                .fetch_one(self.db.pool())
                .await
                .expect("count query")
        }
    }

    /// Small demo so the seeded tests stay quick.
    pub fn small_demo(seed: u64) -> DemoOptions {
        DemoOptions {
            seed,
            classes_per_grade: 1,
            students_per_class: 3,
            activities: 2,
            enrollment_applications: 4,
            attendance_days: 2,
            tasks: 3,
        }
    }
}
