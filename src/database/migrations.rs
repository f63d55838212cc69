use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::database::schema::{
    ColumnDef, ColumnType, IndexDef, TableDef, baseline_tables, document_templates_table,
};
use crate::db::{Database, Dialect, quote_ident};
use crate::error::{AppError, is_duplicate_object_error};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SchemaStep {
    CreateTable(TableDef),
    AddColumn { table: String, column: ColumnDef },
    AddIndex { table: String, index: IndexDef },
}

impl SchemaStep {
    pub fn add_column(table: &str, column: ColumnDef) -> Self {
        SchemaStep::AddColumn {
            table: table.to_string(),
            column,
        }
    }

    pub fn add_index(table: &str, index: IndexDef) -> Self {
        SchemaStep::AddIndex {
            table: table.to_string(),
            index,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SchemaStep::CreateTable(table) => format!("create table {}", table.name),
            SchemaStep::AddColumn { table, column } => {
                format!("add column {}.{}", table, column.name)
            }
            SchemaStep::AddIndex { table, index } => {
                format!("add index {} on {}", index.name, table)
            }
        }
    }

    pub fn render(&self, dialect: Dialect) -> Result<String, AppError> {
        match self {
            SchemaStep::CreateTable(table) => table.render_create(dialect),
            SchemaStep::AddColumn { table, column } => Ok(format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_ident(dialect, table)?,
                column.render(dialect)?
            )),
            SchemaStep::AddIndex { table, index } => index.render_create(table, dialect),
        }
    }

    /// The existence check guarding this step.
    pub async fn is_applied(&self, db: &Database) -> Result<bool, AppError> {
        match self {
            SchemaStep::CreateTable(table) => db.table_exists(&table.name).await,
            SchemaStep::AddColumn { table, column } => db.column_exists(table, &column.name).await,
            SchemaStep::AddIndex { table, index } => db.index_exists(table, &index.name).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Migration {
    pub name: String,
    pub steps: Vec<SchemaStep>,
}

impl Migration {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: SchemaStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Creates the table, then each of its indexes as its own guarded step.
    pub fn create_table(mut self, table: TableDef) -> Self {
        let indexes = table.indexes.clone();
        let name = table.name.clone();
        self.steps.push(SchemaStep::CreateTable(table));
        for index in indexes {
            self.steps.push(SchemaStep::add_index(&name, index));
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Applied,
    AlreadyPresent,
    DuplicateTolerated,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub migration: String,
    pub step: String,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingStep {
    pub migration: String,
    pub step: String,
    pub sql: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct MigrationReport {
    pub results: Vec<StepResult>,
}

impl MigrationReport {
    pub fn applied(&self) -> usize {
        self.count(|o| o == StepOutcome::Applied)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| o != StepOutcome::Applied)
    }

    fn count(&self, predicate: impl Fn(StepOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| predicate(r.outcome)).count()
    }
}

pub struct Migrator<'a> {
    db: &'a Database,
    migrations: Vec<Migration>,
}

impl<'a> Migrator<'a> {
    pub fn new(db: &'a Database, migrations: Vec<Migration>) -> Self {
        Self { db, migrations }
    }

    pub fn with_catalog(db: &'a Database) -> Self {
        Self::new(db, catalog())
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    #[instrument(skip(self))]
    pub async fn plan(&self) -> Result<Vec<PendingStep>, AppError> {
        let mut pending = Vec::new();

        for migration in &self.migrations {
            for step in &migration.steps {
                if !step.is_applied(self.db).await? {
                    pending.push(PendingStep {
                        migration: migration.name.clone(),
                        step: step.describe(),
                        sql: step.render(self.db.dialect())?,
                    });
                }
            }
        }

        info!("{} pending schema steps", pending.len());
        Ok(pending)
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<MigrationReport, AppError> {
        let mut report = MigrationReport::default();

        for migration in &self.migrations {
            info!("Running migration {}", migration.name);
            for step in &migration.steps {
                let outcome = self.apply_step(step).await?;
                report.results.push(StepResult {
                    migration: migration.name.clone(),
                    step: step.describe(),
                    outcome,
                });
            }
        }

        info!(
            applied = report.applied(),
            skipped = report.skipped(),
            "Migrations complete"
        );
        Ok(report)
    }

    async fn apply_step(&self, step: &SchemaStep) -> Result<StepOutcome, AppError> {
        if step.is_applied(self.db).await? {
            return Ok(StepOutcome::AlreadyPresent);
        }

        let sql = step.render(self.db.dialect())?;
        match sqlx::query(&sql).execute(self.db.pool()).await {
            Ok(_) => {
                info!("Applied: {}", step.describe());
                Ok(StepOutcome::Applied)
            }
            Err(e) if is_duplicate_object_error(&e) => {
                warn!("Skipped {}: {}", step.describe(), e);
                Ok(StepOutcome::DuplicateTolerated)
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }
}

/// Baseline tables followed by the incremental changes, in application order.
pub fn catalog() -> Vec<Migration> {
    let mut migrations = vec![
        baseline_tables()
            .into_iter()
            .fold(Migration::new("baseline"), Migration::create_table),
    ];

    migrations.push(
        Migration::new("student_health_fields")
            .step(SchemaStep::add_column(
                "students",
                ColumnDef::new("blood_type", ColumnType::Varchar(5)).comment("Blood type"),
            ))
            .step(SchemaStep::add_column(
                "students",
                ColumnDef::new("allergies", ColumnType::Text).comment("Known allergies"),
            ))
            .step(SchemaStep::add_column(
                "students",
                ColumnDef::new("health_notes", ColumnType::Text).comment("Health notes"),
            ))
            .step(SchemaStep::add_column(
                "students",
                ColumnDef::new("emergency_contact", ColumnType::Varchar(50)),
            ))
            .step(SchemaStep::add_column(
                "students",
                ColumnDef::new("emergency_phone", ColumnType::Varchar(20)),
            )),
    );

    migrations.push(
        Migration::new("activity_poster_fields")
            .step(SchemaStep::add_column(
                "activities",
                ColumnDef::new("poster_template_id", ColumnType::BigInt),
            ))
            .step(SchemaStep::add_column(
                "activities",
                ColumnDef::new("poster_url", ColumnType::Varchar(500)),
            ))
            .step(SchemaStep::add_column(
                "activities",
                ColumnDef::new("poster_generated_at", ColumnType::DateTime),
            )),
    );

    migrations.push(
        Migration::new("parent_referral_codes")
            .step(SchemaStep::add_column(
                "parents",
                ColumnDef::new("referral_code", ColumnType::Varchar(64))
                    .comment("Personal referral code"),
            ))
            .step(SchemaStep::add_column(
                "parents",
                ColumnDef::new("referral_count", ColumnType::Int)
                    .not_null()
                    .default("0"),
            ))
            .step(SchemaStep::add_index(
                "parents",
                IndexDef::unique("uk_parents_referral_code", &["referral_code"]),
            )),
    );

    migrations.push(
        Migration::new("ai_usage_billing")
            .step(SchemaStep::add_column(
                "ai_usage_records",
                ColumnDef::new("cost", ColumnType::Decimal(10, 4))
                    .not_null()
                    .default("0"),
            ))
            .step(SchemaStep::add_column(
                "ai_usage_records",
                ColumnDef::new("billing_status", ColumnType::Varchar(20))
                    .not_null()
                    .default("'unbilled'"),
            ))
            .step(SchemaStep::add_index(
                "ai_usage_records",
                IndexDef::new("idx_ai_usage_user_created", &["user_id", "created_at"]),
            )),
    );

    migrations.push(
        Migration::new("task_indexes")
            .step(SchemaStep::add_index(
                "tasks",
                IndexDef::new("idx_tasks_status", &["status"]),
            ))
            .step(SchemaStep::add_index(
                "tasks",
                IndexDef::new("idx_tasks_assignee", &["assignee_id"]),
            ))
            .step(SchemaStep::add_index(
                "tasks",
                IndexDef::new("idx_tasks_due_date", &["due_date"]),
            )),
    );

    migrations.push(Migration::new("attendance_one_per_day").step(
        SchemaStep::add_index(
            "attendances",
            IndexDef::unique(
                "uk_attendance_student_date",
                &["student_id", "attendance_date"],
            ),
        ),
    ));

    migrations.push(Migration::new("page_guide_section_order").step(
        SchemaStep::add_index(
            "page_guide_sections",
            IndexDef::new(
                "idx_page_guide_sections_order",
                &["page_guide_id", "sort_order"],
            ),
        ),
    ));

    migrations.push(Migration::new("document_templates").create_table(document_templates_table()));

    migrations
}
