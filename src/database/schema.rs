use serde::Serialize;

use crate::db::{Dialect, quote_ident};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    /// Auto-increment primary key.
    Id,
    BigInt,
    Int,
    Bool,
    Varchar(u16),
    Text,
    Decimal(u8, u8),
    Date,
    DateTime,
    Json,
}

impl ColumnType {
    pub fn render(&self, dialect: Dialect) -> String {
        match (self, dialect) {
            (ColumnType::Id, Dialect::MySql) => "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY".into(),
            (ColumnType::Id, Dialect::Sqlite) => "INTEGER PRIMARY KEY AUTOINCREMENT".into(),
            (ColumnType::BigInt, Dialect::MySql) => "BIGINT".into(),
            (ColumnType::Int, Dialect::MySql) => "INT".into(),
            (ColumnType::BigInt | ColumnType::Int, Dialect::Sqlite) => "INTEGER".into(),
            (ColumnType::Bool, Dialect::MySql) => "TINYINT(1)".into(),
            (ColumnType::Bool, Dialect::Sqlite) => "BOOLEAN".into(),
            (ColumnType::Varchar(len), Dialect::MySql) => format!("VARCHAR({})", len),
            (ColumnType::Varchar(_), Dialect::Sqlite) => "TEXT".into(),
            (ColumnType::Text, _) => "TEXT".into(),
            (ColumnType::Decimal(p, s), Dialect::MySql) => format!("DECIMAL({},{})", p, s),
            (ColumnType::Decimal(_, _), Dialect::Sqlite) => "REAL".into(),
            (ColumnType::Date, _) => "DATE".into(),
            (ColumnType::DateTime, _) => "DATETIME".into(),
            (ColumnType::Json, Dialect::MySql) => "JSON".into(),
            (ColumnType::Json, Dialect::Sqlite) => "TEXT".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<String>,
    pub unique: bool,
    pub comment: Option<String>,
}

impl ColumnDef {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: true,
            default: None,
            unique: false,
            comment: None,
        }
    }

    pub fn id() -> Self {
        Self::new("id", ColumnType::Id).not_null()
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Raw SQL default, e.g. `'active'`, `0` or `CURRENT_TIMESTAMP`.
    pub fn default(mut self, value: &str) -> Self {
        self.default = Some(value.to_string());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn render(&self, dialect: Dialect) -> Result<String, AppError> {
        let mut sql = format!(
            "{} {}",
            quote_ident(dialect, &self.name)?,
            self.column_type.render(dialect)
        );

        if self.column_type == ColumnType::Id {
            return Ok(sql);
        }

        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let (Some(comment), Dialect::MySql) = (&self.comment, dialect) {
            sql.push_str(&format!(" COMMENT '{}'", comment.replace('\'', "''")));
        }

        Ok(sql)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(name: &str, columns: &[&str]) -> Self {
        Self {
            unique: true,
            ..Self::new(name, columns)
        }
    }

    pub fn render_create(&self, table: &str, dialect: Dialect) -> Result<String, AppError> {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(dialect, c))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ");

        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            quote_ident(dialect, &self.name)?,
            quote_ident(dialect, table)?,
            columns
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub on_delete_cascade: bool,
}

impl ForeignKey {
    pub fn new(column: &str, references_table: &str) -> Self {
        Self {
            column: column.to_string(),
            references_table: references_table.to_string(),
            references_column: "id".to_string(),
            on_delete_cascade: false,
        }
    }

    pub fn cascade(mut self) -> Self {
        self.on_delete_cascade = true;
        self
    }

    fn render(&self, dialect: Dialect) -> Result<String, AppError> {
        Ok(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}){}",
            quote_ident(dialect, &self.column)?,
            quote_ident(dialect, &self.references_table)?,
            quote_ident(dialect, &self.references_column)?,
            if self.on_delete_cascade {
                " ON DELETE CASCADE"
            } else {
                ""
            }
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub indexes: Vec<IndexDef>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: vec![ColumnDef::id()],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn timestamps(self) -> Self {
        self.column(
            ColumnDef::new("created_at", ColumnType::DateTime)
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        )
        .column(
            ColumnDef::new("updated_at", ColumnType::DateTime)
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        )
    }

    pub fn soft_delete(self) -> Self {
        self.column(ColumnDef::new("deleted_at", ColumnType::DateTime))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// `CREATE TABLE IF NOT EXISTS`; indexes are created separately.
    pub fn render_create(&self, dialect: Dialect) -> Result<String, AppError> {
        let mut parts = self
            .columns
            .iter()
            .map(|c| c.render(dialect))
            .collect::<Result<Vec<_>, _>>()?;

        for fk in &self.foreign_keys {
            parts.push(fk.render(dialect)?);
        }

        let body = parts.join(",\n    ");
        let suffix = match dialect {
            Dialect::MySql => " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            Dialect::Sqlite => "",
        };

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n){}",
            quote_ident(dialect, &self.name)?,
            body,
            suffix
        ))
    }
}

fn varchar(name: &str, len: u16) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Varchar(len))
}

fn bigint(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::BigInt)
}

fn int(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Int)
}

fn text(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Text)
}

fn boolean(name: &str, default: bool) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Bool)
        .not_null()
        .default(if default { "1" } else { "0" })
}

fn date(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Date)
}

fn datetime(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::DateTime)
}

fn status(default: &str) -> ColumnDef {
    varchar("status", 20)
        .not_null()
        .default(&format!("'{}'", default))
}

/// Baseline tables in creation order (referenced tables first).
pub fn baseline_tables() -> Vec<TableDef> {
    vec![
        TableDef::new("users")
            .column(varchar("username", 50).not_null().unique())
            .column(varchar("password", 255).not_null())
            .column(varchar("real_name", 50))
            .column(varchar("email", 100))
            .column(varchar("phone", 20))
            .column(varchar("role", 20).not_null().default("'teacher'"))
            .column(status("active"))
            .timestamps()
            .soft_delete(),
        TableDef::new("roles")
            .column(varchar("code", 50).not_null().unique())
            .column(varchar("name", 50).not_null())
            .column(varchar("description", 255))
            .timestamps(),
        TableDef::new("permissions")
            .column(varchar("code", 100).not_null().unique())
            .column(varchar("name", 100).not_null())
            .column(varchar("type", 20).not_null().default("'action'"))
            .column(varchar("path", 255))
            .timestamps(),
        TableDef::new("role_permissions")
            .column(bigint("role_id").not_null())
            .column(bigint("permission_id").not_null())
            .timestamps()
            .index(IndexDef::unique(
                "uk_role_permission",
                &["role_id", "permission_id"],
            ))
            .foreign_key(ForeignKey::new("role_id", "roles").cascade())
            .foreign_key(ForeignKey::new("permission_id", "permissions").cascade()),
        TableDef::new("kindergartens")
            .column(varchar("name", 100).not_null())
            .column(varchar("code", 50).not_null().unique())
            .column(varchar("address", 255))
            .column(varchar("phone", 20))
            .column(varchar("principal_name", 50))
            .column(status("active"))
            .timestamps()
            .soft_delete(),
        TableDef::new("classes")
            .column(bigint("kindergarten_id").not_null())
            .column(varchar("name", 50).not_null())
            .column(varchar("grade", 20).not_null())
            .column(int("capacity").not_null().default("30"))
            .column(status("active"))
            .timestamps()
            .soft_delete()
            .foreign_key(ForeignKey::new("kindergarten_id", "kindergartens")),
        TableDef::new("teachers")
            .column(bigint("user_id"))
            .column(bigint("kindergarten_id").not_null())
            .column(bigint("class_id"))
            .column(varchar("name", 50).not_null())
            .column(varchar("position", 50))
            .column(varchar("phone", 20))
            .column(date("hire_date"))
            .column(status("active"))
            .timestamps()
            .soft_delete()
            .foreign_key(ForeignKey::new("user_id", "users"))
            .foreign_key(ForeignKey::new("kindergarten_id", "kindergartens"))
            .foreign_key(ForeignKey::new("class_id", "classes")),
        TableDef::new("students")
            .column(bigint("kindergarten_id").not_null())
            .column(bigint("class_id"))
            .column(varchar("name", 50).not_null())
            .column(varchar("student_no", 50).not_null().unique())
            .column(varchar("gender", 10).not_null())
            .column(date("birth_date"))
            .column(date("enrollment_date"))
            .column(status("active"))
            .timestamps()
            .soft_delete()
            .index(IndexDef::new("idx_students_class", &["class_id"]))
            .foreign_key(ForeignKey::new("kindergarten_id", "kindergartens"))
            .foreign_key(ForeignKey::new("class_id", "classes")),
        TableDef::new("parents")
            .column(bigint("user_id"))
            .column(varchar("name", 50).not_null())
            .column(varchar("phone", 20).not_null())
            .column(varchar("relationship", 20))
            .timestamps()
            .soft_delete()
            .foreign_key(ForeignKey::new("user_id", "users")),
        TableDef::new("parent_student_relations")
            .column(bigint("parent_id").not_null())
            .column(bigint("student_id").not_null())
            .column(varchar("relationship", 20).not_null())
            .column(boolean("is_primary", false))
            .timestamps()
            .index(IndexDef::unique(
                "uk_parent_student",
                &["parent_id", "student_id"],
            ))
            .foreign_key(ForeignKey::new("parent_id", "parents").cascade())
            .foreign_key(ForeignKey::new("student_id", "students").cascade()),
        TableDef::new("activities")
            .column(bigint("kindergarten_id").not_null())
            .column(varchar("title", 100).not_null())
            .column(varchar("activity_type", 30).not_null())
            .column(text("description"))
            .column(datetime("start_time").not_null())
            .column(datetime("end_time"))
            .column(varchar("location", 100))
            .column(int("capacity").not_null().default("50"))
            .column(status("planned"))
            .timestamps()
            .soft_delete()
            .foreign_key(ForeignKey::new("kindergarten_id", "kindergartens")),
        TableDef::new("activity_registrations")
            .column(bigint("activity_id").not_null())
            .column(bigint("student_id"))
            .column(varchar("contact_name", 50).not_null())
            .column(varchar("contact_phone", 20).not_null())
            .column(status("registered"))
            .column(boolean("checked_in", false))
            .timestamps()
            .foreign_key(ForeignKey::new("activity_id", "activities").cascade())
            .foreign_key(ForeignKey::new("student_id", "students")),
        TableDef::new("enrollment_applications")
            .column(bigint("kindergarten_id").not_null())
            .column(varchar("child_name", 50).not_null())
            .column(varchar("gender", 10).not_null())
            .column(date("birth_date"))
            .column(varchar("parent_name", 50).not_null())
            .column(varchar("parent_phone", 20).not_null())
            .column(varchar("source", 30))
            .column(status("pending"))
            .column(datetime("applied_at").not_null().default("CURRENT_TIMESTAMP"))
            .timestamps()
            .soft_delete()
            .foreign_key(ForeignKey::new("kindergarten_id", "kindergartens")),
        TableDef::new("attendances")
            .column(bigint("student_id").not_null())
            .column(bigint("class_id"))
            .column(date("attendance_date").not_null())
            .column(status("present"))
            .column(datetime("check_in_time"))
            .column(datetime("check_out_time"))
            .timestamps()
            .foreign_key(ForeignKey::new("student_id", "students").cascade()),
        TableDef::new("task_templates")
            .column(varchar("name", 100).not_null())
            .column(varchar("category", 30).not_null())
            .column(text("description"))
            .column(varchar("priority", 10).not_null().default("'medium'"))
            .timestamps()
            .soft_delete(),
        TableDef::new("tasks")
            .column(bigint("template_id"))
            .column(varchar("title", 100).not_null())
            .column(text("description"))
            .column(bigint("assignee_id"))
            .column(bigint("creator_id"))
            .column(varchar("priority", 10).not_null().default("'medium'"))
            .column(status("pending"))
            .column(date("due_date"))
            .timestamps()
            .soft_delete()
            .foreign_key(ForeignKey::new("template_id", "task_templates"))
            .foreign_key(ForeignKey::new("assignee_id", "users"))
            .foreign_key(ForeignKey::new("creator_id", "users")),
        TableDef::new("poster_categories")
            .column(varchar("name", 50).not_null().unique())
            .column(int("sort_order").not_null().default("0"))
            .timestamps(),
        TableDef::new("poster_templates")
            .column(bigint("category_id").not_null())
            .column(varchar("name", 100).not_null())
            .column(varchar("preview_url", 255))
            .column(ColumnDef::new("config", ColumnType::Json))
            .column(status("active"))
            .timestamps()
            .soft_delete()
            .foreign_key(ForeignKey::new("category_id", "poster_categories")),
        TableDef::new("referral_relationships")
            .column(varchar("referrer_type", 20).not_null())
            .column(bigint("referrer_id").not_null())
            .column(varchar("referrer_name", 50).not_null())
            .column(varchar("referral_code", 64).not_null())
            .column(varchar("referee_name", 50).not_null())
            .column(varchar("referee_phone", 20).not_null())
            .column(bigint("student_id"))
            .column(status("pending"))
            .column(datetime("converted_at"))
            .timestamps()
            .soft_delete()
            .index(IndexDef::new(
                "idx_referral_code",
                &["referral_code"],
            ))
            .foreign_key(ForeignKey::new("student_id", "students")),
        TableDef::new("referral_rewards")
            .column(bigint("relationship_id").not_null())
            .column(varchar("reward_type", 20).not_null())
            .column(ColumnDef::new("amount", ColumnType::Decimal(10, 2)).not_null().default("0"))
            .column(status("pending"))
            .column(datetime("issued_at"))
            .timestamps()
            .foreign_key(ForeignKey::new("relationship_id", "referral_relationships").cascade()),
        TableDef::new("page_guides")
            .column(varchar("page_path", 200).not_null().unique())
            .column(varchar("page_name", 100).not_null())
            .column(text("page_description").not_null())
            .column(varchar("category", 50).not_null())
            .column(int("importance").not_null().default("5"))
            .column(ColumnDef::new("related_tables", ColumnType::Json))
            .column(text("context_prompt"))
            .column(boolean("is_active", true))
            .timestamps(),
        TableDef::new("page_guide_sections")
            .column(bigint("page_guide_id").not_null())
            .column(varchar("section_name", 100).not_null())
            .column(text("section_description"))
            .column(varchar("section_path", 200))
            .column(ColumnDef::new("features", ColumnType::Json))
            .column(int("sort_order").not_null().default("0"))
            .column(boolean("is_active", true))
            .timestamps()
            .foreign_key(ForeignKey::new("page_guide_id", "page_guides").cascade()),
        TableDef::new("ai_usage_records")
            .column(bigint("user_id"))
            .column(varchar("model_name", 100).not_null())
            .column(varchar("usage_type", 30).not_null())
            .column(varchar("tier", 20))
            .column(int("input_tokens").not_null().default("0"))
            .column(int("output_tokens").not_null().default("0"))
            .column(text("request_summary"))
            .timestamps()
            .foreign_key(ForeignKey::new("user_id", "users")),
        TableDef::new("courses")
            .column(varchar("name", 100).not_null().unique())
            .column(varchar("category", 30).not_null())
            .column(varchar("age_group", 20).not_null())
            .column(int("total_sessions").not_null())
            .column(status("active"))
            .timestamps()
            .soft_delete(),
        TableDef::new("course_plans")
            .column(bigint("course_id").not_null())
            .column(bigint("class_id").not_null())
            .column(varchar("semester", 20).not_null())
            .column(date("start_date").not_null())
            .column(date("end_date"))
            .column(status("in_progress"))
            .timestamps()
            .index(IndexDef::unique(
                "uk_course_plan",
                &["course_id", "class_id", "semester"],
            ))
            .foreign_key(ForeignKey::new("course_id", "courses").cascade())
            .foreign_key(ForeignKey::new("class_id", "classes").cascade()),
        TableDef::new("course_progress")
            .column(bigint("plan_id").not_null())
            .column(int("session_no").not_null())
            .column(boolean("completed", false))
            .column(datetime("completed_at"))
            .timestamps()
            .foreign_key(ForeignKey::new("plan_id", "course_plans").cascade()),
    ]
}

/// Document center templates. Created by a later migration, not the baseline.
pub fn document_templates_table() -> TableDef {
    TableDef::new("document_templates")
        .column(varchar("code", 20).not_null().unique())
        .column(varchar("name", 200).not_null())
        .column(varchar("category", 30).not_null())
        .column(varchar("sub_category", 50))
        .column(varchar("priority", 20).not_null().default("'required'"))
        .column(varchar("frequency", 20))
        .column(varchar("content_type", 20).not_null().default("'markdown'"))
        .column(text("template_content").not_null())
        .column(ColumnDef::new("variables", ColumnType::Json))
        .column(int("line_count").not_null().default("0"))
        .column(int("estimated_fill_time"))
        .column(boolean("is_detailed", false))
        .column(boolean("is_system", true))
        .column(boolean("is_active", true))
        .column(varchar("version", 20).not_null().default("'1.0'"))
        .column(int("sort_order").not_null().default("0"))
        .column(bigint("created_by"))
        .timestamps()
        .index(IndexDef::new(
            "idx_document_templates_category",
            &["category", "sort_order"],
        ))
        .foreign_key(ForeignKey::new("created_by", "users"))
}

pub fn baseline_table(name: &str) -> Option<TableDef> {
    baseline_tables().into_iter().find(|t| t.name == name)
}
