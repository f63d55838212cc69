use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::db::Database;
use crate::error::AppError;

/// Templates above this many lines are flagged as detailed.
pub const DETAILED_LINE_COUNT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Annual,
    Special,
    Routine,
    Staff,
    Student,
    Finance,
    Education,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 7] = [
        TemplateCategory::Annual,
        TemplateCategory::Special,
        TemplateCategory::Routine,
        TemplateCategory::Staff,
        TemplateCategory::Student,
        TemplateCategory::Finance,
        TemplateCategory::Education,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::Annual => "annual",
            TemplateCategory::Special => "special",
            TemplateCategory::Routine => "routine",
            TemplateCategory::Staff => "staff",
            TemplateCategory::Student => "student",
            TemplateCategory::Finance => "finance",
            TemplateCategory::Education => "education",
        }
    }

    /// Leading part of every template code in the category.
    pub fn code_prefix(&self) -> &'static str {
        match self {
            TemplateCategory::Annual => "01",
            TemplateCategory::Special => "02",
            TemplateCategory::Routine => "03",
            TemplateCategory::Staff => "04",
            TemplateCategory::Student => "05",
            TemplateCategory::Finance => "06",
            TemplateCategory::Education => "07",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TemplateCategory::Annual => "Annual inspection",
            TemplateCategory::Special => "Special inspection",
            TemplateCategory::Routine => "Routine supervision",
            TemplateCategory::Staff => "Staff management",
            TemplateCategory::Student => "Student management",
            TemplateCategory::Finance => "Financial management",
            TemplateCategory::Education => "Education and teaching",
        }
    }

    /// (name, label, type) of the variables every template in the category adds.
    fn extra_variables(&self) -> &'static [(&'static str, &'static str, &'static str)] {
        match self {
            TemplateCategory::Annual => &[
                ("year", "Inspection year", "number"),
                ("self_check_date", "Self-check date", "date"),
                ("principal_name", "Principal", "text"),
            ],
            TemplateCategory::Special => &[
                ("check_date", "Check date", "date"),
                ("inspector", "Inspector", "text"),
            ],
            TemplateCategory::Routine => &[
                ("check_time", "Check time", "datetime"),
                ("supervisor", "Supervisor", "text"),
            ],
            TemplateCategory::Staff => &[
                ("stat_date", "Statistics date", "date"),
                ("prepared_by", "Prepared by", "text"),
            ],
            TemplateCategory::Student => &[
                ("stat_date", "Statistics date", "date"),
                ("class_name", "Class", "text"),
            ],
            TemplateCategory::Finance => &[
                ("period", "Accounting period", "text"),
                ("owner", "Responsible person", "text"),
            ],
            TemplateCategory::Education => &[
                ("semester", "Semester", "text"),
                ("class_name", "Class", "text"),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Required,
    Optional,
    /// Only applies to kindergartens with the matching facility, such as a school bus.
    Conditional,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Required => "required",
            Priority::Optional => "optional",
            Priority::Conditional => "conditional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Semester,
    Yearly,
    AsNeeded,
    Continuous,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Semester => "semester",
            Frequency::Yearly => "yearly",
            Frequency::AsNeeded => "as_needed",
            Frequency::Continuous => "continuous",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Frequency::Daily => "Every day",
            Frequency::Weekly => "Every week",
            Frequency::Monthly => "Every month",
            Frequency::Semester => "Every semester",
            Frequency::Yearly => "Every year",
            Frequency::AsNeeded => "When needed",
            Frequency::Continuous => "Kept up to date",
        }
    }
}

pub struct TemplateSeed {
    pub code: &'static str,
    pub name: &'static str,
    pub category: TemplateCategory,
    pub sub_category: &'static str,
    pub priority: Priority,
    pub frequency: Frequency,
    pub line_count: i64,
    /// Minutes.
    pub estimated_fill_time: i64,
}

impl TemplateSeed {
    const fn new(
        code: &'static str,
        name: &'static str,
        category: TemplateCategory,
        sub_category: &'static str,
    ) -> Self {
        Self {
            code,
            name,
            category,
            sub_category,
            priority: Priority::Required,
            frequency: Frequency::Yearly,
            line_count: 0,
            estimated_fill_time: 0,
        }
    }

    const fn schedule(self, priority: Priority, frequency: Frequency) -> Self {
        Self {
            priority,
            frequency,
            ..self
        }
    }

    const fn size(self, line_count: i64, estimated_fill_time: i64) -> Self {
        Self {
            line_count,
            estimated_fill_time,
            ..self
        }
    }

    pub fn is_detailed(&self) -> bool {
        self.line_count > DETAILED_LINE_COUNT
    }

    /// Fillable fields as stored in the `variables` column.
    pub fn variables(&self) -> Value {
        let mut variables = vec![
            json!({"name": "kindergarten_name", "label": "Kindergarten", "type": "text", "required": true}),
            json!({"name": "fill_date", "label": "Fill date", "type": "date", "required": true, "default": "{{today}}"}),
            json!({"name": "filled_by", "label": "Filled by", "type": "text", "required": true}),
        ];
        variables.extend(
            self.category
                .extra_variables()
                .iter()
                .map(|(name, label, kind)| {
                    json!({"name": name, "label": label, "type": kind, "required": false})
                }),
        );
        Value::Array(variables)
    }

    /// Markdown body with `{{variable}}` placeholders for every field in [`Self::variables`].
    pub fn render_content(&self) -> String {
        let mut md = format!("# {}\n\n", self.name);
        md.push_str(&format!(
            "> {} template {}, filled {}.\n\n",
            self.category.label(),
            self.code,
            self.frequency.label().to_lowercase()
        ));

        md.push_str("## Basic information\n\n| Item | Content |\n|------|---------|\n");
        md.push_str(&format!("| Template code | {} |\n", self.code));
        md.push_str(&format!("| Frequency | {} |\n", self.frequency.label()));
        md.push_str(&format!(
            "| Estimated fill time | {} minutes |\n",
            self.estimated_fill_time
        ));
        md.push_str(&format!("| Priority | {} |\n\n", self.priority.as_str()));

        md.push_str("## Details\n\n| Field | Value |\n|-------|-------|\n");
        md.push_str("| Kindergarten | {{kindergarten_name}} |\n");
        for (name, label, _) in self.category.extra_variables() {
            md.push_str(&format!("| {} | {{{{{}}}}} |\n", label, name));
        }
        md.push('\n');

        md.push_str("## Fill instructions\n\n");
        md.push_str("1. Complete every field in the details table.\n");
        md.push_str("2. Attach supporting records where the item asks for evidence.\n");
        if self.priority == Priority::Conditional {
            md.push_str("3. Skip this template when the facility it covers does not exist.\n");
        }
        md.push_str("\n## Notes\n\n- Keep the signed copy with the inspection archive.\n\n");

        md.push_str("## Signatures\n\n");
        md.push_str("Filled by: {{filled_by}}    Date: {{fill_date}}\n\n");
        md.push_str("Reviewed by: ____________    Date: ____________\n");
        md
    }
}

pub const DOCUMENT_TEMPLATES: &[TemplateSeed] = &[
    TemplateSeed::new("01-01", "Annual inspection self-assessment report", TemplateCategory::Annual, "inspection")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(300, 120),
    TemplateSeed::new("01-02", "Annual inspection score sheet", TemplateCategory::Annual, "evaluation")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(100, 60),
    TemplateSeed::new("01-03", "Kindergarten basic statistics", TemplateCategory::Annual, "statistics")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(80, 45),
    TemplateSeed::new("01-04", "Operating conduct supervision self-evaluation", TemplateCategory::Annual, "supervision")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(150, 90),
    TemplateSeed::new("01-05", "Operating conditions self-check report", TemplateCategory::Annual, "conditions")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(120, 75),
    TemplateSeed::new("01-06", "Care and education annual summary", TemplateCategory::Annual, "education")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(100, 60),
    TemplateSeed::new("01-07", "Teaching staff development report", TemplateCategory::Annual, "teachers")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(80, 50),
    TemplateSeed::new("01-08", "Grade assessment application", TemplateCategory::Annual, "grade_assessment")
        .schedule(Priority::Optional, Frequency::AsNeeded)
        .size(200, 120),
    TemplateSeed::new("01-09", "Grade assessment self-evaluation report", TemplateCategory::Annual, "grade_assessment")
        .schedule(Priority::Optional, Frequency::AsNeeded)
        .size(250, 150),
    TemplateSeed::new("01-10", "Public-benefit kindergarten application", TemplateCategory::Annual, "public_welfare")
        .schedule(Priority::Optional, Frequency::AsNeeded)
        .size(180, 100),
    TemplateSeed::new("01-11", "Public-benefit fee commitment letter", TemplateCategory::Annual, "public_welfare")
        .schedule(Priority::Optional, Frequency::AsNeeded)
        .size(50, 30),
    TemplateSeed::new("01-12", "Operating license and certificates", TemplateCategory::Annual, "licenses")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(60, 30),
    TemplateSeed::new("02-13", "Morning health check log", TemplateCategory::Special, "health")
        .schedule(Priority::Required, Frequency::Daily)
        .size(50, 30),
    TemplateSeed::new("02-14", "Midday health check log", TemplateCategory::Special, "health")
        .schedule(Priority::Required, Frequency::Daily)
        .size(40, 25),
    TemplateSeed::new("02-15", "Sick absence follow-up register", TemplateCategory::Special, "health")
        .schedule(Priority::Required, Frequency::Daily)
        .size(60, 30),
    TemplateSeed::new("02-16", "Infectious disease report log", TemplateCategory::Special, "health")
        .schedule(Priority::Required, Frequency::AsNeeded)
        .size(80, 40),
    TemplateSeed::new("02-17", "Vaccination certificate check register", TemplateCategory::Special, "health")
        .schedule(Priority::Required, Frequency::Semester)
        .size(100, 60),
    TemplateSeed::new("02-18", "Child health examination record", TemplateCategory::Special, "health")
        .schedule(Priority::Required, Frequency::Semester)
        .size(80, 50),
    TemplateSeed::new("02-19", "Cleaning and disinfection log", TemplateCategory::Special, "health")
        .schedule(Priority::Required, Frequency::Daily)
        .size(70, 35),
    TemplateSeed::new("02-20", "UV disinfection log", TemplateCategory::Special, "health")
        .schedule(Priority::Required, Frequency::Daily)
        .size(40, 20),
    TemplateSeed::new("02-21", "Food purchase ledger", TemplateCategory::Special, "food_safety")
        .schedule(Priority::Required, Frequency::Daily)
        .size(80, 40),
    TemplateSeed::new("02-22", "Food sample retention log", TemplateCategory::Special, "food_safety")
        .schedule(Priority::Required, Frequency::Daily)
        .size(50, 25),
    TemplateSeed::new("02-23", "Food safety self-check log", TemplateCategory::Special, "food_safety")
        .schedule(Priority::Required, Frequency::Weekly)
        .size(100, 60),
    TemplateSeed::new("02-24", "Kitchen staff health certificate register", TemplateCategory::Special, "food_safety")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(60, 30),
    TemplateSeed::new("02-25", "Kitchen equipment cleaning log", TemplateCategory::Special, "food_safety")
        .schedule(Priority::Required, Frequency::Daily)
        .size(70, 35),
    TemplateSeed::new("02-26", "Food safety incident response plan", TemplateCategory::Special, "food_safety")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(120, 80),
    TemplateSeed::new("02-27", "Weekly menu notice", TemplateCategory::Special, "food_safety")
        .schedule(Priority::Required, Frequency::Weekly)
        .size(60, 30),
    TemplateSeed::new("02-28", "Fire equipment inspection log", TemplateCategory::Special, "safety")
        .schedule(Priority::Required, Frequency::Monthly)
        .size(80, 40),
    TemplateSeed::new("02-29", "Fire safety self-check log", TemplateCategory::Special, "safety")
        .schedule(Priority::Required, Frequency::Monthly)
        .size(100, 50),
    TemplateSeed::new("02-30", "Fire extinguisher inspection log", TemplateCategory::Special, "safety")
        .schedule(Priority::Required, Frequency::Monthly)
        .size(50, 25),
    TemplateSeed::new("02-31", "Evacuation drill record", TemplateCategory::Special, "safety")
        .schedule(Priority::Required, Frequency::Semester)
        .size(70, 40),
    TemplateSeed::new("02-32", "Fire safety training record", TemplateCategory::Special, "safety")
        .schedule(Priority::Required, Frequency::Semester)
        .size(60, 30),
    TemplateSeed::new("02-33", "Fire emergency plan", TemplateCategory::Special, "safety")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(100, 60),
    TemplateSeed::new("02-34", "Fire safety responsibility agreement", TemplateCategory::Special, "safety")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(50, 25),
    TemplateSeed::new("02-35", "School bus safety inspection log", TemplateCategory::Special, "school_bus")
        .schedule(Priority::Conditional, Frequency::Daily)
        .size(80, 40),
    TemplateSeed::new("02-36", "School bus driver qualification register", TemplateCategory::Special, "school_bus")
        .schedule(Priority::Conditional, Frequency::Yearly)
        .size(60, 30),
    TemplateSeed::new("02-37", "School bus escort register", TemplateCategory::Special, "school_bus")
        .schedule(Priority::Conditional, Frequency::Yearly)
        .size(50, 25),
    TemplateSeed::new("02-38", "School bus trip log", TemplateCategory::Special, "school_bus")
        .schedule(Priority::Conditional, Frequency::Daily)
        .size(70, 35),
    TemplateSeed::new("02-39", "School bus emergency plan", TemplateCategory::Special, "school_bus")
        .schedule(Priority::Conditional, Frequency::Yearly)
        .size(90, 50),
    TemplateSeed::new("02-40", "Safety hazard inspection log", TemplateCategory::Special, "safety_production")
        .schedule(Priority::Required, Frequency::Monthly)
        .size(100, 50),
    TemplateSeed::new("02-41", "Safety hazard rectification ledger", TemplateCategory::Special, "safety_production")
        .schedule(Priority::Required, Frequency::Monthly)
        .size(80, 40),
    TemplateSeed::new("02-42", "Workplace safety responsibility agreement", TemplateCategory::Special, "safety_production")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(60, 30),
    TemplateSeed::new("02-43", "Safety education training record", TemplateCategory::Special, "safety_production")
        .schedule(Priority::Required, Frequency::Semester)
        .size(70, 35),
    TemplateSeed::new("02-44", "Emergency response plan", TemplateCategory::Special, "emergency")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(120, 80),
    TemplateSeed::new("03-45", "Supervisor monthly inspection record", TemplateCategory::Routine, "supervision")
        .schedule(Priority::Required, Frequency::Monthly)
        .size(90, 45),
    TemplateSeed::new("03-46", "Supervision issue rectification report", TemplateCategory::Routine, "supervision")
        .schedule(Priority::Required, Frequency::AsNeeded)
        .size(80, 40),
    TemplateSeed::new("03-47", "Care and education quality self-check", TemplateCategory::Routine, "quality")
        .schedule(Priority::Required, Frequency::Semester)
        .size(100, 60),
    TemplateSeed::new("03-48", "Daily patrol log", TemplateCategory::Routine, "inspection")
        .schedule(Priority::Required, Frequency::Weekly)
        .size(70, 35),
    TemplateSeed::new("03-49", "Compliant operation self-check", TemplateCategory::Routine, "compliance")
        .schedule(Priority::Required, Frequency::Semester)
        .size(120, 70),
    TemplateSeed::new("04-50", "Staff roster", TemplateCategory::Staff, "management")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(200, 120),
    TemplateSeed::new("04-51", "Teacher certificate register", TemplateCategory::Staff, "qualifications")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(80, 45),
    TemplateSeed::new("04-52", "Staff health certificate register", TemplateCategory::Staff, "health")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(70, 35),
    TemplateSeed::new("04-53", "Teacher training record", TemplateCategory::Staff, "training")
        .schedule(Priority::Required, Frequency::Continuous)
        .size(100, 50),
    TemplateSeed::new("04-54", "Teacher attendance record", TemplateCategory::Staff, "attendance")
        .schedule(Priority::Required, Frequency::Monthly)
        .size(60, 30),
    TemplateSeed::new("04-55", "Teacher performance review", TemplateCategory::Staff, "evaluation")
        .schedule(Priority::Required, Frequency::Semester)
        .size(120, 80),
    TemplateSeed::new("05-56", "Child roster", TemplateCategory::Student, "management")
        .schedule(Priority::Required, Frequency::Semester)
        .size(150, 180),
    TemplateSeed::new("05-57", "Admission health examination form", TemplateCategory::Student, "health")
        .schedule(Priority::Required, Frequency::AsNeeded)
        .size(80, 40),
    TemplateSeed::new("05-58", "Child growth portfolio", TemplateCategory::Student, "development")
        .schedule(Priority::Required, Frequency::Continuous)
        .size(100, 60),
    TemplateSeed::new("05-59", "Drop-off and pick-up register", TemplateCategory::Student, "safety")
        .schedule(Priority::Required, Frequency::Daily)
        .size(80, 40),
    TemplateSeed::new("05-60", "Accidental injury record", TemplateCategory::Student, "safety")
        .schedule(Priority::Required, Frequency::AsNeeded)
        .size(90, 45),
    TemplateSeed::new("06-61", "Fee disclosure notice", TemplateCategory::Finance, "fees")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(60, 30),
    TemplateSeed::new("06-62", "Income and expense ledger", TemplateCategory::Finance, "accounting")
        .schedule(Priority::Required, Frequency::Monthly)
        .size(100, 60),
    TemplateSeed::new("06-63", "Fixed asset register", TemplateCategory::Finance, "assets")
        .schedule(Priority::Required, Frequency::Yearly)
        .size(120, 80),
    TemplateSeed::new("06-64", "Procurement contract register", TemplateCategory::Finance, "procurement")
        .schedule(Priority::Required, Frequency::Continuous)
        .size(80, 40),
    TemplateSeed::new("06-65", "Funding usage report", TemplateCategory::Finance, "budget")
        .schedule(Priority::Required, Frequency::Semester)
        .size(90, 50),
    TemplateSeed::new("07-66", "Teaching plan", TemplateCategory::Education, "planning")
        .schedule(Priority::Required, Frequency::Semester)
        .size(100, 70),
    TemplateSeed::new("07-67", "Weekly activity plan", TemplateCategory::Education, "planning")
        .schedule(Priority::Required, Frequency::Weekly)
        .size(80, 50),
    TemplateSeed::new("07-68", "Teaching research record", TemplateCategory::Education, "research")
        .schedule(Priority::Required, Frequency::Weekly)
        .size(70, 40),
    TemplateSeed::new("07-69", "Parent meeting record", TemplateCategory::Education, "parent_communication")
        .schedule(Priority::Required, Frequency::Semester)
        .size(60, 30),
    TemplateSeed::new("07-70", "Home visit record", TemplateCategory::Education, "parent_communication")
        .schedule(Priority::Required, Frequency::Continuous)
        .size(70, 35),
    TemplateSeed::new("07-71", "Child observation record", TemplateCategory::Education, "observation")
        .schedule(Priority::Required, Frequency::Daily)
        .size(80, 40),
    TemplateSeed::new("07-72", "Learning corner activity record", TemplateCategory::Education, "activities")
        .schedule(Priority::Required, Frequency::Daily)
        .size(70, 35),
    TemplateSeed::new("07-73", "Outdoor activity record", TemplateCategory::Education, "activities")
        .schedule(Priority::Required, Frequency::Daily)
        .size(60, 30),
];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSeedSummary {
    pub created: usize,
    pub skipped: usize,
}

/// Inserts every template whose code is not present yet. The table comes
/// from the `document_templates` migration.
#[instrument(skip(db, templates))]
pub async fn seed_document_templates(
    db: &Database,
    templates: &[TemplateSeed],
) -> Result<DocumentSeedSummary, AppError> {
    if !db.table_exists("document_templates").await? {
        return Err(AppError::NotFound(
            "Table document_templates is missing, run migrate first".to_string(),
        ));
    }

    let admin_id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM users WHERE role = 'admin' AND deleted_at IS NULL ORDER BY id LIMIT 1",
    )
    .fetch_optional(db.pool())
    .await?;
    if admin_id.is_none() {
        debug!("No admin user, templates get no creator");
    }

    let mut summary = DocumentSeedSummary::default();
    for (order, template) in templates.iter().enumerate() {
        let present: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM document_templates WHERE code = ?")
                .bind(template.code)
                .fetch_one(db.pool())
                .await?;
        if present > 0 {
            debug!("Document template {} already present", template.code);
            summary.skipped += 1;
            continue;
        }

        sqlx::query(
            "INSERT INTO document_templates \
             (code, name, category, sub_category, priority, frequency, content_type, \
              template_content, variables, line_count, estimated_fill_time, is_detailed, \
              is_system, is_active, version, sort_order, created_by) \
             VALUES (?, ?, ?, ?, ?, ?, 'markdown', ?, ?, ?, ?, ?, ?, ?, '1.0', ?, ?)",
        )
        .bind(template.code)
        .bind(template.name)
        .bind(template.category.as_str())
        .bind(template.sub_category)
        .bind(template.priority.as_str())
        .bind(template.frequency.as_str())
        .bind(template.render_content())
        .bind(template.variables().to_string())
        .bind(template.line_count)
        .bind(template.estimated_fill_time)
        .bind(template.is_detailed())
        .bind(true)
        .bind(true)
        .bind(order as i64 + 1)
        .bind(admin_id)
        .execute(db.pool())
        .await?;
        summary.created += 1;
    }

    info!(
        created = summary.created,
        skipped = summary.skipped,
        "Document templates seeded"
    );
    Ok(summary)
}

/// Deletes the catalog's templates by code prefix. Returns the rows removed.
#[instrument(skip(db))]
pub async fn remove_document_templates(db: &Database) -> Result<u64, AppError> {
    let mut removed = 0;
    for category in TemplateCategory::ALL {
        removed += sqlx::query("DELETE FROM document_templates WHERE code LIKE ?")
            .bind(format!("{}-%", category.code_prefix()))
            .execute(db.pool())
            .await?
            .rows_affected();
    }
    info!(removed, "Document templates removed");
    Ok(removed)
}
