use chrono::{Datelike, NaiveDate, Utc};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{info, instrument};

use crate::db::Database;
use crate::error::AppError;
use crate::models::ClassLevel;
use crate::seed::{date_str, insert_row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TeachingVariant {
    Minimal,
    Standard,
    Full,
}

struct CourseSpec {
    name: &'static str,
    category: &'static str,
    age_group: &'static str,
}

const COURSES: [CourseSpec; 6] = [
    CourseSpec {
        name: "Early Reading",
        category: "language",
        age_group: "3-6",
    },
    CourseSpec {
        name: "Number Sense",
        category: "math",
        age_group: "4-6",
    },
    CourseSpec {
        name: "Music and Movement",
        category: "art",
        age_group: "2-6",
    },
    CourseSpec {
        name: "Science Discovery",
        category: "science",
        age_group: "4-6",
    },
    CourseSpec {
        name: "Social Skills",
        category: "social",
        age_group: "2-5",
    },
    CourseSpec {
        name: "Outdoor Play",
        category: "sports",
        age_group: "2-6",
    },
];

impl TeachingVariant {
    pub fn course_count(&self) -> usize {
        match self {
            TeachingVariant::Minimal => 2,
            TeachingVariant::Standard => 4,
            TeachingVariant::Full => COURSES.len(),
        }
    }

    pub fn sessions_per_course(&self) -> i64 {
        match self {
            TeachingVariant::Minimal => 8,
            TeachingVariant::Standard => 12,
            TeachingVariant::Full => 16,
        }
    }

    /// Share of sessions already marked complete.
    pub fn completion_ratio(&self) -> f64 {
        match self {
            TeachingVariant::Minimal => 0.25,
            TeachingVariant::Standard => 0.5,
            TeachingVariant::Full => 0.75,
        }
    }

    pub fn completed_sessions(&self) -> i64 {
        (self.sessions_per_course() as f64 * self.completion_ratio()).round() as i64
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TeachingSeedSummary {
    pub courses_created: usize,
    pub classes_created: usize,
    pub plans_created: usize,
    pub plans_skipped: usize,
    pub progress_rows: usize,
    pub completed_sessions: usize,
}

pub fn current_semester(today: NaiveDate) -> String {
    let term = if today.month() < 8 { "spring" } else { "autumn" };
    format!("{}-{}", today.year(), term)
}

#[instrument(skip(db))]
pub async fn seed_teaching_center(
    db: &Database,
    variant: TeachingVariant,
) -> Result<TeachingSeedSummary, AppError> {
    let mut summary = TeachingSeedSummary::default();
    let today = Utc::now().date_naive();
    let semester = current_semester(today);

    let mut course_ids = Vec::new();
    for course in COURSES.iter().take(variant.course_count()) {
        course_ids.push(ensure_course(db, course, variant, &mut summary).await?);
    }

    let mut class_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM classes WHERE deleted_at IS NULL ORDER BY id")
            .fetch_all(db.pool())
            .await?;
    if class_ids.is_empty() {
        class_ids = create_default_classes(db).await?;
        summary.classes_created = class_ids.len();
    }

    let completed = variant.completed_sessions();
    for &class_id in &class_ids {
        for &course_id in &course_ids {
            let existing: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM course_plans \
                 WHERE course_id = ? AND class_id = ? AND semester = ?",
            )
            .bind(course_id)
            .bind(class_id)
            .bind(&semester)
            .fetch_one(db.pool())
            .await?;
            if existing > 0 {
                summary.plans_skipped += 1;
                continue;
            }

            let sql = db.dialect().returning_id(
                "INSERT INTO course_plans (course_id, class_id, semester, start_date, status) \
                 VALUES (?, ?, ?, ?, 'in_progress')",
            );
            let query = sqlx::query(&sql)
                .bind(course_id)
                .bind(class_id)
                .bind(&semester)
                .bind(date_str(today));
            let plan_id = insert_row(db.pool(), db.dialect(), query, "course plan").await?;
            summary.plans_created += 1;

            for session_no in 1..=variant.sessions_per_course() {
                let done = session_no <= completed;
                sqlx::query(
                    "INSERT INTO course_progress (plan_id, session_no, completed, completed_at) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(plan_id)
                .bind(session_no)
                .bind(done)
                .bind(done.then(crate::db::now_timestamp))
                .execute(db.pool())
                .await?;

                summary.progress_rows += 1;
                if done {
                    summary.completed_sessions += 1;
                }
            }
        }
    }

    info!(
        variant = ?variant,
        plans = summary.plans_created,
        progress = summary.progress_rows,
        "Teaching center data seeded"
    );
    Ok(summary)
}

async fn ensure_course(
    db: &Database,
    course: &CourseSpec,
    variant: TeachingVariant,
    summary: &mut TeachingSeedSummary,
) -> Result<i64, AppError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM courses WHERE name = ?")
        .bind(course.name)
        .fetch_optional(db.pool())
        .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let sql = db.dialect().returning_id(
        "INSERT INTO courses (name, category, age_group, total_sessions) VALUES (?, ?, ?, ?)",
    );
    let query = sqlx::query(&sql)
        .bind(course.name)
        .bind(course.category)
        .bind(course.age_group)
        .bind(variant.sessions_per_course());
    let id = insert_row(db.pool(), db.dialect(), query, "course").await?;
    summary.courses_created += 1;
    Ok(id)
}

/// One class per grade under the first kindergarten, creating that too if needed.
pub(crate) async fn create_default_classes(db: &Database) -> Result<Vec<i64>, AppError> {
    let kindergarten_id = ensure_kindergarten(db, "KG-DEFAULT", "Sunshine Kindergarten").await?;

    let sql = db.dialect().returning_id(
        "INSERT INTO classes (kindergarten_id, name, grade, capacity) VALUES (?, ?, ?, 30)",
    );
    let mut ids = Vec::new();
    for level in ClassLevel::ALL {
        let query = sqlx::query(&sql)
            .bind(kindergarten_id)
            .bind(format!("{} Class 1", level.display_name()))
            .bind(level.as_str());
        ids.push(insert_row(db.pool(), db.dialect(), query, "class").await?);
    }

    info!("Created {} default classes", ids.len());
    Ok(ids)
}

pub(crate) async fn ensure_kindergarten(
    db: &Database,
    code: &str,
    name: &str,
) -> Result<i64, AppError> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM kindergartens WHERE code = ?")
        .bind(code)
        .fetch_optional(db.pool())
        .await?;
    if let Some(id) = existing {
        return Ok(id);
    }

    let sql = db.dialect().returning_id("INSERT INTO kindergartens (name, code) VALUES (?, ?)");
    let query = sqlx::query(&sql).bind(name).bind(code);
    insert_row(db.pool(), db.dialect(), query, "kindergarten").await
}
