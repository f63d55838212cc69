use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::SeedConfig;
use crate::db::Database;
use crate::error::AppError;
use crate::models::{
    ActivityType, AttendanceStatus, ClassLevel, EnrollmentStatus, Gender, TaskPriority, TaskStatus,
};
use crate::seed::{date_str, datetime_str, insert_row};

const FAMILY_NAMES: [&str; 12] = [
    "Wang", "Li", "Zhang", "Liu", "Chen", "Yang", "Zhao", "Huang", "Zhou", "Wu", "Xu", "Sun",
];
const BOY_NAMES: [&str; 8] = [
    "Haoran", "Yuxuan", "Zimo", "Yichen", "Junjie", "Mingze", "Tianyou", "Ruize",
];
const GIRL_NAMES: [&str; 8] = [
    "Xinyi", "Yutong", "Zixuan", "Ruoxi", "Shiyu", "Keke", "Yinuo", "Mengqi",
];
const ADULT_NAMES: [&str; 8] = [
    "Jing", "Wei", "Fang", "Lei", "Min", "Qiang", "Yan", "Jun",
];
const ENROLLMENT_SOURCES: [&str; 4] = ["referral", "walk_in", "online", "open_day"];
const TASK_TITLES: [&str; 6] = [
    "Prepare weekly lesson plan",
    "Update student health records",
    "Follow up enrollment leads",
    "Organize parent meeting",
    "Check classroom safety",
    "Submit activity summary",
];

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub seed: u64,
    pub classes_per_grade: usize,
    pub students_per_class: usize,
    pub activities: usize,
    pub enrollment_applications: usize,
    pub attendance_days: usize,
    pub tasks: usize,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            classes_per_grade: 2,
            students_per_class: 20,
            activities: 8,
            enrollment_applications: 30,
            attendance_days: 10,
            tasks: 15,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DemoSeedSummary {
    pub kindergartens: usize,
    pub classes: usize,
    pub users: usize,
    pub teachers: usize,
    pub students: usize,
    pub parents: usize,
    pub relations: usize,
    pub activities: usize,
    pub registrations: usize,
    pub enrollment_applications: usize,
    pub attendances: usize,
    pub tasks: usize,
}

struct Family {
    student_id: i64,
    class_id: i64,
    parent_name: String,
    parent_phone: String,
}

struct DemoSeeder<'a> {
    db: &'a Database,
    rng: StdRng,
    options: &'a DemoOptions,
    password_hash: String,
    code: String,
    today: NaiveDate,
    summary: DemoSeedSummary,
}

/// Generates a complete demo kindergarten. The same `seed` gives the same data.
#[instrument(skip(db, seed_config))]
pub async fn seed_demo(
    db: &Database,
    options: &DemoOptions,
    seed_config: &SeedConfig,
) -> Result<DemoSeedSummary, AppError> {
    let code = format!("KG-DEMO-{}", options.seed);
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kindergartens WHERE code = ?")
        .bind(&code)
        .fetch_one(db.pool())
        .await?;
    if existing > 0 {
        return Err(AppError::Validation(format!(
            "Demo data for seed {} already exists (kindergarten {})",
            options.seed, code
        )));
    }

    let password_hash = bcrypt::hash(&seed_config.default_password, seed_config.bcrypt_cost)?;

    let mut seeder = DemoSeeder {
        db,
        rng: StdRng::seed_from_u64(options.seed),
        options,
        password_hash,
        code,
        today: Utc::now().date_naive(),
        summary: DemoSeedSummary::default(),
    };
    seeder.run().await?;

    info!(summary = ?seeder.summary, "Demo data seeded");
    Ok(seeder.summary)
}

impl DemoSeeder<'_> {
    async fn run(&mut self) -> Result<(), AppError> {
        let kindergarten_id = self.kindergarten().await?;
        let principal_user = self.principal(kindergarten_id).await?;
        let classes = self.classes(kindergarten_id).await?;

        let mut teacher_users = Vec::new();
        let mut families = Vec::new();
        for (class_id, level) in &classes {
            teacher_users.push(self.teacher(kindergarten_id, *class_id).await?);
            for _ in 0..self.options.students_per_class {
                families.push(self.student(kindergarten_id, *class_id, *level).await?);
            }
        }

        self.activities(kindergarten_id, &families).await?;
        self.enrollment_applications(kindergarten_id).await?;
        self.attendance(&families).await?;
        self.tasks(principal_user, &teacher_users).await?;
        Ok(())
    }

    async fn kindergarten(&mut self) -> Result<i64, AppError> {
        let dialect = self.db.dialect();
        let sql = dialect.returning_id(
            "INSERT INTO kindergartens (name, code, address, phone, principal_name) \
             VALUES (?, ?, ?, ?, ?)",
        );
        let query = sqlx::query(&sql)
            .bind(format!("Demo Kindergarten {}", self.options.seed))
            .bind(&self.code)
            .bind("88 Garden Road")
            .bind("010-88886666")
            .bind("Demo Principal");
        let id = insert_row(self.db.pool(), dialect, query, "kindergarten").await?;
        self.summary.kindergartens += 1;
        Ok(id)
    }

    async fn user(&mut self, username: &str, real_name: &str, role: &str) -> Result<i64, AppError> {
        let phone = self.phone();
        let dialect = self.db.dialect();
        let sql = dialect.returning_id(
            "INSERT INTO users (username, password, real_name, phone, role) VALUES (?, ?, ?, ?, ?)",
        );
        let query = sqlx::query(&sql)
            .bind(username)
            .bind(&self.password_hash)
            .bind(real_name)
            .bind(phone)
            .bind(role);
        let id = insert_row(self.db.pool(), dialect, query, "user").await?;
        self.summary.users += 1;
        Ok(id)
    }

    async fn principal(&mut self, kindergarten_id: i64) -> Result<i64, AppError> {
        let username = format!("principal_{}", self.options.seed);
        let user_id = self.user(&username, "Demo Principal", "principal").await?;
        self.teacher_row(user_id, kindergarten_id, None, "Demo Principal", "Principal")
            .await?;
        Ok(user_id)
    }

    async fn classes(&mut self, kindergarten_id: i64) -> Result<Vec<(i64, ClassLevel)>, AppError> {
        let mut classes = Vec::new();
        let dialect = self.db.dialect();
        let sql = dialect.returning_id(
            "INSERT INTO classes (kindergarten_id, name, grade, capacity) VALUES (?, ?, ?, ?)",
        );

        for level in ClassLevel::ALL {
            for n in 1..=self.options.classes_per_grade {
                let query = sqlx::query(&sql)
                    .bind(kindergarten_id)
                    .bind(format!("{} Class {}", level.display_name(), n))
                    .bind(level.as_str())
                    .bind(self.options.students_per_class.max(1) as i64 + 5);
                let id = insert_row(self.db.pool(), dialect, query, "class").await?;
                classes.push((id, level));
                self.summary.classes += 1;
            }
        }

        Ok(classes)
    }

    async fn teacher(&mut self, kindergarten_id: i64, class_id: i64) -> Result<i64, AppError> {
        let n = self.summary.teachers + 1;
        let name = self.adult_name();
        let username = format!("teacher_{}_{}", self.options.seed, n);
        let user_id = self.user(&username, &name, "teacher").await?;
        self.teacher_row(user_id, kindergarten_id, Some(class_id), &name, "Head Teacher")
            .await?;
        Ok(user_id)
    }

    async fn teacher_row(
        &mut self,
        user_id: i64,
        kindergarten_id: i64,
        class_id: Option<i64>,
        name: &str,
        position: &str,
    ) -> Result<(), AppError> {
        let hire_date = self.today - Duration::days(self.rng.random_range(90..1500));
        sqlx::query(
            "INSERT INTO teachers (user_id, kindergarten_id, class_id, name, position, phone, hire_date) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(kindergarten_id)
        .bind(class_id)
        .bind(name)
        .bind(position)
        .bind(self.phone())
        .bind(date_str(hire_date))
        .execute(self.db.pool())
        .await?;
        self.summary.teachers += 1;
        Ok(())
    }

    async fn student(
        &mut self,
        kindergarten_id: i64,
        class_id: i64,
        level: ClassLevel,
    ) -> Result<Family, AppError> {
        let gender = *Gender::ALL.choose(&mut self.rng).unwrap_or(&Gender::Female);
        let family_name = self.pick(&FAMILY_NAMES);
        let given = match gender {
            Gender::Male => self.pick(&BOY_NAMES),
            Gender::Female => self.pick(&GIRL_NAMES),
        };
        let name = format!("{} {}", family_name, given);
        let age_days = level.age() * 365 + self.rng.random_range(0..365);
        let birth_date = self.today - Duration::days(age_days);
        let enrollment_date = self.today - Duration::days(self.rng.random_range(30..400));
        let student_no = format!("{}-{:05}", self.code, self.summary.students + 1);

        let dialect = self.db.dialect();
        let sql = dialect.returning_id(
            "INSERT INTO students \
             (kindergarten_id, class_id, name, student_no, gender, birth_date, enrollment_date) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        );
        let query = sqlx::query(&sql)
            .bind(kindergarten_id)
            .bind(class_id)
            .bind(&name)
            .bind(&student_no)
            .bind(gender.as_str())
            .bind(date_str(birth_date))
            .bind(date_str(enrollment_date));
        let student_id = insert_row(self.db.pool(), dialect, query, "student").await?;
        self.summary.students += 1;

        let relationship = if self.rng.random_bool(0.6) {
            "mother"
        } else {
            "father"
        };
        let parent_name = format!("{} {}", family_name, self.pick(&ADULT_NAMES));
        let parent_phone = self.phone();

        let sql = dialect.returning_id("INSERT INTO parents (name, phone, relationship) VALUES (?, ?, ?)");
        let query = sqlx::query(&sql)
            .bind(&parent_name)
            .bind(&parent_phone)
            .bind(relationship);
        let parent_id = insert_row(self.db.pool(), dialect, query, "parent").await?;
        self.summary.parents += 1;

        sqlx::query(
            "INSERT INTO parent_student_relations (parent_id, student_id, relationship, is_primary) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(parent_id)
        .bind(student_id)
        .bind(relationship)
        .bind(true)
        .execute(self.db.pool())
        .await?;
        self.summary.relations += 1;

        Ok(Family {
            student_id,
            class_id,
            parent_name,
            parent_phone,
        })
    }

    async fn activities(&mut self, kindergarten_id: i64, families: &[Family]) -> Result<(), AppError> {
        for _ in 0..self.options.activities {
            let kind = *ActivityType::ALL
                .choose(&mut self.rng)
                .unwrap_or(&ActivityType::OpenDay);
            let offset = self.rng.random_range(-30..30);
            let day = self.today + Duration::days(offset);
            let start = day.and_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN));
            let end = start + Duration::hours(2);
            let status = if offset < 0 { "completed" } else { "planned" };

            let dialect = self.db.dialect();
            let sql = dialect.returning_id(
                "INSERT INTO activities \
                 (kindergarten_id, title, activity_type, description, start_time, end_time, \
                  location, capacity, status) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            );
            let query = sqlx::query(&sql)
                .bind(kindergarten_id)
                .bind(format!("{} {}", kind.title(), day.format("%m/%d")))
                .bind(kind.as_str())
                .bind(format!("{} for families and children", kind.title()))
                .bind(datetime_str(start))
                .bind(datetime_str(end))
                .bind("Main Hall")
                .bind(40_i64)
                .bind(status);
            let activity_id = insert_row(self.db.pool(), dialect, query, "activity").await?;
            self.summary.activities += 1;

            if families.is_empty() {
                continue;
            }
            let registrations = self.rng.random_range(3..=10).min(families.len());
            let chosen: Vec<&Family> = families
                .choose_multiple(&mut self.rng, registrations)
                .collect();
            for family in chosen {
                let checked_in = status == "completed" && self.rng.random_bool(0.8);
                sqlx::query(
                    "INSERT INTO activity_registrations \
                     (activity_id, student_id, contact_name, contact_phone, status, checked_in) \
                     VALUES (?, ?, ?, ?, 'registered', ?)",
                )
                .bind(activity_id)
                .bind(family.student_id)
                .bind(&family.parent_name)
                .bind(&family.parent_phone)
                .bind(checked_in)
                .execute(self.db.pool())
                .await?;
                self.summary.registrations += 1;
            }
        }

        Ok(())
    }

    async fn enrollment_applications(&mut self, kindergarten_id: i64) -> Result<(), AppError> {
        for _ in 0..self.options.enrollment_applications {
            let gender = *Gender::ALL.choose(&mut self.rng).unwrap_or(&Gender::Male);
            let family_name = self.pick(&FAMILY_NAMES);
            let given = match gender {
                Gender::Male => self.pick(&BOY_NAMES),
                Gender::Female => self.pick(&GIRL_NAMES),
            };
            let status = *EnrollmentStatus::ALL
                .choose(&mut self.rng)
                .unwrap_or(&EnrollmentStatus::Pending);
            let birth_date = self.today - Duration::days(self.rng.random_range(700..2000));
            let applied = self.today - Duration::days(self.rng.random_range(0..90));
            let applied_at =
                applied.and_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN));

            sqlx::query(
                "INSERT INTO enrollment_applications \
                 (kindergarten_id, child_name, gender, birth_date, parent_name, parent_phone, \
                  source, status, applied_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(kindergarten_id)
            .bind(format!("{} {}", family_name, given))
            .bind(gender.as_str())
            .bind(date_str(birth_date))
            .bind(format!("{} {}", family_name, self.pick(&ADULT_NAMES)))
            .bind(self.phone())
            .bind(self.pick(&ENROLLMENT_SOURCES))
            .bind(status.as_str())
            .bind(datetime_str(applied_at))
            .execute(self.db.pool())
            .await?;
            self.summary.enrollment_applications += 1;
        }

        Ok(())
    }

    /// One row per student per school day, weekends skipped.
    async fn attendance(&mut self, families: &[Family]) -> Result<(), AppError> {
        let mut days = Vec::new();
        let mut day = self.today;
        while days.len() < self.options.attendance_days {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                days.push(day);
            }
            day -= Duration::days(1);
        }

        for day in days {
            for family in families {
                let roll: f64 = self.rng.random();
                let status = if roll < 0.85 {
                    AttendanceStatus::Present
                } else if roll < 0.90 {
                    AttendanceStatus::Late
                } else if roll < 0.95 {
                    AttendanceStatus::Leave
                } else {
                    AttendanceStatus::Absent
                };
                let check_in = match status {
                    AttendanceStatus::Present => Some((8, self.rng.random_range(0..30))),
                    AttendanceStatus::Late => Some((9, self.rng.random_range(0..45))),
                    _ => None,
                }
                .and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
                .map(|t| datetime_str(day.and_time(t)));

                sqlx::query(
                    "INSERT INTO attendances \
                     (student_id, class_id, attendance_date, status, check_in_time) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(family.student_id)
                .bind(family.class_id)
                .bind(date_str(day))
                .bind(status.as_str())
                .bind(check_in)
                .execute(self.db.pool())
                .await?;
                self.summary.attendances += 1;
            }
        }

        Ok(())
    }

    async fn tasks(&mut self, creator_id: i64, assignees: &[i64]) -> Result<(), AppError> {
        for _ in 0..self.options.tasks {
            let title = self.pick(&TASK_TITLES);
            let priority = *TaskPriority::ALL
                .choose(&mut self.rng)
                .unwrap_or(&TaskPriority::Medium);
            let status = *TaskStatus::ALL
                .choose(&mut self.rng)
                .unwrap_or(&TaskStatus::Pending);
            let assignee = assignees.choose(&mut self.rng).copied();
            let due = self.today + Duration::days(self.rng.random_range(-5..15));

            sqlx::query(
                "INSERT INTO tasks (title, description, assignee_id, creator_id, priority, status, due_date) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(title)
            .bind(format!("{} before {}", title, due.format("%Y-%m-%d")))
            .bind(assignee)
            .bind(creator_id)
            .bind(priority.as_str())
            .bind(status.as_str())
            .bind(date_str(due))
            .execute(self.db.pool())
            .await?;
            self.summary.tasks += 1;
        }

        Ok(())
    }

    fn pick(&mut self, values: &[&'static str]) -> &'static str {
        values.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn adult_name(&mut self) -> String {
        format!("{} {}", self.pick(&FAMILY_NAMES), self.pick(&ADULT_NAMES))
    }

    fn phone(&mut self) -> String {
        let prefix = *["138", "139", "158", "186"].choose(&mut self.rng).unwrap_or(&"138");
        format!("{}{:08}", prefix, self.rng.random_range(0..100_000_000u32))
    }
}
