use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::db::Database;
use crate::error::AppError;
use crate::seed::insert_row;

pub struct GuideSeed {
    pub page_path: &'static str,
    pub page_name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub importance: i64,
    pub related_tables: &'static [&'static str],
    pub context_prompt: &'static str,
    pub sections: &'static [SectionSeed],
}

pub struct SectionSeed {
    pub name: &'static str,
    pub description: &'static str,
    pub path: &'static str,
    pub features: &'static [&'static str],
}

pub const PAGE_GUIDES: &[GuideSeed] = &[
    GuideSeed {
        page_path: "/dashboard",
        page_name: "Dashboard",
        description: "Overview of enrollment, attendance, activities and pending tasks for the whole kindergarten.",
        category: "overview",
        importance: 10,
        related_tables: &["students", "attendances", "activities", "tasks"],
        context_prompt: "The user is on the dashboard. Summarize key figures and point to the page that holds the detail.",
        sections: &[
            SectionSeed {
                name: "Key metrics",
                description: "Student count, today's attendance rate and open enrollment applications.",
                path: "/dashboard#metrics",
                features: &["student total", "attendance rate", "pending applications"],
            },
            SectionSeed {
                name: "Today's schedule",
                description: "Activities and tasks due today.",
                path: "/dashboard#today",
                features: &["activity list", "task reminders"],
            },
        ],
    },
    GuideSeed {
        page_path: "/students",
        page_name: "Student Management",
        description: "List, search and edit student records, class placement and health information.",
        category: "education",
        importance: 9,
        related_tables: &["students", "classes", "parents", "parent_student_relations"],
        context_prompt: "The user manages student records. Queries usually filter by class, status or enrollment date.",
        sections: &[
            SectionSeed {
                name: "Student list",
                description: "Filterable table of students with class and status.",
                path: "/students",
                features: &["search", "class filter", "export"],
            },
            SectionSeed {
                name: "Student profile",
                description: "Personal details, guardians and health notes.",
                path: "/students/:id",
                features: &["guardian contacts", "health fields", "attendance history"],
            },
        ],
    },
    GuideSeed {
        page_path: "/enrollment",
        page_name: "Enrollment Center",
        description: "Track enrollment applications from first contact to admission.",
        category: "enrollment",
        importance: 9,
        related_tables: &["enrollment_applications", "students", "referral_relationships"],
        context_prompt: "The user follows enrollment applications. Status moves from pending to interviewed to approved or rejected.",
        sections: &[
            SectionSeed {
                name: "Applications",
                description: "Applications grouped by status and source.",
                path: "/enrollment/applications",
                features: &["status board", "source statistics"],
            },
            SectionSeed {
                name: "Conversion funnel",
                description: "Conversion rate from application to enrolled student.",
                path: "/enrollment/funnel",
                features: &["monthly trend", "source breakdown"],
            },
        ],
    },
    GuideSeed {
        page_path: "/activities",
        page_name: "Activity Center",
        description: "Plan activities, manage registrations and generate posters.",
        category: "activity",
        importance: 8,
        related_tables: &["activities", "activity_registrations", "poster_templates"],
        context_prompt: "The user organizes activities. Registrations and check-ins measure participation.",
        sections: &[
            SectionSeed {
                name: "Activity list",
                description: "Upcoming and past activities with capacity.",
                path: "/activities",
                features: &["calendar", "capacity tracking"],
            },
            SectionSeed {
                name: "Registrations",
                description: "Registered families and check-in status.",
                path: "/activities/:id/registrations",
                features: &["check-in", "contact export"],
            },
            SectionSeed {
                name: "Posters",
                description: "Generate a promotional poster from a template.",
                path: "/activities/:id/poster",
                features: &["template picker", "poster download"],
            },
        ],
    },
    GuideSeed {
        page_path: "/attendance",
        page_name: "Attendance",
        description: "Daily check-in and check-out records per class.",
        category: "education",
        importance: 8,
        related_tables: &["attendances", "students", "classes"],
        context_prompt: "The user reviews attendance. Each student has at most one record per day.",
        sections: &[SectionSeed {
            name: "Daily records",
            description: "Present, late, leave and absent counts per class.",
            path: "/attendance/daily",
            features: &["class summary", "absence follow-up"],
        }],
    },
    GuideSeed {
        page_path: "/marketing/referrals",
        page_name: "Referral Marketing",
        description: "Referral codes, referred families, conversions and rewards.",
        category: "marketing",
        importance: 7,
        related_tables: &["referral_relationships", "referral_rewards", "parents", "teachers"],
        context_prompt: "The user analyzes referrals. A conversion is a referred child who enrolled.",
        sections: &[
            SectionSeed {
                name: "Referral ranking",
                description: "Referrers ordered by converted referrals.",
                path: "/marketing/referrals/ranking",
                features: &["leaderboard", "reward totals"],
            },
            SectionSeed {
                name: "Rewards",
                description: "Issued and pending referral rewards.",
                path: "/marketing/referrals/rewards",
                features: &["reward status", "payout export"],
            },
        ],
    },
    GuideSeed {
        page_path: "/tasks",
        page_name: "Task Center",
        description: "Assign and track staff tasks built from templates.",
        category: "management",
        importance: 6,
        related_tables: &["tasks", "task_templates", "users"],
        context_prompt: "The user manages staff tasks by status, priority and due date.",
        sections: &[SectionSeed {
            name: "Task board",
            description: "Tasks grouped by status.",
            path: "/tasks/board",
            features: &["priority filter", "overdue highlight"],
        }],
    },
    GuideSeed {
        page_path: "/teaching-center",
        page_name: "Teaching Center",
        description: "Course plans per class and session progress.",
        category: "education",
        importance: 7,
        related_tables: &["courses", "course_plans", "course_progress", "classes"],
        context_prompt: "The user follows course progress per class for the current semester.",
        sections: &[SectionSeed {
            name: "Course progress",
            description: "Completed sessions per course plan.",
            path: "/teaching-center/progress",
            features: &["completion rate", "class comparison"],
        }],
    },
    GuideSeed {
        page_path: "/ai-assistant",
        page_name: "AI Assistant",
        description: "Ask questions about kindergarten data in natural language.",
        category: "ai",
        importance: 8,
        related_tables: &["ai_usage_records", "page_guides"],
        context_prompt: "The user talks to the assistant. Simple counts are answered directly, the rest goes through templates or the model.",
        sections: &[SectionSeed {
            name: "Usage",
            description: "Token usage and cost per user.",
            path: "/ai-assistant/usage",
            features: &["token totals", "billing status"],
        }],
    },
];

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PageGuideSeedSummary {
    pub guides_created: usize,
    pub guides_skipped: usize,
    pub sections_created: usize,
    pub sections_skipped: usize,
}

#[instrument(skip(db, guides))]
pub async fn seed_page_guides(
    db: &Database,
    guides: &[GuideSeed],
) -> Result<PageGuideSeedSummary, AppError> {
    let mut summary = PageGuideSeedSummary::default();

    for guide in guides {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM page_guides WHERE page_path = ?")
                .bind(guide.page_path)
                .fetch_optional(db.pool())
                .await?;

        let guide_id = match existing {
            Some(id) => {
                debug!("Page guide {} already present", guide.page_path);
                summary.guides_skipped += 1;
                id
            }
            None => {
                let sql = db.dialect().returning_id(
                    "INSERT INTO page_guides \
                     (page_path, page_name, page_description, category, importance, \
                      related_tables, context_prompt, is_active) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                );
                let query = sqlx::query(&sql)
                    .bind(guide.page_path)
                    .bind(guide.page_name)
                    .bind(guide.description)
                    .bind(guide.category)
                    .bind(guide.importance)
                    .bind(serde_json::to_string(guide.related_tables)?)
                    .bind(guide.context_prompt)
                    .bind(true);
                let id = insert_row(db.pool(), db.dialect(), query, "page guide").await?;
                summary.guides_created += 1;
                id
            }
        };

        for (order, section) in guide.sections.iter().enumerate() {
            let present: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM page_guide_sections \
                 WHERE page_guide_id = ? AND section_name = ?",
            )
            .bind(guide_id)
            .bind(section.name)
            .fetch_one(db.pool())
            .await?;
            if present > 0 {
                summary.sections_skipped += 1;
                continue;
            }

            sqlx::query(
                "INSERT INTO page_guide_sections \
                 (page_guide_id, section_name, section_description, section_path, features, \
                  sort_order, is_active) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(guide_id)
            .bind(section.name)
            .bind(section.description)
            .bind(section.path)
            .bind(serde_json::to_string(section.features)?)
            .bind(order as i64 + 1)
            .bind(true)
            .execute(db.pool())
            .await?;
            summary.sections_created += 1;
        }
    }

    info!(
        created = summary.guides_created,
        skipped = summary.guides_skipped,
        "Page guides seeded"
    );
    Ok(summary)
}
