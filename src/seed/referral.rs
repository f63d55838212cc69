use chrono::{Datelike, Months, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{Any, Transaction};
use tracing::{info, instrument};

use crate::db::{Database, Dialect};
use crate::error::AppError;
use crate::models::{ReferralStatus, ReferrerType};
use crate::seed::{datetime_str, insert_row};

pub const DEFAULT_MONTHLY_CONVERSIONS: [u32; 6] = [8, 12, 15, 18, 22, 25];

#[derive(Debug, Clone, PartialEq)]
pub struct ReferralPlan {
    /// First day of the first month in the plan.
    pub start_month: NaiveDate,
    /// Converted referrals per consecutive month.
    pub monthly_conversions: Vec<u32>,
    pub leads_per_month: u32,
    pub reward_amount: f64,
}

impl ReferralPlan {
    /// A plan whose last month is the current one.
    pub fn ending_this_month(monthly_conversions: Vec<u32>) -> Self {
        let today = Utc::now().date_naive();
        let this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), 1).unwrap_or(today);
        let back = monthly_conversions.len().saturating_sub(1) as u32;
        let start_month = this_month
            .checked_sub_months(Months::new(back))
            .unwrap_or(this_month);

        Self {
            start_month,
            monthly_conversions,
            leads_per_month: 5,
            reward_amount: 200.0,
        }
    }

    pub fn total_conversions(&self) -> u32 {
        self.monthly_conversions.iter().sum()
    }

    pub fn month_start(&self, index: usize) -> Result<NaiveDate, AppError> {
        self.start_month
            .checked_add_months(Months::new(index as u32))
            .ok_or_else(|| AppError::Validation("Referral plan runs past the calendar".into()))
    }
}

impl Default for ReferralPlan {
    fn default() -> Self {
        Self::ending_this_month(DEFAULT_MONTHLY_CONVERSIONS.to_vec())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ReferralSeedSummary {
    pub converted: u32,
    pub leads: u32,
    pub rewards: u32,
    pub monthly: Vec<MonthlyConversions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyConversions {
    pub month: String,
    pub converted: u32,
}

struct Referrer {
    kind: ReferrerType,
    id: i64,
    name: String,
}

impl Referrer {
    fn code(&self) -> String {
        let prefix = match self.kind {
            ReferrerType::Teacher => 'T',
            ReferrerType::Parent => 'P',
        };
        format!("REF-{}{:06}", prefix, self.id)
    }
}

/// Inserts the whole plan in one transaction; nothing is kept on failure.
#[instrument(skip(db))]
pub async fn seed_referrals(
    db: &Database,
    plan: &ReferralPlan,
) -> Result<ReferralSeedSummary, AppError> {
    if plan.monthly_conversions.is_empty() {
        return Err(AppError::Validation(
            "Referral plan needs at least one month".to_string(),
        ));
    }

    let referrers = load_referrers(db).await?;
    if referrers.is_empty() {
        return Err(AppError::NotFound(
            "No teachers or parents to act as referrers; seed demo data first".to_string(),
        ));
    }

    let mut tx = db.pool().begin().await?;
    match insert_plan(&mut tx, db.dialect(), plan, &referrers).await {
        Ok(summary) => {
            tx.commit().await?;
            info!(
                converted = summary.converted,
                leads = summary.leads,
                "Referral demo data committed"
            );
            Ok(summary)
        }
        Err(e) => {
            tx.rollback().await?;
            Err(e)
        }
    }
}

async fn load_referrers(db: &Database) -> Result<Vec<Referrer>, AppError> {
    let teachers: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM teachers WHERE deleted_at IS NULL ORDER BY id")
            .fetch_all(db.pool())
            .await?;
    let parents: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM parents WHERE deleted_at IS NULL ORDER BY id LIMIT 20")
            .fetch_all(db.pool())
            .await?;

    let teachers = teachers.into_iter().map(|(id, name)| Referrer {
        kind: ReferrerType::Teacher,
        id,
        name,
    });
    let parents = parents.into_iter().map(|(id, name)| Referrer {
        kind: ReferrerType::Parent,
        id,
        name,
    });

    Ok(teachers.chain(parents).collect())
}

async fn insert_plan(
    tx: &mut Transaction<'_, Any>,
    dialect: Dialect,
    plan: &ReferralPlan,
    referrers: &[Referrer],
) -> Result<ReferralSeedSummary, AppError> {
    let mut summary = ReferralSeedSummary::default();
    let mut sequence: usize = 0;

    for (month_index, &conversions) in plan.monthly_conversions.iter().enumerate() {
        let month_start = plan.month_start(month_index)?;

        for n in 0..conversions {
            let referrer = &referrers[sequence % referrers.len()];
            let day = month_start + chrono::Duration::days(i64::from(n % 28));
            let created_at = datetime_str(day.and_time(hms(9, 0)));
            let converted_at = datetime_str(day.and_time(hms(16, 30)));

            let sql = dialect.returning_id(
                "INSERT INTO referral_relationships \
                 (referrer_type, referrer_id, referrer_name, referral_code, referee_name, \
                  referee_phone, status, converted_at, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            );
            let query = sqlx::query(&sql)
                .bind(referrer.kind.as_str())
                .bind(referrer.id)
                .bind(&referrer.name)
                .bind(referrer.code())
                .bind(format!("Referred Child {}", sequence + 1))
                .bind(format!("139{:08}", sequence + 1))
                .bind(ReferralStatus::Converted.as_str())
                .bind(&converted_at)
                .bind(&created_at)
                .bind(&converted_at);
            let relationship_id =
                insert_row(&mut **tx, dialect, query, "referral relationship").await?;

            sqlx::query(
                "INSERT INTO referral_rewards \
                 (relationship_id, reward_type, amount, status, issued_at) \
                 VALUES (?, 'cash', ?, 'issued', ?)",
            )
            .bind(relationship_id)
            .bind(plan.reward_amount)
            .bind(&converted_at)
            .execute(&mut **tx)
            .await?;

            summary.converted += 1;
            summary.rewards += 1;
            sequence += 1;
        }

        for n in 0..plan.leads_per_month {
            let referrer = &referrers[sequence % referrers.len()];
            let day = month_start + chrono::Duration::days(i64::from(n % 28));
            let status = if n % 2 == 0 {
                ReferralStatus::Pending
            } else {
                ReferralStatus::Visited
            };

            sqlx::query(
                "INSERT INTO referral_relationships \
                 (referrer_type, referrer_id, referrer_name, referral_code, referee_name, \
                  referee_phone, status, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(referrer.kind.as_str())
            .bind(referrer.id)
            .bind(&referrer.name)
            .bind(referrer.code())
            .bind(format!("Referral Lead {}", sequence + 1))
            .bind(format!("138{:08}", sequence + 1))
            .bind(status.as_str())
            .bind(datetime_str(day.and_time(hms(11, 0))))
            .bind(datetime_str(day.and_time(hms(11, 0))))
            .execute(&mut **tx)
            .await?;

            summary.leads += 1;
            sequence += 1;
        }

        summary.monthly.push(MonthlyConversions {
            month: month_start.format("%Y-%m").to_string(),
            converted: conversions,
        });
    }

    Ok(summary)
}

fn hms(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
