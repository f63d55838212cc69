pub mod demo;
pub mod documents;
pub mod page_guides;
pub mod referral;
pub mod teaching;

pub use demo::*;
pub use documents::*;
pub use page_guides::*;
pub use referral::*;
pub use teaching::*;

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, Executor, Row};

use crate::db::Dialect;
use crate::error::AppError;

/// Runs an INSERT whose SQL came from [`Dialect::returning_id`] and yields
/// the id of the new row.
pub(crate) async fn insert_row<'q, 'c, E>(
    executor: E,
    dialect: Dialect,
    query: Query<'q, Any, AnyArguments<'q>>,
    what: &str,
) -> Result<i64, AppError>
where
    E: Executor<'c, Database = Any>,
{
    let id = match dialect {
        Dialect::Sqlite => Some(query.fetch_one(executor).await?.try_get::<i64, _>(0)?),
        Dialect::MySql => query.execute(executor).await?.last_insert_id(),
    };
    id.ok_or_else(|| AppError::Internal(format!("No id returned for inserted {}", what)))
}

pub(crate) fn date_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn datetime_str(datetime: NaiveDateTime) -> String {
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}
